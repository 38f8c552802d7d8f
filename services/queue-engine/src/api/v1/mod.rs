//! API v1 routes.

mod configurations;
mod deployments;
mod history;
mod pods;
mod queues;

use axum::{http::HeaderMap, Router};
use oqs_audit::Actor;

use crate::state::AppState;

/// Header naming the user on whose behalf a mutation is made.
pub const ACTOR_HEADER: &str = "x-oqs-user";

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/deployments", deployments::routes())
        .nest("/pods", pods::routes())
        .nest("/configurations", configurations::routes())
        .nest("/queues", queues::routes())
        .nest("/history", history::routes())
}

/// The audit actor for a request: the named user, or the system.
fn actor(headers: &HeaderMap) -> Actor {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Actor::User(v.to_string()))
        .unwrap_or_default()
}
