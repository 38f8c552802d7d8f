//! Audit history endpoints, one subtree per entity kind.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use oqs_audit::{AuditRecord, EntityKind};

use crate::api::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/deployments", kind_routes(EntityKind::Deployment))
        .nest("/pods", kind_routes(EntityKind::Pod))
        .nest("/configurations", kind_routes(EntityKind::Configuration))
}

fn kind_routes(kind: EntityKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>| async move {
                list_history(state, kind).await
            }),
        )
        .route(
            "/{name}",
            get(
                move |State(state): State<AppState>, Path(name): Path<String>| async move {
                    entity_history(state, kind, name).await
                },
            ),
        )
}

async fn list_history(state: AppState, kind: EntityKind) -> ApiResult<Json<Vec<AuditRecord>>> {
    Ok(Json(state.history().list(kind).await?))
}

async fn entity_history(
    state: AppState,
    kind: EntityKind,
    name: String,
) -> ApiResult<Json<Vec<AuditRecord>>> {
    Ok(Json(state.history().for_entity(kind, &name).await?))
}
