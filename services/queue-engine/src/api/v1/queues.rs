//! On-demand sweep triggers.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::queue::{SweepKind, SweepReport, Trigger};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/verify-relationships", post(verify_relationships))
        .route("/deployment-timeouts", post(deployment_timeouts))
        .route("/start-deployments", post(start_deployments))
}

async fn run(state: &AppState, kind: SweepKind) -> (StatusCode, Json<SweepReport>) {
    let report = state.engine().run_sweep(kind, Trigger::OnDemand).await;
    let status = if report.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

async fn verify_relationships(State(state): State<AppState>) -> (StatusCode, Json<SweepReport>) {
    run(&state, SweepKind::Relationships).await
}

async fn deployment_timeouts(State(state): State<AppState>) -> (StatusCode, Json<SweepReport>) {
    run(&state, SweepKind::Timeouts).await
}

async fn start_deployments(State(state): State<AppState>) -> (StatusCode, Json<SweepReport>) {
    run(&state, SweepKind::DeploymentStart).await
}
