//! Deployment endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use super::actor;
use crate::api::error::ApiResult;
use crate::model::{Deployment, DeploymentPatch, NewDeployment};
use crate::service::{DeploymentCreated, DeploymentDeleted, DeploymentUpdated, DocumentFilter};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deployments).post(create_deployment))
        .route(
            "/{name}",
            get(get_deployment)
                .put(update_deployment)
                .delete(delete_deployment),
        )
}

/// Lists deployments, keeping those whose fields match every query pair,
/// e.g. `?queueStatus=Queued&associatedPod=cloud1`.
async fn list_deployments(
    State(state): State<AppState>,
    Query(filter): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Deployment>>> {
    let filter = DocumentFilter::from(filter);
    Ok(Json(state.deployments().search(&filter).await?))
}

async fn get_deployment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Deployment>> {
    Ok(Json(state.deployments().get(&name).await?))
}

async fn create_deployment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewDeployment>,
) -> ApiResult<(StatusCode, Json<DeploymentCreated>)> {
    let created = state
        .deployments()
        .create(request, &actor(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_deployment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<DeploymentPatch>,
) -> ApiResult<Json<DeploymentUpdated>> {
    let updated = state
        .deployments()
        .update(&name, patch, &actor(&headers))
        .await?;
    Ok(Json(updated))
}

async fn delete_deployment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<DeploymentDeleted>> {
    let deleted = state.deployments().delete(&name, &actor(&headers)).await?;
    Ok(Json(deleted))
}
