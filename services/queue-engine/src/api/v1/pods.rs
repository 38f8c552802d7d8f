//! Pod endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::actor;
use crate::api::error::ApiResult;
use crate::model::{NewPod, Pod, PodPatch};
use crate::service::{DocumentFilter, PodUpdated};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pods).post(create_pod))
        .route("/{name}", get(get_pod).put(update_pod).delete(delete_pod))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn list_pods(
    State(state): State<AppState>,
    Query(filter): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Pod>>> {
    let filter = DocumentFilter::from(filter);
    Ok(Json(state.pods().search(&filter).await?))
}

async fn get_pod(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<Pod>> {
    Ok(Json(state.pods().get(&name).await?))
}

async fn create_pod(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewPod>,
) -> ApiResult<(StatusCode, Json<Pod>)> {
    let pod = state.pods().create(request, &actor(&headers)).await?;
    Ok((StatusCode::CREATED, Json(pod)))
}

async fn update_pod(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<PodPatch>,
) -> ApiResult<Json<PodUpdated>> {
    let updated = state.pods().update(&name, patch, &actor(&headers)).await?;
    Ok(Json(updated))
}

async fn delete_pod(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<MessageResponse>> {
    state.pods().delete(&name, &actor(&headers)).await?;
    Ok(Json(MessageResponse {
        message: "Pod deleted successfully.",
    }))
}
