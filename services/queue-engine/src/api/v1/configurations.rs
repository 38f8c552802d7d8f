//! Configuration endpoints.

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
use crate::model::{Configuration, ConfigurationPatch};
use crate::service::DocumentFilter;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_configurations).post(create_configuration))
        .route(
            "/{name}",
            get(get_configuration)
                .put(update_configuration)
                .delete(delete_configuration),
        )
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn list_configurations(
    State(state): State<AppState>,
    Query(filter): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Vec<Configuration>>> {
    let filter = DocumentFilter::from(filter);
    Ok(Json(state.configurations().search(&filter).await?))
}

async fn get_configuration(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Configuration>> {
    Ok(Json(state.configurations().get(&name).await?))
}

async fn create_configuration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(configuration): Json<Configuration>,
) -> ApiResult<(StatusCode, Json<Configuration>)> {
    let created = state
        .configurations()
        .create(configuration, &actor(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_configuration(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<ConfigurationPatch>,
) -> ApiResult<Json<Configuration>> {
    let updated = state
        .configurations()
        .update(&name, patch, &actor(&headers))
        .await?;
    Ok(Json(updated))
}

async fn delete_configuration(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<MessageResponse>> {
    state
        .configurations()
        .delete(&name, &actor(&headers))
        .await?;
    Ok(Json(MessageResponse {
        message: "Configuration deleted successfully.",
    }))
}
