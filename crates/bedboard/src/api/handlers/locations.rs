use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::ApiResult;
use crate::api::extract::{Body, Id, Params};
use crate::api::AppState;
use crate::model::{LocationKind, LocationUpdate, NewLocation};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LocationFilter {
    kind: Option<LocationKind>,
    parent_id: Option<i64>,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Params(filter): Params<LocationFilter>,
) -> ApiResult {
    let locations = state
        .with_storage(move |s| s.locations(filter.kind, filter.parent_id))
        .await?;
    Ok(Json(json!({ "success": true, "locations": locations })))
}

pub(crate) async fn tree(State(state): State<AppState>) -> ApiResult {
    let tree = state.with_storage(|s| s.location_tree()).await?;
    Ok(Json(json!({ "success": true, "locations": tree })))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Body(new): Body<NewLocation>,
) -> ApiResult {
    let location = state.with_storage(move |s| s.create_location(&new)).await?;
    Ok(Json(json!({ "success": true, "location": location })))
}

pub(crate) async fn show(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    let location = state.with_storage(move |s| s.location(id)).await?;
    Ok(Json(json!({ "success": true, "location": location })))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Id(id): Id,
    Body(update): Body<LocationUpdate>,
) -> ApiResult {
    let location = state
        .with_storage(move |s| s.update_location(id, &update))
        .await?;
    Ok(Json(json!({ "success": true, "location": location })))
}

pub(crate) async fn deactivate(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    state.with_storage(move |s| s.deactivate_location(id)).await?;
    Ok(Json(json!({ "success": true })))
}

/// A sector (or any location) with its beds, for the grid view.
pub(crate) async fn beds(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    let (location, beds) = state
        .with_storage(move |s| Ok((s.location(id)?, s.beds_in_location(id)?)))
        .await?;
    Ok(Json(json!({ "success": true, "location": location, "beds": beds })))
}
