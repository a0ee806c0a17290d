use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::ApiResult;
use crate::api::AppState;

pub(crate) async fn health(State(state): State<AppState>) -> ApiResult {
    let version = state.with_storage(|s| s.schema_version()).await?;
    Ok(Json(json!({
        "success": true,
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": version,
    })))
}

pub(crate) async fn statuses(State(state): State<AppState>) -> ApiResult {
    let statuses = state.with_storage(|s| s.statuses()).await?;
    Ok(Json(json!({ "success": true, "statuses": statuses })))
}

pub(crate) async fn statistics(State(state): State<AppState>) -> ApiResult {
    let stats = state.with_storage(|s| s.statistics()).await?;
    Ok(Json(json!({
        "success": true,
        "total": stats.total,
        "by_status": stats.by_status,
    })))
}

pub(crate) async fn dashboard(State(state): State<AppState>) -> ApiResult {
    let dashboard = state.with_storage(|s| s.dashboard()).await?;
    Ok(Json(json!({ "success": true, "dashboard": dashboard })))
}
