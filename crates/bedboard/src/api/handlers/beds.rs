use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{ApiResult, DEFAULT_LIMIT};
use crate::api::extract::{Body, Id, Params};
use crate::api::{ApiError, AppState};
use crate::model::{BedUpdate, NewBed, StatusChangeRequest};
use crate::workflow::TransitionOutcome;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct HistoryParams {
    limit: usize,
}

impl Default for HistoryParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

pub(crate) async fn create(State(state): State<AppState>, Body(new): Body<NewBed>) -> ApiResult {
    let bed = state.with_storage(move |s| s.create_bed(&new)).await?;
    Ok(Json(json!({ "success": true, "bed": bed })))
}

pub(crate) async fn show(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    let bed = state.with_storage(move |s| s.bed(id)).await?;
    Ok(Json(json!({ "success": true, "bed": bed })))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Id(id): Id,
    Body(update): Body<BedUpdate>,
) -> ApiResult {
    let bed = state.with_storage(move |s| s.update_bed(id, &update)).await?;
    Ok(Json(json!({ "success": true, "bed": bed })))
}

pub(crate) async fn deactivate(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    state.with_storage(move |s| s.deactivate_bed(id)).await?;
    Ok(Json(json!({ "success": true })))
}

/// Run the transition workflow.
///
/// An unconfirmed transfer answers 409 with the patient and the bed they
/// currently occupy; the client repeats the request with
/// `confirm_transfer: true` to proceed.
pub(crate) async fn change_status(
    State(state): State<AppState>,
    Id(id): Id,
    Body(request): Body<StatusChangeRequest>,
) -> Result<Response, ApiError> {
    let actor = state.default_actor.clone();
    let outcome = state
        .with_storage(move |s| s.change_bed_status(id, &request, &actor))
        .await?;

    let warning = outcome.warning();
    let response = match outcome {
        TransitionOutcome::Applied { bed, released_bed } => Json(json!({
            "success": true,
            "bed": bed,
            "released_bed": released_bed,
        }))
        .into_response(),
        TransitionOutcome::ConfirmationRequired {
            patient,
            current_bed,
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "requires_confirmation": true,
                "warning": warning,
                "patient": patient,
                "current_bed": current_bed,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

pub(crate) async fn history(
    State(state): State<AppState>,
    Id(id): Id,
    Params(params): Params<HistoryParams>,
) -> ApiResult {
    let history = state
        .with_storage(move |s| s.bed_history(id, params.limit))
        .await?;
    Ok(Json(json!({ "success": true, "history": history })))
}
