use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{ApiResult, DEFAULT_LIMIT};
use crate::api::extract::{Body, Id, Params};
use crate::api::AppState;
use crate::model::{NewPatient, PatientUpdate};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct SearchParams {
    q: String,
    limit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: String::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

pub(crate) async fn search(
    State(state): State<AppState>,
    Params(params): Params<SearchParams>,
) -> ApiResult {
    let patients = state
        .with_storage(move |s| s.search_patients(&params.q, params.limit))
        .await?;
    Ok(Json(json!({ "success": true, "patients": patients })))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Body(new): Body<NewPatient>,
) -> ApiResult {
    let patient = state.with_storage(move |s| s.create_patient(&new)).await?;
    Ok(Json(json!({ "success": true, "patient": patient })))
}

/// A patient with the bed they occupy, if any.
pub(crate) async fn show(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    let (patient, bed) = state
        .with_storage(move |s| Ok((s.patient(id)?, s.patient_bed(id)?)))
        .await?;
    Ok(Json(json!({ "success": true, "patient": patient, "bed": bed })))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Id(id): Id,
    Body(update): Body<PatientUpdate>,
) -> ApiResult {
    let patient = state
        .with_storage(move |s| s.update_patient(id, &update))
        .await?;
    Ok(Json(json!({ "success": true, "patient": patient })))
}

pub(crate) async fn deactivate(State(state): State<AppState>, Id(id): Id) -> ApiResult {
    state.with_storage(move |s| s.deactivate_patient(id)).await?;
    Ok(Json(json!({ "success": true })))
}
