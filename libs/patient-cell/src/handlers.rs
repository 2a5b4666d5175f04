use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{PatientSearchQuery, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);
    let patients = service.search(&query).await;

    Ok(Json(json!({
        "total": patients.len(),
        "patients": patients,
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);
    let summary = service.summary(patient_id).await?;

    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);
    let patient = service.update(patient_id, request).await?;

    Ok(Json(json!(patient.profile())))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);
    let removed = service.delete(patient_id).await?;
    let revoked = state
        .sessions
        .revoke_user(&removed.id.to_string(), Role::Patient)
        .await;

    Ok(Json(json!({
        "success": true,
        "deleted": removed.id,
        "sessions_closed": revoked,
    })))
}
