use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    CreateDoctorRequest, DoctorProfile, DoctorSearchFilters, DoctorStatus, UpdateDoctorRequest,
};
use crate::services::{AvailabilityService, DoctorService};

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub q: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);

    let filters = DoctorSearchFilters {
        q: query.q,
        specialty: query.specialty,
        status: Some(DoctorStatus::Active),
    };
    let doctors: Vec<DoctorProfile> = doctor_service
        .search(&filters)
        .await
        .iter()
        .map(DoctorProfile::from)
        .collect();

    Ok(Json(json!({
        "total": doctors.len(),
        "doctors": doctors,
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    let doctor = doctor_service.get(doctor_id).await?;

    Ok(Json(json!(doctor.profile())))
}

#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state.db, &state.config);
    let slots = availability_service.slots_for(doctor_id, query.date).await?;
    let available = slots.iter().filter(|s| s.is_available).count();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "available_count": available,
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    let specialties = doctor_service.specialties().await;

    Ok(Json(json!({ "specialties": specialties })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<DoctorSearchFilters>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    let doctors: Vec<DoctorProfile> = doctor_service
        .search(&filters)
        .await
        .iter()
        .map(DoctorProfile::from)
        .collect();

    Ok(Json(json!({
        "total": doctors.len(),
        "doctors": doctors,
    })))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    let doctor = doctor_service.create_doctor(request).await?;

    Ok(Json(json!(doctor.profile())))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    let doctor = doctor_service.update_doctor(doctor_id, request).await?;

    Ok(Json(json!(doctor.profile())))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    doctor_service.delete_doctor(doctor_id).await?;

    Ok(Json(json!({
        "deleted": true,
        "doctor_id": doctor_id,
    })))
}

#[axum::debug_handler]
pub async fn toggle_doctor_status(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state.db);
    let doctor = doctor_service.toggle_status(doctor_id).await?;

    Ok(Json(json!(doctor.profile())))
}

#[axum::debug_handler]
pub async fn regenerate_slots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state.db, &state.config);
    let report = availability_service.regenerate().await?;

    Ok(Json(json!(report)))
}
