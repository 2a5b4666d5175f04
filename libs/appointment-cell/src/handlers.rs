use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::Session;
use shared_models::error::AppError;
use shared_utils::extractor::optional_session;
use shared_utils::AppState;

use crate::models::{
    ConfirmBookingRequest, DoctorScheduleQuery, DoctorStatusUpdateRequest, RescheduleRequest,
    SelectSlotRequest,
};
use crate::services::BookingService;

// ==============================================================================
// BOOKING WORKFLOW HANDLERS
// ==============================================================================

/// Open to guests. Without a session the response carries the pending
/// selection and the login redirect.
#[axum::debug_handler]
pub async fn select_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SelectSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let session = optional_session(&state, &headers).await;
    let booking_service = BookingService::new(&state);

    let outcome = booking_service.select_slot(session.as_ref(), request).await?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service.confirm_booking(&session, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Your appointment has been booked",
    })))
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointments = booking_service.my_appointments(&session).await;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service.get_appointment(&session, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .cancel_appointment(&session, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment canceled",
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .reschedule_appointment(&session, appointment_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_schedule(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<DoctorScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = session
        .doctor_id
        .ok_or_else(|| AppError::Forbidden("No doctor profile is linked to this account".to_string()))?;
    let booking_service = BookingService::new(&state);

    let groups = booking_service.doctor_schedule(doctor_id, &query).await;
    let total: usize = groups.iter().map(|g| g.appointments.len()).sum();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "view": query.view,
        "total": total,
        "groups": groups,
    })))
}

#[axum::debug_handler]
pub async fn update_status_by_doctor(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<DoctorStatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .update_status_by_doctor(&session, appointment_id, request)
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointments = booking_service.all_appointments().await;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments,
    })))
}
