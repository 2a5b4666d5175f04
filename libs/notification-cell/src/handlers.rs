use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::Session;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::NotificationFeed;
use crate::services::NotificationService;

fn doctor_id_of(session: &Session) -> Result<i64, AppError> {
    session
        .doctor_id
        .ok_or_else(|| AppError::Forbidden("No doctor profile is linked to this account".to_string()))
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_id_of(&session)?;
    let service = NotificationService::new(&state.db);

    let notifications = service.for_doctor(doctor_id).await;
    let feed = NotificationFeed {
        unread: notifications.iter().filter(|n| !n.read).count(),
        notifications,
    };

    Ok(Json(json!(feed)))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_id_of(&session)?;
    let service = NotificationService::new(&state.db);

    let notification = service.mark_as_read(notification_id, doctor_id).await?;
    let unread = service.unread_count(doctor_id).await;

    Ok(Json(json!({
        "notification": notification,
        "unread": unread,
    })))
}

#[axum::debug_handler]
pub async fn get_notification_appointment(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_id_of(&session)?;
    let service = NotificationService::new(&state.db);

    let appointment = service.appointment_for(notification_id, doctor_id).await?;

    Ok(Json(appointment))
}
