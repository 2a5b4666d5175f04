use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use content_cell::router::content_routes;
use doctor_cell::router::doctor_routes;
use monitoring_cell::router::monitoring_routes;
use notification_cell::router::notification_routes;
use patient_cell::router::patient_routes;
use shared_utils::AppState;

use crate::events::change_events;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Booking API is running!" }))
        .route("/events", get(change_events).with_state(state.clone()))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/content", content_routes(state.clone()))
        .nest("/monitoring", monitoring_routes(state))
}
