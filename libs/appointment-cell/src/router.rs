use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::{admin_only, doctor_only, session_middleware};
use shared_utils::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/select", post(handlers::select_slot));

    let patient_routes = Router::new()
        .route("/confirm", post(handlers::confirm_booking))
        .route("/mine", get(handlers::my_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", post(handlers::reschedule_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    let doctor_routes = Router::new()
        .route("/doctor", get(handlers::doctor_schedule))
        .route(
            "/doctor/{appointment_id}/status",
            patch(handlers::update_status_by_doctor),
        )
        .layer(middleware::from_fn_with_state(state.clone(), doctor_only));

    let admin_routes = Router::new()
        .route("/admin", get(handlers::list_all_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), admin_only));

    Router::new()
        .merge(public_routes)
        .merge(patient_routes)
        .merge(doctor_routes)
        .merge(admin_routes)
        .with_state(state)
}
