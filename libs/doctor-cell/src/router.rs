use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::admin_only;
use shared_utils::AppState;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/specialties", get(handlers::list_specialties))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/slots", get(handlers::get_doctor_slots));

    let admin_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/admin/search", get(handlers::search_doctors))
        .route("/slots/regenerate", post(handlers::regenerate_slots))
        .route(
            "/{doctor_id}",
            put(handlers::update_doctor).delete(handlers::delete_doctor),
        )
        .route("/{doctor_id}/toggle-status", post(handlers::toggle_doctor_status))
        .layer(middleware::from_fn_with_state(state.clone(), admin_only));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
