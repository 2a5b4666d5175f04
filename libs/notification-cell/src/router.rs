use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::doctor_only;
use shared_utils::AppState;

use crate::handlers;

pub fn notification_routes(state: Arc<AppState>) -> Router {
    let doctor_routes = Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/{notification_id}/read", post(handlers::mark_notification_read))
        .route(
            "/{notification_id}/appointment",
            get(handlers::get_notification_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), doctor_only));

    Router::new().merge(doctor_routes).with_state(state)
}
