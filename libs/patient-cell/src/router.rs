use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_utils::extractor::admin_only;
use shared_utils::AppState;

use crate::handlers;

/// Admin-only patient management.
pub fn patient_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_patients))
        .route(
            "/{patient_id}",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_only))
        .with_state(state)
}
