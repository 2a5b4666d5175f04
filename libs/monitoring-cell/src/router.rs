// =====================================================================================
// MONITORING CELL ROUTER
// =====================================================================================

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_utils::extractor::admin_only;
use shared_utils::AppState;

use crate::handlers::{get_component_health, get_dashboard, get_health_status};

pub fn monitoring_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(get_health_status))
        .route("/health/{component}", get(get_component_health));

    // Admin only routes
    let admin_routes = Router::new()
        .route("/dashboard", get(get_dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), admin_only));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
