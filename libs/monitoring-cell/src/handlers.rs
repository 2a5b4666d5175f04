// =====================================================================================
// MONITORING HANDLERS
// =====================================================================================

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::HealthStatus;
use crate::services::{DashboardService, HealthMonitorService};

/// 503 when any component is unhealthy, so load balancers can act on it.
pub async fn get_health_status(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    let health = HealthMonitorService::new(&state).check().await;

    let status = match health.overall_status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };

    (status, Json(json!(health)))
}

pub async fn get_component_health(
    State(state): State<Arc<AppState>>,
    Path(component): Path<String>,
) -> Result<Json<Value>, AppError> {
    let check = HealthMonitorService::new(&state)
        .component(&component)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Unknown component: {}", component)))?;

    Ok(Json(json!(check)))
}

pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let stats = DashboardService::new(&state.db).stats().await;

    Ok(Json(json!(stats)))
}
