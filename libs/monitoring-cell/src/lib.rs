// =====================================================================================
// MONITORING CELL - SERVICE HEALTH & ADMIN DASHBOARD
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DashboardStats, HealthCheck, HealthStatus, SystemHealth};
pub use services::{DashboardService, HealthMonitorService};

pub use router::monitoring_routes;
