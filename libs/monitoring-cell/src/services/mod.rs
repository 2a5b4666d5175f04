pub mod dashboard;
pub mod health;

pub use dashboard::DashboardService;
pub use health::HealthMonitorService;
