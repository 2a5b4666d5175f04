// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub last_checked: DateTime<Utc>,
    pub error_message: Option<String>,
    pub details: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub system_uptime_seconds: u64,
    pub components: Vec<HealthCheck>,
    pub timestamp: DateTime<Utc>,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_patients: usize,
    pub total_doctors: usize,
    pub active_doctors: usize,
    pub total_appointments: usize,
    pub appointments_today: usize,
    pub appointments_by_status: BTreeMap<String, usize>,
    pub available_slots: usize,
    pub published_articles: usize,
    pub unread_notifications: usize,
}
