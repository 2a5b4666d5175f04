// =====================================================================================
// HEALTH MONITORING SERVICE
// =====================================================================================

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use shared_database::keys;
use shared_utils::AppState;

use crate::models::{HealthCheck, HealthStatus, SystemHealth};

pub struct HealthMonitorService<'a> {
    state: &'a AppState,
}

impl<'a> HealthMonitorService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    #[instrument(skip(self))]
    pub async fn check(&self) -> SystemHealth {
        let components = vec![
            self.check_store().await,
            self.check_slot_catalog().await,
            self.check_change_bus(),
            self.check_sessions().await,
        ];

        let overall_status = determine_overall_status(&components);
        if overall_status != HealthStatus::Healthy {
            warn!("Service health is {:?}", overall_status);
        }

        let uptime = (Utc::now() - self.state.started_at).num_seconds().max(0) as u64;

        SystemHealth {
            overall_status,
            system_uptime_seconds: uptime,
            components,
            timestamp: Utc::now(),
        }
    }

    pub async fn component(&self, name: &str) -> Option<HealthCheck> {
        match name {
            "store" => Some(self.check_store().await),
            "slot_catalog" => Some(self.check_slot_catalog().await),
            "change_bus" => Some(self.check_change_bus()),
            "sessions" => Some(self.check_sessions().await),
            _ => None,
        }
    }

    /// Every required key present and the seed sentinel set.
    async fn check_store(&self) -> HealthCheck {
        let start = Instant::now();
        let db = &self.state.db;

        let mut missing = Vec::new();
        for key in keys::REQUIRED_KEYS {
            if !db.contains(key).await {
                missing.push(key);
            }
        }
        let initialized = db.contains(keys::DATA_INITIALIZED).await;

        let (status, error_message) = if !missing.is_empty() {
            (HealthStatus::Unhealthy, Some(format!("Missing keys: {}", missing.join(", "))))
        } else if !initialized {
            (HealthStatus::Degraded, Some("Seed data has not been written".to_string()))
        } else {
            (HealthStatus::Healthy, None)
        };

        HealthCheck {
            component: "store".to_string(),
            status,
            response_time_ms: start.elapsed().as_millis() as u64,
            last_checked: Utc::now(),
            error_message,
            details: HashMap::from([
                ("backend".to_string(), json!(db.backend_name())),
                ("persistent".to_string(), json!(self.state.config.is_persistent())),
                ("keys".to_string(), json!(db.keys().await.len())),
                ("commits".to_string(), json!(db.version())),
            ]),
        }
    }

    /// An empty catalog means nothing can be booked.
    async fn check_slot_catalog(&self) -> HealthCheck {
        let start = Instant::now();
        let slots: Vec<Value> = self.state.db.collection(keys::APPOINTMENT_SLOTS).await;
        let available = slots
            .iter()
            .filter(|s| s.get("is_available").and_then(Value::as_bool).unwrap_or(false))
            .count();

        let (status, error_message) = if slots.is_empty() {
            (HealthStatus::Degraded, Some("Slot catalog is empty".to_string()))
        } else {
            (HealthStatus::Healthy, None)
        };

        HealthCheck {
            component: "slot_catalog".to_string(),
            status,
            response_time_ms: start.elapsed().as_millis() as u64,
            last_checked: Utc::now(),
            error_message,
            details: HashMap::from([
                ("slots".to_string(), json!(slots.len())),
                ("available".to_string(), json!(available)),
                ("lookahead_days".to_string(), json!(self.state.config.slot_lookahead_days)),
            ]),
        }
    }

    fn check_change_bus(&self) -> HealthCheck {
        HealthCheck {
            component: "change_bus".to_string(),
            status: HealthStatus::Healthy,
            response_time_ms: 0,
            last_checked: Utc::now(),
            error_message: None,
            details: HashMap::from([(
                "subscribers".to_string(),
                json!(self.state.db.bus().receiver_count()),
            )]),
        }
    }

    async fn check_sessions(&self) -> HealthCheck {
        let active = self.state.sessions.count().await;
        debug!("{} active sessions", active);

        HealthCheck {
            component: "sessions".to_string(),
            status: HealthStatus::Healthy,
            response_time_ms: 0,
            last_checked: Utc::now(),
            error_message: None,
            details: HashMap::from([("active".to_string(), json!(active))]),
        }
    }
}

/// Worst component wins.
fn determine_overall_status(checks: &[HealthCheck]) -> HealthStatus {
    checks
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: HealthStatus) -> HealthCheck {
        HealthCheck {
            component: "x".to_string(),
            status,
            response_time_ms: 0,
            last_checked: Utc::now(),
            error_message: None,
            details: HashMap::new(),
        }
    }

    #[test]
    fn test_worst_status_wins() {
        assert_eq!(determine_overall_status(&[]), HealthStatus::Healthy);
        assert_eq!(
            determine_overall_status(&[check(HealthStatus::Healthy), check(HealthStatus::Degraded)]),
            HealthStatus::Degraded
        );
        assert_eq!(
            determine_overall_status(&[check(HealthStatus::Unhealthy), check(HealthStatus::Degraded)]),
            HealthStatus::Unhealthy
        );
    }
}
