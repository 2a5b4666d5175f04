use chrono::Utc;
use serde_json::Value;

use shared_database::{keys, Database};

use crate::models::DashboardStats;

/// Counts over the raw collections, so the dashboard never fails on a
/// record another cell would reject.
pub struct DashboardService {
    db: Database,
}

impl DashboardService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn stats(&self) -> DashboardStats {
        let patients: Vec<Value> = self.db.collection(keys::PATIENTS).await;
        let doctors: Vec<Value> = self.db.collection(keys::DOCTORS).await;
        let appointments: Vec<Value> = self.db.collection(keys::APPOINTMENTS).await;
        let slots: Vec<Value> = self.db.collection(keys::APPOINTMENT_SLOTS).await;
        let news: Vec<Value> = self.db.collection(keys::NEWS).await;
        let notifications: Vec<Value> = self.db.collection(keys::NOTIFICATIONS).await;

        let today = Utc::now().date_naive().to_string();
        let mut stats = DashboardStats {
            total_patients: patients.len(),
            total_doctors: doctors.len(),
            active_doctors: doctors
                .iter()
                .filter(|d| str_field(d, "status").unwrap_or("active") == "active")
                .count(),
            total_appointments: appointments.len(),
            appointments_today: appointments
                .iter()
                .filter(|a| str_field(a, "date") == Some(today.as_str()))
                .count(),
            available_slots: slots
                .iter()
                .filter(|s| s.get("is_available").and_then(Value::as_bool).unwrap_or(false))
                .count(),
            published_articles: news
                .iter()
                .filter(|n| n.get("published").and_then(Value::as_bool).unwrap_or(true))
                .count(),
            unread_notifications: notifications
                .iter()
                .filter(|n| !n.get("read").and_then(Value::as_bool).unwrap_or(false))
                .count(),
            ..Default::default()
        };

        for appointment in &appointments {
            let status = str_field(appointment, "status").unwrap_or("unknown");
            *stats
                .appointments_by_status
                .entry(status.to_string())
                .or_insert(0) += 1;
        }

        stats
    }
}

fn str_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}
