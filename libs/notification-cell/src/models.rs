use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Booking,
    Reschedule,
    Cancel,
}

impl NotificationType {
    /// Booking and cancel happen at most once per appointment.
    pub fn is_once_per_appointment(&self) -> bool {
        matches!(self, NotificationType::Booking | NotificationType::Cancel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub doctor_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub doctor_id: i64,
    pub kind: NotificationType,
    pub message: String,
    pub appointment_id: Option<Uuid>,
}

impl NewNotification {
    pub fn booking(doctor_id: i64, appointment_id: Uuid, patient: &str, time: &str, date: &str) -> Self {
        Self {
            doctor_id,
            kind: NotificationType::Booking,
            message: format!("New appointment from {} at {} on {}.", patient, time, date),
            appointment_id: Some(appointment_id),
        }
    }

    pub fn cancel(doctor_id: i64, appointment_id: Uuid, canceled_by: &str, time: &str, date: &str) -> Self {
        Self {
            doctor_id,
            kind: NotificationType::Cancel,
            message: format!("Appointment canceled by {} at {} on {}.", canceled_by, time, date),
            appointment_id: Some(appointment_id),
        }
    }

    pub fn reschedule(
        doctor_id: i64,
        appointment_id: Uuid,
        patient: &str,
        from: (&str, &str),
        to: (&str, &str),
    ) -> Self {
        Self {
            doctor_id,
            kind: NotificationType::Reschedule,
            message: format!(
                "Appointment from {} moved from {} on {} to {} on {}.",
                patient, from.0, from.1, to.0, to.1
            ),
            appointment_id: Some(appointment_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub unread: usize,
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_message() {
        let n = NewNotification::booking(1, Uuid::nil(), "Binh Tran", "09:00 - 09:30", "2025-05-02");
        assert_eq!(n.message, "New appointment from Binh Tran at 09:00 - 09:30 on 2025-05-02.");
        assert_eq!(n.kind, NotificationType::Booking);
    }

    #[test]
    fn test_type_serialized_as_type_field() {
        let notification = Notification {
            id: Uuid::nil(),
            doctor_id: 1,
            kind: NotificationType::Cancel,
            message: "m".into(),
            read: false,
            appointment_id: None,
            date: Utc::now(),
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "cancel");
    }
}
