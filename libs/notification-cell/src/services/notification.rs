use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::{keys, Database};

use crate::error::NotificationError;
use crate::models::{NewNotification, Notification};

/// Append-only doctor notification log.
pub struct NotificationService {
    db: Database,
}

impl NotificationService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Prepends an unread notification. Returns `None` when the same booking
    /// or cancel notice was already logged for this doctor and appointment.
    #[instrument(skip(self, new), fields(doctor_id = new.doctor_id, kind = ?new.kind))]
    pub async fn add(&self, new: NewNotification) -> Result<Option<Notification>, NotificationError> {
        let added = self
            .db
            .transact(|tx| {
                let mut notifications: Vec<Notification> = tx.collection(keys::NOTIFICATIONS);

                if let Some(appointment_id) = new.appointment_id {
                    let duplicate = new.kind.is_once_per_appointment()
                        && notifications.iter().any(|n| {
                            n.doctor_id == new.doctor_id
                                && n.appointment_id == Some(appointment_id)
                                && n.kind == new.kind
                        });
                    if duplicate {
                        return Ok(None);
                    }
                }

                let notification = Notification {
                    id: Uuid::new_v4(),
                    doctor_id: new.doctor_id,
                    kind: new.kind,
                    message: new.message.clone(),
                    read: false,
                    appointment_id: new.appointment_id,
                    date: Utc::now(),
                };

                notifications.insert(0, notification.clone());
                tx.put_collection(keys::NOTIFICATIONS, &notifications)?;
                Ok::<_, NotificationError>(Some(notification))
            })
            .await?;

        match &added {
            Some(n) => info!("Notified doctor {}: {}", n.doctor_id, n.message),
            None => debug!("Skipped duplicate notification"),
        }

        Ok(added)
    }

    /// Notifications for a doctor, newest first.
    pub async fn for_doctor(&self, doctor_id: i64) -> Vec<Notification> {
        let mut notifications: Vec<Notification> = self
            .db
            .collection::<Notification>(keys::NOTIFICATIONS)
            .await
            .into_iter()
            .filter(|n| n.doctor_id == doctor_id)
            .collect();
        notifications.sort_by(|a, b| b.date.cmp(&a.date));
        notifications
    }

    pub async fn unread_count(&self, doctor_id: i64) -> usize {
        self.for_doctor(doctor_id)
            .await
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn get(&self, id: Uuid, doctor_id: i64) -> Result<Notification, NotificationError> {
        let notification = self
            .db
            .collection::<Notification>(keys::NOTIFICATIONS)
            .await
            .into_iter()
            .find(|n| n.id == id)
            .ok_or(NotificationError::NotFound(id))?;

        if notification.doctor_id != doctor_id {
            return Err(NotificationError::NotOwner(id));
        }
        Ok(notification)
    }

    pub async fn mark_as_read(&self, id: Uuid, doctor_id: i64) -> Result<Notification, NotificationError> {
        let updated = self
            .db
            .transact(|tx| {
                let mut notifications: Vec<Notification> = tx.collection(keys::NOTIFICATIONS);
                let notification = notifications
                    .iter_mut()
                    .find(|n| n.id == id)
                    .ok_or(NotificationError::NotFound(id))?;

                if notification.doctor_id != doctor_id {
                    return Err(NotificationError::NotOwner(id));
                }
                if notification.read {
                    return Ok(notification.clone());
                }

                notification.read = true;
                let updated = notification.clone();
                tx.put_collection(keys::NOTIFICATIONS, &notifications)?;
                Ok(updated)
            })
            .await?;

        debug!("Notification {} marked as read", id);
        Ok(updated)
    }

    /// Appointment behind a notification, as stored.
    pub async fn appointment_for(&self, id: Uuid, doctor_id: i64) -> Result<Value, NotificationError> {
        let notification = self.get(id, doctor_id).await?;
        let appointment_id = notification
            .appointment_id
            .ok_or(NotificationError::NoAppointment(id))?;

        let wanted = appointment_id.to_string();
        self.db
            .collection::<Value>(keys::APPOINTMENTS)
            .await
            .into_iter()
            .find(|a| a.get("id").and_then(Value::as_str) == Some(wanted.as_str()))
            .ok_or(NotificationError::AppointmentMissing(appointment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_add_prepends_unread() {
        let db = Database::in_memory();
        let service = NotificationService::new(&db);

        service
            .add(NewNotification::booking(1, Uuid::new_v4(), "A", "09:00 - 09:30", "2025-05-02"))
            .await
            .unwrap();
        let second = service
            .add(NewNotification::booking(1, Uuid::new_v4(), "B", "09:30 - 10:00", "2025-05-02"))
            .await
            .unwrap()
            .unwrap();

        let stored: Vec<Notification> = db.collection(keys::NOTIFICATIONS).await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, second.id);
        assert!(!stored[0].read);
        assert_eq!(service.unread_count(1).await, 2);
    }

    #[tokio::test]
    async fn test_booking_notice_deduplicated_per_appointment() {
        let db = Database::in_memory();
        let service = NotificationService::new(&db);
        let appointment_id = Uuid::new_v4();

        let first = service
            .add(NewNotification::booking(1, appointment_id, "A", "09:00 - 09:30", "2025-05-02"))
            .await
            .unwrap();
        let again = service
            .add(NewNotification::booking(1, appointment_id, "A", "09:00 - 09:30", "2025-05-02"))
            .await
            .unwrap();
        let cancel = service
            .add(NewNotification::cancel(1, appointment_id, "A", "09:00 - 09:30", "2025-05-02"))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(again.is_none());
        assert!(cancel.is_some());
        assert_eq!(service.for_doctor(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_as_read_checks_owner() {
        let db = Database::in_memory();
        let service = NotificationService::new(&db);
        let added = service
            .add(NewNotification::booking(1, Uuid::new_v4(), "A", "09:00 - 09:30", "2025-05-02"))
            .await
            .unwrap()
            .unwrap();

        assert_matches!(
            service.mark_as_read(added.id, 2).await,
            Err(NotificationError::NotOwner(_))
        );
        assert!(service.mark_as_read(added.id, 1).await.unwrap().read);
        assert_eq!(service.unread_count(1).await, 0);
    }

    #[tokio::test]
    async fn test_appointment_lookup() {
        let db = Database::in_memory();
        let service = NotificationService::new(&db);
        let appointment_id = Uuid::new_v4();
        db.set_raw(
            keys::APPOINTMENTS,
            serde_json::json!([{ "id": appointment_id, "doctor_id": 1 }]).to_string(),
        )
        .await
        .unwrap();

        let added = service
            .add(NewNotification::booking(1, appointment_id, "A", "09:00 - 09:30", "2025-05-02"))
            .await
            .unwrap()
            .unwrap();

        let appointment = service.appointment_for(added.id, 1).await.unwrap();
        assert_eq!(appointment["doctor_id"], 1);
        assert_matches!(
            service.appointment_for(Uuid::new_v4(), 1).await,
            Err(NotificationError::NotFound(_))
        );
    }
}
