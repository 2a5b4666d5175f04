use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::keys;

const DEFAULT_CAPACITY: usize = 256;

/// Coarse grouping of storage keys that views subscribe to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Appointments,
    Slots,
    Notifications,
    Doctors,
    Patients,
    Users,
    Content,
    System,
}

impl Topic {
    pub fn for_key(key: &str) -> Self {
        match key {
            keys::APPOINTMENTS | keys::APPOINTMENT_VERSION => Topic::Appointments,
            keys::APPOINTMENT_SLOTS => Topic::Slots,
            keys::NOTIFICATIONS => Topic::Notifications,
            keys::DOCTORS | keys::SPECIALTIES => Topic::Doctors,
            keys::PATIENTS | keys::MEDICAL_RECORDS => Topic::Patients,
            keys::USERS => Topic::Users,
            keys::NEWS | keys::REVIEWS => Topic::Content,
            _ => Topic::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub key: String,
    pub topic: Topic,
    /// Store version of the commit that touched `key`.
    pub version: u64,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(key: &str, version: u64) -> Self {
        Self {
            key: key.to_string(),
            topic: Topic::for_key(key),
            version,
            at: Utc::now(),
        }
    }
}

/// Single publish/subscribe channel for storage changes.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
