use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus};

pub struct ConflictDetectionService;

impl ConflictDetectionService {
    pub fn new() -> Self {
        Self
    }

    /// First active appointment holding the (doctor, date, start) triple.
    pub fn find_conflict<'a>(
        &self,
        appointments: &'a [Appointment],
        doctor_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Option<&'a Appointment> {
        let conflict = appointments.iter().find(|existing| {
            Some(existing.id) != exclude_appointment_id
                && existing.holds(doctor_id, date, start_time)
                && self.is_active_appointment(&existing.status)
        });

        if let Some(existing) = conflict {
            debug!(
                "Doctor {} already has appointment {} at {} on {}",
                doctor_id,
                existing.id,
                existing.time_range(),
                date
            );
        }

        conflict
    }

    fn is_active_appointment(&self, status: &AppointmentStatus) -> bool {
        !matches!(status, AppointmentStatus::Canceled)
    }
}

impl Default for ConflictDetectionService {
    fn default() -> Self {
        Self::new()
    }
}
