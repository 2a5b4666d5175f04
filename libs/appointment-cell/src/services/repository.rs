use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{slot_key, Slot};
use shared_database::{keys, Database, Transaction};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

/// New placement for an existing appointment.
#[derive(Debug, Clone)]
pub struct SlotMove {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Storage contract for appointments. Every mutating call runs as one
/// transaction, so the conflict check and the write cannot interleave with
/// another booking.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn all(&self) -> Vec<Appointment>;

    async fn find(&self, id: Uuid) -> Option<Appointment>;

    /// Active appointment holding the (doctor, date, time) triple.
    async fn find_by_doctor_date_time(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Option<Appointment>;

    /// Appends without any slot bookkeeping.
    async fn append(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// Validated status change. Canceling frees the slot.
    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError>;

    /// Conflict check, append, slot flip and version bump as one commit.
    async fn reserve(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// Frees the current slot and takes the new one as one commit.
    /// Returns the appointment before and after the move.
    async fn reschedule(
        &self,
        id: Uuid,
        to: SlotMove,
    ) -> Result<(Appointment, Appointment), AppointmentError>;
}

pub struct StoreAppointmentRepository {
    db: Database,
    conflicts: ConflictDetectionService,
    lifecycle: AppointmentLifecycleService,
}

impl StoreAppointmentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            conflicts: ConflictDetectionService::new(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }
}

#[async_trait]
impl AppointmentRepository for StoreAppointmentRepository {
    async fn all(&self) -> Vec<Appointment> {
        self.db.collection(keys::APPOINTMENTS).await
    }

    async fn find(&self, id: Uuid) -> Option<Appointment> {
        self.all().await.into_iter().find(|a| a.id == id)
    }

    async fn find_by_doctor_date_time(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Option<Appointment> {
        let appointments = self.all().await;
        self.conflicts
            .find_conflict(&appointments, doctor_id, date, start_time, None)
            .cloned()
    }

    async fn append(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        self.db
            .transact(|tx| {
                let mut appointments: Vec<Appointment> = tx.collection(keys::APPOINTMENTS);
                appointments.push(appointment.clone());
                tx.put_collection(keys::APPOINTMENTS, &appointments)?;
                bump_version(tx);
                Ok::<_, AppointmentError>(())
            })
            .await?;

        debug!("Appended appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let updated = self
            .db
            .transact(|tx| {
                let mut appointments: Vec<Appointment> = tx.collection(keys::APPOINTMENTS);
                let appointment = appointments
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or(AppointmentError::NotFound(id))?;

                self.lifecycle
                    .validate_status_transition(&appointment.status, &status)?;

                appointment.status = status;
                appointment.updated_at = Some(Utc::now());
                let updated = appointment.clone();

                tx.put_collection(keys::APPOINTMENTS, &appointments)?;
                if status == AppointmentStatus::Canceled {
                    release_slot(tx, updated.doctor_id, updated.date, updated.start_time)?;
                }
                bump_version(tx);

                Ok::<_, AppointmentError>(updated)
            })
            .await?;

        info!("Appointment {} is now {}", id, updated.status);
        Ok(updated)
    }

    async fn reserve(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        self.db
            .transact(|tx| {
                let mut appointments: Vec<Appointment> = tx.collection(keys::APPOINTMENTS);

                if let Some(existing) = self.conflicts.find_conflict(
                    &appointments,
                    appointment.doctor_id,
                    appointment.date,
                    appointment.start_time,
                    None,
                ) {
                    warn!(
                        "Slot {} already held by appointment {}",
                        appointment.slot_id, existing.id
                    );
                    return Err(AppointmentError::SlotUnavailable);
                }

                appointments.push(appointment.clone());
                tx.put_collection(keys::APPOINTMENTS, &appointments)?;
                set_slot_availability(
                    tx,
                    appointment.doctor_id,
                    appointment.date,
                    appointment.start_time,
                    false,
                )?;
                bump_version(tx);

                Ok(())
            })
            .await?;

        info!(
            "Reserved {} for {} (appointment {})",
            appointment.slot_id, appointment.patient_email, appointment.id
        );
        Ok(appointment)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        to: SlotMove,
    ) -> Result<(Appointment, Appointment), AppointmentError> {
        let (before, after) = self
            .db
            .transact(|tx| {
                let mut appointments: Vec<Appointment> = tx.collection(keys::APPOINTMENTS);

                let index = appointments
                    .iter()
                    .position(|a| a.id == id)
                    .ok_or(AppointmentError::NotFound(id))?;
                let before = appointments[index].clone();

                if before.status.is_terminal() {
                    return Err(AppointmentError::Locked(before.status));
                }

                if self
                    .conflicts
                    .find_conflict(&appointments, before.doctor_id, to.date, to.start_time, Some(id))
                    .is_some()
                {
                    return Err(AppointmentError::SlotUnavailable);
                }

                let after = {
                    let appointment = &mut appointments[index];
                    appointment.date = to.date;
                    appointment.start_time = to.start_time;
                    appointment.end_time = to.end_time;
                    appointment.slot_id = slot_key(before.doctor_id, to.date, to.start_time);
                    appointment.updated_at = Some(Utc::now());
                    appointment.clone()
                };

                tx.put_collection(keys::APPOINTMENTS, &appointments)?;
                release_slot(tx, before.doctor_id, before.date, before.start_time)?;
                set_slot_availability(tx, after.doctor_id, after.date, after.start_time, false)?;
                bump_version(tx);

                Ok::<_, AppointmentError>((before, after))
            })
            .await?;

        info!("Moved appointment {} from {} to {}", id, before.slot_id, after.slot_id);
        Ok((before, after))
    }
}

/// Flips the availability flag of the slot matching the triple. The slot must exist.
fn set_slot_availability(
    tx: &mut Transaction<'_>,
    doctor_id: i64,
    date: NaiveDate,
    start_time: NaiveTime,
    available: bool,
) -> Result<(), AppointmentError> {
    let mut slots: Vec<Slot> = tx.collection(keys::APPOINTMENT_SLOTS);

    let slot = slots
        .iter_mut()
        .find(|s| s.matches(doctor_id, date, start_time))
        .ok_or_else(|| AppointmentError::SlotNotFound {
            date,
            time: start_time.format("%H:%M").to_string(),
        })?;
    slot.is_available = available;

    tx.put_collection(keys::APPOINTMENT_SLOTS, &slots)?;
    Ok(())
}

/// Marks the slot available again. The catalog may no longer hold it (doctor
/// deleted, catalog regenerated past that date), which is not an error here.
fn release_slot(
    tx: &mut Transaction<'_>,
    doctor_id: i64,
    date: NaiveDate,
    start_time: NaiveTime,
) -> Result<(), AppointmentError> {
    match set_slot_availability(tx, doctor_id, date, start_time, true) {
        Err(AppointmentError::SlotNotFound { date, time }) => {
            warn!("No catalog slot for doctor {} on {} at {}, nothing to release", doctor_id, date, time);
            Ok(())
        }
        other => other,
    }
}

fn bump_version(tx: &mut Transaction<'_>) {
    let current = tx
        .get_raw(keys::APPOINTMENT_VERSION)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0);
    tx.set_raw(keys::APPOINTMENT_VERSION, (current + 1).to_string());
}

/// Current `appointment_version` counter.
pub async fn appointment_version(db: &Database) -> u64 {
    db.get_raw(keys::APPOINTMENT_VERSION)
        .await
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}
