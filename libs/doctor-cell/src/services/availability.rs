use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{keys, Database, StoreError};

use crate::models::{hhmm, slot_key, Doctor, DoctorError, RegenerateReport, Slot};

const SLOT_MINUTES: i64 = 30;

/// Daily sessions as `(first start, end of last slot)` in 24h clock.
const SESSIONS: [((u32, u32), (u32, u32)); 2] = [((7, 30), (11, 0)), ((13, 30), (16, 30))];

/// The part of a stored appointment that holds a slot.
#[derive(Debug, Deserialize)]
struct SlotHold {
    doctor_id: i64,
    date: NaiveDate,
    #[serde(with = "hhmm")]
    start_time: NaiveTime,
    status: String,
}

pub struct AvailabilityService {
    db: Database,
    lookahead_days: u32,
}

impl AvailabilityService {
    pub fn new(db: &Database, config: &AppConfig) -> Self {
        Self {
            db: db.clone(),
            lookahead_days: config.slot_lookahead_days,
        }
    }

    /// Fixed 13-entry list of `(start, end)` pairs, 30 minutes each.
    pub fn daily_template() -> Vec<(NaiveTime, NaiveTime)> {
        let mut template = Vec::new();

        for ((start_h, start_m), (end_h, end_m)) in SESSIONS {
            let (Some(mut start), Some(end)) = (
                NaiveTime::from_hms_opt(start_h, start_m, 0),
                NaiveTime::from_hms_opt(end_h, end_m, 0),
            ) else {
                continue;
            };

            while start < end {
                let next = start + Duration::minutes(SLOT_MINUTES);
                template.push((start, next));
                start = next;
            }
        }

        template
    }

    /// One slot per (doctor, date, template time), all available.
    pub fn generate(
        doctors: &[Doctor],
        start_date: NaiveDate,
        days: u32,
        template: &[(NaiveTime, NaiveTime)],
    ) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(doctors.len() * days as usize * template.len());

        for doctor in doctors {
            for offset in 0..days {
                let slot_date = start_date + Duration::days(offset as i64);
                for (start_time, end_time) in template {
                    slots.push(Slot {
                        id: Uuid::new_v4(),
                        doctor_id: doctor.id,
                        slot_date,
                        start_time: *start_time,
                        end_time: *end_time,
                        is_available: true,
                    });
                }
            }
        }

        slots
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Bookable dates are `[today, today + lookahead)`.
    pub fn is_bookable_date(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= today && date < today + Duration::days(self.lookahead_days as i64)
    }

    /// Builds the catalog only when `appointment_slots` is missing or empty.
    /// Returns how many slots were written.
    #[instrument(skip(self))]
    pub async fn ensure_catalog(&self) -> Result<usize, DoctorError> {
        let days = self.lookahead_days;
        let today = Self::today();

        let written = self
            .db
            .transact(|tx| {
                let existing: Vec<Slot> = tx.collection(keys::APPOINTMENT_SLOTS);
                if !existing.is_empty() {
                    return Ok::<_, StoreError>(0);
                }

                let doctors: Vec<Doctor> = tx.collection(keys::DOCTORS);
                let slots = Self::generate(&doctors, today, days, &Self::daily_template());
                tx.put_collection(keys::APPOINTMENT_SLOTS, &slots)?;
                Ok(slots.len())
            })
            .await?;

        if written > 0 {
            info!("Generated {} appointment slots over {} days", written, days);
        } else {
            debug!("Slot catalog already present, generation skipped");
        }

        Ok(written)
    }

    /// Rebuilds the catalog from today for the current doctor list. A slot
    /// held by a non-canceled appointment comes back unavailable.
    #[instrument(skip(self))]
    pub async fn regenerate(&self) -> Result<RegenerateReport, DoctorError> {
        let days = self.lookahead_days;
        let today = Self::today();

        let report = self
            .db
            .transact(|tx| {
                let doctors: Vec<Doctor> = tx.collection(keys::DOCTORS);
                let appointments: Vec<Value> = tx.collection(keys::APPOINTMENTS);
                let held = held_slot_keys(&appointments);

                let mut slots = Self::generate(&doctors, today, days, &Self::daily_template());
                let mut unavailable = 0;
                for slot in slots.iter_mut() {
                    if held.contains(&slot.key()) {
                        slot.is_available = false;
                        unavailable += 1;
                    }
                }

                tx.put_collection(keys::APPOINTMENT_SLOTS, &slots)?;

                Ok::<_, StoreError>(RegenerateReport {
                    doctors: doctors.len(),
                    days,
                    slots: slots.len(),
                    unavailable,
                })
            })
            .await?;

        info!(
            "Regenerated {} slots for {} doctors ({} held by appointments)",
            report.slots, report.doctors, report.unavailable
        );

        Ok(report)
    }

    /// A doctor's slots for one date, ordered by start time.
    pub async fn slots_for(&self, doctor_id: i64, date: NaiveDate) -> Result<Vec<Slot>, DoctorError> {
        let doctors: Vec<Doctor> = self.db.collection(keys::DOCTORS).await;
        if !doctors.iter().any(|d| d.id == doctor_id) {
            return Err(DoctorError::NotFound(doctor_id));
        }

        let mut slots: Vec<Slot> = self
            .db
            .collection::<Slot>(keys::APPOINTMENT_SLOTS)
            .await
            .into_iter()
            .filter(|s| s.doctor_id == doctor_id && s.slot_date == date)
            .collect();
        slots.sort_by_key(|s| s.start_time);

        Ok(slots)
    }
}

/// Slot keys held by non-canceled appointments. Records that do not parse
/// hold nothing.
fn held_slot_keys(appointments: &[Value]) -> HashSet<String> {
    appointments
        .iter()
        .filter_map(|raw| serde_json::from_value::<SlotHold>(raw.clone()).ok())
        .filter(|hold| hold.status != "Canceled")
        .map(|hold| slot_key(hold.doctor_id, hold.date, hold.start_time))
        .collect()
}
