use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

/// `NaiveTime` stored as `"HH:MM"`, the way slot and appointment times are kept.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }

    /// Accepts `"HH:MM"`, `"HH:MM:SS"` or a `"HH:MM - HH:MM"` range (start wins).
    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let start = raw.split(" - ").next().unwrap_or(raw).trim();
        NaiveTime::parse_from_str(start, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(start, "%H:%M:%S"))
            .ok()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DoctorStatus {
    #[default]
    Active,
    Inactive,
}

impl DoctorStatus {
    pub fn toggled(self) -> Self {
        match self {
            DoctorStatus::Active => DoctorStatus::Inactive,
            DoctorStatus::Inactive => DoctorStatus::Active,
        }
    }
}

/// Stored doctor record. Carries the login password, so handlers return
/// [`DoctorProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub hospital: String,
    #[serde(default)]
    pub credentials: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub status: DoctorStatus,
}

impl Doctor {
    pub fn is_active(&self) -> bool {
        self.status == DoctorStatus::Active
    }

    pub fn profile(&self) -> DoctorProfile {
        DoctorProfile::from(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub specialty_id: Option<i64>,
    pub hospital: String,
    pub credentials: String,
    pub image: String,
    pub license_number: String,
    pub status: DoctorStatus,
}

impl From<&Doctor> for DoctorProfile {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name.clone(),
            email: doctor.email.clone(),
            specialty: doctor.specialty.clone(),
            specialty_id: doctor.specialty_id,
            hospital: doctor.hospital.clone(),
            credentials: doctor.credentials.clone(),
            image: doctor.image.clone(),
            license_number: doctor.license_number.clone(),
            status: doctor.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialty {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One bookable (doctor, date, time-range) unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: i64,
    pub slot_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl Slot {
    pub fn key(&self) -> String {
        slot_key(self.doctor_id, self.slot_date, self.start_time)
    }

    pub fn matches(&self, doctor_id: i64, date: NaiveDate, start_time: NaiveTime) -> bool {
        self.doctor_id == doctor_id && self.slot_date == date && self.start_time == start_time
    }

    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format(hhmm::FORMAT),
            self.end_time.format(hhmm::FORMAT)
        )
    }
}

/// Natural key of a slot, also stored on appointments as `slot_id`.
pub fn slot_key(doctor_id: i64, date: NaiveDate, start_time: NaiveTime) -> String {
    format!(
        "{}_{}_{}",
        doctor_id,
        date.format("%Y-%m-%d"),
        start_time.format(hhmm::FORMAT)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    pub specialty: String,
    #[serde(default)]
    pub specialty_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub hospital: Option<String>,
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub license_number: String,
    #[serde(default)]
    pub status: Option<DoctorStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub specialty: Option<String>,
    pub specialty_id: Option<i64>,
    pub hospital: Option<String>,
    pub credentials: Option<String>,
    pub image: Option<String>,
    pub license_number: Option<String>,
    pub status: Option<DoctorStatus>,
}

/// Admin list filters. Empty values match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    /// Case-insensitive match on name or specialty.
    pub q: Option<String>,
    /// Exact specialty name.
    pub specialty: Option<String>,
    pub status: Option<DoctorStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateReport {
    pub doctors: usize,
    pub days: u32,
    pub slots: usize,
    pub unavailable: usize,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound(i64),

    #[error("Doctor {0} is not accepting appointments")]
    Inactive(i64),

    #[error("Doctor with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Validation failed")]
    InvalidFields(BTreeMap<String, String>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) | DoctorError::Inactive(_) => AppError::NotFound(err.to_string()),
            DoctorError::DuplicateEmail(_) => AppError::Conflict(err.to_string()),
            DoctorError::InvalidFields(fields) => AppError::InvalidFields(fields),
            DoctorError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
