use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{hhmm, DoctorError};
use shared_database::StoreError;
use shared_models::error::AppError;

pub const DEFAULT_REASON: &str = "General Checkup";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    #[serde(rename = "Haven't examined yet")]
    NotExamined,
    #[serde(rename = "Examined")]
    Examined,
    #[serde(rename = "Canceled")]
    Canceled,
}

impl AppointmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::NotExamined => "Haven't examined yet",
            AppointmentStatus::Examined => "Examined",
            AppointmentStatus::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Examined | AppointmentStatus::Canceled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: i64,
    /// Doctor name at booking time.
    pub doctor: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub hospital: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub slot_id: String,
    pub status: AppointmentStatus,
    pub patient_name: String,
    /// Partition key for patient reads.
    pub patient_email: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_reason")]
    pub reason: String,
    #[serde(default)]
    pub fee: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_reason() -> String {
    DEFAULT_REASON.to_string()
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Canceled
    }

    pub fn holds(&self, doctor_id: i64, date: NaiveDate, start_time: NaiveTime) -> bool {
        self.doctor_id == doctor_id && self.date == date && self.start_time == start_time
    }

    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format(hhmm::FORMAT),
            self.end_time.format(hhmm::FORMAT)
        )
    }

    pub fn belongs_to(&self, email: &str) -> bool {
        self.patient_email.eq_ignore_ascii_case(email.trim())
    }
}

// ==============================================================================
// BOOKING WORKFLOW DTOs
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectSlotRequest {
    pub doctor_id: i64,
    pub date: NaiveDate,
    /// `"HH:MM"` or the `"HH:MM - HH:MM"` label shown on the slot button.
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    pub hospital: String,
    pub image: String,
}

/// A selected slot ready for the confirmation form. Holds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub doctor: DoctorSummary,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub slot_id: String,
    pub fee: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionOutcome {
    Ready { draft: BookingDraft },
    LoginRequired { pending: SelectSlotRequest, redirect: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientDetails {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub confirm_email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl PatientDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[serde(default)]
    pub card_number: String,
    /// `MM/YY`
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub receipt_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmBookingRequest {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub patient: PatientDetails,
    pub payment: PaymentDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorStatusUpdateRequest {
    pub status: AppointmentStatus,
    /// The doctor acknowledged that the change cannot be undone.
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleView {
    #[default]
    Day,
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorScheduleQuery {
    #[serde(default)]
    pub view: ScheduleView,
    /// Day shown in `day` view. Defaults to today.
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub appointments: Vec<AppointmentWithControl>,
}

/// What the doctor's status dropdown offers for one appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusControl {
    pub editable: bool,
    pub options: Vec<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithControl {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub control: StatusControl,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("No slot exists for {time} on {date}")]
    SlotNotFound { date: NaiveDate, time: String },

    #[error("This time slot has already been booked. Please choose another time.")]
    SlotUnavailable,

    #[error("Appointments can only be booked from {from} until {until}")]
    OutsideBookingWindow { from: NaiveDate, until: NaiveDate },

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation failed")]
    InvalidFields(BTreeMap<String, String>),

    #[error("Status cannot change from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment is already {0} and can no longer change")]
    Locked(AppointmentStatus),

    #[error("Please confirm the status change")]
    ConfirmationRequired,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) | AppointmentError::SlotNotFound { .. } => {
                AppError::NotFound(err.to_string())
            }
            AppointmentError::Doctor(e) => AppError::from(e),
            AppointmentError::SlotUnavailable => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::Locked(_) => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::OutsideBookingWindow { .. }
            | AppointmentError::InvalidTime(_)
            | AppointmentError::ConfirmationRequired => AppError::ValidationError(err.to_string()),
            AppointmentError::InvalidFields(fields) => AppError::InvalidFields(fields),
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_uses_display_strings() {
        assert_eq!(
            serde_json::to_value(AppointmentStatus::NotExamined).unwrap(),
            json!("Haven't examined yet")
        );
        let status: AppointmentStatus = serde_json::from_value(json!("Canceled")).unwrap();
        assert_eq!(status, AppointmentStatus::Canceled);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AppointmentStatus::NotExamined.is_terminal());
        assert!(AppointmentStatus::Examined.is_terminal());
        assert!(AppointmentStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_patient_full_name_is_trimmed() {
        let details = PatientDetails {
            first_name: "  Binh ".to_string(),
            last_name: "Tran".to_string(),
            ..Default::default()
        };
        assert_eq!(details.full_name(), "Binh Tran");
    }
}
