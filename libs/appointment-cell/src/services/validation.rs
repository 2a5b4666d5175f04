use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::models::{AppointmentError, ConfirmBookingRequest, PatientDetails, PaymentDetails};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));
static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9,15}$").expect("phone pattern compiles"));
static EXPIRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("expiry pattern compiles"));

const MIN_NAME_LENGTH: usize = 2;
const MIN_CARD_LENGTH: usize = 8;

/// Field checks for the two confirmation steps. Errors are keyed by field name.
/// Patterns are compiled once per process and shared by every instance.
pub struct BookingValidationService {
    email_regex: &'static Regex,
    phone_regex: &'static Regex,
    expiry_regex: &'static Regex,
}

impl BookingValidationService {
    pub fn new() -> Self {
        Self {
            email_regex: &EMAIL_REGEX,
            phone_regex: &PHONE_REGEX,
            expiry_regex: &EXPIRY_REGEX,
        }
    }

    pub fn validate_email(&self, email: &str) -> bool {
        self.email_regex.is_match(email.trim())
    }

    /// Step 1: who the appointment is for.
    pub fn validate_patient_details(&self, details: &PatientDetails) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();

        if details.first_name.trim().chars().count() < MIN_NAME_LENGTH {
            errors.insert("first_name".into(), "First name must be at least 2 characters.".into());
        }
        if details.last_name.trim().chars().count() < MIN_NAME_LENGTH {
            errors.insert("last_name".into(), "Last name must be at least 2 characters.".into());
        }

        if !self.validate_email(&details.email) {
            errors.insert("email".into(), "Please enter a valid email address.".into());
        } else if details.email.trim() != details.confirm_email.trim() {
            errors.insert("confirm_email".into(), "Emails do not match.".into());
        }

        if !self.phone_regex.is_match(details.phone.trim()) {
            errors.insert("phone".into(), "Phone number must be 9 to 15 digits.".into());
        }
        if is_blank(details.dob.as_deref()) {
            errors.insert("dob".into(), "Date of birth is required.".into());
        }
        if is_blank(details.gender.as_deref()) {
            errors.insert("gender".into(), "Please select a gender.".into());
        }

        errors
    }

    /// Step 2: structural card checks. The card number is never checked numerically.
    pub fn validate_payment_details(&self, payment: &PaymentDetails) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();

        let digits = payment.card_number.chars().filter(|c| !c.is_whitespace()).count();
        if digits < MIN_CARD_LENGTH {
            errors.insert("card_number".into(), "Card number is too short.".into());
        }
        if !self.expiry_regex.is_match(payment.expiry.trim()) {
            errors.insert("expiry".into(), "Expiry must be in MM/YY format.".into());
        }
        if let Some(receipt) = payment.receipt_email.as_deref() {
            if !receipt.trim().is_empty() && !self.validate_email(receipt) {
                errors.insert("receipt_email".into(), "Please enter a valid receipt email.".into());
            }
        }

        errors
    }

    /// Runs both steps and reports every failing field at once.
    #[instrument(skip(self, request), fields(doctor_id = request.doctor_id))]
    pub fn validate_confirmation(&self, request: &ConfirmBookingRequest) -> Result<(), AppointmentError> {
        let mut errors = self.validate_patient_details(&request.patient);
        errors.extend(self.validate_payment_details(&request.payment));

        if errors.is_empty() {
            Ok(())
        } else {
            debug!("Confirmation rejected on fields: {:?}", errors.keys().collect::<Vec<_>>());
            Err(AppointmentError::InvalidFields(errors))
        }
    }
}

impl Default for BookingValidationService {
    fn default() -> Self {
        Self::new()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn valid_patient() -> PatientDetails {
        PatientDetails {
            first_name: "Binh".into(),
            last_name: "Tran".into(),
            email: "binh@clinic.test".into(),
            confirm_email: "binh@clinic.test".into(),
            phone: "0912345678".into(),
            dob: Some("1990-04-12".into()),
            gender: Some("male".into()),
            reason: None,
        }
    }

    fn valid_payment() -> PaymentDetails {
        PaymentDetails {
            card_number: "4111 1111 1111 1111".into(),
            expiry: "09/27".into(),
            receipt_email: None,
        }
    }

    #[test]
    fn test_valid_details_pass() {
        let service = BookingValidationService::new();
        assert!(service.validate_patient_details(&valid_patient()).is_empty());
        assert!(service.validate_payment_details(&valid_payment()).is_empty());
    }

    #[test]
    fn test_patient_field_errors() {
        let service = BookingValidationService::new();
        let details = PatientDetails {
            first_name: " B ".into(),
            confirm_email: "other@clinic.test".into(),
            phone: "12345".into(),
            dob: None,
            gender: Some("  ".into()),
            ..valid_patient()
        };

        let errors = service.validate_patient_details(&details);
        assert!(errors.contains_key("first_name"));
        assert!(!errors.contains_key("last_name"));
        assert_eq!(errors["confirm_email"], "Emails do not match.");
        assert!(errors.contains_key("phone"));
        assert!(errors.contains_key("dob"));
        assert!(errors.contains_key("gender"));
    }

    #[test]
    fn test_instances_share_compiled_patterns() {
        let first = BookingValidationService::new();
        let second = BookingValidationService::default();
        assert!(std::ptr::eq(first.email_regex, second.email_regex));
        assert!(std::ptr::eq(first.phone_regex, second.phone_regex));
        assert!(std::ptr::eq(first.expiry_regex, second.expiry_regex));
    }

    #[test]
    fn test_email_shapes() {
        let service = BookingValidationService::new();
        assert!(service.validate_email("a@b.co"));
        assert!(!service.validate_email("a@b"));
        assert!(!service.validate_email("a b@c.de"));
    }

    #[test]
    fn test_payment_field_errors() {
        let service = BookingValidationService::new();
        let payment = PaymentDetails {
            card_number: "1234 567".into(),
            expiry: "13/25".into(),
            receipt_email: Some("not-an-email".into()),
        };

        let errors = service.validate_payment_details(&payment);
        assert_eq!(errors.len(), 3);

        let blank_receipt = PaymentDetails { receipt_email: Some(String::new()), ..valid_payment() };
        assert!(service.validate_payment_details(&blank_receipt).is_empty());
    }

    #[test]
    fn test_confirmation_collects_both_steps() {
        let service = BookingValidationService::new();
        let request = ConfirmBookingRequest {
            doctor_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            time: "09:00".into(),
            patient: PatientDetails { phone: "abc".into(), ..valid_patient() },
            payment: PaymentDetails { expiry: "1/25".into(), ..valid_payment() },
        };

        assert_matches!(
            service.validate_confirmation(&request),
            Err(AppointmentError::InvalidFields(fields)) if fields.len() == 2
        );
    }
}
