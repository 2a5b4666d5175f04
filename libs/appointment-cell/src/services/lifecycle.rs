use tracing::{debug, info, warn};

use crate::models::{AppointmentError, AppointmentStatus, StatusControl};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::NotExamined => {
                vec![AppointmentStatus::Examined, AppointmentStatus::Canceled]
            }
            // Terminal states
            AppointmentStatus::Examined => vec![],
            AppointmentStatus::Canceled => vec![],
        }
    }

    /// Checks a change made through the doctor's status control. The control
    /// only marks an appointment examined, and only after confirmation.
    pub fn validate_doctor_update(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
        confirmed: bool,
    ) -> Result<(), AppointmentError> {
        if current_status.is_terminal() {
            return Err(AppointmentError::Locked(*current_status));
        }
        if *new_status != AppointmentStatus::Examined {
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }
        if !confirmed {
            return Err(AppointmentError::ConfirmationRequired);
        }

        self.validate_status_transition(current_status, new_status)?;
        info!("Doctor status change approved: {} -> {}", current_status, new_status);
        Ok(())
    }

    pub fn doctor_control(&self, status: &AppointmentStatus) -> StatusControl {
        if status.is_terminal() {
            StatusControl {
                editable: false,
                options: vec![*status],
            }
        } else {
            StatusControl {
                editable: true,
                options: vec![AppointmentStatus::NotExamined, AppointmentStatus::Examined],
            }
        }
    }

    /// Patients and admins may cancel only while the appointment is pending.
    pub fn can_cancel(&self, status: &AppointmentStatus) -> bool {
        self.get_valid_transitions(status)
            .contains(&AppointmentStatus::Canceled)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_pending_transitions() {
        let service = AppointmentLifecycleService::new();
        let pending = AppointmentStatus::NotExamined;

        assert!(service
            .validate_status_transition(&pending, &AppointmentStatus::Examined)
            .is_ok());
        assert!(service
            .validate_status_transition(&pending, &AppointmentStatus::Canceled)
            .is_ok());
    }

    #[test]
    fn test_terminal_statuses_are_locked() {
        let service = AppointmentLifecycleService::new();

        for terminal in [AppointmentStatus::Examined, AppointmentStatus::Canceled] {
            assert!(service.get_valid_transitions(&terminal).is_empty());
            assert_matches!(
                service.validate_status_transition(&terminal, &AppointmentStatus::NotExamined),
                Err(AppointmentError::InvalidStatusTransition { .. })
            );
            assert!(!service.can_cancel(&terminal));
        }
    }

    #[test]
    fn test_doctor_update_requires_confirmation() {
        let service = AppointmentLifecycleService::new();

        assert_matches!(
            service.validate_doctor_update(
                &AppointmentStatus::NotExamined,
                &AppointmentStatus::Examined,
                false
            ),
            Err(AppointmentError::ConfirmationRequired)
        );
        assert!(service
            .validate_doctor_update(
                &AppointmentStatus::NotExamined,
                &AppointmentStatus::Examined,
                true
            )
            .is_ok());
    }

    #[test]
    fn test_doctor_cannot_cancel_through_control() {
        let service = AppointmentLifecycleService::new();

        assert_matches!(
            service.validate_doctor_update(
                &AppointmentStatus::NotExamined,
                &AppointmentStatus::Canceled,
                true
            ),
            Err(AppointmentError::InvalidStatusTransition { .. })
        );
        assert_matches!(
            service.validate_doctor_update(
                &AppointmentStatus::Examined,
                &AppointmentStatus::Examined,
                true
            ),
            Err(AppointmentError::Locked(AppointmentStatus::Examined))
        );
    }

    #[test]
    fn test_doctor_control_options() {
        let service = AppointmentLifecycleService::new();

        let open = service.doctor_control(&AppointmentStatus::NotExamined);
        assert!(open.editable);
        assert_eq!(
            open.options,
            vec![AppointmentStatus::NotExamined, AppointmentStatus::Examined]
        );

        let locked = service.doctor_control(&AppointmentStatus::Canceled);
        assert!(!locked.editable);
        assert_eq!(locked.options, vec![AppointmentStatus::Canceled]);
    }
}
