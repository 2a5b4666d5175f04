use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound(Uuid),

    #[error("Notification belongs to another doctor")]
    NotOwner(Uuid),

    #[error("Notification is not linked to an appointment")]
    NoAppointment(Uuid),

    #[error("Appointment {0} no longer exists")]
    AppointmentMissing(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(_)
            | NotificationError::NoAppointment(_)
            | NotificationError::AppointmentMissing(_) => AppError::NotFound(err.to_string()),
            NotificationError::NotOwner(_) => AppError::Forbidden(err.to_string()),
            NotificationError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
