pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod repository;
pub mod validation;

pub use booking::BookingService;
pub use conflict::ConflictDetectionService;
pub use lifecycle::AppointmentLifecycleService;
pub use repository::{appointment_version, AppointmentRepository, SlotMove, StoreAppointmentRepository};
pub use validation::BookingValidationService;
