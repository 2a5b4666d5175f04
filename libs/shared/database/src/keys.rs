//! Storage key layout. Every collection is a JSON array under its key.

pub const USERS: &str = "users";
pub const DOCTORS: &str = "doctors";
pub const PATIENTS: &str = "patients";
pub const SPECIALTIES: &str = "specialties";
pub const APPOINTMENTS: &str = "appointments";
pub const APPOINTMENT_SLOTS: &str = "appointment_slots";
pub const MEDICAL_RECORDS: &str = "medical_records";
pub const REVIEWS: &str = "reviews";
pub const NOTIFICATIONS: &str = "notifications";
pub const NEWS: &str = "news";

/// Monotonic counter bumped on every appointment write.
pub const APPOINTMENT_VERSION: &str = "appointment_version";
/// Set once the seed dataset has been written.
pub const DATA_INITIALIZED: &str = "data_initialized";
/// Survives re-seeding.
pub const CURRENT_USER: &str = "currentUser";

/// Keys that must exist after initialization, back-filled with `[]`.
pub const REQUIRED_KEYS: [&str; 10] = [
    USERS,
    DOCTORS,
    PATIENTS,
    SPECIALTIES,
    APPOINTMENTS,
    APPOINTMENT_SLOTS,
    MEDICAL_RECORDS,
    REVIEWS,
    NOTIFICATIONS,
    NEWS,
];
