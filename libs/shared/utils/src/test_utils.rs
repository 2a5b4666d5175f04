use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::{initialize, Database, SeedData};
use shared_models::auth::{Role, Session};

use crate::state::AppState;

pub struct TestConfig {
    pub slot_lookahead_days: u32,
    pub payment_delay_ms: u64,
    pub consultation_fee: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            slot_lookahead_days: 7,
            payment_delay_ms: 0,
            consultation_fee: 100,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            slot_lookahead_days: self.slot_lookahead_days,
            payment_delay_ms: self.payment_delay_ms,
            consultation_fee: self.consultation_fee,
            ..AppConfig::default()
        }
    }
}

/// Account from the fixture dataset.
pub struct TestUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub doctor_id: Option<i64>,
}

impl TestUser {
    pub fn new(id: &str, name: &str, email: &str, password: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
            doctor_id: None,
        }
    }

    pub fn admin() -> Self {
        Self::new("u-admin", "Clinic Admin", "admin@clinic.test", "admin123", Role::Admin)
    }

    /// Doctor 1, Cardiology.
    pub fn doctor() -> Self {
        Self {
            doctor_id: Some(1),
            ..Self::new("1", "Dr. An Nguyen", "an.nguyen@clinic.test", "doctor123", Role::Doctor)
        }
    }

    /// Doctor 2, Dermatology.
    pub fn other_doctor() -> Self {
        Self {
            doctor_id: Some(2),
            ..Self::new("2", "Dr. Mai Le", "mai.le@clinic.test", "doctor123", Role::Doctor)
        }
    }

    pub fn patient() -> Self {
        Self::new("1", "Binh Tran", "binh@clinic.test", "patient123", Role::Patient)
    }

    pub fn other_patient() -> Self {
        Self::new("2", "Chi Pham", "chi@clinic.test", "patient123", Role::Patient)
    }
}

pub fn fixture_dataset() -> Value {
    json!({
        "users": [
            { "id": "u-admin", "name": "Clinic Admin", "email": "admin@clinic.test", "password": "admin123", "role": "admin" }
        ],
        "doctors": [
            {
                "id": 1, "name": "Dr. An Nguyen", "email": "an.nguyen@clinic.test", "password": "doctor123",
                "specialty": "Cardiology", "specialty_id": 1, "hospital": "City General Hospital",
                "credentials": "MD, Cardiology Board", "image": "/images/doctors/an-nguyen.jpg",
                "license_number": "LIC-10001", "status": "active"
            },
            {
                "id": 2, "name": "Dr. Mai Le", "email": "mai.le@clinic.test", "password": "doctor123",
                "specialty": "Dermatology", "specialty_id": 2, "hospital": "Riverside Clinic",
                "credentials": "MD", "image": "/images/doctors/mai-le.jpg",
                "license_number": "LIC-10002", "status": "active"
            },
            {
                "id": 3, "name": "Dr. Quang Vo", "email": "quang.vo@clinic.test", "password": "doctor123",
                "specialty": "Pediatrics", "specialty_id": 3, "hospital": "City General Hospital",
                "credentials": "MD", "image": "/images/doctors/quang-vo.jpg",
                "license_number": "LIC-10003", "status": "inactive"
            }
        ],
        "patients": [
            {
                "id": 1, "name": "Binh Tran", "email": "binh@clinic.test", "password": "patient123",
                "phone": "0912345678", "dob": "1990-04-12", "gender": "male"
            },
            {
                "id": 2, "name": "Chi Pham", "email": "chi@clinic.test", "password": "patient123",
                "phone": "0987654321", "dob": "1995-09-30", "gender": "female"
            }
        ],
        "specialties": [
            { "id": 1, "name": "Cardiology", "description": "Heart and blood vessels" },
            { "id": 2, "name": "Dermatology", "description": "Skin, hair and nails" },
            { "id": 3, "name": "Pediatrics", "description": "Children's health" }
        ],
        "news": [
            {
                "id": 1, "title": "Keeping your heart healthy", "specialty": "Cardiology",
                "summary": "Simple habits for a stronger heart.", "content": "Walk every day.",
                "image": "", "published": true, "date": "2025-01-10T08:00:00Z"
            },
            {
                "id": 2, "title": "Sun protection basics", "specialty": "Dermatology",
                "summary": "Choosing a sunscreen.", "content": "Use SPF 30 or higher.",
                "image": "", "published": false, "date": "2025-02-02T08:00:00Z"
            }
        ],
        "appointments": [],
        "notifications": []
    })
}

/// In-memory state seeded with [`fixture_dataset`]. Slots are not generated.
pub async fn test_state() -> Arc<AppState> {
    test_state_with(TestConfig::default()).await
}

pub async fn test_state_with(config: TestConfig) -> Arc<AppState> {
    let db = Database::in_memory();
    let seed = match SeedData::from_value(fixture_dataset()) {
        Ok(seed) => seed,
        Err(e) => panic!("fixture dataset is invalid: {}", e),
    };
    if let Err(e) = initialize(&db, &seed).await {
        panic!("failed to seed test store: {}", e);
    }

    AppState::new(config.to_app_config(), db).shared()
}

/// Opens a session for `user` without going through the login route.
pub async fn login_as(state: &AppState, user: &TestUser) -> Session {
    state
        .sessions
        .create(&user.id, &user.email, &user.name, user.role, user.doctor_id)
        .await
}

pub fn bearer(session: &Session) -> String {
    format!("Bearer {}", session.token)
}
