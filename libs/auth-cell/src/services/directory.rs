use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use shared_database::{keys, Database};
use shared_models::auth::{LoginRequest, LoginResponse, Role};
use shared_utils::SessionStore;

use crate::models::{Account, AccountSource, AuthError};

/// One credential lookup over `users`, `doctors` and `patients`.
pub struct CredentialDirectory {
    db: Database,
}

impl CredentialDirectory {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Every account in source order: users, then doctors, then patients.
    pub async fn accounts(&self) -> Vec<Account> {
        let mut accounts = Vec::new();

        for (key, source) in [
            (keys::USERS, AccountSource::Users),
            (keys::DOCTORS, AccountSource::Doctors),
            (keys::PATIENTS, AccountSource::Patients),
        ] {
            let records: Vec<Value> = self.db.collection(key).await;
            accounts.extend(records.iter().filter_map(|r| account_from(r, source)));
        }

        accounts
    }

    /// Email is matched trimmed and case-insensitive. The password is
    /// compared as stored.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let wanted = email.trim().to_lowercase();

        self.accounts()
            .await
            .into_iter()
            .find(|a| a.email.to_lowercase() == wanted && a.password == password)
            .ok_or(AuthError::InvalidCredentials)
    }

    #[instrument(skip(self, sessions, request), fields(email = %request.email))]
    pub async fn login(
        &self,
        sessions: &SessionStore,
        request: &LoginRequest,
    ) -> Result<LoginResponse, AuthError> {
        let account = match self.authenticate(&request.email, &request.password).await {
            Ok(account) => account,
            Err(e) => {
                warn!("Login failed for {}", request.email.trim());
                return Err(e);
            }
        };

        let session = sessions
            .create(&account.id, &account.email, &account.name, account.role, account.doctor_id)
            .await;

        let redirect_to = request
            .from
            .as_deref()
            .filter(|from| is_local_path(from))
            .unwrap_or_else(|| account.role.home_path())
            .to_string();

        info!("{} logged in as {}, continuing to {}", account.email, account.role, redirect_to);

        Ok(LoginResponse {
            token: session.token,
            role: session.role,
            name: session.name,
            email: session.email,
            redirect_to,
        })
    }
}

/// Only same-site paths are honored as a post-login target.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

fn account_from(record: &Value, source: AccountSource) -> Option<Account> {
    let id = match record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            debug!("Skipping {:?} record without an id", source);
            return None;
        }
    };
    let email = text(record, "email")?;
    let password = text(record, "password").unwrap_or_default();

    let role = match record.get("role").and_then(Value::as_str) {
        Some("admin") => Role::Admin,
        Some("doctor") => Role::Doctor,
        Some("patient") => Role::Patient,
        _ if record.get("specialty").is_some_and(|s| !s.is_null()) => Role::Doctor,
        _ => Role::Patient,
    };

    let doctor_id = match (role, source) {
        (Role::Doctor, AccountSource::Doctors) => record.get("id").and_then(Value::as_i64),
        (Role::Doctor, _) => record.get("doctor_id").and_then(Value::as_i64),
        _ => None,
    };

    Some(Account {
        id,
        name: display_name(record),
        email: email.trim().to_string(),
        password,
        role,
        doctor_id,
        source,
    })
}

fn text(record: &Value, field: &str) -> Option<String> {
    record.get(field).and_then(Value::as_str).map(str::to_string)
}

fn display_name(record: &Value) -> String {
    if let Some(name) = text(record, "name").or_else(|| text(record, "fullName")) {
        return name;
    }
    let first = text(record, "firstName").unwrap_or_default();
    let last = text(record, "lastName").unwrap_or_default();
    format!("{} {}", first, last).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_inferred_from_specialty() {
        let doctor = account_from(
            &json!({ "id": 4, "email": "d@clinic.test", "password": "x", "specialty": "ENT" }),
            AccountSource::Doctors,
        )
        .unwrap();
        assert_eq!(doctor.role, Role::Doctor);
        assert_eq!(doctor.doctor_id, Some(4));
        assert_eq!(doctor.id, "4");

        let patient = account_from(
            &json!({ "id": "p9", "email": "p@clinic.test", "firstName": "Lan", "lastName": "Do" }),
            AccountSource::Patients,
        )
        .unwrap();
        assert_eq!(patient.role, Role::Patient);
        assert_eq!(patient.name, "Lan Do");
    }

    #[test]
    fn test_explicit_role_wins() {
        let admin = account_from(
            &json!({ "id": "a", "email": "a@clinic.test", "role": "admin", "specialty": "ENT" }),
            AccountSource::Users,
        )
        .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.doctor_id, None);
    }

    #[test]
    fn test_records_without_email_are_skipped() {
        assert!(account_from(&json!({ "id": 1 }), AccountSource::Patients).is_none());
    }

    #[test]
    fn test_redirect_targets() {
        assert!(is_local_path("/doctors/3"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("https://evil.example"));
    }
}
