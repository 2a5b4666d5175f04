use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use shared_database::{keys, Database};

use crate::models::{AuthError, CreateUserRequest, UpdateUserRequest, User};

const MIN_PASSWORD_LENGTH: usize = 6;

/// Admin management of the `users` collection.
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn list(&self) -> Vec<User> {
        self.db.collection(keys::USERS).await
    }

    pub async fn get(&self, id: &str) -> Result<User, AuthError> {
        self.list()
            .await
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<User, AuthError> {
        let errors = validate_user_fields(
            Some(&request.name),
            Some(&request.email),
            Some(&request.password),
        );
        if !errors.is_empty() {
            return Err(AuthError::InvalidFields(errors));
        }

        let user = self
            .db
            .transact(|tx| {
                let mut users: Vec<User> = tx.collection(keys::USERS);
                let email = request.email.trim().to_lowercase();
                if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
                    return Err(AuthError::DuplicateEmail(email));
                }

                let user = User {
                    id: Uuid::new_v4().to_string(),
                    name: request.name.trim().to_string(),
                    email,
                    password: request.password.clone(),
                    role: request.role,
                    doctor_id: request.doctor_id,
                    created_at: Some(Utc::now()),
                };

                users.push(user.clone());
                tx.put_collection(keys::USERS, &users)?;
                Ok(user)
            })
            .await?;

        info!("Created {} user {}", user.role, user.email);
        Ok(user)
    }

    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<User, AuthError> {
        let errors = validate_user_fields(
            request.name.as_ref(),
            request.email.as_ref(),
            request.password.as_ref(),
        );
        if !errors.is_empty() {
            return Err(AuthError::InvalidFields(errors));
        }

        let user = self
            .db
            .transact(|tx| {
                let mut users: Vec<User> = tx.collection(keys::USERS);

                if let Some(email) = &request.email {
                    let email = email.trim().to_lowercase();
                    if users
                        .iter()
                        .any(|u| u.id != id && u.email.eq_ignore_ascii_case(&email))
                    {
                        return Err(AuthError::DuplicateEmail(email));
                    }
                }

                let user = users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

                if let Some(name) = &request.name {
                    user.name = name.trim().to_string();
                }
                if let Some(email) = &request.email {
                    user.email = email.trim().to_lowercase();
                }
                if let Some(password) = &request.password {
                    user.password = password.clone();
                }
                if let Some(role) = request.role {
                    user.role = role;
                }
                if request.doctor_id.is_some() {
                    user.doctor_id = request.doctor_id;
                }

                let updated = user.clone();
                tx.put_collection(keys::USERS, &users)?;
                Ok(updated)
            })
            .await?;

        info!("Updated user {}", user.id);
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> Result<User, AuthError> {
        let removed = self
            .db
            .transact(|tx| {
                let mut users: Vec<User> = tx.collection(keys::USERS);
                let index = users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;
                let removed = users.remove(index);
                tx.put_collection(keys::USERS, &users)?;
                Ok::<_, AuthError>(removed)
            })
            .await?;

        info!("Deleted user {}", removed.email);
        Ok(removed)
    }
}

fn validate_user_fields(
    name: Option<&String>,
    email: Option<&String>,
    password: Option<&String>,
) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    if name.is_some_and(|n| n.trim().is_empty()) {
        errors.insert("name".into(), "Name is required.".into());
    }
    if email.is_some_and(|e| !e.contains('@')) {
        errors.insert("email".into(), "Please enter a valid email address.".into());
    }
    if password.is_some_and(|p| p.chars().count() < MIN_PASSWORD_LENGTH) {
        errors.insert("password".into(), "Password must be at least 6 characters.".into());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_models::auth::Role;

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Front Desk".to_string(),
            email: email.to_string(),
            password: "desk1234".to_string(),
            role: Role::Admin,
            doctor_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let db = Database::in_memory();
        let service = UserService::new(&db);

        service.create(request("desk@clinic.test")).await.unwrap();
        assert_matches!(
            service.create(request("DESK@clinic.test")).await,
            Err(AuthError::DuplicateEmail(_))
        );
        assert_eq!(service.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_short_password_is_a_field_error() {
        let db = Database::in_memory();
        let mut short = request("desk@clinic.test");
        short.password = "abc".to_string();

        assert_matches!(
            UserService::new(&db).create(short).await,
            Err(AuthError::InvalidFields(fields)) if fields.contains_key("password")
        );
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::in_memory();
        let service = UserService::new(&db);
        let user = service.create(request("desk@clinic.test")).await.unwrap();

        let updated = service
            .update(
                &user.id,
                UpdateUserRequest {
                    name: Some("Reception".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Reception");
        assert_eq!(updated.email, "desk@clinic.test");

        service.delete(&user.id).await.unwrap();
        assert_matches!(service.get(&user.id).await, Err(AuthError::UserNotFound(_)));
    }
}
