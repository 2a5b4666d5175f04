use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Role, Session};

/// Server-side session map. A token is an opaque handle, valid until logout.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(
        &self,
        user_id: &str,
        email: &str,
        name: &str,
        role: Role,
        doctor_id: Option<i64>,
    ) -> Session {
        let session = Session {
            token: Uuid::new_v4(),
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            doctor_id,
            created_at: Utc::now(),
        };

        self.sessions.write().await.insert(session.token, session.clone());
        info!("Session opened for {} ({})", session.email, session.role);

        session
    }

    pub async fn get(&self, token: &Uuid) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn revoke(&self, token: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(token);
        if let Some(session) = &removed {
            debug!("Session closed for {}", session.email);
        }
        removed.is_some()
    }

    /// Drops every session of a deleted account. Ids are only unique per role.
    pub async fn revoke_user(&self, user_id: &str, role: Role) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !(session.user_id == user_id && session.role == role));
        before - sessions.len()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_get_revoke() {
        let store = SessionStore::new();
        let session = store
            .create("p-1", "patient@clinic.test", "Patient One", Role::Patient, None)
            .await;

        let found = store.get(&session.token).await.unwrap();
        assert_eq!(found.email, "patient@clinic.test");
        assert_eq!(found.role, Role::Patient);

        assert!(store.revoke(&session.token).await);
        assert!(store.get(&session.token).await.is_none());
        assert!(!store.revoke(&session.token).await);
    }

    #[tokio::test]
    async fn test_revoke_user_drops_all_sessions() {
        let store = SessionStore::new();
        store.create("7", "doc@clinic.test", "Doc", Role::Doctor, Some(7)).await;
        store.create("7", "doc@clinic.test", "Doc", Role::Doctor, Some(7)).await;
        store.create("8", "other@clinic.test", "Other", Role::Doctor, Some(8)).await;
        store.create("7", "patient@clinic.test", "Patient", Role::Patient, None).await;

        assert_eq!(store.revoke_user("7", Role::Doctor).await, 2);
        assert_eq!(store.count().await, 2);
    }
}
