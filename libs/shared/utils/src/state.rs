use std::sync::Arc;

use chrono::{DateTime, Utc};

use shared_config::AppConfig;
use shared_database::Database;

use crate::session::SessionStore;

/// Everything a request handler can reach. Routers receive it as `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub sessions: SessionStore,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db,
            sessions: SessionStore::new(),
            started_at: Utc::now(),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
