use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;

/// News entry shown on the public site. Stored under `news`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    /// Category label, usually a specialty name.
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_published")]
    pub published: bool,
    pub date: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Published,
    Draft,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleFilters {
    /// Matches title, summary or content.
    pub q: Option<String>,
    /// Substring of the category.
    pub category: Option<String>,
    pub status: Option<PublishState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    #[error("Validation failed")]
    InvalidFields(BTreeMap<String, String>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(_) => AppError::NotFound(err.to_string()),
            ContentError::InvalidFields(fields) => AppError::InvalidFields(fields),
            ContentError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
