use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use shared_database::{keys, Database, Transaction};

use crate::models::{Article, ArticleFilters, ArticleRequest, ContentError, PublishState};

pub struct ArticleService {
    db: Database,
}

impl ArticleService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn list_all(&self) -> Vec<Article> {
        let mut articles: Vec<Article> = self.db.collection(keys::NEWS).await;
        articles.sort_by(|a, b| b.date.cmp(&a.date));
        articles
    }

    /// Public feed, newest first.
    pub async fn published(&self) -> Vec<Article> {
        self.list_all()
            .await
            .into_iter()
            .filter(|a| a.published)
            .collect()
    }

    /// Drafts read as missing.
    pub async fn get_published(&self, id: i64) -> Result<Article, ContentError> {
        self.published()
            .await
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(ContentError::NotFound(id))
    }

    pub async fn search(&self, filters: &ArticleFilters) -> Vec<Article> {
        self.list_all()
            .await
            .into_iter()
            .filter(|a| matches_filters(a, filters))
            .collect()
    }

    pub async fn create(&self, request: ArticleRequest) -> Result<Article, ContentError> {
        validate(&request)?;

        let article = self
            .db
            .transact(|tx| {
                let mut articles: Vec<Article> = tx.collection(keys::NEWS);
                let article = Article {
                    id: articles.iter().map(|a| a.id).max().unwrap_or(0) + 1,
                    title: request.title.trim().to_string(),
                    specialty: request.specialty.trim().to_string(),
                    summary: request.summary.clone(),
                    content: request.content.clone(),
                    image: request.image.clone(),
                    published: request.published,
                    date: Utc::now(),
                };
                articles.push(article.clone());
                tx.put_collection(keys::NEWS, &articles)?;
                Ok::<_, ContentError>(article)
            })
            .await?;

        info!("Created article {} ({})", article.id, article.title);
        Ok(article)
    }

    /// Replaces the editable fields. The original date is kept.
    pub async fn update(&self, id: i64, request: ArticleRequest) -> Result<Article, ContentError> {
        validate(&request)?;

        let article = self
            .db
            .transact(|tx| {
                modify(tx, id, |article| {
                    article.title = request.title.trim().to_string();
                    article.specialty = request.specialty.trim().to_string();
                    article.summary = request.summary.clone();
                    article.content = request.content.clone();
                    article.image = request.image.clone();
                    article.published = request.published;
                })
            })
            .await?;

        info!("Updated article {}", article.id);
        Ok(article)
    }

    pub async fn toggle_published(&self, id: i64) -> Result<Article, ContentError> {
        let article = self
            .db
            .transact(|tx| modify(tx, id, |article| article.published = !article.published))
            .await?;

        info!("Article {} published: {}", article.id, article.published);
        Ok(article)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        self.db
            .transact(|tx| {
                let mut articles: Vec<Article> = tx.collection(keys::NEWS);
                let before = articles.len();
                articles.retain(|a| a.id != id);
                if articles.len() == before {
                    return Err(ContentError::NotFound(id));
                }
                tx.put_collection(keys::NEWS, &articles)?;
                Ok(())
            })
            .await?;

        info!("Deleted article {}", id);
        Ok(())
    }
}

fn modify(
    tx: &mut Transaction<'_>,
    id: i64,
    change: impl FnOnce(&mut Article),
) -> Result<Article, ContentError> {
    let mut articles: Vec<Article> = tx.collection(keys::NEWS);
    let article = articles
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or(ContentError::NotFound(id))?;

    change(article);
    let updated = article.clone();

    tx.put_collection(keys::NEWS, &articles)?;
    Ok(updated)
}

fn validate(request: &ArticleRequest) -> Result<(), ContentError> {
    let mut errors = BTreeMap::new();
    if request.title.trim().is_empty() {
        errors.insert("title".to_string(), "Title is required.".to_string());
    }
    if request.specialty.trim().is_empty() {
        errors.insert("specialty".to_string(), "Category is required.".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ContentError::InvalidFields(errors))
    }
}

pub fn matches_filters(article: &Article, filters: &ArticleFilters) -> bool {
    if let Some(q) = filters.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let q = q.to_lowercase();
        let hit = article.title.to_lowercase().contains(&q)
            || article.summary.to_lowercase().contains(&q)
            || article.content.to_lowercase().contains(&q);
        if !hit {
            return false;
        }
    }

    if let Some(category) = filters.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        if !article
            .specialty
            .to_lowercase()
            .contains(&category.to_lowercase())
        {
            return false;
        }
    }

    match filters.status {
        Some(PublishState::Published) => article.published,
        Some(PublishState::Draft) => !article.published,
        None => true,
    }
}
