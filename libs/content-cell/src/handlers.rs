use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{ArticleFilters, ArticleRequest};
use crate::services::ArticleService;

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_news(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let articles = ArticleService::new(&state.db).published().await;

    Ok(Json(json!({
        "total": articles.len(),
        "articles": articles,
    })))
}

#[axum::debug_handler]
pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let article = ArticleService::new(&state.db).get_published(article_id).await?;

    Ok(Json(json!(article)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_articles(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ArticleFilters>,
) -> Result<Json<Value>, AppError> {
    let articles = ArticleService::new(&state.db).search(&filters).await;

    Ok(Json(json!({
        "total": articles.len(),
        "articles": articles,
    })))
}

#[axum::debug_handler]
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<Value>, AppError> {
    let article = ArticleService::new(&state.db).create(request).await?;

    Ok(Json(json!(article)))
}

#[axum::debug_handler]
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<Value>, AppError> {
    let article = ArticleService::new(&state.db)
        .update(article_id, request)
        .await?;

    Ok(Json(json!(article)))
}

#[axum::debug_handler]
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    ArticleService::new(&state.db).delete(article_id).await?;

    Ok(Json(json!({ "success": true, "deleted": article_id })))
}

#[axum::debug_handler]
pub async fn toggle_published(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let article = ArticleService::new(&state.db)
        .toggle_published(article_id)
        .await?;

    Ok(Json(json!(article)))
}
