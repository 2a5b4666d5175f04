use std::sync::Arc;

use axum::extract::{Extension, Json, Path, State};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{LoginRequest, LoginResponse, Session};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{CreateUserRequest, UpdateUserRequest, UserProfile};
use crate::services::{CredentialDirectory, UserService};

// ==============================================================================
// SESSION HANDLERS
// ==============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let directory = CredentialDirectory::new(&state.db);
    let response = directory.login(&state.sessions, &request).await?;

    Ok(Json(response))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = Uuid::parse_str(auth.token())
        .map_err(|_| AppError::Auth("Please log in to continue".to_string()))?;

    let closed = state.sessions.revoke(&token).await;
    debug!("Logout, session closed: {}", closed);

    Ok(Json(json!({ "success": true, "redirect": "/login" })))
}

pub async fn me(Extension(session): Extension<Session>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "user_id": session.user_id,
        "email": session.email,
        "name": session.name,
        "role": session.role,
        "doctor_id": session.doctor_id,
        "home": session.role.home_path(),
    })))
}

// ==============================================================================
// ADMIN USER HANDLERS
// ==============================================================================

pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let users: Vec<UserProfile> = UserService::new(&state.db)
        .list()
        .await
        .iter()
        .map(|u| u.profile())
        .collect();

    Ok(Json(json!({
        "total": users.len(),
        "users": users,
    })))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let user = UserService::new(&state.db).create(request).await?;

    Ok(Json(user.profile()))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let user = UserService::new(&state.db).update(&user_id, request).await?;

    Ok(Json(user.profile()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let removed = UserService::new(&state.db).delete(&user_id).await?;
    let revoked = state.sessions.revoke_user(&removed.id, removed.role).await;

    Ok(Json(json!({
        "success": true,
        "deleted": removed.id,
        "sessions_closed": revoked,
    })))
}
