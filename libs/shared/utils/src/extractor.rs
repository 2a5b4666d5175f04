use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::auth::{Role, Session};
use shared_models::error::AppError;

use crate::state::AppState;

/// Parses `Authorization: Bearer <uuid>`. Anything else reads as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let auth = headers.typed_get::<Authorization<Bearer>>()?;
    match Uuid::parse_str(auth.token()) {
        Ok(token) => Some(token),
        Err(_) => {
            debug!("Ignoring bearer token that is not a session handle");
            None
        }
    }
}

/// Session for routes where logging in is optional.
pub async fn optional_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = bearer_token(headers)?;
    state.sessions.get(&token).await
}

pub async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, AppError> {
    optional_session(state, headers)
        .await
        .ok_or_else(|| AppError::Auth("Please log in to continue".to_string()))
}

/// Single navigation gate: the session's role must be one of `allowed`.
pub fn gate(session: &Session, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&session.role) {
        Ok(())
    } else {
        warn!(
            "{} ({}) denied, route requires one of {:?}",
            session.email, session.role, allowed
        );
        Err(AppError::Forbidden("You do not have access to this page".to_string()))
    }
}

async fn gated(
    state: &AppState,
    allowed: &[Role],
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = require_session(state, request.headers()).await?;
    gate(&session, allowed)?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Any logged-in role
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    gated(&state, &[Role::Admin, Role::Doctor, Role::Patient], request, next).await
}

pub async fn admin_only(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    gated(&state, &[Role::Admin], request, next).await
}

pub async fn doctor_only(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    gated(&state, &[Role::Doctor], request, next).await
}
