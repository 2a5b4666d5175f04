use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::{admin_only, session_middleware};
use shared_utils::AppState;

use crate::handlers;

pub fn auth_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout));

    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    let admin_routes = Router::new()
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/users/{user_id}", put(handlers::update_user).delete(handlers::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), admin_only));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}
