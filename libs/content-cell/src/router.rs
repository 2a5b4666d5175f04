use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::admin_only;
use shared_utils::AppState;

use crate::handlers;

pub fn content_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/news", get(handlers::list_news))
        .route("/news/{article_id}", get(handlers::get_news));

    let admin_routes = Router::new()
        .route(
            "/admin",
            get(handlers::search_articles).post(handlers::create_article),
        )
        .route(
            "/admin/{article_id}",
            put(handlers::update_article).delete(handlers::delete_article),
        )
        .route(
            "/admin/{article_id}/toggle-published",
            post(handlers::toggle_published),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_only));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
