use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use monitoring_cell::router::monitoring_routes;
use shared_database::keys;
use shared_utils::test_utils::{bearer, login_as, test_state, TestUser};
use shared_utils::AppState;

async fn create_test_app() -> (Arc<AppState>, Router) {
    let state = test_state().await;
    let app = monitoring_routes(state.clone());
    (state, app)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_is_degraded_without_slots() {
    let (_, app) = create_test_app().await;

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["overall_status"], "degraded");
    let components: Vec<&str> = body["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["component"].as_str().unwrap())
        .collect();
    assert_eq!(components, vec!["store", "slot_catalog", "change_bus", "sessions"]);
}

#[tokio::test]
async fn test_missing_key_is_unhealthy() {
    let (state, app) = create_test_app().await;
    state.db.remove(keys::REVIEWS).await.unwrap();

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["overall_status"], "unhealthy");
}

#[tokio::test]
async fn test_component_lookup() {
    let (state, app) = create_test_app().await;
    login_as(&state, &TestUser::patient()).await;

    let response = app.clone().oneshot(get("/health/sessions", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["details"]["active"], 1);

    let response = app.oneshot(get("/health/video", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_counts_for_admin() {
    let (state, app) = create_test_app().await;
    let admin = login_as(&state, &TestUser::admin()).await;

    let response = app
        .oneshot(get("/dashboard", Some(&bearer(&admin))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_patients"], 2);
    assert_eq!(body["total_doctors"], 3);
    assert_eq!(body["active_doctors"], 2);
    assert_eq!(body["total_appointments"], 0);
    assert_eq!(body["published_articles"], 1);
}

#[tokio::test]
async fn test_dashboard_requires_admin() {
    let (_, app) = create_test_app().await;

    let response = app.oneshot(get("/dashboard", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
