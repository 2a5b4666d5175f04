use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use content_cell::router::content_routes;
use shared_utils::test_utils::{bearer, login_as, test_state, TestUser};
use shared_utils::AppState;

async fn create_test_app() -> (Arc<AppState>, Router) {
    let state = test_state().await;
    let app = content_routes(state.clone());
    (state, app)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_public_feed_hides_drafts() {
    let (_, app) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/news", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["articles"][0]["id"], 1);

    let response = app
        .oneshot(request(Method::GET, "/news/2", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_filters_by_status_and_category() {
    let (state, app) = create_test_app().await;
    let admin = login_as(&state, &TestUser::admin()).await;
    let token = bearer(&admin);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/admin?status=draft", Some(&token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["articles"][0]["title"], "Sun protection basics");

    let response = app
        .oneshot(request(Method::GET, "/admin?category=CARDIO", Some(&token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["articles"][0]["specialty"], "Cardiology");
}

#[tokio::test]
async fn test_admin_publishes_draft() {
    let (state, app) = create_test_app().await;
    let admin = login_as(&state, &TestUser::admin()).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/admin/2/toggle-published",
            Some(&bearer(&admin)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["published"], true);

    let response = app
        .oneshot(request(Method::GET, "/news", None, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 2);
}

#[tokio::test]
async fn test_create_requires_title() {
    let (state, app) = create_test_app().await;
    let admin = login_as(&state, &TestUser::admin()).await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/admin",
            Some(&bearer(&admin)),
            Some(json!({ "title": "  ", "specialty": "Cardiology" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["fields"]["title"].is_string());
}

#[tokio::test]
async fn test_create_update_delete() {
    let (state, app) = create_test_app().await;
    let admin = login_as(&state, &TestUser::admin()).await;
    let token = bearer(&admin);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/admin",
            Some(&token),
            Some(json!({ "title": "Flu season", "specialty": "General", "summary": "Get vaccinated" })),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    assert_eq!(created["id"], 3);
    assert_eq!(created["published"], true);

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/admin/3",
            Some(&token),
            Some(json!({ "title": "Flu season 2025", "specialty": "General", "published": false })),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["title"], "Flu season 2025");

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, "/admin/3", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(Method::DELETE, "/admin/3", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_admin_requires_admin() {
    let (state, app) = create_test_app().await;
    let doctor = login_as(&state, &TestUser::doctor()).await;

    let response = app
        .oneshot(request(Method::GET, "/admin", Some(&bearer(&doctor)), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
