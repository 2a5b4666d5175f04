use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use doctor_cell::router::doctor_routes;
use doctor_cell::services::AvailabilityService;
use shared_database::keys;
use shared_utils::test_utils::{bearer, login_as, test_state, TestUser};
use shared_utils::AppState;

async fn create_test_app() -> (Arc<AppState>, Router) {
    let state = test_state().await;
    AvailabilityService::new(&state.db, &state.config)
        .ensure_catalog()
        .await
        .unwrap();
    let app = doctor_routes(state.clone());
    (state, app)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn admin_auth(state: &AppState) -> String {
    bearer(&login_as(state, &TestUser::admin()).await)
}

#[tokio::test]
async fn test_public_list_shows_active_doctors_without_passwords() {
    let (_state, app) = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert!(json["doctors"][0].get("password").is_none());
}

#[tokio::test]
async fn test_get_unknown_doctor_is_not_found() {
    let (_state, app) = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/999").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["redirect"], "/");
}

#[tokio::test]
async fn test_slots_for_today_follow_template() {
    let (_state, app) = create_test_app().await;
    let today = AvailabilityService::today();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/1/slots?date={}", today))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 13);
    assert_eq!(slots[0]["start_time"], "07:30");
    assert_eq!(slots[12]["end_time"], "16:30");
    assert_eq!(json["available_count"], 13);
}

#[tokio::test]
async fn test_catalog_generated_only_once() {
    let (state, _app) = create_test_app().await;
    let service = AvailabilityService::new(&state.db, &state.config);

    assert_eq!(service.ensure_catalog().await.unwrap(), 0);
    let slots: Vec<Value> = state.db.collection(keys::APPOINTMENT_SLOTS).await;
    assert_eq!(slots.len(), 3 * 7 * 13);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let (state, app) = create_test_app().await;

    let anonymous = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/1/toggle-status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(anonymous).await["redirect"], "/login");

    let patient = login_as(&state, &TestUser::patient()).await;
    let forbidden = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/1/toggle-status")
                .header(header::AUTHORIZATION, bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(forbidden).await["redirect"], "/");
}

#[tokio::test]
async fn test_create_doctor_validates_license() {
    let (state, app) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, admin_auth(&state).await)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Dr. New",
                        "email": "new@clinic.test",
                        "specialty": "Cardiology",
                        "license_number": "L12"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["fields"]["license_number"],
        "License number must be at least 5 characters."
    );
}

#[tokio::test]
async fn test_new_doctor_gets_slots_after_regenerate() {
    let (state, app) = create_test_app().await;
    let auth = admin_auth(&state).await;

    let created = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, &auth)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Dr. Hoa Dang",
                        "email": "hoa@clinic.test",
                        "specialty": "Neurology",
                        "license_number": "LIC-20001"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);
    let doctor = body_json(created).await;
    assert_eq!(doctor["id"], 4);
    assert_eq!(doctor["status"], "active");

    let service = AvailabilityService::new(&state.db, &state.config);
    let tomorrow = AvailabilityService::today() + Duration::days(1);
    assert!(service.slots_for(4, tomorrow).await.unwrap().is_empty());

    let regenerated = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/slots/regenerate")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(regenerated.status(), StatusCode::OK);
    let report = body_json(regenerated).await;
    assert_eq!(report["doctors"], 4);
    assert_eq!(report["slots"], 4 * 7 * 13);

    assert_eq!(service.slots_for(4, tomorrow).await.unwrap().len(), 13);
}

#[tokio::test]
async fn test_toggle_status_hides_doctor_from_public_list() {
    let (state, app) = create_test_app().await;

    let toggled = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/2/toggle-status")
                .header(header::AUTHORIZATION, admin_auth(&state).await)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(toggled).await["status"], "inactive");

    let listed = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(listed).await["total"], 1);
}

#[tokio::test]
async fn test_admin_search_filters() {
    let (state, app) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/search?status=inactive")
                .header(header::AUTHORIZATION, admin_auth(&state).await)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["doctors"][0]["name"], "Dr. Quang Vo");
}

#[tokio::test]
async fn test_delete_doctor_removes_slots() {
    let (state, app) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/3")
                .header(header::AUTHORIZATION, admin_auth(&state).await)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let slots: Vec<Value> = state.db.collection(keys::APPOINTMENT_SLOTS).await;
    assert_eq!(slots.len(), 2 * 7 * 13);
    assert!(slots.iter().all(|s| s["doctor_id"] != 3));
}
