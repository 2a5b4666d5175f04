use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use doctor_cell::services::AvailabilityService;
use shared_utils::test_utils::{bearer, login_as, test_state, TestUser};
use shared_utils::AppState;

async fn create_test_app() -> (Arc<AppState>, Router) {
    let state = test_state().await;
    AvailabilityService::new(&state.db, &state.config)
        .ensure_catalog()
        .await
        .unwrap();
    let app = appointment_routes(state.clone());
    (state, app)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn tomorrow() -> String {
    (AvailabilityService::today() + Duration::days(1)).to_string()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, token)
        .body(Body::empty())
        .unwrap()
}

fn confirm_body(time: &str) -> Value {
    json!({
        "doctor_id": 1,
        "date": tomorrow(),
        "time": time,
        "patient": {
            "first_name": "Binh",
            "last_name": "Tran",
            "email": "binh@clinic.test",
            "confirm_email": "binh@clinic.test",
            "phone": "0901234567",
            "dob": "1990-04-12",
            "gender": "male"
        },
        "payment": {
            "card_number": "4111111111111111",
            "expiry": "11/28"
        }
    })
}

#[tokio::test]
async fn test_guest_select_returns_login_redirect() {
    let (_, app) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/select",
            None,
            json!({ "doctor_id": 1, "date": tomorrow(), "time": "09:00 - 09:30" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "login_required");
    assert_eq!(body["redirect"], "/login");
    assert_eq!(body["pending"]["doctor_id"], 1);
}

#[tokio::test]
async fn test_patient_select_returns_draft() {
    let (state, app) = create_test_app().await;
    let patient = login_as(&state, &TestUser::patient()).await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/select",
            Some(&bearer(&patient)),
            json!({ "doctor_id": 1, "date": tomorrow(), "time": "09:00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["draft"]["start_time"], "09:00");
    assert_eq!(body["draft"]["end_time"], "09:30");
    assert_eq!(body["draft"]["fee"], 100);
}

#[tokio::test]
async fn test_confirm_requires_login() {
    let (_, app) = create_test_app().await;

    let response = app
        .oneshot(json_request(Method::POST, "/confirm", None, confirm_body("09:00")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["redirect"], "/login");
}

#[tokio::test]
async fn test_full_booking_scenario() {
    let (state, app) = create_test_app().await;
    let patient = login_as(&state, &TestUser::patient()).await;
    let doctor = login_as(&state, &TestUser::doctor()).await;
    let patient_token = bearer(&patient);
    let doctor_token = bearer(&doctor);

    // Patient books 09:00
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/confirm", Some(&patient_token), confirm_body("09:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["appointment"]["status"], "Haven't examined yet");

    // Same slot again conflicts
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/confirm", Some(&patient_token), confirm_body("09:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Patient list
    let response = app.clone().oneshot(get_request("/mine", &patient_token)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);

    // Doctor marks examined
    let response = app
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/doctor/{}/status", appointment_id),
            Some(&doctor_token),
            json!({ "status": "Examined", "confirmed": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Examined");
    assert_eq!(body["control"]["editable"], false);

    // Schedule shows the locked control
    let response = app
        .clone()
        .oneshot(get_request("/doctor?view=all", &doctor_token))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["groups"][0]["appointments"][0]["control"]["options"], json!(["Examined"]));

    // Patient can no longer cancel
    let response = app
        .oneshot(json_request(
            Method::POST,
            &format!("/{}/cancel", appointment_id),
            Some(&patient_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_confirmation_returns_field_errors() {
    let (state, app) = create_test_app().await;
    let patient = login_as(&state, &TestUser::patient()).await;

    let mut body = confirm_body("09:00");
    body["patient"]["phone"] = json!("12ab");
    body["payment"]["card_number"] = json!("4111");

    let response = app
        .oneshot(json_request(Method::POST, "/confirm", Some(&bearer(&patient)), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["fields"]["phone"].is_string());
    assert!(body["fields"]["card_number"].is_string());
}

#[tokio::test]
async fn test_doctor_routes_reject_patients() {
    let (state, app) = create_test_app().await;
    let patient = login_as(&state, &TestUser::patient()).await;

    let response = app.oneshot(get_request("/doctor", &bearer(&patient))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_lists_every_appointment() {
    let (state, app) = create_test_app().await;
    let patient = login_as(&state, &TestUser::patient()).await;
    let admin = login_as(&state, &TestUser::admin()).await;

    app.clone()
        .oneshot(json_request(Method::POST, "/confirm", Some(&bearer(&patient)), confirm_body("14:30")))
        .await
        .unwrap();

    let response = app.clone().oneshot(get_request("/admin", &bearer(&admin))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);

    let response = app.oneshot(get_request("/admin", &bearer(&patient))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
