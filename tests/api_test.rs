use std::sync::Arc;

use assessment_backend::{
    config::Settings,
    database::MemoryRepo,
    middleware::auth::issue_token,
    routes,
    services::{conference_service::DisabledConferenceProvider, notification_service::LogMailer},
    utils::time::{parse_iso_datetime, FixedClock},
    AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures_util::StreamExt;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const SECRET: &str = "test_secret_key";

struct TestApp {
    app: Router,
    repo: MemoryRepo,
    clock: Arc<FixedClock>,
}

fn test_app() -> TestApp {
    let repo = MemoryRepo::new();
    let clock = Arc::new(FixedClock::new(
        parse_iso_datetime("2022-12-01T12:00:00Z").expect("clock"),
    ));
    let settings = Settings {
        jwt_secret: SECRET.to_string(),
        ..Settings::default()
    };
    let state = AppState::new(
        Arc::new(repo.clone()),
        clock.clone(),
        settings,
        Arc::new(LogMailer),
        Arc::new(DisabledConferenceProvider),
    );
    TestApp {
        app: routes::router(state),
        repo,
        clock,
    }
}

fn token(email: &str) -> String {
    issue_token(email, None, SECRET, chrono::Duration::hours(1)).expect("token")
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    as_email: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(email) = as_email {
        req = req.header("authorization", format!("Bearer {}", token(email)));
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

/// Acme with assessors Ann and Bob, assessee Sam, two tools and a flow.
/// Returns the flow id.
async fn seed(t: &TestApp) -> String {
    let acme = t.repo.add_company("Acme", "hr@acme.test");
    t.repo.add_assessor(acme.id, "ann@acme.test", "Ann", "Lee");
    t.repo.add_assessor(acme.id, "bob@acme.test", "Bob", "Ray");
    t.repo.add_assessee("sam@mail.test", "Sam", "Doe");

    let (status, essay) = call(
        &t.app,
        "POST",
        "/api/tools",
        Some("hr@acme.test"),
        Some(json!({
            "name": "Essay",
            "type": "assignment",
            "expected_file_format": "pdf",
            "duration_minutes": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, quiz) = call(
        &t.app,
        "POST",
        "/api/tools",
        Some("hr@acme.test"),
        Some(json!({
            "name": "Quiz",
            "type": "interactive_quiz",
            "duration_minutes": 15,
            "questions": [{
                "type": "multiple_choice",
                "prompt": "2+2",
                "options": ["3", "4"],
                "correct_option": 1,
                "points": 1
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Given out of order on purpose.
    let (status, flow) = call(
        &t.app,
        "POST",
        "/api/test-flows",
        Some("hr@acme.test"),
        Some(json!({
            "name": "Graduate flow",
            "tools": [
                {
                    "tool_id": quiz["id"],
                    "release_time": "2022-12-02T10:00:00Z",
                    "start_working_time": "2022-12-02T10:00:00Z"
                },
                {
                    "tool_id": essay["id"],
                    "release_time": "2022-12-02T09:00:00Z",
                    "start_working_time": "2022-12-02T09:05:00Z"
                }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(flow["is_usable"], json!(true));
    assert_eq!(flow["tools"][0]["tool"]["name"], json!("Essay"));
    assert_eq!(flow["tools"][1]["tool"]["name"], json!("Quiz"));
    flow["id"].as_str().unwrap().to_string()
}

async fn create_event(t: &TestApp, flow_id: &str) -> String {
    let (status, event) = call(
        &t.app,
        "POST",
        "/api/events",
        Some("hr@acme.test"),
        Some(json!({
            "name": "Graduate day",
            "start_date": "2022-12-02T08:30:00Z",
            "test_flow_id": flow_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", event);
    event["id"].as_str().unwrap().to_string()
}

async fn register_sam(t: &TestApp, event_id: &str) -> JsonValue {
    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/events/{}/participants", event_id),
        Some("hr@acme.test"),
        Some(json!({
            "participants": [{"assessee_email": "sam@mail.test", "assessor_email": "ann@acme.test"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

#[tokio::test]
async fn health_needs_no_token() {
    let t = test_app();
    let (status, body) = call(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn api_requires_a_bearer_token() {
    let t = test_app();
    let (status, body) = call(&t.app, "GET", "/api/tools", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = call(&t.app, "GET", "/api/tools", Some("ghost@nowhere.test"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn event_round_trip_and_date_rule() {
    let t = test_app();
    let flow_id = seed(&t).await;
    let event_id = create_event(&t, &flow_id).await;

    let (status, event) = call(
        &t.app,
        "GET",
        &format!("/api/events/{}", event_id),
        Some("ann@acme.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["name"], json!("Graduate day"));
    assert_eq!(event["test_flow_id"], json!(flow_id));
    assert_eq!(event["state"], json!("scheduled"));
    assert_eq!(
        parse_iso_datetime(event["start_date"].as_str().unwrap()),
        parse_iso_datetime("2022-12-02T08:30:00Z")
    );
    assert_eq!(
        parse_iso_datetime(event["end_date"].as_str().unwrap()),
        parse_iso_datetime("2022-12-02T10:15:00Z")
    );

    t.clock.set(parse_iso_datetime("2022-12-03T00:00:00Z").unwrap());
    let (status, body) = call(
        &t.app,
        "POST",
        "/api/events",
        Some("hr@acme.test"),
        Some(json!({
            "name": "Late day",
            "start_date": "2022-12-02",
            "test_flow_id": flow_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("The assessment event must not begin on a previous date.")
    );
}

#[tokio::test]
async fn only_the_owner_changes_an_event_and_nobody_deletes_it() {
    let t = test_app();
    let flow_id = seed(&t).await;
    let event_id = create_event(&t, &flow_id).await;
    t.repo.add_company("Other", "hr@other.test");

    let uri = format!("/api/events/{}", event_id);
    let (status, _) = call(
        &t.app,
        "PATCH",
        &uri,
        Some("hr@other.test"),
        Some(json!({"name": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &t.app,
        "POST",
        &format!("{}/participants", uri),
        Some("hr@other.test"),
        Some(json!({
            "participants": [{"assessee_email": "sam@mail.test", "assessor_email": "ann@acme.test"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &t.app,
        "PATCH",
        &uri,
        Some("hr@acme.test"),
        Some(json!({"name": "Graduate day 2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("Graduate day 2"));

    let (status, body) = call(&t.app, "DELETE", &uri, Some("hr@acme.test"), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], json!("Assessment events cannot be deleted."));
}

#[tokio::test]
async fn participants_are_added_once() {
    let t = test_app();
    let flow_id = seed(&t).await;
    let event_id = create_event(&t, &flow_id).await;

    let first = register_sam(&t, &event_id).await;
    assert_eq!(first, json!({"added": 1, "skipped": 0}));
    let again = register_sam(&t, &event_id).await;
    assert_eq!(again, json!({"added": 0, "skipped": 1}));

    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/events/{}/participants", event_id),
        Some("hr@acme.test"),
        Some(json!({
            "participants": [{"assessee_email": "ghost@mail.test", "assessor_email": "ann@acme.test"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("Assessee with email ghost@mail.test does not exist")
    );

    let (status, roster) = call(
        &t.app,
        "GET",
        &format!("/api/events/{}/participants", event_id),
        Some("hr@acme.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn grading_is_for_the_paired_assessor() {
    let t = test_app();
    let flow_id = seed(&t).await;
    let event_id = create_event(&t, &flow_id).await;
    register_sam(&t, &event_id).await;
    let (_, roster) = call(
        &t.app,
        "GET",
        &format!("/api/events/{}/participants", event_id),
        Some("hr@acme.test"),
        None,
    )
    .await;
    let sam_id = roster["items"][0]["assessee_id"].as_str().unwrap().to_string();

    let (status, attempts) = call(
        &t.app,
        "GET",
        &format!("/api/events/{}/assessees/{}/attempts", event_id, sam_id),
        Some("ann@acme.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attempt_id = attempts["items"][0]["id"].as_str().unwrap().to_string();
    let grade_uri = format!("/api/events/{}/attempts/{}/grade", event_id, attempt_id);

    let (status, _) = call(
        &t.app,
        "PATCH",
        &grade_uri,
        Some("bob@acme.test"),
        Some(json!({"grade": 70})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, graded) = call(
        &t.app,
        "PATCH",
        &grade_uri,
        Some("ann@acme.test"),
        Some(json!({"grade": 70})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, noted) = call(
        &t.app,
        "PATCH",
        &grade_uri,
        Some("ann@acme.test"),
        Some(json!({"note": "Clear writing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(noted["grade"], graded["grade"]);
    assert_eq!(noted["note"], json!("Clear writing"));

    let (status, body) = call(
        &t.app,
        "PATCH",
        &grade_uri,
        Some("ann@acme.test"),
        Some(json!({"grade": "seventy"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("The grade must be a number."));
}

#[tokio::test]
async fn task_stream_opens_with_a_begin_frame() {
    let t = test_app();
    let flow_id = seed(&t).await;
    let event_id = create_event(&t, &flow_id).await;
    register_sam(&t, &event_id).await;
    let uri = format!("/api/events/{}/tasks/stream", event_id);

    // Not running yet.
    let (status, _) = call(&t.app, "GET", &uri, Some("sam@mail.test"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    t.clock.set(parse_iso_datetime("2022-12-02T09:30:00Z").unwrap());
    t.repo.add_assessee("kim@mail.test", "Kim", "Park");
    let (status, _) = call(&t.app, "GET", &uri, Some("kim@mail.test"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri(&uri)
        .header("authorization", format!("Bearer {}", token("sam@mail.test")))
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let mut frames = resp.into_body().into_data_stream();
    let first = frames.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("\"payload\":null"), "{}", text);

    let (status, released) = call(
        &t.app,
        "GET",
        &format!("/api/events/{}/tasks/released", event_id),
        Some("sam@mail.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = released["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], json!("Essay"));
}

#[tokio::test]
async fn active_projections_follow_the_clock() {
    let t = test_app();
    let flow_id = seed(&t).await;
    let event_id = create_event(&t, &flow_id).await;
    register_sam(&t, &event_id).await;

    let (_, active) = call(&t.app, "GET", "/api/assessor/events/active", Some("ann@acme.test"), None).await;
    assert!(active["items"].as_array().unwrap().is_empty());

    t.clock.set(parse_iso_datetime("2022-12-02T09:30:00Z").unwrap());
    let (status, active) =
        call(&t.app, "GET", "/api/assessor/events/active", Some("ann@acme.test"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["items"][0]["id"], json!(event_id));
    assert_eq!(active["items"][0]["state"], json!("active"));

    let (_, mine) = call(&t.app, "GET", "/api/assessee/events", Some("sam@mail.test"), None).await;
    assert_eq!(mine["items"].as_array().unwrap().len(), 1);

    let (status, pairs) = call(
        &t.app,
        "GET",
        &format!("/api/events/{}/participants", event_id),
        Some("ann@acme.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pairs["items"][0]["assessee_email"], json!("sam@mail.test"));
}
