//! Integration tests for vigil-server API endpoints
//!
//! Each test builds the full router over a fresh in-memory SQLite pool and
//! drives it with `oneshot` requests, covering registration and login for
//! both roles, token namespacing, caregiver linkage, roster gating, session
//! recording, disease-flag updates, questionnaires, and reports.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method
use vigil_server::{build_router, db, AppState};

/// Test helper: build the app over a fresh in-memory database
async fn setup_app() -> Router {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Should create in-memory database");
    build_router(AppState::new(pool, "test-secret"))
}

/// Test helper: create a request with optional bearer token and JSON body
fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: register an elder, returning (token, guid)
async fn register_elder(app: &Router, email: &str, caregiver_email: Option<&str>) -> (String, String) {
    let mut body = json!({
        "name": "Test Elder",
        "email": email,
        "password": "hunter22",
        "age": 74,
        "gender": "Female",
    });
    if let Some(ce) = caregiver_email {
        body["caregiverEmail"] = json!(ce);
    }
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/register", None, Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    (
        body["token"].as_str().unwrap().to_string(),
        body["elder"]["guid"].as_str().unwrap().to_string(),
    )
}

/// Test helper: register a caregiver, returning (token, elders_linked)
async fn register_caregiver(app: &Router, email: &str) -> (String, u64) {
    let body = json!({
        "name": "Test Caregiver",
        "email": email,
        "password": "hunter22",
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/caregiver/register", None, Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    (
        body["token"].as_str().unwrap().to_string(),
        body["eldersLinked"].as_u64().unwrap(),
    )
}

/// Test helper: record a session for the given elder token
async fn record_session(app: &Router, token: &str, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(request("POST", "/api/session/record", Some(token), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_no_auth_required() {
    let app = setup_app().await;
    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "vigil-server");
}

// =============================================================================
// Elder accounts
// =============================================================================

#[tokio::test]
async fn elder_registration_and_me() {
    let app = setup_app().await;
    let (token, guid) = register_elder(&app, "Alma@Example.com", None).await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/elder/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["guid"], guid.as_str());
    // Emails are normalized to lowercase
    assert_eq!(body["email"], "alma@example.com");
    assert_eq!(body["d1"], false);
    assert!(body.get("caregiver").is_none());
}

#[tokio::test]
async fn elder_registration_rejects_duplicates_and_bad_input() {
    let app = setup_app().await;
    register_elder(&app, "alma@example.com", None).await;

    // Same email, different case
    let dup = json!({
        "name": "Other", "email": "ALMA@example.com", "password": "hunter22",
        "age": 70, "gender": "Male",
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/register", None, Some(dup)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bad_gender = json!({
        "name": "Other", "email": "b@example.com", "password": "hunter22",
        "age": 70, "gender": "robot",
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/register", None, Some(bad_gender)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn elder_login_is_generic_about_failures() {
    let app = setup_app().await;
    register_elder(&app, "alma@example.com", None).await;

    let wrong_password = json!({"email": "alma@example.com", "password": "nope-nope"});
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/login", None, Some(wrong_password)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let wrong_pw_body = extract_json(response.into_body()).await;

    let unknown_email = json!({"email": "nobody@example.com", "password": "hunter22"});
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/login", None, Some(unknown_email)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = extract_json(response.into_body()).await;

    // Same message either way
    assert_eq!(wrong_pw_body["error"], unknown_body["error"]);

    let good = json!({"email": "alma@example.com", "password": "hunter22"});
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/login", None, Some(good)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn disease_status_partial_update() {
    let app = setup_app().await;
    let (token, _) = register_elder(&app, "alma@example.com", None).await;

    // Seed d1 via a first update
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/elder/disease-status",
            Some(&token),
            Some(json!({"d1": true})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A d2-only update must leave d1 untouched
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/elder/disease-status",
            Some(&token),
            Some(json!({"d2": true})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["d1"], true);
    assert_eq!(body["d2"], true);
    assert_eq!(body["d3"], false);

    // Empty update is a validation error
    let response = app
        .clone()
        .oneshot(request("PUT", "/api/elder/disease-status", Some(&token), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Token namespaces
// =============================================================================

#[tokio::test]
async fn elder_token_is_rejected_on_caregiver_endpoints_and_vice_versa() {
    let app = setup_app().await;
    let (elder_token, _) = register_elder(&app, "alma@example.com", None).await;
    let (caregiver_token, _) = register_caregiver(&app, "cg@example.com").await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/caregiver/elders", Some(&elder_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/elder/me", Some(&caregiver_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // And no token at all
    let response = app
        .clone()
        .oneshot(request("GET", "/api/elder/me", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Caregiver linkage
// =============================================================================

#[tokio::test]
async fn caregiver_registration_links_all_pending_elders() {
    let app = setup_app().await;
    let (_, elder_a) = register_elder(&app, "a@example.com", Some("cg@example.com")).await;
    let (_, elder_b) = register_elder(&app, "b@example.com", Some("CG@example.com")).await;
    register_elder(&app, "c@example.com", Some("other@example.com")).await;

    let (token, linked) = register_caregiver(&app, "cg@example.com").await;
    assert_eq!(linked, 2);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/caregiver/elders", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let roster = body.as_array().unwrap();
    assert_eq!(roster.len(), 2);
    let guids: Vec<&str> = roster.iter().map(|e| e["guid"].as_str().unwrap()).collect();
    assert!(guids.contains(&elder_a.as_str()));
    assert!(guids.contains(&elder_b.as_str()));
}

#[tokio::test]
async fn elder_registering_after_caregiver_links_immediately() {
    let app = setup_app().await;
    register_caregiver(&app, "cg@example.com").await;

    let body = json!({
        "name": "Late Elder", "email": "late@example.com", "password": "hunter22",
        "age": 80, "gender": "Male", "caregiverEmail": "cg@example.com",
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/elder/register", None, Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["caregiverLinked"], true);
    assert_eq!(body["elder"]["caregiver"]["email"], "cg@example.com");
}

#[tokio::test]
async fn roster_gating_is_indistinguishable_from_missing_elder() {
    let app = setup_app().await;
    let (_, elder_b) = register_elder(&app, "b@example.com", Some("owner@example.com")).await;
    register_caregiver(&app, "owner@example.com").await;
    let (intruder_token, _) = register_caregiver(&app, "intruder@example.com").await;

    // Elder owned by another caregiver
    let uri = format!("/api/caregiver/elders/{elder_b}/sessions");
    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some(&intruder_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let foreign = extract_json(response.into_body()).await;

    // Elder that does not exist at all
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/caregiver/elders/no-such-guid/sessions",
            Some(&intruder_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let missing = extract_json(response.into_body()).await;

    assert_eq!(foreign["error"], missing["error"]);
}

// =============================================================================
// Sessions
// =============================================================================

fn tap_detection_body(result: &str) -> Value {
    json!({
        "diseaseType": "parkinson",
        "mode": "detection",
        "result": result,
        "metrics": {"parkinson": {"tapsPerSecond": 2.0, "correctTaps": 30, "time": 15.0}},
    })
}

#[tokio::test]
async fn session_recording_requires_elder_token() {
    let app = setup_app().await;
    let response = app
        .clone()
        .oneshot(request("POST", "/api/session/record", None, Some(tap_detection_body("Yellow"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recorded_sessions_come_back_newest_first() {
    let app = setup_app().await;
    let (token, guid) = register_elder(&app, "alma@example.com", None).await;

    let first = record_session(&app, &token, tap_detection_body("Yellow")).await;
    assert_eq!(first["elder_guid"], guid.as_str());
    record_session(
        &app,
        &token,
        json!({
            "diseaseType": "parkinson",
            "mode": "therapy",
            "result": "completed",
            "metrics": {"parkinson": {"correctTaps": 15, "time": 6.2}},
        }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/session/mine", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["result"], "completed");
    assert_eq!(sessions[1]["result"], "Yellow");
    assert_eq!(sessions[1]["metrics"]["parkinson"]["correctTaps"], 30);
}

#[tokio::test]
async fn caregiver_reads_roster_elder_sessions() {
    let app = setup_app().await;
    let (elder_token, elder_guid) =
        register_elder(&app, "a@example.com", Some("cg@example.com")).await;
    let (caregiver_token, _) = register_caregiver(&app, "cg@example.com").await;

    record_session(&app, &elder_token, tap_detection_body("Red")).await;

    let uri = format!("/api/caregiver/elders/{elder_guid}/sessions");
    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some(&caregiver_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["result"], "Red");
}

#[tokio::test]
async fn session_rejects_unknown_disease() {
    let app = setup_app().await;
    let (token, _) = register_elder(&app, "alma@example.com", None).await;

    let body = json!({
        "diseaseType": "cardiac",
        "mode": "detection",
        "result": "Green",
        "metrics": {},
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/session/record", Some(&token), Some(body)))
        .await
        .unwrap();
    // Serde rejects the enum before the handler runs
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Questionnaires
// =============================================================================

#[tokio::test]
async fn questionnaire_derives_bmi_and_trust_level() {
    let app = setup_app().await;
    let (token, guid) = register_elder(&app, "alma@example.com", None).await;

    let body = json!({"height": 170.0, "weight": 70.0, "breathsPerMin": 16.0});
    let response = app
        .clone()
        .oneshot(request("POST", "/api/questionnaire", Some(&token), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["bmi"], 24.2);
    assert_eq!(body["bmi_status"], "Normal");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["stress_level"], 3);

    // Tokenless fallback with explicit elderId is stored lower-trust
    let fallback = json!({
        "elderId": guid, "height": 160.0, "weight": 40.0, "breathsPerMin": 14.0,
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/api/questionnaire", None, Some(fallback)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["bmi_status"], "Underweight");

    // Neither token nor elderId
    let anonymous = json!({"height": 170.0, "weight": 70.0, "breathsPerMin": 16.0});
    let response = app
        .clone()
        .oneshot(request("POST", "/api/questionnaire", None, Some(anonymous)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn questionnaire_history_is_roster_gated() {
    let app = setup_app().await;
    let (elder_token, elder_guid) =
        register_elder(&app, "a@example.com", Some("cg@example.com")).await;
    let (caregiver_token, _) = register_caregiver(&app, "cg@example.com").await;
    let (outsider_token, _) = register_caregiver(&app, "outsider@example.com").await;

    let body = json!({"height": 170.0, "weight": 70.0, "breathsPerMin": 16.0});
    app.clone()
        .oneshot(request("POST", "/api/questionnaire", Some(&elder_token), Some(body)))
        .await
        .unwrap();

    let uri = format!("/api/questionnaire/elder/{elder_guid}");
    for token in [&elder_token, &caregiver_token] {
        let response = app
            .clone()
            .oneshot(request("GET", &uri, Some(token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some(&outsider_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn report_counts_and_therapy_trend() {
    let app = setup_app().await;
    let (token, _) = register_elder(&app, "alma@example.com", None).await;

    record_session(&app, &token, tap_detection_body("Yellow")).await;
    for i in 0..6 {
        record_session(
            &app,
            &token,
            json!({
                "diseaseType": "vision",
                "mode": "therapy",
                "result": "completed",
                "metrics": {"vision": {"correctAnswers": 9, "attempts": 12, "finalThreshold": 20 - i}},
            }),
        )
        .await;
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/api/report/mine", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["parkinson"]["detectionCount"], 1);
    assert_eq!(body["parkinson"]["therapyCount"], 0);
    assert_eq!(body["vision"]["therapyCount"], 6);

    // Last five therapy sessions, oldest first, tracking the threshold
    let trend = body["vision"]["therapyTrend"].as_array().unwrap();
    assert_eq!(trend.len(), 5);
    let values: Vec<f64> = trend.iter().map(|p| p["value"].as_f64().unwrap()).collect();
    assert_eq!(values, vec![19.0, 18.0, 17.0, 16.0, 15.0]);
    assert_eq!(trend[0]["unit"], "threshold");
}

#[tokio::test]
async fn caregiver_report_is_roster_gated() {
    let app = setup_app().await;
    let (_, elder_guid) = register_elder(&app, "a@example.com", Some("cg@example.com")).await;
    let (caregiver_token, _) = register_caregiver(&app, "cg@example.com").await;
    let (outsider_token, _) = register_caregiver(&app, "outsider@example.com").await;

    let uri = format!("/api/report/elder/{elder_guid}");
    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some(&caregiver_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", &uri, Some(&outsider_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
