use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::test_support::{build_api, bearer_token, read_json, send_json, ApiFixture};

async fn create_attempt(api: &ApiFixture, token: &str, mode: &str) -> String {
    let response = send_json(
        &api.app,
        Method::POST,
        "/api/v1/attempts",
        Some(token),
        Some(json!({"mode": mode})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    body["id"].as_str().expect("attempt id").to_string()
}

#[tokio::test]
async fn create_returns_a_fresh_attempt() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");

    let response = send_json(
        &api.app,
        Method::POST,
        "/api/v1/attempts",
        Some(&token),
        Some(json!({"mode": "mock"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["mode"], "mock");
    assert_eq!(body["time_spent_seconds"], 0);
    assert_eq!(body["sections"].as_array().expect("sections").len(), 5);
    assert!(body["current_section"].is_null());
}

#[tokio::test]
async fn unknown_mode_is_rejected() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");

    let response = send_json(
        &api.app,
        Method::POST,
        "/api/v1/attempts",
        Some(&token),
        Some(json!({"mode": "speedrun"})),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn mock_section_flow_over_http() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    let id = create_attempt(&api, &token, "mock").await;

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/sections/reading/select"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["current_section"], "reading");
    let reading = &body["sections"][0];
    assert_eq!(reading["id"], "reading");
    assert_eq!(reading["remaining_seconds"], 5400);
    assert!(reading["content"]["parts"].as_array().expect("parts").len() > 0);

    let response = send_json(
        &api.app,
        Method::PUT,
        &format!("/api/v1/attempts/{id}/sections/reading/answers"),
        Some(&token),
        Some(json!({"question_id": "reading-p0-q0", "value": "b"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/sections/reading/submit"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = read_json(response).await;
    assert_eq!(result["max_points"], 75.0);
    assert_eq!(result["per_question"]["reading-p0-q0"]["correct"], true);

    // Edits after submission are refused.
    let response = send_json(
        &api.app,
        Method::PUT,
        &format!("/api/v1/attempts/{id}/sections/reading/answers"),
        Some(&token),
        Some(json!({"question_id": "reading-p0-q1", "value": "a"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send_json(
        &api.app,
        Method::GET,
        &format!("/api/v1/attempts/{id}"),
        Some(&token),
        None,
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["sections"][0]["submitted"], true);
    assert!(body["sections"][0]["result"]["grade"].is_string());

    // Submission is a milestone save; the store already has the result.
    let stored = api.fixture.store.stored(&id).expect("persisted");
    assert!(stored.results.contains_key(&crate::db::types::SectionId::Reading));
}

#[tokio::test]
async fn free_text_flow_for_writing() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    let id = create_attempt(&api, &token, "mock").await;

    send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/sections/writing/select"),
        Some(&token),
        None,
    )
    .await;

    let response = send_json(
        &api.app,
        Method::PUT,
        &format!("/api/v1/attempts/{id}/sections/writing/parts/0/text"),
        Some(&token),
        Some(json!({"text": "Sehr geehrte Damen und Herren, ich schreibe Ihnen, weil ..."})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let writing = &body["sections"][3];
    assert_eq!(writing["id"], "writing");
    assert!(writing["free_texts"]["0"].as_str().expect("text").starts_with("Sehr geehrte"));

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/sections/writing/submit"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = read_json(response).await;
    assert_eq!(result["earned_points"], 30.0);
    assert!(result["feedback"].is_string());
}

#[tokio::test]
async fn attempts_of_other_users_stay_hidden() {
    let api = build_api();
    let owner = bearer_token(&api.state, "user-1");
    let intruder = bearer_token(&api.state, "user-2");
    let id = create_attempt(&api, &owner, "mock").await;

    let response = send_json(
        &api.app,
        Method::GET,
        &format!("/api/v1/attempts/{id}"),
        Some(&intruder),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completion_without_scores_is_a_bad_request() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    let id = create_attempt(&api, &token, "mock").await;

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/complete"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["detail"].as_str().expect("detail").contains("reading"));
}

#[tokio::test]
async fn pause_and_resume_round_trip() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    let id = create_attempt(&api, &token, "mock").await;

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/pause"),
        Some(&token),
        None,
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["is_paused"], true);

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/resume"),
        Some(&token),
        None,
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["is_paused"], false);
}

#[tokio::test]
async fn empty_answers_are_rejected_by_validation() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    let id = create_attempt(&api, &token, "mock").await;

    send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/sections/reading/select"),
        Some(&token),
        None,
    )
    .await;

    let response = send_json(
        &api.app,
        Method::PUT,
        &format!("/api/v1/attempts/{id}/sections/reading/answers"),
        Some(&token),
        Some(json!({"question_id": "reading-p0-q0", "value": ""})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_sections_are_rejected_in_the_path() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    let id = create_attempt(&api, &token, "mock").await;

    let response = send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{id}/sections/grammar/select"),
        Some(&token),
        None,
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn a_second_live_attempt_is_a_conflict() {
    let api = build_api();
    let token = bearer_token(&api.state, "user-1");
    create_attempt(&api, &token, "mock").await;

    let response = send_json(
        &api.app,
        Method::POST,
        "/api/v1/attempts",
        Some(&token),
        Some(json!({"mode": "practice"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn history_is_scoped_per_user() {
    let api = build_api();
    let first = bearer_token(&api.state, "user-1");
    let second = bearer_token(&api.state, "user-2");
    let abandoned = create_attempt(&api, &first, "practice").await;
    send_json(
        &api.app,
        Method::POST,
        &format!("/api/v1/attempts/{abandoned}/abandon"),
        Some(&first),
        None,
    )
    .await;
    create_attempt(&api, &first, "mock").await;
    create_attempt(&api, &second, "mock").await;

    let response = send_json(&api.app, Method::GET, "/api/v1/attempts", Some(&first), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body.as_array().expect("history").len(), 2);
}
