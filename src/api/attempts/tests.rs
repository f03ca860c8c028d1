use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::{GradingMode, QuestionKind};
use crate::test_support::{self, ApiHarness};

fn setup() -> (ApiHarness, String) {
    let harness = test_support::api_harness();
    harness.engine.add_student("student-1");
    harness.engine.add_paper(
        "paper-1",
        GradingMode::TimeBound,
        Some(45),
        &[QuestionKind::MultipleChoice, QuestionKind::MultipleChoice],
    );
    let token = test_support::bearer_token("student-1", &harness.settings);
    (harness, token)
}

async fn start(harness: &ApiHarness, token: &str) -> String {
    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/papers/paper-1/attempts",
            Some(token),
            Some(json!({"showAnswerAfterWrong": true})),
        ))
        .await
        .expect("start attempt");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = test_support::read_json(response).await;
    assert_eq!(body["attempt"]["show_answer_after_wrong"], true);
    body["attempt"]["id"].as_str().expect("attempt id").to_string()
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let (harness, _token) = setup();

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/papers/paper-1/attempts",
            None,
            Some(json!({})),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/me/standing",
            Some("not-a-jwt"),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_takes_exam_end_to_end() {
    let (harness, token) = setup();
    let attempt_id = start(&harness, &token).await;

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/papers/paper-1/attempts",
            Some(&token),
            Some(json!({})),
        ))
        .await
        .expect("resume");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["resumed"], true);
    assert_eq!(body["attempt"]["id"], attempt_id.as_str());

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{attempt_id}/questions/0"),
            Some(&token),
            None,
        ))
        .await
        .expect("question");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["question"]["id"], "paper-1-q0");
    assert!(body["question"].get("correct_option").is_none());

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{attempt_id}/answers/paper-1-q0"),
            Some(&token),
            Some(json!({"selectedOption": 2})),
        ))
        .await
        .expect("save");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["answer"]["is_correct"], false);
    assert_eq!(body["revealed_key"]["correct_option"], 0);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{attempt_id}/answers/paper-1-q1"),
            Some(&token),
            Some(json!({"selected_option": 0})),
        ))
        .await
        .expect("save");
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{attempt_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("exam data");
    let body = test_support::read_json(response).await;
    assert_eq!(body["answered"], 2);
    assert!(body["time_remaining_seconds"].as_i64().expect("remaining") > 0);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            Some(&token),
            None,
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["attempt"]["status"], "submitted");
    assert_eq!(body["attempt"]["total_score"], 1.0);
    assert_eq!(body["correct"], 1);
    assert_eq!(body["incorrect"], 1);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{attempt_id}/result"),
            Some(&token),
            None,
        ))
        .await
        .expect("result");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["questions"][0]["status"], "incorrect");
    assert_eq!(body["questions"][1]["status"], "correct");

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/me/standing",
            Some(&token),
            None,
        ))
        .await
        .expect("standing");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["rank"], 1);
    assert_eq!(body["percentile"], 100);
    assert_eq!(body["totalStudents"], 1);
}

#[tokio::test]
async fn too_hard_flag_must_be_boolean() {
    let (harness, token) = setup();
    let attempt_id = start(&harness, &token).await;
    let uri = format!("/api/v1/attempts/{attempt_id}/answers/paper-1-q1/too-hard");

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({"isTooHard": "yes"})),
        ))
        .await
        .expect("too hard");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({"isTooHard": true})),
        ))
        .await
        .expect("too hard");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["marked_too_hard"], true);
}

#[tokio::test]
async fn review_before_answer_is_not_found() {
    let (harness, token) = setup();
    let attempt_id = start(&harness, &token).await;

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/answers/paper-1-q0/review"),
            Some(&token),
            None,
        ))
        .await
        .expect("review");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn navigation_and_index_errors_are_bad_requests() {
    let (harness, token) = setup();
    let attempt_id = start(&harness, &token).await;

    for uri in [
        format!("/api/v1/attempts/{attempt_id}/previous"),
        format!("/api/v1/attempts/{attempt_id}/questions/5"),
        format!("/api/v1/attempts/{attempt_id}/result"),
    ] {
        let response = harness
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, &uri, Some(&token), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{attempt_id}/next"),
            Some(&token),
            None,
        ))
        .await
        .expect("next");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["position"], 2);
}

#[tokio::test]
async fn negative_option_fails_validation() {
    let (harness, token) = setup();
    let attempt_id = start(&harness, &token).await;

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/attempts/{attempt_id}/answers/paper-1-q0"),
            Some(&token),
            Some(json!({"selectedOption": -1})),
        ))
        .await
        .expect("save");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_students_attempt_is_hidden() {
    let (harness, token) = setup();
    let attempt_id = start(&harness, &token).await;
    harness.engine.add_student("student-2");
    let intruder = test_support::bearer_token("student-2", &harness.settings);

    let response = harness
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            Some(&intruder),
            None,
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
