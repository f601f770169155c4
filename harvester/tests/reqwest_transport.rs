//! Wire-level behaviour of the reqwest transport against a stub server.

use std::time::Duration;

use harvester::domain::ports::{FetchOutcome, RecordTransport};
use harvester::outbound::http::{HttpIdentity, ReqwestRecordTransport};
use reqwest::Url;
use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(timeout: Duration) -> ReqwestRecordTransport {
    ReqwestRecordTransport::with_identity(
        timeout,
        HttpIdentity {
            user_agent: "harvest-test/1.0".to_owned(),
        },
    )
    .expect("client builds")
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).expect("valid url")
}

async fn send_once(template: ResponseTemplate) -> FetchOutcome {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(template)
        .mount(&server)
        .await;
    transport(Duration::from_secs(5))
        .send(&url(&server, "/records/1"))
        .await
}

#[rstest]
#[tokio::test]
async fn sends_identity_and_accept_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/7"))
        .and(header("user-agent", "harvest-test/1.0"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matchId": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = transport(Duration::from_secs(5))
        .send(&url(&server, "/records/7"))
        .await;

    match outcome {
        FetchOutcome::Success(record) => assert_eq!(record.get("matchId"), Some(&json!(7))),
        other => panic!("expected success, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn rate_limit_carries_retry_after_seconds() {
    let outcome = send_once(ResponseTemplate::new(429).insert_header("Retry-After", "3")).await;

    assert_eq!(
        outcome,
        FetchOutcome::RateLimited {
            retry_after_seconds: 3
        }
    );
}

#[rstest]
#[case(500)]
#[case(503)]
#[tokio::test]
async fn server_errors_are_reported_with_their_status(#[case] status: u16) {
    let outcome = send_once(ResponseTemplate::new(status)).await;

    assert_eq!(outcome, FetchOutcome::ServerError { status });
}

#[rstest]
#[tokio::test]
async fn client_error_message_is_read_from_the_body() {
    let outcome = send_once(ResponseTemplate::new(404).set_body_json(json!({
        "status": { "message": "Not Found", "status_code": 404 }
    })))
    .await;

    assert_eq!(
        outcome,
        FetchOutcome::ClientError {
            status: 404,
            message: Some("Not Found".to_owned()),
        }
    );
}

#[rstest]
#[tokio::test]
async fn non_object_success_body_is_malformed() {
    let outcome = send_once(ResponseTemplate::new(200).set_body_string("[]")).await;

    assert!(
        matches!(outcome, FetchOutcome::Malformed { .. }),
        "expected malformed, got {outcome:?}"
    );
}

#[rstest]
#[tokio::test]
async fn slow_responses_time_out_as_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "late": true }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let outcome = transport(Duration::from_millis(50))
        .send(&url(&server, "/records/1"))
        .await;

    match outcome {
        FetchOutcome::Malformed { reason } => {
            assert!(reason.starts_with("request timed out"), "reason: {reason}");
        }
        other => panic!("expected malformed, got {other:?}"),
    }
}
