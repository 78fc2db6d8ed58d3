//! Tests for the reqwest-backed transport against a mock HTTP server.

use polanji_client::transport::error_code;
use polanji_client::{
    Checks, CountingErrorSink, Gateway, HttpMethod, LoginForm, NewUser, ReqwestTransport, UserClient,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_utils::RecordingErrorSink;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_login_sends_form_and_reads_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/log_in"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "grant_type=password&username=a%40b.com&password=pw&scope=&client_id=&client_secret=",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 42}, "access_token": "tok"})),
        )
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingErrorSink::new());
    let users = UserClient::new(Gateway::new(server.uri(), transport(), sink.clone()));

    let response = users.login(&LoginForm::password_grant("a@b.com", "pw")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json_path("user.id"), Some(json!(42)));
    assert!(response.timings.duration >= response.timings.waiting);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn test_create_user_server_error_is_recorded_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("{\"detail\":\"db down\"}"))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingErrorSink::new());
    let users = UserClient::new(Gateway::new(server.uri(), transport(), sink.clone()));
    let user = NewUser {
        first_name: "Performance",
        last_name: "Test",
        email: "performancetest09+1234@gmail.com",
        password: "pw",
    };

    let response = users.create_user(&user).await.unwrap();

    assert_eq!(response.status, 500);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 500);
    assert_eq!(records[0].response_body, "{\"detail\":\"db down\"}");
    assert_eq!(records[0].url, format!("{}/users/", server.uri()));
    assert_eq!(records[0].name(), Some("createUser"));
}

#[tokio::test]
async fn test_connection_failure_surfaces_as_status_zero() {
    // Nothing listens on port 9 on the loopback interface.
    let sink = Arc::new(CountingErrorSink::new());
    let gateway = Gateway::new("http://127.0.0.1:9", transport(), sink.clone());
    let request = polanji_client::ApiRequest::new(HttpMethod::Get, "/topics", polanji_client::Operation::GetAllTopics);

    let response = gateway.send(request, &Checks::new().status("topics status is 200", 200)).await;

    assert_eq!(response.status, 0);
    assert_ne!(response.error_code, error_code::NONE);
    assert!(response.error.is_some());
    assert_eq!(sink.count(), 1);
}
