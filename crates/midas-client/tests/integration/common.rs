//! Shared test helpers for Midas web API integration tests
//!
//! Provides wiremock-based mock server setup. Every Midas call goes to
//! `/api/json` and is told apart by its `method` query parameter.

use std::sync::Arc;

use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use midas_client::client::MidasClient;
use midas_client::MidasCommunicator;
use midas_core::domain::SessionToken;
use midas_core::ports::ICommunicator;

pub const SESSION_TOKEN: &str = "session-token-0001";

/// Wraps `data` in a successful envelope
pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "stat": "ok",
        "code": "0",
        "message": "",
        "data": data
    }))
}

/// A failed envelope with the given HTTP status and Midas code
pub fn fail(status: u16, code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "stat": "fail",
        "code": code.to_string(),
        "message": message,
        "data": null
    }))
}

/// Starts a mock server with `midas.version` mounted and returns a
/// communicator pointed at it.
///
/// Pre-configured endpoints:
/// - midas.version → 3.4.2
pub async fn setup_midas_mock() -> (MockServer, Arc<dyn ICommunicator>) {
    let server = MockServer::start().await;

    Mock::given(path("/api/json"))
        .and(query_param("method", "midas.version"))
        .respond_with(ok(serde_json::json!({ "version": "3.4.2" })))
        .mount(&server)
        .await;

    let client = MidasClient::with_base_url(server.uri());
    let communicator: Arc<dyn ICommunicator> = Arc::new(MidasCommunicator::from_client(client));

    (server, communicator)
}

/// Mounts a POST call of `midas_method` answering with `data`
pub async fn mount_call(server: &MockServer, midas_method: &str, data: Value) {
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", midas_method))
        .respond_with(ok(data))
        .mount(server)
        .await;
}

/// Mounts a POST call of `midas_method` answering with `response`
pub async fn mount_response(server: &MockServer, midas_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", midas_method))
        .respond_with(response)
        .mount(server)
        .await;
}

pub fn session_token() -> SessionToken {
    SessionToken::new(SESSION_TOKEN).unwrap()
}
