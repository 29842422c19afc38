//! Integration tests for the login flows
//!
//! Verifies that AuthenticateUseCase drives the right sequence of web API
//! calls for password, API key and one-time password logins.

use wiremock::matchers::{method, path, query_param};
use wiremock::Mock;

use midas_core::domain::{ApiKey, Credentials, DomainError, Email, Secret};
use midas_core::ports::ICommunicator;
use midas_core::usecases::AuthenticateUseCase;

use crate::common;

fn email() -> Email {
    Email::new("jane@example.org").unwrap()
}

#[tokio::test]
async fn test_server_version() {
    let (_server, communicator) = common::setup_midas_mock().await;

    let version = communicator.server_version().await.expect("version failed");

    assert_eq!(version, "3.4.2");
}

#[tokio::test]
async fn test_password_login_fetches_default_key() {
    let (server, communicator) = common::setup_midas_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.user.apikey.default"))
        .and(query_param("email", "jane@example.org"))
        .and(query_param("password", "hunter22"))
        .respond_with(common::ok(serde_json::json!({ "apikey": "default-key-1" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.login"))
        .and(query_param("apikey", "default-key-1"))
        .and(query_param("appname", "Default"))
        .respond_with(common::ok(serde_json::json!({ "token": common::SESSION_TOKEN })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::new(
        &server.uri(),
        email(),
        Secret::Password("hunter22".to_string()),
    )
    .unwrap();

    let session = AuthenticateUseCase::new(communicator)
        .login(&credentials)
        .await
        .expect("login failed");

    assert_eq!(session.token().as_str(), common::SESSION_TOKEN);
    assert_eq!(session.api_key().as_str(), "default-key-1");
    assert_eq!(session.application(), "Default");
}

#[tokio::test]
async fn test_api_key_login_uses_application() {
    let (server, communicator) = common::setup_midas_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.login"))
        .and(query_param("apikey", "pipeline-key"))
        .and(query_param("appname", "pipeline"))
        .respond_with(common::ok(serde_json::json!({ "token": common::SESSION_TOKEN })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::new(
        &server.uri(),
        email(),
        Secret::ApiKey {
            key: ApiKey::new("pipeline-key").unwrap(),
            application: "pipeline".to_string(),
        },
    )
    .unwrap();

    let session = AuthenticateUseCase::new(communicator)
        .login(&credentials)
        .await
        .expect("login failed");

    assert_eq!(session.application(), "pipeline");
}

#[tokio::test]
async fn test_mfa_login_exchanges_temporary_token() {
    let (server, communicator) = common::setup_midas_mock().await;

    common::mount_call(&server, "midas.login", serde_json::json!({ "token": "tmp42" })).await;

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.mfa.otp.login"))
        .and(query_param("token", "tmp42"))
        .and(query_param("otp", "123456"))
        .respond_with(common::ok(serde_json::json!({ "token": common::SESSION_TOKEN })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::new(
        &server.uri(),
        email(),
        Secret::default_api_key(ApiKey::new("k").unwrap()),
    )
    .unwrap()
    .with_one_time_password("123456");

    let session = AuthenticateUseCase::new(communicator)
        .login(&credentials)
        .await
        .expect("mfa login failed");

    assert_eq!(session.token().as_str(), common::SESSION_TOKEN);
}

#[tokio::test]
async fn test_mfa_without_otp_is_reported() {
    let (server, communicator) = common::setup_midas_mock().await;

    common::mount_call(&server, "midas.login", serde_json::json!({ "token": "tmp42" })).await;

    let credentials = Credentials::new(
        &server.uri(),
        email(),
        Secret::default_api_key(ApiKey::new("k").unwrap()),
    )
    .unwrap();

    let err = AuthenticateUseCase::new(communicator)
        .login(&credentials)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::OneTimePasswordRequired(_))
    ));
}
