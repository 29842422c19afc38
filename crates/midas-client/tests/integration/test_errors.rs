//! Integration tests for error classification
//!
//! Verifies that failed envelopes and HTTP statuses surface as the matching
//! MidasError variant through the ICommunicator port.

use wiremock::matchers::{path, query_param};
use wiremock::{Mock, ResponseTemplate};

use midas_client::MidasError;
use midas_core::domain::FolderId;
use midas_core::ports::ICommunicator;

use crate::common;

fn parent() -> FolderId {
    FolderId::new("10").unwrap()
}

#[tokio::test]
async fn test_invalid_token_code() {
    let (server, communicator) = common::setup_midas_mock().await;
    common::mount_response(
        &server,
        "midas.user.folders",
        common::fail(200, -101, "Invalid token"),
    )
    .await;

    let err = communicator
        .list_user_folders(&common::session_token())
        .await
        .unwrap_err();

    let midas = err.downcast_ref::<MidasError>().expect("not a MidasError");
    assert!(matches!(midas, MidasError::InvalidToken(_)));
    assert!(midas.is_auth_error());
}

#[tokio::test]
async fn test_code_wins_over_http_status() {
    let (server, communicator) = common::setup_midas_mock().await;
    common::mount_response(
        &server,
        "midas.folder.create",
        common::fail(400, -150, "Parameter parentid is not valid"),
    )
    .await;

    let err = communicator
        .create_folder(&common::session_token(), "scans", &parent())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MidasError>(),
        Some(MidasError::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn test_policy_code() {
    let (server, communicator) = common::setup_midas_mock().await;
    common::mount_response(
        &server,
        "midas.item.create",
        common::fail(200, -151, "Write permission required"),
    )
    .await;

    let err = communicator
        .create_item(&common::session_token(), "ct.dcm", &parent())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MidasError>(),
        Some(MidasError::InvalidPolicy(_))
    ));
}

#[tokio::test]
async fn test_http_status_without_envelope() {
    let (server, communicator) = common::setup_midas_mock().await;
    Mock::given(path("/api/json"))
        .and(query_param("method", "midas.folder.get"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = communicator
        .folder_get(&common::session_token(), &parent())
        .await
        .unwrap_err();

    match err.downcast_ref::<MidasError>() {
        Some(MidasError::Forbidden(message)) => assert!(message.contains("Forbidden")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_status() {
    let (server, communicator) = common::setup_midas_mock().await;
    Mock::given(path("/api/json"))
        .and(query_param("method", "midas.folder.children"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = communicator
        .folder_children(&common::session_token(), &parent())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MidasError>(),
        Some(MidasError::HttpError { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_unknown_code_is_request_failed() {
    let (server, communicator) = common::setup_midas_mock().await;
    common::mount_response(&server, "midas.item.delete", common::fail(200, -42, "Odd")).await;

    let err = communicator
        .delete_item(
            &common::session_token(),
            &midas_core::domain::ItemId::new("7").unwrap(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MidasError>(),
        Some(MidasError::RequestFailed { code: Some(-42), .. })
    ));
}

#[tokio::test]
async fn test_non_json_success_is_invalid_response() {
    let (server, communicator) = common::setup_midas_mock().await;
    Mock::given(path("/api/json"))
        .and(query_param("method", "midas.user.folders"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = communicator
        .list_user_folders(&common::session_token())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MidasError>(),
        Some(MidasError::InvalidResponse(_))
    ));
}
