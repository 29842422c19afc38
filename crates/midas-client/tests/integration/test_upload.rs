//! Integration tests for uploads through the web API
//!
//! Drives the Uploader over a MidasCommunicator against the mock server and
//! checks the calls that reach the wire.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::Mock;

use midas_client::MidasError;
use midas_core::domain::FolderId;
use midas_core::usecases::{DicomExtractCallback, Uploader};

use crate::common;

/// md5("hello world")
const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

async fn mount_create_item(server: &wiremock::MockServer, name: &str, item_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.item.create"))
        .and(query_param("name", name))
        .respond_with(common::ok(serde_json::json!({
            "item_id": item_id,
            "name": name,
            "sizebytes": "0"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_file_upload_sends_bytes() {
    let (server, communicator) = common::setup_midas_mock().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, b"hello world").unwrap();

    mount_create_item(&server, "hello.txt", "7").await;

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.upload.generatetoken"))
        .and(query_param("itemid", "7"))
        .and(query_param("filename", "hello.txt"))
        .and(query_param("checksum", HELLO_MD5))
        .respond_with(common::ok(serde_json::json!({ "token": "upload-token-1" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.upload.perform"))
        .and(query_param("uploadtoken", "upload-token-1"))
        .and(query_param("revision", "head"))
        .and(query_param("length", "11"))
        .and(header("content-length", "11"))
        .and(body_bytes(b"hello world".to_vec()))
        .respond_with(common::ok(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = Uploader::new(communicator, common::session_token());
    let report = uploader
        .upload_file(&file, &FolderId::new("10").unwrap())
        .await
        .expect("upload failed");

    assert_eq!(report.items_created, 1);
    assert_eq!(report.bitstreams_uploaded, 1);
    assert_eq!(report.bytes_uploaded, 11);
}

#[tokio::test]
async fn test_empty_upload_token_links_existing_content() {
    let (server, communicator) = common::setup_midas_mock().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, b"hello world").unwrap();

    mount_create_item(&server, "hello.txt", "7").await;
    common::mount_call(
        &server,
        "midas.upload.generatetoken",
        serde_json::json!({ "token": "" }),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.upload.perform"))
        .respond_with(common::ok(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let uploader = Uploader::new(communicator, common::session_token());
    let report = uploader
        .upload_file(&file, &FolderId::new("10").unwrap())
        .await
        .expect("upload failed");

    assert_eq!(report.bitstreams_linked, 1);
    assert_eq!(report.bitstreams_uploaded, 0);
}

#[tokio::test]
async fn test_malformed_upload_token_fails_upload() {
    let (server, communicator) = common::setup_midas_mock().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, b"hello world").unwrap();

    mount_create_item(&server, "hello.txt", "7").await;
    common::mount_call(
        &server,
        "midas.upload.generatetoken",
        serde_json::json!({ "unexpected": 1 }),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.upload.perform"))
        .respond_with(common::ok(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let uploader = Uploader::new(communicator, common::session_token());
    let err = uploader
        .upload_file(&file, &FolderId::new("10").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MidasError>(),
        Some(MidasError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_directory_upload_with_dicom_callback() {
    let (server, communicator) = common::setup_midas_mock().await;
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("study");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.dcm"), b"first").unwrap();
    fs::write(root.join("b.dcm"), b"second").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.folder.create"))
        .and(query_param("name", "study"))
        .and(query_param("parentid", "10"))
        .respond_with(common::ok(serde_json::json!({
            "folder_id": 30,
            "name": "study",
            "parent_id": 10
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_create_item(&server, "a.dcm", "71").await;
    mount_create_item(&server, "b.dcm", "72").await;
    common::mount_call(
        &server,
        "midas.upload.generatetoken",
        serde_json::json!({ "token": "upload-token-1" }),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.upload.perform"))
        .respond_with(common::ok(serde_json::json!({})))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(query_param("method", "midas.dicomextractor.extract"))
        .respond_with(common::ok(serde_json::json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let mut uploader = Uploader::new(communicator, common::session_token());
    uploader.add_item_upload_callback(Arc::new(DicomExtractCallback));
    let report = uploader
        .upload(&root, &FolderId::new("10").unwrap())
        .await
        .expect("upload failed");

    assert_eq!(report.folders_created, 1);
    assert_eq!(report.items_created, 2);
    assert_eq!(report.callbacks_invoked, 2);
}

#[tokio::test]
async fn test_destination_name_resolves_user_folder() {
    let (server, communicator) = common::setup_midas_mock().await;
    common::mount_call(
        &server,
        "midas.user.folders",
        serde_json::json!([
            { "folder_id": "11", "name": "Public", "parent_id": "10" },
            { "folder_id": "12", "name": "Private", "parent_id": "10" }
        ]),
    )
    .await;

    let uploader = Uploader::new(communicator, common::session_token());

    let private = uploader.resolve_destination("Private").await.unwrap();
    assert_eq!(private.as_str(), "12");

    let fallback = uploader.resolve_destination("Missing").await.unwrap();
    assert_eq!(fallback.as_str(), "11");
}
