//! Bitstream transfer for the Midas web API
//!
//! Provides functions for moving file content:
//! - [`generate_upload_token`] - Reserves a single-use upload slot for one file
//! - [`perform_upload`] - Streams one bitstream from an open file (PUT)
//! - [`download_item`] - Streams the head revision of an item
//!
//! An upload token request carries the file's MD5 checksum. When the server
//! already stores identical content it links that bitstream into the item and
//! answers with an empty token, so no bytes need to be sent.

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Body;
use serde_json::Value;
use tracing::{debug, info};

use midas_core::ports::DownloadedItem;

use crate::client::MidasClient;
use crate::MidasError;

/// Requests an upload token (`midas.upload.generatetoken`)
///
/// # Returns
/// `None` when the server linked existing content with the same checksum
pub async fn generate_upload_token(
    client: &MidasClient,
    token: &str,
    item_id: &str,
    filename: &str,
    checksum: Option<&str>,
) -> Result<Option<String>, MidasError> {
    let mut params = vec![("token", token), ("itemid", item_id), ("filename", filename)];
    if let Some(checksum) = checksum {
        params.push(("checksum", checksum));
    }

    let data: Value = client.call("midas.upload.generatetoken", &params).await?;
    let upload_token = token_from_data(data)?;
    if upload_token.is_none() {
        debug!(item_id, filename, "Server already holds this content");
    }
    Ok(upload_token)
}

/// Uploads one bitstream into the head revision of an item (`midas.upload.perform`)
pub async fn perform_upload(
    client: &MidasClient,
    upload_token: &str,
    filename: &str,
    item_id: &str,
    file: tokio::fs::File,
    length: u64,
) -> Result<(), MidasError> {
    let declared = length.to_string();
    let _: Value = client
        .call_with_payload(
            "midas.upload.perform",
            &[
                ("uploadtoken", upload_token),
                ("filename", filename),
                ("itemid", item_id),
                ("revision", "head"),
                ("length", declared.as_str()),
            ],
            Body::from(file),
            length,
        )
        .await?;
    info!(item_id, filename, bytes = length, "Bitstream uploaded");
    Ok(())
}

/// Opens the head revision of an item for download (`midas.item.download`)
///
/// Multi-bitstream items arrive as a zip archive; the server names the file
/// in the `Content-Disposition` header. The body is handed back unread as a
/// stream of chunks.
pub async fn download_item(client: &MidasClient, token: &str, item_id: &str) -> Result<DownloadedItem, MidasError> {
    let response = client
        .call_raw("midas.item.download", &[("id", item_id), ("token", token)])
        .await?;

    let filename = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| format!("item-{item_id}"));

    debug!(item_id, filename = %filename, length = ?response.content_length(), "Item download started");
    let content = response
        .bytes_stream()
        .map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| anyhow::Error::new(MidasError::NetworkError(e)))
        })
        .boxed();
    Ok(DownloadedItem { filename, content })
}

/// The token arrives as `{"token": ".."}`; older servers send a bare string
///
/// Only an empty token means the content was linked. Anything else that is
/// not a string token is rejected.
fn token_from_data(data: Value) -> Result<Option<String>, MidasError> {
    let token = match data {
        Value::Object(mut map) => match map.remove("token") {
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(MidasError::InvalidResponse(format!(
                    "midas.upload.generatetoken: token is not a string: {other}"
                )))
            }
            None => {
                return Err(MidasError::InvalidResponse(
                    "midas.upload.generatetoken: missing token".to_string(),
                ))
            }
        },
        Value::String(s) => s,
        other => {
            return Err(MidasError::InvalidResponse(format!(
                "midas.upload.generatetoken: unexpected data: {other}"
            )))
        }
    };
    Ok(Some(token).filter(|t| !t.is_empty()))
}

/// Extracts the file name from `attachment; filename="name"`
fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
