//! Midas web API client
//!
//! Typed HTTP transport for the Midas JSON web API. Every call is a request to
//! `{server}/api/json?method=<name>` with its parameters in the query string;
//! the response is an envelope of the form
//! `{"stat": "ok"|"fail", "code": .., "message": .., "data": ..}`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use midas_client::client::MidasClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let url = url::Url::parse("https://midas.example.org")?;
//! let client = MidasClient::new(&url)?;
//! println!("Server version {}", client.version().await?);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::MidasError;

/// Path of the JSON web API below the server base URL
pub const API_PATH: &str = "/api/json";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Wire types
// ============================================================================

/// Response envelope shared by every web API method
#[derive(Debug, Deserialize)]
struct Envelope {
    stat: String,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ApiKeyResponse {
    apikey: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Deserializers for fields Midas sends as either strings or numbers
pub(crate) mod wire {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    impl StringOrNumber {
        fn into_string(self) -> String {
            match self {
                Self::String(s) => s,
                Self::Number(n) => n.to_string(),
            }
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(StringOrNumber::deserialize(deserializer)?.into_string())
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Ok(opt_id(deserializer)?.and_then(|s| s.parse().ok()))
    }
}

// ============================================================================
// MidasClient
// ============================================================================

/// HTTP client for Midas web API calls
///
/// Holds no session state; tokens are passed as call parameters.
#[derive(Debug, Clone)]
pub struct MidasClient {
    /// The underlying HTTP client
    client: Client,
    /// Server base URL without a trailing slash
    base_url: String,
}

impl MidasClient {
    /// Creates a client for the server at `server_url` with the default timeout
    pub fn new(server_url: &Url) -> Result<Self, MidasError> {
        Self::with_timeout(server_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout
    pub fn with_timeout(server_url: &Url, timeout: Duration) -> Result<Self, MidasError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: server_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client with a raw base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request builder for a web API method
    ///
    /// # Arguments
    /// * `http_method` - POST for plain calls, PUT for uploads, GET for downloads
    /// * `method` - Midas method name, e.g. `midas.folder.create`
    /// * `params` - Query parameters of the call
    pub fn request(&self, http_method: Method, method: &str, params: &[(&str, &str)]) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, API_PATH);
        self.client
            .request(http_method, url)
            .query(&[("method", method)])
            .query(params)
    }

    /// Calls `method` and deserializes the envelope's `data`
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MidasError> {
        debug!(method, "POST web API call");
        let response = self.request(Method::POST, method, params).send().await?;
        parse_response(method, response).await
    }

    /// Calls `method`, sending `body` as the raw request payload (PUT)
    ///
    /// `length` is sent as `Content-Length`, so a streamed body is not chunked.
    pub async fn call_with_payload<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
        body: impl Into<Body>,
        length: u64,
    ) -> Result<T, MidasError> {
        debug!(method, bytes = length, "PUT web API call");
        let response = self
            .request(Method::PUT, method, params)
            .header(CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await?;
        parse_response(method, response).await
    }

    /// Calls a method whose successful response is raw content, not an envelope
    pub(crate) async fn call_raw(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, MidasError> {
        debug!(method, "GET web API call");
        let response = self.request(Method::GET, method, params).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Err(error_from_body(method, status, &body))
    }

    // ========================================================================
    // Session calls
    // ========================================================================

    /// Version string of the server (`midas.version`)
    pub async fn version(&self) -> Result<String, MidasError> {
        let response: VersionResponse = self.call("midas.version", &[]).await?;
        Ok(response.version)
    }

    /// Default API key of an account (`midas.user.apikey.default`)
    pub async fn default_api_key(&self, email: &str, password: &str) -> Result<String, MidasError> {
        let response: ApiKeyResponse = self
            .call(
                "midas.user.apikey.default",
                &[("email", email), ("password", password)],
            )
            .await?;
        Ok(response.apikey)
    }

    /// Exchanges an API key for a session token (`midas.login`)
    pub async fn login(&self, email: &str, api_key: &str, application: &str) -> Result<String, MidasError> {
        let response: TokenResponse = self
            .call(
                "midas.login",
                &[("email", email), ("apikey", api_key), ("appname", application)],
            )
            .await?;
        debug!(email, application, "Obtained session token");
        Ok(response.token)
    }

    /// Completes an MFA login (`midas.mfa.otp.login`)
    pub async fn mfa_otp_login(&self, temp_token: &str, otp: &str) -> Result<String, MidasError> {
        let response: TokenResponse = self
            .call("midas.mfa.otp.login", &[("token", temp_token), ("otp", otp)])
            .await?;
        Ok(response.token)
    }
}

// ============================================================================
// Envelope handling
// ============================================================================

async fn parse_response<T: DeserializeOwned>(method: &str, response: Response) -> Result<T, MidasError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    parse_envelope(method, status, &body)
}

fn parse_envelope<T: DeserializeOwned>(method: &str, status: u16, body: &[u8]) -> Result<T, MidasError> {
    if !(200..400).contains(&status) {
        return Err(error_from_body(method, status, body));
    }

    let envelope: Envelope = serde_json::from_slice(body).map_err(|e| {
        MidasError::InvalidResponse(format!("{method}: response is not a JSON envelope: {e}"))
    })?;

    if envelope.stat != "ok" {
        return Err(MidasError::from_status_and_code(
            status,
            envelope.code.as_ref().and_then(parse_code),
            format!("{method}: {}", envelope.message.unwrap_or_default()),
        ));
    }

    serde_json::from_value(envelope.data)
        .map_err(|e| MidasError::InvalidResponse(format!("{method}: unexpected data: {e}")))
}

fn error_from_body(method: &str, status: u16, body: &[u8]) -> MidasError {
    match serde_json::from_slice::<Envelope>(body) {
        Ok(envelope) => MidasError::from_status_and_code(
            status,
            envelope.code.as_ref().and_then(parse_code),
            format!("{method}: {}", envelope.message.unwrap_or_default()),
        ),
        Err(_) => MidasError::from_status_and_code(
            status,
            None,
            format!("{method}: {}", String::from_utf8_lossy(body).trim()),
        ),
    }
}

/// Midas error codes arrive as numbers or numeric strings
fn parse_code(code: &Value) -> Option<i64> {
    match code {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
