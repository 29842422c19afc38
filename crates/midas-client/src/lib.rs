//! Midas Client - Midas Server web API adapter
//!
//! Provides async client for:
//! - API key and one-time-password login
//! - Folder, item, user and community calls
//! - Checksummed bitstream uploads and item downloads
//! - API key storage in the system keyring
//!
//! ## Modules
//!
//! - [`auth`] - Keyring storage of API keys
//! - [`client`] - JSON web API transport and envelope handling
//! - [`resources`] - Folder, item, user and community calls
//! - [`upload`] - Upload tokens, bitstream upload and item download
//! - [`provider`] - [`ICommunicator`](midas_core::ports::ICommunicator) implementation

pub mod auth;
pub mod client;
pub mod provider;
pub mod resources;
pub mod upload;

use thiserror::Error;

pub use client::MidasClient;
pub use provider::MidasCommunicator;

/// Errors that can occur when communicating with a Midas server
///
/// Built from the HTTP status first; a Midas error code in the response
/// envelope, when recognised, takes precedence.
#[derive(Debug, Error)]
pub enum MidasError {
    /// HTTP 400
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 401
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 403
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// HTTP 404 or 410
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 405
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Any other HTTP error status
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    /// Midas code -100
    #[error("Midas internal error: {0}")]
    InternalError(String),

    /// Midas code -101; the session token expired or was never valid
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Midas code -105
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Midas code -140
    #[error("Upload token generation failed: {0}")]
    UploadTokenGenerationFailed(String),

    /// Midas code -141
    #[error("Invalid upload token: {0}")]
    InvalidUploadToken(String),

    /// Midas code -150
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Midas code -151
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// `stat: fail` with a code not listed above
    #[error("Request failed with Midas error code {code:?}: {message}")]
    RequestFailed { code: Option<i64>, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl MidasError {
    /// Classifies a failed call from its HTTP status and Midas error code
    pub fn from_status_and_code(status: u16, code: Option<i64>, message: impl Into<String>) -> Self {
        let message = message.into();

        match code {
            Some(-100) => return Self::InternalError(message),
            Some(-101) => return Self::InvalidToken(message),
            Some(-105) => return Self::UploadFailed(message),
            Some(-140) => return Self::UploadTokenGenerationFailed(message),
            Some(-141) => return Self::InvalidUploadToken(message),
            Some(-150) => return Self::InvalidParameter(message),
            Some(-151) => return Self::InvalidPolicy(message),
            _ => {}
        }

        match status {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 | 410 => Self::NotFound(message),
            405 => Self::MethodNotAllowed(message),
            s if s >= 400 => Self::HttpError { status: s, message },
            _ => Self::RequestFailed { code, message },
        }
    }

    /// Whether logging in again could fix the failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::InvalidToken(_))
    }
}
