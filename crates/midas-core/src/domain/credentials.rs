//! Login credentials
//!
//! Explicit credentials value passed to the authentication use case, in place
//! of prompting on the console from library code.

use url::Url;

use super::errors::DomainError;
use super::newtypes::{ApiKey, Email};

/// Application name Midas assigns to the API key created with every account
pub const DEFAULT_APPLICATION: &str = "Default";

/// The secret used to obtain a session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secret {
    /// Account password; exchanged for the default API key first
    Password(String),
    /// An API key registered for the named application
    ApiKey {
        /// The key itself
        key: ApiKey,
        /// Application the key was issued for
        application: String,
    },
}

impl Secret {
    /// Builds an API key secret for the default application
    pub fn default_api_key(key: ApiKey) -> Self {
        Self::ApiKey {
            key,
            application: DEFAULT_APPLICATION.to_string(),
        }
    }
}

/// Everything needed to open a session against one Midas server
#[derive(Debug, Clone)]
pub struct Credentials {
    server_url: Url,
    email: Email,
    secret: Secret,
    one_time_password: Option<String>,
}

impl Credentials {
    /// Creates credentials for `server_url`
    ///
    /// A trailing slash on the URL is dropped so API paths can be appended.
    ///
    /// # Errors
    /// Returns error if the URL is not an absolute http(s) URL
    pub fn new(server_url: &str, email: Email, secret: Secret) -> Result<Self, DomainError> {
        Ok(Self {
            server_url: parse_server_url(server_url)?,
            email,
            secret,
            one_time_password: None,
        })
    }

    /// Supplies the one-time password used when the server enforces MFA
    pub fn with_one_time_password(mut self, otp: impl Into<String>) -> Self {
        self.one_time_password = Some(otp.into());
        self
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn one_time_password(&self) -> Option<&str> {
        self.one_time_password.as_deref()
    }
}

/// Parses and normalises a server base URL
///
/// # Errors
/// Returns [`DomainError::InvalidServerUrl`] for relative or non-http(s) URLs
pub fn parse_server_url(raw: &str) -> Result<Url, DomainError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| DomainError::InvalidServerUrl(format!("{raw}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DomainError::InvalidServerUrl(format!(
            "unsupported scheme '{other}' in {raw}"
        ))),
    }
}
