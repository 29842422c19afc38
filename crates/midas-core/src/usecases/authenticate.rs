//! Authentication use case
//!
//! Turns explicit [`Credentials`] into a session token. A password is first
//! exchanged for the account's default API key; the API key is then used to
//! log in, completing a one-time-password step when the server enforces MFA.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use url::Url;

use crate::{
    domain::{ApiKey, Credentials, DomainError, Email, Secret, SessionToken, DEFAULT_APPLICATION},
    ports::ICommunicator,
};

/// A logged-in session and the material needed to renew it
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    server_url: Url,
    email: Email,
    api_key: ApiKey,
    application: String,
    token: SessionToken,
}

impl AuthenticatedSession {
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    /// API key the session was opened with; persist this, not the password
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }
}

/// Use case for authentication operations
pub struct AuthenticateUseCase {
    communicator: Arc<dyn ICommunicator>,
}

impl AuthenticateUseCase {
    /// Creates a new AuthenticateUseCase over the given communicator
    pub fn new(communicator: Arc<dyn ICommunicator>) -> Self {
        Self { communicator }
    }

    /// Logs in with the given credentials
    ///
    /// This method:
    /// 1. Resolves the API key, fetching the default key when a password is given
    /// 2. Exchanges the API key for a session token
    /// 3. Completes the MFA step if the server returned a temporary token
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The password or API key is rejected
    /// - MFA is enabled and no one-time password was supplied
    ///   ([`DomainError::OneTimePasswordRequired`])
    /// - The one-time password is rejected
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthenticatedSession> {
        let email = credentials.email();

        // Step 1: Resolve the API key and its application
        let (api_key, application) = match credentials.secret() {
            Secret::Password(password) => {
                debug!(email = %email, "Fetching default API key");
                let key = self
                    .communicator
                    .get_default_api_key(email, password)
                    .await
                    .context("Failed to obtain the default API key")?;
                (key, DEFAULT_APPLICATION.to_string())
            }
            Secret::ApiKey { key, application } => (key.clone(), application.clone()),
        };

        // Step 2: Log in with the API key
        let token = self
            .communicator
            .login_with_api_key(email, &api_key, &application)
            .await
            .context("Failed to log in with API key")?;

        // Step 3: Complete MFA when the token is only a temporary one
        let token = if token.requires_otp() {
            let otp = credentials
                .one_time_password()
                .ok_or_else(|| DomainError::OneTimePasswordRequired(email.to_string()))?;
            debug!(email = %email, "Completing one-time password login");
            self.communicator
                .mfa_otp_login(&token, otp)
                .await
                .context("One-time password login failed")?
        } else {
            token
        };

        info!(email = %email, application = %application, "Logged in");

        Ok(AuthenticatedSession {
            server_url: credentials.server_url().clone(),
            email: email.clone(),
            api_key,
            application,
            token,
        })
    }

    /// Replaces the session token with a fresh one
    ///
    /// Midas session tokens expire server-side; this re-runs the API key login
    /// with the cached key. Fails with
    /// [`DomainError::OneTimePasswordRequired`] if the server now asks for MFA,
    /// since no one-time password is cached.
    pub async fn renew_token(&self, session: &mut AuthenticatedSession) -> Result<()> {
        let token = self
            .communicator
            .login_with_api_key(&session.email, &session.api_key, &session.application)
            .await
            .context("Failed to renew session token")?;

        if token.requires_otp() {
            return Err(DomainError::OneTimePasswordRequired(session.email.to_string()).into());
        }

        debug!(email = %session.email, "Session token renewed");
        session.token = token;
        Ok(())
    }
}
