//! CLI subcommands and the session setup they share

pub mod auth;
pub mod completions;
pub mod config;
pub mod download;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dialoguer::Input;
use midas_client::auth::{KeyringApiKeyStorage, StoredApiKey};
use midas_client::MidasCommunicator;
use midas_core::config::Config;
use midas_core::domain::credentials::parse_server_url;
use midas_core::domain::{ApiKey, Credentials, DomainError, Email, Secret};
use midas_core::ports::ICommunicator;
use midas_core::usecases::{AuthenticateUseCase, AuthenticatedSession};
use tracing::debug;
use url::Url;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// State every command starts from
pub struct CliContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl CliContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    pub fn server_url(&self) -> Result<Url> {
        parse_server_url(&self.config.server.url)
            .with_context(|| format!("Invalid server.url in {}", self.config_path.display()))
    }

    pub fn email(&self) -> Result<Email> {
        let email = self
            .config
            .account
            .email
            .as_deref()
            .context("No account configured. Run 'midas login' first.")?;
        Email::new(email).context("Invalid account.email in configuration")
    }

    /// Communicator for `server_url` with the configured timeout
    pub fn communicator(&self, server_url: &Url) -> Result<Arc<dyn ICommunicator>> {
        let timeout = Duration::from_secs(self.config.server.timeout_secs);
        let communicator = MidasCommunicator::new(server_url, timeout)
            .context("Failed to build HTTP client")?;
        Ok(Arc::new(communicator))
    }

    /// Logs in with the stored API key
    ///
    /// When the account has MFA enabled and `interactive` is set, prompts
    /// for the one-time password.
    pub async fn open_session(
        &self,
        interactive: bool,
    ) -> Result<(Arc<dyn ICommunicator>, AuthenticatedSession)> {
        let server_url = self.server_url()?;
        let email = self.email()?;
        let stored = KeyringApiKeyStorage::load(&email, &server_url)?;
        let secret = stored_secret(stored, &self.config)?;

        let communicator = self.communicator(&server_url)?;
        let use_case = AuthenticateUseCase::new(communicator.clone());
        let credentials = Credentials::new(server_url.as_str(), email, secret)?;

        let attempt = use_case.login(&credentials).await;
        let session = match attempt {
            Ok(session) => session,
            Err(e) if interactive && is_otp_required(&e) => {
                debug!("Server requested a one-time password");
                let otp: String = Input::new()
                    .with_prompt("One-time password")
                    .interact_text()?;
                use_case
                    .login(&credentials.with_one_time_password(otp))
                    .await?
            }
            Err(e) => return Err(e),
        };
        Ok((communicator, session))
    }
}

/// The keyring entry wins over a plain-text key in the configuration
fn stored_secret(stored: Option<StoredApiKey>, config: &Config) -> Result<Secret> {
    if let Some(stored) = stored {
        return stored.into_secret();
    }
    match &config.account.api_key {
        Some(key) => Ok(Secret::ApiKey {
            key: ApiKey::new(key.clone()).context("Invalid account.api_key in configuration")?,
            application: config.server.application.clone(),
        }),
        None => bail!("No API key stored. Run 'midas login' first."),
    }
}

pub(crate) fn is_otp_required(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<DomainError>(),
        Some(DomainError::OneTimePasswordRequired(_))
    )
}
