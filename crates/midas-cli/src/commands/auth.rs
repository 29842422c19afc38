//! Account commands: login, logout and status
//!
//! Only the API key is kept between runs, in the system keyring. `login`
//! trades the account password for the default API key (or takes an API key
//! for a named application), proves it by opening a session and records the
//! server and email in the configuration file.

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::{Input, Password};
use midas_client::auth::{KeyringApiKeyStorage, StoredApiKey};
use midas_core::domain::credentials::parse_server_url;
use midas_core::domain::{ApiKey, Credentials, Email, Secret, DEFAULT_APPLICATION};
use midas_core::ports::ICommunicator;
use midas_core::usecases::AuthenticateUseCase;
use tracing::info;

use super::{is_otp_required, CliContext};

/// Environment variable read instead of prompting for the password
const PASSWORD_ENV: &str = "MIDAS_PASSWORD";
/// Environment variable read instead of prompting for an application API key
const API_KEY_ENV: &str = "MIDAS_API_KEY";

#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Server URL (defaults to server.url from the configuration)
    #[arg(long)]
    pub url: Option<String>,
    /// Account email
    #[arg(long)]
    pub email: Option<String>,
    /// Log in with an API key registered for this application instead of a password
    #[arg(long)]
    pub application: Option<String>,
    /// One-time password for accounts with MFA enabled
    #[arg(long)]
    pub otp: Option<String>,
}

impl LoginCommand {
    pub async fn execute(&self, mut ctx: CliContext) -> Result<()> {
        let fmt = ctx.formatter();

        let raw_url = self.url.as_deref().unwrap_or(&ctx.config.server.url);
        let server_url = parse_server_url(raw_url).context("Invalid server URL")?;

        let email = match self.email.as_deref().or(ctx.config.account.email.as_deref()) {
            Some(email) => email.to_string(),
            None => Input::new().with_prompt("Email").interact_text()?,
        };
        let email = Email::new(email).context("Invalid email")?;

        let secret = match self.application.as_deref() {
            Some(application) if application != DEFAULT_APPLICATION => {
                let key = match std::env::var(API_KEY_ENV) {
                    Ok(key) => key,
                    Err(_) => Password::new()
                        .with_prompt(format!("API key for {application}"))
                        .interact()?,
                };
                Secret::ApiKey {
                    key: ApiKey::new(key).context("Invalid API key")?,
                    application: application.to_string(),
                }
            }
            _ => {
                let password = match std::env::var(PASSWORD_ENV) {
                    Ok(password) => password,
                    Err(_) => Password::new().with_prompt("Password").interact()?,
                };
                Secret::Password(password)
            }
        };

        let mut credentials = Credentials::new(server_url.as_str(), email.clone(), secret)?;
        if let Some(otp) = &self.otp {
            credentials = credentials.with_one_time_password(otp.clone());
        }

        info!(server = %server_url, email = %email, "Logging in");
        let communicator = ctx.communicator(&server_url)?;
        let use_case = AuthenticateUseCase::new(communicator);
        let attempt = use_case.login(&credentials).await;
        let session = match attempt {
            Ok(session) => session,
            Err(e) if is_otp_required(&e) => {
                let otp: String = Input::new()
                    .with_prompt("One-time password")
                    .interact_text()?;
                use_case
                    .login(&credentials.with_one_time_password(otp))
                    .await?
            }
            Err(e) => return Err(e.context("Login failed")),
        };

        KeyringApiKeyStorage::store(
            &email,
            &server_url,
            &StoredApiKey::new(session.api_key(), session.application()),
        )?;

        ctx.config.server.url = server_url.as_str().trim_end_matches('/').to_string();
        ctx.config.server.application = session.application().to_string();
        ctx.config.account.email = Some(email.to_string());
        ctx.config.save(&ctx.config_path)?;

        if ctx.format.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "server": ctx.config.server.url,
                "email": email.as_str(),
                "application": session.application(),
            }));
        } else {
            fmt.success(&format!("Logged in as {email}"));
            fmt.field("Server", &ctx.config.server.url);
            fmt.field("Application", session.application());
            fmt.info("API key stored in the system keyring");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LogoutCommand;

impl LogoutCommand {
    pub async fn execute(&self, ctx: CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let server_url = ctx.server_url()?;
        let email = ctx.email()?;

        KeyringApiKeyStorage::clear(&email, &server_url)?;

        if ctx.format.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "email": email.as_str(),
                "server": server_url.as_str(),
            }));
        } else {
            fmt.success(&format!("Removed stored API key for {email}"));
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct StatusCommand;

impl StatusCommand {
    pub async fn execute(&self, ctx: CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let server_url = ctx.server_url()?;

        let version = ctx
            .communicator(&server_url)?
            .server_version()
            .await
            .with_context(|| format!("Server {server_url} is unreachable"))?;

        let email = ctx.config.account.email.clone();
        let login = match email {
            Some(_) => Some(ctx.open_session(false).await),
            None => None,
        };
        let login_error = match &login {
            Some(Err(e)) => Some(format!("{e:#}")),
            _ => None,
        };
        let logged_in = matches!(login, Some(Ok(_)));

        if ctx.format.is_json() {
            fmt.print_json(&serde_json::json!({
                "server": server_url.as_str(),
                "version": version,
                "email": ctx.config.account.email,
                "logged_in": logged_in,
                "error": login_error,
            }));
            return Ok(());
        }

        fmt.field("Server", server_url.as_str());
        fmt.field("Version", &version);
        match &ctx.config.account.email {
            Some(email) => fmt.field("Account", email),
            None => fmt.field("Account", "(none)"),
        }
        if logged_in {
            fmt.success("Stored credentials are valid");
        } else if let Some(error) = login_error {
            fmt.error(&error);
        } else {
            fmt.warn("Not logged in. Run 'midas login'.");
        }
        Ok(())
    }
}
