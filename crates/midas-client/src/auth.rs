//! API key persistence
//!
//! ## Components
//!
//! - [`StoredApiKey`] - API key plus the application it was issued for
//! - [`KeyringApiKeyStorage`] - Secure storage using the system keyring
//!
//! Only the API key is ever persisted. Passwords are exchanged for the
//! default key at login and then dropped; session tokens are short-lived and
//! obtained again on every run.

use anyhow::{Context, Result};
use midas_core::domain::{ApiKey, Email, Secret};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// Keyring service name for storing API keys
const KEYRING_SERVICE: &str = "midas";

/// What goes into one keyring entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredApiKey {
    pub api_key: String,
    pub application: String,
}

impl StoredApiKey {
    pub fn new(api_key: &ApiKey, application: impl Into<String>) -> Self {
        Self {
            api_key: api_key.as_str().to_string(),
            application: application.into(),
        }
    }

    /// Converts the entry into a login secret
    pub fn into_secret(self) -> Result<Secret> {
        Ok(Secret::ApiKey {
            key: ApiKey::new(self.api_key).context("Stored API key is malformed")?,
            application: self.application,
        })
    }
}

// ============================================================================
// KeyringApiKeyStorage
// ============================================================================

/// Stores and retrieves API keys from the system keyring
///
/// Uses the `keyring` crate to store keys securely in the OS credential
/// store (e.g., GNOME Keyring, KDE Wallet, macOS Keychain).
/// Entries are serialized as JSON with the service name "midas" and
/// `<email>@<server url>` as the username, so one account can hold keys for
/// several servers.
pub struct KeyringApiKeyStorage;

impl KeyringApiKeyStorage {
    /// Keyring username for an account on a server
    pub fn username(email: &Email, server_url: &Url) -> String {
        format!("{}@{}", email, server_url.as_str().trim_end_matches('/'))
    }

    /// Stores an API key for the given account
    pub fn store(email: &Email, server_url: &Url, key: &StoredApiKey) -> Result<()> {
        let username = Self::username(email, server_url);
        let entry = keyring::Entry::new(KEYRING_SERVICE, &username)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(key).context("Failed to serialize API key")?;

        entry
            .set_password(&json)
            .context("Failed to store API key in keyring")?;

        debug!("Stored API key in keyring for: {}", username);
        Ok(())
    }

    /// Loads the API key for the given account
    ///
    /// # Returns
    /// `Some(StoredApiKey)` if found and valid, `None` if not found
    pub fn load(email: &Email, server_url: &Url) -> Result<Option<StoredApiKey>> {
        let username = Self::username(email, server_url);
        let entry = keyring::Entry::new(KEYRING_SERVICE, &username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let key: StoredApiKey = serde_json::from_str(&json)
                    .context("Failed to deserialize API key from keyring")?;
                debug!("Loaded API key from keyring for: {}", username);
                Ok(Some(key))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No API key found in keyring for: {}", username);
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes the API key for the given account
    pub fn clear(email: &Email, server_url: &Url) -> Result<()> {
        let username = Self::username(email, server_url);
        let entry = keyring::Entry::new(KEYRING_SERVICE, &username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!("Cleared API key from keyring for: {}", username);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No API key to clear for: {}", username);
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}
