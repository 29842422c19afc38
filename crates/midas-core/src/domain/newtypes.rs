//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote identifiers and
//! credentials. Each newtype ensures data validity at construction time.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Remote identifiers
// ============================================================================

/// Validates a server-assigned resource identifier.
///
/// Midas ids are decimal database keys, but they are carried as opaque strings
/// so that any alphanumeric key the server hands out is accepted.
fn validate_remote_id(kind: &str, id: &str) -> Result<(), DomainError> {
    if id.is_empty() {
        return Err(DomainError::InvalidRemoteId(format!(
            "{kind} cannot be empty"
        )));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DomainError::InvalidRemoteId(format!(
            "{kind} contains invalid characters: {id}"
        )));
    }

    Ok(())
}

macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", $kind)]
            ///
            /// # Errors
            /// Returns error if the ID is empty or contains invalid characters
            pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
                let id = id.into();
                validate_remote_id($kind, &id)?;
                Ok(Self(id))
            }

            /// Get the inner string reference
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

remote_id!(
    /// Identifier of a remote folder
    FolderId,
    "folder id"
);

remote_id!(
    /// Identifier of a remote item
    ItemId,
    "item id"
);

remote_id!(
    /// Identifier of a remote user
    UserId,
    "user id"
);

remote_id!(
    /// Identifier of a remote community
    CommunityId,
    "community id"
);

// ============================================================================
// Credentials
// ============================================================================

fn validate_secret(kind: &str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::InvalidCredential(format!(
            "{kind} cannot be empty"
        )));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(DomainError::InvalidCredential(format!(
            "{kind} cannot contain whitespace"
        )));
    }
    Ok(())
}

macro_rules! secret {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", $kind)]
            ///
            /// # Errors
            /// Returns error if the value is empty or contains whitespace
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                validate_secret($kind, &value)?;
                Ok(Self(value))
            }

            /// Get the inner string reference
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Number of characters in the value
            #[must_use]
            pub fn len(&self) -> usize {
                self.0.chars().count()
            }

            /// Always false; empty values are rejected at construction
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        // Secrets never appear in logs.
        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(***)"))
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

secret!(
    /// Session token returned by `midas.login`, required by every authenticated call
    SessionToken,
    "session token"
);

secret!(
    /// Long-lived per-application API key, exchanged for session tokens
    ApiKey,
    "API key"
);

secret!(
    /// Single-use token authorising the upload of one bitstream
    UploadToken,
    "upload token"
);

/// Minimum length of a real session token.
///
/// When multi-factor authentication is enabled, `midas.login` answers with a
/// short temporary token that must be exchanged through `midas.mfa.otp.login`.
pub const MIN_SESSION_TOKEN_LEN: usize = 10;

impl SessionToken {
    /// Returns true if this is a temporary MFA token rather than a usable session
    #[must_use]
    pub fn requires_otp(&self) -> bool {
        self.len() < MIN_SESSION_TOKEN_LEN
    }
}

// ============================================================================
// Email
// ============================================================================

/// A validated email address
///
/// Validation rules:
/// - Contains exactly one @
/// - Has non-empty local part
/// - Has non-empty domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a new validated Email
    ///
    /// # Errors
    /// Returns error if the email format is invalid
    pub fn new(email: impl Into<String>) -> Result<Self, DomainError> {
        let email = email.into();
        let trimmed = email.trim();

        let mut parts = trimmed.split('@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next();

        match domain {
            _ if trimmed.is_empty() => Err(DomainError::InvalidEmail(
                "Email cannot be empty".to_string(),
            )),
            None => Err(DomainError::InvalidEmail(format!(
                "Email must contain '@': {email}"
            ))),
            Some(_) if parts.next().is_some() => Err(DomainError::InvalidEmail(format!(
                "Email must contain exactly one '@': {email}"
            ))),
            Some(_) if local.is_empty() => Err(DomainError::InvalidEmail(format!(
                "Email local part cannot be empty: {email}"
            ))),
            Some("") => Err(DomainError::InvalidEmail(format!(
                "Email domain cannot be empty: {email}"
            ))),
            // Midas matches emails case-insensitively but stores them as entered.
            Some(_) => Ok(Self(trimmed.to_string())),
        }
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}
