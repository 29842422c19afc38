//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures, malformed server paths, and login
//! preconditions that cannot be satisfied.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Invalid remote ID format (folder, item, user or community)
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid or empty token / API key
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidServerUrl(String),

    /// Server path does not follow `/users/<first>_<last>/...` or `/communities/<name>/...`
    #[error("Invalid server path: {0}")]
    InvalidServerPath(String),

    /// The server enforces multi-factor authentication and no one-time password was supplied
    #[error("One-time password required for {0}")]
    OneTimePasswordRequired(String),

    /// A server path did not resolve to any folder or item
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
