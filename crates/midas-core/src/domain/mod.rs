//! Domain entities and value types
//!
//! This module contains the core domain types for the Midas client:
//! - Newtypes for remote identifiers and credentials
//! - Login credentials
//! - Server-side resource paths
//! - Transfer reports
//! - Domain-specific error types

pub mod credentials;
pub mod errors;
pub mod newtypes;
pub mod report;
pub mod server_path;

// Re-export commonly used types
pub use credentials::{Credentials, Secret, DEFAULT_APPLICATION};
pub use errors::DomainError;
pub use newtypes::*;
pub use report::{DownloadReport, UploadReport};
pub use server_path::{Resource, ServerPath, ServerPathOwner};
