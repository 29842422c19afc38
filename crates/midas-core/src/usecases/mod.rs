//! Use cases (interactors) for the Midas client
//!
//! This module contains the application use cases that orchestrate
//! domain types and port interfaces. Use cases are thin coordinators
//! that keep traversal rules here and delegate I/O to ports.
//!
//! ## Use Cases
//!
//! - [`AuthenticateUseCase`] - API key login, MFA completion, token renewal
//! - [`Uploader`] - Recursive directory upload onto folders, items and bitstreams
//! - [`ResourceResolver`] - Server path lookup
//! - [`Downloader`] - Recursive download of folders and items
//! - [`DicomExtractCallback`] - Post-upload DICOM metadata extraction

pub mod authenticate;
pub mod dicom;
pub mod download;
pub mod resolve;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use authenticate::{AuthenticateUseCase, AuthenticatedSession};
pub use dicom::DicomExtractCallback;
pub use download::Downloader;
pub use resolve::ResourceResolver;
pub use upload::{UploadOptions, Uploader};
