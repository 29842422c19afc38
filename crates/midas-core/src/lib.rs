//! Midas Core - Domain logic for the Midas Server client
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FolderId`, `ItemId`, `SessionToken`, `Credentials`, `ServerPath`, `UploadReport`
//! - **Use cases** - `AuthenticateUseCase`, `Uploader`, `Downloader`, `ResourceResolver`
//! - **Port definitions** - `ICommunicator` for the remote web API,
//!   `IItemUploadCallback` for post-upload hooks and `IUploadProgress` for display
//!
//! # Architecture
//!
//! The domain module holds plain value types with validation at construction.
//! Ports define the trait interfaces that the `midas-client` adapter implements.
//! Use cases walk local directory trees and drive the communicator port.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
