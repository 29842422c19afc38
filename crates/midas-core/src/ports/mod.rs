//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICommunicator`] - Midas Server web API operations
//! - [`IItemUploadCallback`] - Hooks run after each uploaded item
//! - [`IUploadProgress`] - Progress notifications for display

pub mod callback;
pub mod communicator;
pub mod progress;

pub use callback::IItemUploadCallback;
pub use communicator::{
    CommunityInfo, ContentStream, DownloadedItem, FolderChildren, FolderInfo, ICommunicator, ItemInfo,
    UserInfo,
};
pub use progress::IUploadProgress;
