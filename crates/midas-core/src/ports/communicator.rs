//! Communicator port (driven/secondary port)
//!
//! This module defines the interface to a remote Midas Server web API.
//! The production implementation lives in `midas-client` and speaks the
//! `/api/json?method=...` protocol; tests substitute an in-memory recorder.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific;
//!   the adapter's typed error stays reachable through `downcast_ref`.
//! - Uses `#[async_trait]` for async trait methods.
//! - DTOs here are port-level views of server records, not full server models.

use std::fmt;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{
    ApiKey, CommunityId, Email, FolderId, ItemId, SessionToken, UploadToken, UserId,
};

// ============================================================================
// DTOs
// ============================================================================

/// A remote folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub folder_id: FolderId,
    pub name: String,
    /// Parent folder id (None for a user's or community's root folder)
    pub parent_id: Option<FolderId>,
    pub description: Option<String>,
}

/// A remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub item_id: ItemId,
    pub name: String,
    /// Total size of the head revision's bitstreams, if reported
    pub size: Option<u64>,
}

/// Non-recursive children of a folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderChildren {
    pub folders: Vec<FolderInfo>,
    pub items: Vec<ItemInfo>,
}

impl FolderChildren {
    /// Finds a child folder by exact name
    pub fn folder_named(&self, name: &str) -> Option<&FolderInfo> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Finds a child item by exact name
    pub fn item_named(&self, name: &str) -> Option<&ItemInfo> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// A remote user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: UserId,
    pub firstname: String,
    pub lastname: String,
    /// The user's home folder
    pub folder_id: FolderId,
}

/// A remote community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityInfo {
    pub community_id: CommunityId,
    pub name: String,
    /// The community's root folder
    pub folder_id: FolderId,
}

/// Chunks of a response body, in order
pub type ContentStream = BoxStream<'static, anyhow::Result<Vec<u8>>>;

/// A downloaded item whose content is still arriving
pub struct DownloadedItem {
    /// File name announced by the server (`Content-Disposition`)
    pub filename: String,
    pub content: ContentStream,
}

impl fmt::Debug for DownloadedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedItem")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ICommunicator trait
// ============================================================================

/// Port trait for the Midas Server web API
///
/// Every method maps to a single remote call. Implementations do not retry,
/// so a failure surfaces on the first attempt.
#[async_trait::async_trait]
pub trait ICommunicator: Send + Sync {
    /// Version string of the server (`midas.version`)
    async fn server_version(&self) -> anyhow::Result<String>;

    /// Fetches the default API key of an account from its password
    /// (`midas.user.apikey.default`)
    async fn get_default_api_key(&self, email: &Email, password: &str) -> anyhow::Result<ApiKey>;

    /// Exchanges an API key for a session token (`midas.login`)
    ///
    /// When the account has MFA enabled the returned token is a short
    /// temporary token; see [`SessionToken::requires_otp`].
    async fn login_with_api_key(
        &self,
        email: &Email,
        api_key: &ApiKey,
        application: &str,
    ) -> anyhow::Result<SessionToken>;

    /// Completes an MFA login with a one-time password (`midas.mfa.otp.login`)
    async fn mfa_otp_login(
        &self,
        temp_token: &SessionToken,
        one_time_password: &str,
    ) -> anyhow::Result<SessionToken>;

    /// Lists the top-level folders of the logged-in user (`midas.user.folders`)
    async fn list_user_folders(&self, token: &SessionToken) -> anyhow::Result<Vec<FolderInfo>>;

    /// Gets a folder's attributes (`midas.folder.get`)
    async fn folder_get(
        &self,
        token: &SessionToken,
        folder_id: &FolderId,
    ) -> anyhow::Result<FolderInfo>;

    /// Lists the non-recursive children of a folder (`midas.folder.children`)
    async fn folder_children(
        &self,
        token: &SessionToken,
        folder_id: &FolderId,
    ) -> anyhow::Result<FolderChildren>;

    /// Creates a folder under `parent` (`midas.folder.create`)
    async fn create_folder(
        &self,
        token: &SessionToken,
        name: &str,
        parent: &FolderId,
    ) -> anyhow::Result<FolderInfo>;

    /// Creates an item under `parent` (`midas.item.create`)
    async fn create_item(
        &self,
        token: &SessionToken,
        name: &str,
        parent: &FolderId,
    ) -> anyhow::Result<ItemInfo>;

    /// Deletes an item (`midas.item.delete`)
    async fn delete_item(&self, token: &SessionToken, item_id: &ItemId) -> anyhow::Result<()>;

    /// Requests an upload token for one file of an item (`midas.upload.generatetoken`)
    ///
    /// Returns `None` when the server already holds content with the given
    /// checksum; it then links the existing bitstream into the item and no
    /// upload is needed.
    async fn generate_upload_token(
        &self,
        token: &SessionToken,
        item_id: &ItemId,
        filename: &str,
        checksum: Option<&str>,
    ) -> anyhow::Result<Option<UploadToken>>;

    /// Streams one bitstream from an open file (`midas.upload.perform`)
    ///
    /// `length` is the size of `file` in bytes.
    async fn perform_upload(
        &self,
        upload_token: &UploadToken,
        filename: &str,
        item_id: &ItemId,
        file: tokio::fs::File,
        length: u64,
    ) -> anyhow::Result<()>;

    /// Opens the head revision of an item for download (`midas.item.download`)
    async fn download_item(
        &self,
        token: &SessionToken,
        item_id: &ItemId,
    ) -> anyhow::Result<DownloadedItem>;

    /// Looks a user up by name (`midas.user.get`)
    async fn get_user_by_name(&self, firstname: &str, lastname: &str) -> anyhow::Result<UserInfo>;

    /// Looks a community up by name (`midas.community.get`)
    async fn get_community_by_name(&self, name: &str) -> anyhow::Result<CommunityInfo>;

    /// Asks the dicomextractor module to extract DICOM metadata from an item
    /// (`midas.dicomextractor.extract`)
    async fn extract_dicom_metadata(
        &self,
        token: &SessionToken,
        item_id: &ItemId,
    ) -> anyhow::Result<()>;
}
