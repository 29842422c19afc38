//! MidasCommunicator - ICommunicator implementation for the Midas web API
//!
//! Wraps the [`MidasClient`] and delegates to the resources and upload
//! modules to fulfil the [`ICommunicator`] port contract.
//!
//! ## Design Notes
//!
//! - Errors leave this module as `anyhow::Error` wrapping a [`MidasError`](crate::MidasError),
//!   so callers can `downcast_ref` to inspect the failure class.
//! - Nothing here retries; an expired token surfaces as `MidasError::InvalidToken`.

use std::time::Duration;

use anyhow::Result;
use url::Url;

use midas_core::domain::newtypes::{ApiKey, Email, FolderId, ItemId, SessionToken, UploadToken};
use midas_core::ports::{
    CommunityInfo, DownloadedItem, FolderChildren, FolderInfo, ICommunicator, ItemInfo, UserInfo,
};

use crate::client::MidasClient;
use crate::{resources, upload, MidasError};

/// Midas Server implementation of [`ICommunicator`]
#[derive(Debug, Clone)]
pub struct MidasCommunicator {
    client: MidasClient,
}

impl MidasCommunicator {
    /// Creates a communicator for the server at `server_url`
    pub fn new(server_url: &Url, timeout: Duration) -> Result<Self, MidasError> {
        Ok(Self {
            client: MidasClient::with_timeout(server_url, timeout)?,
        })
    }

    /// Wraps an existing client (useful for testing)
    pub fn from_client(client: MidasClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &MidasClient {
        &self.client
    }
}

fn invalid(e: midas_core::domain::DomainError) -> MidasError {
    MidasError::InvalidResponse(e.to_string())
}

#[async_trait::async_trait]
impl ICommunicator for MidasCommunicator {
    async fn server_version(&self) -> Result<String> {
        Ok(self.client.version().await?)
    }

    async fn get_default_api_key(&self, email: &Email, password: &str) -> Result<ApiKey> {
        let key = self.client.default_api_key(email.as_str(), password).await?;
        Ok(ApiKey::new(key).map_err(invalid)?)
    }

    async fn login_with_api_key(
        &self,
        email: &Email,
        api_key: &ApiKey,
        application: &str,
    ) -> Result<SessionToken> {
        let token = self
            .client
            .login(email.as_str(), api_key.as_str(), application)
            .await?;
        Ok(SessionToken::new(token).map_err(invalid)?)
    }

    async fn mfa_otp_login(
        &self,
        temp_token: &SessionToken,
        one_time_password: &str,
    ) -> Result<SessionToken> {
        let token = self
            .client
            .mfa_otp_login(temp_token.as_str(), one_time_password)
            .await?;
        Ok(SessionToken::new(token).map_err(invalid)?)
    }

    async fn list_user_folders(&self, token: &SessionToken) -> Result<Vec<FolderInfo>> {
        Ok(resources::list_user_folders(&self.client, token.as_str()).await?)
    }

    async fn folder_get(&self, token: &SessionToken, folder_id: &FolderId) -> Result<FolderInfo> {
        Ok(resources::folder_get(&self.client, token.as_str(), folder_id.as_str()).await?)
    }

    async fn folder_children(
        &self,
        token: &SessionToken,
        folder_id: &FolderId,
    ) -> Result<FolderChildren> {
        Ok(resources::folder_children(&self.client, token.as_str(), folder_id.as_str()).await?)
    }

    async fn create_folder(
        &self,
        token: &SessionToken,
        name: &str,
        parent: &FolderId,
    ) -> Result<FolderInfo> {
        Ok(resources::create_folder(&self.client, token.as_str(), name, parent.as_str()).await?)
    }

    async fn create_item(
        &self,
        token: &SessionToken,
        name: &str,
        parent: &FolderId,
    ) -> Result<ItemInfo> {
        Ok(resources::create_item(&self.client, token.as_str(), name, parent.as_str()).await?)
    }

    async fn delete_item(&self, token: &SessionToken, item_id: &ItemId) -> Result<()> {
        Ok(resources::delete_item(&self.client, token.as_str(), item_id.as_str()).await?)
    }

    async fn generate_upload_token(
        &self,
        token: &SessionToken,
        item_id: &ItemId,
        filename: &str,
        checksum: Option<&str>,
    ) -> Result<Option<UploadToken>> {
        let upload_token = upload::generate_upload_token(
            &self.client,
            token.as_str(),
            item_id.as_str(),
            filename,
            checksum,
        )
        .await?;
        Ok(upload_token
            .map(UploadToken::new)
            .transpose()
            .map_err(invalid)?)
    }

    async fn perform_upload(
        &self,
        upload_token: &UploadToken,
        filename: &str,
        item_id: &ItemId,
        file: tokio::fs::File,
        length: u64,
    ) -> Result<()> {
        Ok(upload::perform_upload(
            &self.client,
            upload_token.as_str(),
            filename,
            item_id.as_str(),
            file,
            length,
        )
        .await?)
    }

    async fn download_item(&self, token: &SessionToken, item_id: &ItemId) -> Result<DownloadedItem> {
        Ok(upload::download_item(&self.client, token.as_str(), item_id.as_str()).await?)
    }

    async fn get_user_by_name(&self, firstname: &str, lastname: &str) -> Result<UserInfo> {
        Ok(resources::get_user_by_name(&self.client, firstname, lastname).await?)
    }

    async fn get_community_by_name(&self, name: &str) -> Result<CommunityInfo> {
        Ok(resources::get_community_by_name(&self.client, name).await?)
    }

    async fn extract_dicom_metadata(&self, token: &SessionToken, item_id: &ItemId) -> Result<()> {
        Ok(
            resources::extract_dicom_metadata(&self.client, token.as_str(), item_id.as_str())
                .await?,
        )
    }
}
