//! Download use case
//!
//! Recreates a remote folder or item locally: folders become directories and
//! each item becomes one file holding its head revision.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::{
    domain::{DomainError, DownloadReport, FolderId, ItemId, Resource, ServerPath, SessionToken},
    ports::{DownloadedItem, ICommunicator},
    usecases::resolve::ResourceResolver,
};

/// Recursive downloader
pub struct Downloader {
    communicator: Arc<dyn ICommunicator>,
    token: SessionToken,
}

impl Downloader {
    pub fn new(communicator: Arc<dyn ICommunicator>, token: SessionToken) -> Self {
        Self {
            communicator,
            token,
        }
    }

    /// Downloads the resource at `server_path` into `local_dir`
    ///
    /// A folder is recreated as a new directory below `local_dir`; it is an
    /// error if that directory already exists. Files are overwritten.
    ///
    /// # Errors
    /// Returns [`DomainError::ResourceNotFound`] if nothing lives at the path,
    /// or the first remote or local I/O failure
    pub async fn download(&self, server_path: &ServerPath, local_dir: &Path) -> Result<DownloadReport> {
        let resolver = ResourceResolver::new(self.communicator.clone(), self.token.clone());
        let resource = resolver
            .resolve(server_path)
            .await?
            .ok_or_else(|| DomainError::ResourceNotFound(server_path.to_string()))?;

        let mut report = DownloadReport::start();
        match resource {
            Resource::Item(item_id) => self.download_item(&item_id, local_dir, &mut report).await?,
            Resource::Folder(folder_id) => {
                self.download_folder(folder_id, local_dir.to_path_buf(), &mut report)
                    .await?
            }
        }
        report.finish();
        Ok(report)
    }

    fn download_folder<'a>(
        &'a self,
        folder_id: FolderId,
        local_dir: PathBuf,
        report: &'a mut DownloadReport,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let folder = self
                .communicator
                .folder_get(&self.token, &folder_id)
                .await
                .with_context(|| format!("Failed to get folder {folder_id}"))?;

            let folder_path = local_dir.join(safe_name(&folder.name)?);
            info!(path = %folder_path.display(), "Creating folder");
            tokio::fs::create_dir(&folder_path)
                .await
                .with_context(|| format!("Failed to create {}", folder_path.display()))?;
            report.folders_created += 1;

            let children = self
                .communicator
                .folder_children(&self.token, &folder_id)
                .await
                .with_context(|| format!("Failed to list folder {folder_id}"))?;
            for item in &children.items {
                self.download_item(&item.item_id, &folder_path, report).await?;
            }
            for child in children.folders {
                self.download_folder(child.folder_id, folder_path.clone(), report)
                    .await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn download_item(
        &self,
        item_id: &ItemId,
        local_dir: &Path,
        report: &mut DownloadReport,
    ) -> Result<()> {
        let DownloadedItem {
            filename,
            mut content,
        } = self
            .communicator
            .download_item(&self.token, item_id)
            .await
            .with_context(|| format!("Failed to download item {item_id}"))?;

        let file_path = local_dir.join(safe_name(&filename)?);
        info!(path = %file_path.display(), "Creating file");
        let mut file = tokio::fs::File::create(&file_path)
            .await
            .with_context(|| format!("Failed to create {}", file_path.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.with_context(|| format!("Failed to download item {item_id}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", file_path.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", file_path.display()))?;
        debug!(path = %file_path.display(), bytes = written, "File written");

        report.files_written += 1;
        report.bytes_written += written;
        Ok(())
    }
}

/// Rejects server-supplied names that would escape the target directory
fn safe_name(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
        bail!("Refusing to write unsafe name '{name}'");
    }
    Ok(name)
}
