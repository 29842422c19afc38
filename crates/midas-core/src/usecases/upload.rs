//! Upload use case
//!
//! Mirrors a local directory tree onto a Midas server. Directories become
//! folders and files become items holding a single bitstream. In
//! leaf-folders-as-items mode a directory that holds only files becomes one
//! item with a bitstream per file.
//!
//! Traversal is sequential and depth-first in sorted name order. The first
//! failing remote call or callback aborts the whole upload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures_util::future::{BoxFuture, FutureExt};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        DomainError, FolderId, ItemId, Resource, ServerPath, SessionToken, UploadReport,
    },
    ports::{ICommunicator, IItemUploadCallback, IUploadProgress},
    usecases::resolve::ResourceResolver,
};

/// Read buffer size for checksum computation
const CHECKSUM_CHUNK_SIZE: usize = 64 * 1024;

/// Options controlling how a tree maps onto remote resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Upload directories holding only files as one item each
    pub leaf_folders_as_items: bool,
    /// Reuse a same-named folder or item in the parent instead of creating one
    pub reuse_existing: bool,
}

/// Kind of a directory entry that takes part in an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
    /// Symlink to a directory; never followed, but keeps its parent from being a leaf
    LinkedDirectory,
}

/// Recursive directory uploader
///
/// Built once per session; callbacks registered with
/// [`add_item_upload_callback`](Self::add_item_upload_callback) run in
/// registration order after every item's bitstreams are uploaded.
pub struct Uploader {
    communicator: Arc<dyn ICommunicator>,
    token: SessionToken,
    options: UploadOptions,
    callbacks: Vec<Arc<dyn IItemUploadCallback>>,
    progress: Option<Arc<dyn IUploadProgress>>,
}

impl Uploader {
    pub fn new(communicator: Arc<dyn ICommunicator>, token: SessionToken) -> Self {
        Self {
            communicator,
            token,
            options: UploadOptions::default(),
            callbacks: Vec::new(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Reports finished bitstreams and items to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn IUploadProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> UploadOptions {
        self.options
    }

    /// Appends a callback to run after each uploaded item
    pub fn add_item_upload_callback(&mut self, callback: Arc<dyn IItemUploadCallback>) {
        self.callbacks.push(callback);
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Uploads the directory at `path` as a new folder under `parent`
    ///
    /// The root directory always becomes a folder, even when it is a leaf.
    /// A regular file at `path` is uploaded as with [`upload_file`](Self::upload_file).
    ///
    /// # Errors
    /// Returns the first local I/O, remote, or callback failure
    pub async fn upload(&self, path: &Path, parent: &FolderId) -> Result<UploadReport> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Cannot access {}", path.display()))?;
        if !metadata.is_dir() {
            return self.upload_file(path, parent).await;
        }

        let mut report = UploadReport::start();
        let name = entry_name(path).await?;
        info!(path = %path.display(), "Creating folder");
        let folder_id = self.ensure_folder(&name, parent, &mut report).await?;
        self.upload_directory(path.to_path_buf(), folder_id, &mut report)
            .await?;
        report.finish();
        Ok(report)
    }

    /// Uploads a single file as an item with one bitstream
    pub async fn upload_file(&self, path: &Path, parent: &FolderId) -> Result<UploadReport> {
        let mut report = UploadReport::start();
        self.upload_file_as_item(path, parent, &mut report).await?;
        report.finish();
        Ok(report)
    }

    /// Uploads every path matching a glob pattern into `destination`
    ///
    /// `destination` is a user folder name (e.g. `Private`) or an absolute
    /// server path; see [`resolve_destination`](Self::resolve_destination).
    pub async fn upload_pattern(&self, pattern: &str, destination: &str) -> Result<UploadReport> {
        let parent = self.resolve_destination(destination).await?;

        let mut matches = Vec::new();
        for entry in glob::glob(pattern).with_context(|| format!("Invalid pattern '{pattern}'"))? {
            matches.push(entry.context("Failed to read a matched path")?);
        }
        if matches.is_empty() {
            warn!(pattern = %pattern, "Pattern matched no files");
        }

        let mut report = UploadReport::start();
        for path in matches {
            let metadata = tokio::fs::metadata(&path)
                .await
                .with_context(|| format!("Cannot access {}", path.display()))?;
            let part = if metadata.is_dir() {
                self.upload(&path, &parent).await?
            } else {
                info!(path = %path.display(), "Uploading item");
                self.upload_file(&path, &parent).await?
            };
            report.merge(&part);
        }
        report.finish();
        Ok(report)
    }

    /// Resolves an upload destination to a folder id
    ///
    /// An absolute server path must name an existing folder. Any other value
    /// is matched against the names of the user's top-level folders, falling
    /// back to the first one with a warning.
    pub async fn resolve_destination(&self, destination: &str) -> Result<FolderId> {
        if destination.starts_with('/') {
            let path = ServerPath::parse(destination)?;
            let resolver = ResourceResolver::new(self.communicator.clone(), self.token.clone());
            return match resolver.resolve(&path).await? {
                Some(Resource::Folder(folder_id)) => Ok(folder_id),
                Some(Resource::Item(_)) => {
                    bail!("Destination {destination} is an item, not a folder")
                }
                None => Err(DomainError::ResourceNotFound(destination.to_string()).into()),
            };
        }

        let folders = self
            .communicator
            .list_user_folders(&self.token)
            .await
            .context("Failed to list user folders")?;

        if let Some(folder) = folders.iter().find(|f| f.name == destination) {
            return Ok(folder.folder_id.clone());
        }
        match folders.into_iter().next() {
            Some(first) => {
                warn!(
                    destination = %destination,
                    fallback = %first.name,
                    "Unable to locate destination, defaulting to first user folder"
                );
                Ok(first.folder_id)
            }
            None => bail!("User has no folders to upload into"),
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    fn upload_directory<'a>(
        &'a self,
        dir: PathBuf,
        folder_id: FolderId,
        report: &'a mut UploadReport,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            for (path, kind) in list_entries(&dir).await? {
                match kind {
                    EntryKind::File => {
                        info!(path = %path.display(), "Uploading item");
                        self.upload_file_as_item(&path, &folder_id, report).await?;
                    }
                    EntryKind::Directory => {
                        if self.options.leaf_folders_as_items {
                            let entries = list_entries(&path).await?;
                            if is_leaf(&entries) {
                                info!(path = %path.display(), "Creating item from leaf folder");
                                self.upload_leaf_as_item(&path, &entries, &folder_id, report)
                                    .await?;
                                continue;
                            }
                        }
                        info!(path = %path.display(), "Creating folder");
                        let name = entry_name(&path).await?;
                        let child = self.ensure_folder(&name, &folder_id, report).await?;
                        self.upload_directory(path, child, report).await?;
                    }
                    EntryKind::LinkedDirectory => {
                        debug!(path = %path.display(), "Skipping symlinked directory");
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn upload_file_as_item(
        &self,
        path: &Path,
        parent: &FolderId,
        report: &mut UploadReport,
    ) -> Result<()> {
        let name = entry_name(path).await?;
        let item_id = self.ensure_item(&name, parent, report).await?;
        self.upload_bitstream(path, &item_id, None, report).await?;
        self.finish_item(&item_id, report).await
    }

    async fn upload_leaf_as_item(
        &self,
        dir: &Path,
        entries: &[(PathBuf, EntryKind)],
        parent: &FolderId,
        report: &mut UploadReport,
    ) -> Result<()> {
        let name = entry_name(dir).await?;
        let item_id = self.ensure_item(&name, parent, report).await?;

        let count = entries.len();
        for (index, (path, _)) in entries.iter().enumerate() {
            self.upload_bitstream(path, &item_id, Some((index + 1, count)), report)
                .await?;
        }
        self.finish_item(&item_id, report).await
    }

    // ========================================================================
    // Remote resources
    // ========================================================================

    async fn ensure_folder(
        &self,
        name: &str,
        parent: &FolderId,
        report: &mut UploadReport,
    ) -> Result<FolderId> {
        if self.options.reuse_existing {
            let children = self
                .communicator
                .folder_children(&self.token, parent)
                .await
                .with_context(|| format!("Failed to list folder {parent}"))?;
            if let Some(existing) = children.folder_named(name) {
                debug!(name = %name, folder_id = %existing.folder_id, "Reusing folder");
                report.folders_reused += 1;
                return Ok(existing.folder_id.clone());
            }
        }

        let folder = self
            .communicator
            .create_folder(&self.token, name, parent)
            .await
            .with_context(|| format!("Failed to create folder '{name}'"))?;
        info!(name = %name, folder_id = %folder.folder_id, "Created folder");
        report.folders_created += 1;
        Ok(folder.folder_id)
    }

    async fn ensure_item(
        &self,
        name: &str,
        parent: &FolderId,
        report: &mut UploadReport,
    ) -> Result<ItemId> {
        if self.options.reuse_existing {
            let children = self
                .communicator
                .folder_children(&self.token, parent)
                .await
                .with_context(|| format!("Failed to list folder {parent}"))?;
            if let Some(existing) = children.item_named(name) {
                debug!(name = %name, item_id = %existing.item_id, "Reusing item");
                report.items_reused += 1;
                return Ok(existing.item_id.clone());
            }
        }

        let item = self
            .communicator
            .create_item(&self.token, name, parent)
            .await
            .with_context(|| format!("Failed to create item '{name}'"))?;
        info!(name = %name, item_id = %item.item_id, "Created item");
        report.items_created += 1;
        Ok(item.item_id)
    }

    /// Adds the file at `path` to `item_id` as a bitstream
    ///
    /// `position` is `(i, n)` when the file is the i-th of n in a leaf item.
    async fn upload_bitstream(
        &self,
        path: &Path,
        item_id: &ItemId,
        position: Option<(usize, usize)>,
        report: &mut UploadReport,
    ) -> Result<()> {
        let filename = entry_name(path).await?;
        let progress = position
            .map(|(i, n)| format!("({i} of {n})"))
            .unwrap_or_default();

        let checksum = file_md5(path).await?;
        let upload_token = self
            .communicator
            .generate_upload_token(&self.token, item_id, &filename, Some(&checksum))
            .await
            .with_context(|| format!("Failed to get upload token for {}", path.display()))?;

        let Some(upload_token) = upload_token else {
            info!(file = %filename, item_id = %item_id, "Linked existing bitstream {progress}");
            report.bitstreams_linked += 1;
            self.notify_bitstream(&filename, 0);
            return Ok(());
        };

        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let length = file
            .metadata()
            .await
            .with_context(|| format!("Cannot stat {}", path.display()))?
            .len();
        self.communicator
            .perform_upload(&upload_token, &filename, item_id, file, length)
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;

        info!(file = %filename, item_id = %item_id, bytes = length, "Uploaded bitstream {progress}");
        report.bitstreams_uploaded += 1;
        report.bytes_uploaded += length;
        self.notify_bitstream(&filename, length);
        Ok(())
    }

    fn notify_bitstream(&self, filename: &str, bytes: u64) {
        if let Some(progress) = &self.progress {
            progress.on_bitstream_done(filename, bytes);
        }
    }

    async fn finish_item(&self, item_id: &ItemId, report: &mut UploadReport) -> Result<()> {
        self.run_callbacks(item_id, report).await?;
        if let Some(progress) = &self.progress {
            progress.on_item_done(item_id);
        }
        Ok(())
    }

    async fn run_callbacks(&self, item_id: &ItemId, report: &mut UploadReport) -> Result<()> {
        for callback in &self.callbacks {
            callback
                .on_item_uploaded(self.communicator.as_ref(), &self.token, item_id)
                .await
                .with_context(|| format!("Upload callback failed for item {item_id}"))?;
            report.callbacks_invoked += 1;
        }
        Ok(())
    }
}

// ============================================================================
// Local filesystem helpers
// ============================================================================

/// Lists the files and directories of `dir` sorted by name
///
/// Symlinks to files and special files are dropped. Symlinks to directories
/// are kept as [`EntryKind::LinkedDirectory`].
async fn list_entries(dir: &Path) -> Result<Vec<(PathBuf, EntryKind)>> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("Cannot stat {}", path.display()))?;
        if file_type.is_symlink() {
            let target_is_dir = tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if target_is_dir {
                entries.push((path, EntryKind::LinkedDirectory));
            } else {
                debug!(path = %path.display(), "Skipping symlink");
            }
        } else if file_type.is_dir() {
            entries.push((path, EntryKind::Directory));
        } else if file_type.is_file() {
            entries.push((path, EntryKind::File));
        } else {
            debug!(path = %path.display(), "Skipping special file");
        }
    }
    entries.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(entries)
}

/// A leaf holds at least one file and no directories
fn is_leaf(entries: &[(PathBuf, EntryKind)]) -> bool {
    !entries.is_empty() && entries.iter().all(|(_, kind)| *kind == EntryKind::File)
}

/// Final path component, resolving `.` and `..` through the filesystem
async fn entry_name(path: &Path) -> Result<String> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }
    let canonical = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    match canonical.file_name() {
        Some(name) => Ok(name.to_string_lossy().into_owned()),
        None => bail!("{} has no name to upload under", path.display()),
    }
}

/// Hex MD5 of a file, read in fixed-size chunks
async fn file_md5(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHECKSUM_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
