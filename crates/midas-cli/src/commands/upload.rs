//! Upload command
//!
//! `midas upload <PATTERN>` uploads every matching file or directory into
//! the destination folder. Flags override the `upload` section of the
//! configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use midas_core::domain::{ItemId, UploadReport};
use midas_core::ports::IUploadProgress;
use midas_core::usecases::{DicomExtractCallback, UploadOptions, Uploader};
use tracing::info;

use super::CliContext;
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct UploadCommand {
    /// File, directory or glob pattern to upload
    pub pattern: String,
    /// User folder name (e.g. Private) or absolute server path
    #[arg(long, short)]
    pub destination: Option<String>,
    /// Upload directories holding only files as single multi-bitstream items
    #[arg(long)]
    pub leaf_folders_as_items: bool,
    /// Reuse folders and items that already exist under the same name
    #[arg(long)]
    pub reuse_existing: bool,
    /// Run DICOM metadata extraction on every uploaded item
    #[arg(long)]
    pub extract_dicom: bool,
}

impl UploadCommand {
    fn options(&self, configured: UploadOptions) -> UploadOptions {
        UploadOptions {
            leaf_folders_as_items: self.leaf_folders_as_items || configured.leaf_folders_as_items,
            reuse_existing: self.reuse_existing || configured.reuse_existing,
        }
    }

    pub async fn execute(&self, ctx: CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let (communicator, session) = ctx.open_session(true).await?;

        let options = self.options(ctx.config.upload.options());
        let destination = self
            .destination
            .as_deref()
            .unwrap_or(&ctx.config.upload.destination);

        let mut uploader =
            Uploader::new(communicator, session.token().clone()).with_options(options);
        if self.extract_dicom || ctx.config.upload.extract_dicom {
            uploader.add_item_upload_callback(Arc::new(DicomExtractCallback));
        }
        let progress = if ctx.format.is_json() {
            None
        } else {
            let progress = Arc::new(ItemProgress::new());
            uploader = uploader.with_progress(progress.clone());
            Some(progress)
        };

        info!(pattern = %self.pattern, destination = %destination, "Starting upload");
        let result = uploader
            .upload_pattern(&self.pattern, destination)
            .await
            .with_context(|| format!("Upload of '{}' failed", self.pattern));
        if let Some(progress) = &progress {
            progress.finish();
        }
        let report = result?;

        if ctx.format.is_json() {
            fmt.print_json(&serde_json::to_value(&report)?);
        } else {
            print_report(&*fmt, &report);
        }
        Ok(())
    }
}

fn print_report(fmt: &dyn OutputFormatter, report: &UploadReport) {
    fmt.success(&format!(
        "Uploaded {} item{}",
        report.items(),
        if report.items() == 1 { "" } else { "s" }
    ));
    fmt.field("Folders created", &report.folders_created.to_string());
    fmt.field("Items created", &report.items_created.to_string());
    if report.folders_reused + report.items_reused > 0 {
        fmt.field("Folders reused", &report.folders_reused.to_string());
        fmt.field("Items reused", &report.items_reused.to_string());
    }
    fmt.field("Bitstreams sent", &report.bitstreams_uploaded.to_string());
    fmt.field("Bitstreams linked", &report.bitstreams_linked.to_string());
    fmt.field("Bytes sent", &report.bytes_uploaded.to_string());
}

/// Spinner that counts finished items
pub struct ItemProgress {
    bar: ProgressBar,
}

impl ItemProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{spinner} {pos} items uploaded {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ItemProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl IUploadProgress for ItemProgress {
    fn on_bitstream_done(&self, filename: &str, _bytes: u64) {
        self.bar.set_message(filename.to_string());
    }

    fn on_item_done(&self, item_id: &ItemId) {
        self.bar.inc(1);
        self.bar.set_message(format!("(item {item_id})"));
    }
}
