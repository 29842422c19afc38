//! Download command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use midas_core::domain::ServerPath;
use midas_core::usecases::Downloader;
use tracing::info;

use super::CliContext;

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Server path, e.g. /users/jane_doe/Private/scans
    pub server_path: String,
    /// Local directory to download into
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
}

impl DownloadCommand {
    pub async fn execute(&self, ctx: CliContext) -> Result<()> {
        let fmt = ctx.formatter();
        let server_path = ServerPath::parse(&self.server_path)?;
        let (communicator, session) = ctx.open_session(true).await?;

        info!(path = %server_path, output = %self.output.display(), "Starting download");
        let report = Downloader::new(communicator, session.token().clone())
            .download(&server_path, &self.output)
            .await
            .with_context(|| format!("Download of {server_path} failed"))?;

        if ctx.format.is_json() {
            fmt.print_json(&serde_json::to_value(&report)?);
        } else {
            fmt.success(&format!("Downloaded {server_path}"));
            fmt.field("Folders created", &report.folders_created.to_string());
            fmt.field("Files written", &report.files_written.to_string());
            fmt.field("Bytes written", &report.bytes_written.to_string());
        }
        Ok(())
    }
}
