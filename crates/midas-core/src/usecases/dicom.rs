//! DICOM metadata extraction callback

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    domain::{ItemId, SessionToken},
    ports::{ICommunicator, IItemUploadCallback},
};

/// Asks the server's dicomextractor module to index each uploaded item
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomExtractCallback;

#[async_trait::async_trait]
impl IItemUploadCallback for DicomExtractCallback {
    async fn on_item_uploaded(
        &self,
        communicator: &dyn ICommunicator,
        token: &SessionToken,
        item_id: &ItemId,
    ) -> Result<()> {
        communicator
            .extract_dicom_metadata(token, item_id)
            .await
            .with_context(|| format!("DICOM metadata extraction failed for item {item_id}"))?;
        info!(item_id = %item_id, "Extracted DICOM metadata");
        Ok(())
    }
}
