//! Upload progress port
//!
//! Observers are told about finished bitstreams and items. Unlike
//! [`IItemUploadCallback`](crate::ports::IItemUploadCallback) they cannot
//! fail or talk to the server, and they are not counted in the upload report.

use crate::domain::newtypes::ItemId;

/// Receives progress notifications from an [`Uploader`](crate::usecases::Uploader)
pub trait IUploadProgress: Send + Sync {
    /// A bitstream was sent (`bytes` > 0) or linked to existing content (`bytes` == 0)
    fn on_bitstream_done(&self, filename: &str, bytes: u64);

    /// Every bitstream and callback of `item_id` has completed
    fn on_item_done(&self, item_id: &ItemId);
}
