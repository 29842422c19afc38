//! Item upload callback port (driving hook)
//!
//! Callbacks run after every bitstream of an item has been sent. They receive
//! the communicator and token of the running upload so they can issue further
//! API calls against the new item, such as metadata extraction.

use crate::domain::newtypes::{ItemId, SessionToken};
use crate::ports::communicator::ICommunicator;

/// Hook invoked once per uploaded item
///
/// Callbacks registered on an [`Uploader`](crate::usecases::Uploader) run in
/// registration order. An error returned here aborts the upload.
#[async_trait::async_trait]
pub trait IItemUploadCallback: Send + Sync {
    /// Called after all bitstreams of `item_id` are uploaded
    async fn on_item_uploaded(
        &self,
        communicator: &dyn ICommunicator,
        token: &SessionToken,
        item_id: &ItemId,
    ) -> anyhow::Result<()>;
}
