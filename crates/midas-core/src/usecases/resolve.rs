//! Server path resolution
//!
//! Walks a [`ServerPath`] from its owner's root folder down to the named
//! resource, one `folder_children` call per level.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    domain::{FolderId, Resource, ServerPath, ServerPathOwner, SessionToken},
    ports::ICommunicator,
};

/// Resolves server paths to folder or item ids
pub struct ResourceResolver {
    communicator: Arc<dyn ICommunicator>,
    token: SessionToken,
}

impl ResourceResolver {
    pub fn new(communicator: Arc<dyn ICommunicator>, token: SessionToken) -> Self {
        Self {
            communicator,
            token,
        }
    }

    /// Looks up the resource at `path`
    ///
    /// Returns `Ok(None)` when an intermediate folder or the final resource
    /// does not exist. A folder wins over an item of the same name.
    ///
    /// # Errors
    /// Returns error if the owner cannot be found or a remote call fails
    pub async fn resolve(&self, path: &ServerPath) -> Result<Option<Resource>> {
        let mut current = self.owner_folder(path).await?;

        for name in path.folders() {
            let children = self
                .communicator
                .folder_children(&self.token, &current)
                .await
                .with_context(|| format!("Failed to list folder {current}"))?;
            match children.folder_named(name) {
                Some(folder) => current = folder.folder_id.clone(),
                None => {
                    debug!(path = %path, missing = %name, "Intermediate folder not found");
                    return Ok(None);
                }
            }
        }

        let children = self
            .communicator
            .folder_children(&self.token, &current)
            .await
            .with_context(|| format!("Failed to list folder {current}"))?;

        if let Some(folder) = children.folder_named(path.name()) {
            return Ok(Some(Resource::Folder(folder.folder_id.clone())));
        }
        Ok(children
            .item_named(path.name())
            .map(|item| Resource::Item(item.item_id.clone())))
    }

    async fn owner_folder(&self, path: &ServerPath) -> Result<FolderId> {
        match path.owner() {
            ServerPathOwner::User {
                firstname,
                lastname,
            } => {
                let user = self
                    .communicator
                    .get_user_by_name(firstname, lastname)
                    .await
                    .with_context(|| format!("Unknown user {firstname} {lastname}"))?;
                Ok(user.folder_id)
            }
            ServerPathOwner::Community { name } => {
                let community = self
                    .communicator
                    .get_community_by_name(name)
                    .await
                    .with_context(|| format!("Unknown community {name}"))?;
                Ok(community.folder_id)
            }
        }
    }
}
