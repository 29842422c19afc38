//! Folder, item, user and community calls
//!
//! Thin wrappers over [`MidasClient::call`] that convert Midas records into
//! the port DTOs of `midas-core`.

use midas_core::domain::newtypes::{CommunityId, FolderId, ItemId, UserId};
use midas_core::ports::{CommunityInfo, FolderChildren, FolderInfo, ItemInfo, UserInfo};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{wire, MidasClient};
use crate::MidasError;

// ============================================================================
// Midas record types
// ============================================================================

/// A folder record as returned by `midas.folder.*` and `midas.user.folders`
#[derive(Debug, Deserialize)]
struct MidasFolder {
    #[serde(deserialize_with = "wire::id")]
    folder_id: String,
    name: String,
    #[serde(default, deserialize_with = "wire::opt_id")]
    parent_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// An item record as returned by `midas.item.create` and `midas.folder.children`
#[derive(Debug, Deserialize)]
struct MidasItem {
    #[serde(deserialize_with = "wire::id")]
    item_id: String,
    name: String,
    #[serde(default, deserialize_with = "wire::opt_u64")]
    sizebytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MidasChildren {
    #[serde(default)]
    folders: Vec<MidasFolder>,
    #[serde(default)]
    items: Vec<MidasItem>,
}

#[derive(Debug, Deserialize)]
struct MidasUser {
    #[serde(deserialize_with = "wire::id")]
    user_id: String,
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    lastname: String,
    #[serde(deserialize_with = "wire::id")]
    folder_id: String,
}

#[derive(Debug, Deserialize)]
struct MidasCommunity {
    #[serde(deserialize_with = "wire::id")]
    community_id: String,
    name: String,
    #[serde(deserialize_with = "wire::id")]
    folder_id: String,
}

fn invalid_id(field: &str) -> impl FnOnce(midas_core::domain::DomainError) -> MidasError + '_ {
    move |e| MidasError::InvalidResponse(format!("{field}: {e}"))
}

impl TryFrom<MidasFolder> for FolderInfo {
    type Error = MidasError;

    fn try_from(folder: MidasFolder) -> Result<Self, Self::Error> {
        // Top-level folders report a sentinel parent such as -1 or 0
        let parent_id = folder
            .parent_id
            .filter(|p| !matches!(p.as_str(), "" | "-1" | "0"))
            .map(FolderId::new)
            .transpose()
            .map_err(invalid_id("parent_id"))?;
        Ok(FolderInfo {
            folder_id: FolderId::new(folder.folder_id).map_err(invalid_id("folder_id"))?,
            name: folder.name,
            parent_id,
            description: folder.description.filter(|d| !d.is_empty()),
        })
    }
}

impl TryFrom<MidasItem> for ItemInfo {
    type Error = MidasError;

    fn try_from(item: MidasItem) -> Result<Self, Self::Error> {
        Ok(ItemInfo {
            item_id: ItemId::new(item.item_id).map_err(invalid_id("item_id"))?,
            name: item.name,
            size: item.sizebytes,
        })
    }
}

// ============================================================================
// Calls
// ============================================================================

/// Lists the top-level folders of the logged-in user (`midas.user.folders`)
pub async fn list_user_folders(client: &MidasClient, token: &str) -> Result<Vec<FolderInfo>, MidasError> {
    let folders: Vec<MidasFolder> = client.call("midas.user.folders", &[("token", token)]).await?;
    folders.into_iter().map(FolderInfo::try_from).collect()
}

/// Gets a folder's attributes (`midas.folder.get`)
pub async fn folder_get(client: &MidasClient, token: &str, folder_id: &str) -> Result<FolderInfo, MidasError> {
    let folder: MidasFolder = client
        .call("midas.folder.get", &[("token", token), ("id", folder_id)])
        .await?;
    folder.try_into()
}

/// Lists the non-recursive children of a folder (`midas.folder.children`)
pub async fn folder_children(
    client: &MidasClient,
    token: &str,
    folder_id: &str,
) -> Result<FolderChildren, MidasError> {
    let children: MidasChildren = client
        .call("midas.folder.children", &[("token", token), ("id", folder_id)])
        .await?;
    Ok(FolderChildren {
        folders: children
            .folders
            .into_iter()
            .map(FolderInfo::try_from)
            .collect::<Result<_, _>>()?,
        items: children
            .items
            .into_iter()
            .map(ItemInfo::try_from)
            .collect::<Result<_, _>>()?,
    })
}

/// Creates a folder (`midas.folder.create`)
///
/// The server returns the existing folder when one of the same name is
/// already present under `parent`.
pub async fn create_folder(
    client: &MidasClient,
    token: &str,
    name: &str,
    parent: &str,
) -> Result<FolderInfo, MidasError> {
    let folder: MidasFolder = client
        .call(
            "midas.folder.create",
            &[("token", token), ("name", name), ("parentid", parent), ("description", "")],
        )
        .await?;
    debug!(name, folder_id = %folder.folder_id, "Folder created");
    folder.try_into()
}

/// Creates a public item (`midas.item.create`)
pub async fn create_item(
    client: &MidasClient,
    token: &str,
    name: &str,
    parent: &str,
) -> Result<ItemInfo, MidasError> {
    let item: MidasItem = client
        .call(
            "midas.item.create",
            &[("token", token), ("name", name), ("parentid", parent), ("privacy", "Public")],
        )
        .await?;
    debug!(name, item_id = %item.item_id, "Item created");
    item.try_into()
}

/// Deletes an item (`midas.item.delete`)
pub async fn delete_item(client: &MidasClient, token: &str, item_id: &str) -> Result<(), MidasError> {
    let _: Value = client
        .call("midas.item.delete", &[("token", token), ("id", item_id)])
        .await?;
    Ok(())
}

/// Looks a user up by name (`midas.user.get`)
pub async fn get_user_by_name(
    client: &MidasClient,
    firstname: &str,
    lastname: &str,
) -> Result<UserInfo, MidasError> {
    let user: MidasUser = client
        .call("midas.user.get", &[("firstname", firstname), ("lastname", lastname)])
        .await?;
    Ok(UserInfo {
        user_id: UserId::new(user.user_id).map_err(invalid_id("user_id"))?,
        firstname: user.firstname,
        lastname: user.lastname,
        folder_id: FolderId::new(user.folder_id).map_err(invalid_id("folder_id"))?,
    })
}

/// Looks a community up by name (`midas.community.get`)
pub async fn get_community_by_name(client: &MidasClient, name: &str) -> Result<CommunityInfo, MidasError> {
    let community: MidasCommunity = client.call("midas.community.get", &[("name", name)]).await?;
    Ok(CommunityInfo {
        community_id: CommunityId::new(community.community_id).map_err(invalid_id("community_id"))?,
        name: community.name,
        folder_id: FolderId::new(community.folder_id).map_err(invalid_id("folder_id"))?,
    })
}

/// Runs DICOM metadata extraction on an item (`midas.dicomextractor.extract`)
pub async fn extract_dicom_metadata(client: &MidasClient, token: &str, item_id: &str) -> Result<(), MidasError> {
    let _: Value = client
        .call("midas.dicomextractor.extract", &[("token", token), ("item", item_id)])
        .await?;
    Ok(())
}
