//! In-memory communicator for use case tests
//!
//! Models a small Midas server: folders and items live in maps, every call is
//! appended to a shared event log, and a single method can be made to fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use futures_util::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;

use crate::domain::newtypes::{
    ApiKey, CommunityId, Email, FolderId, ItemId, SessionToken, UploadToken, UserId,
};
use crate::ports::{
    CommunityInfo, DownloadedItem, FolderChildren, FolderInfo, ICommunicator, IItemUploadCallback,
    ItemInfo, UserInfo,
};

pub const PASSWORD: &str = "correct-horse";
pub const DEFAULT_API_KEY: &str = "default-api-key";
pub const SESSION_TOKEN: &str = "session-token-0001";
pub const TEMP_TOKEN: &str = "tmp42";
pub const OTP: &str = "123456";
pub const HOME_FOLDER: &str = "10";
pub const PRIVATE_FOLDER: &str = "1";
pub const PUBLIC_FOLDER: &str = "2";
pub const COMMUNITY_FOLDER: &str = "3";
/// Downloads are served in chunks of this many bytes
pub const DOWNLOAD_CHUNK: usize = 4;

/// One observed event, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Version,
    DefaultApiKey,
    Login { application: String },
    MfaLogin,
    ListUserFolders,
    FolderGet(String),
    FolderChildren(String),
    CreateFolder { name: String, parent: String },
    CreateItem { name: String, parent: String },
    DeleteItem(String),
    GenerateUploadToken { item: String, filename: String },
    PerformUpload { item: String, filename: String, len: usize },
    DownloadItem(String),
    GetUser,
    GetCommunity,
    ExtractDicom(String),
    Callback { tag: String, item: String },
}

#[derive(Debug, Clone)]
struct StoredFolder {
    name: String,
    parent: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredItem {
    name: String,
    parent: String,
    bitstreams: Vec<(String, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    folders: BTreeMap<String, StoredFolder>,
    items: BTreeMap<String, StoredItem>,
    known_checksums: HashSet<String>,
    pending_uploads: BTreeMap<String, String>,
}

/// In-memory [`ICommunicator`]
pub struct MockCommunicator {
    state: Mutex<State>,
    events: Arc<Mutex<Vec<Event>>>,
    fail_on: Mutex<Option<&'static str>>,
    mfa_enabled: bool,
    user_folders: Vec<&'static str>,
}

impl MockCommunicator {
    /// A server where user `jane doe` has home folder 10 holding `Private`
    /// (id 1) and `Public` (id 2), and the `Imaging` community owns folder 3
    pub fn new() -> Self {
        let mut state = State {
            next_id: 100,
            ..State::default()
        };
        for (id, name, parent) in [
            (HOME_FOLDER, "jane_doe", None),
            (PRIVATE_FOLDER, "Private", Some(HOME_FOLDER)),
            (PUBLIC_FOLDER, "Public", Some(HOME_FOLDER)),
            (COMMUNITY_FOLDER, "Imaging", None),
        ] {
            state.folders.insert(
                id.to_string(),
                StoredFolder {
                    name: name.to_string(),
                    parent: parent.map(str::to_string),
                },
            );
        }
        Self {
            state: Mutex::new(state),
            events: Arc::new(Mutex::new(Vec::new())),
            fail_on: Mutex::new(None),
            mfa_enabled: false,
            user_folders: vec![PRIVATE_FOLDER, PUBLIC_FOLDER],
        }
    }

    /// A server without any user folders
    pub fn without_user_folders() -> Self {
        Self {
            user_folders: Vec::new(),
            ..Self::new()
        }
    }

    pub fn with_mfa() -> Self {
        Self {
            mfa_enabled: true,
            ..Self::new()
        }
    }

    /// Makes every later call of `method` fail
    pub fn fail_on(&self, method: &'static str) {
        *self.fail_on.lock().unwrap() = Some(method);
    }

    /// Marks content as already present on the server
    pub fn know_checksum(&self, checksum: &str) {
        self.state
            .lock()
            .unwrap()
            .known_checksums
            .insert(checksum.to_string());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_log(&self) -> Arc<Mutex<Vec<Event>>> {
        Arc::clone(&self.events)
    }

    pub fn token(&self) -> SessionToken {
        SessionToken::new(SESSION_TOKEN).unwrap()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn folders_created(&self) -> usize {
        self.count(|e| matches!(e, Event::CreateFolder { .. }))
    }

    pub fn items_created(&self) -> usize {
        self.count(|e| matches!(e, Event::CreateItem { .. }))
    }

    pub fn uploads_performed(&self) -> usize {
        self.count(|e| matches!(e, Event::PerformUpload { .. }))
    }

    /// Names of bitstreams stored in the item named `name`
    pub fn bitstreams_of(&self, item_name: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .items
            .values()
            .find(|i| i.name == item_name)
            .map(|i| i.bitstreams.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    /// Name of the parent folder of the folder or item named `name`
    pub fn parent_name_of(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let parent = state
            .folders
            .values()
            .find(|f| f.name == name)
            .and_then(|f| f.parent.clone())
            .or_else(|| {
                state
                    .items
                    .values()
                    .find(|i| i.name == name)
                    .map(|i| i.parent.clone())
            })?;
        state.folders.get(&parent).map(|f| f.name.clone())
    }

    /// Inserts a folder without recording an event
    pub fn seed_folder(&self, name: &str, parent: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state);
        state.folders.insert(
            id.clone(),
            StoredFolder {
                name: name.to_string(),
                parent: Some(parent.to_string()),
            },
        );
        id
    }

    /// Inserts an item with bitstreams without recording an event
    pub fn seed_item(&self, name: &str, parent: &str, bitstreams: &[(&str, &[u8])]) -> String {
        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state);
        state.items.insert(
            id.clone(),
            StoredItem {
                name: name.to_string(),
                parent: parent.to_string(),
                bitstreams: bitstreams
                    .iter()
                    .map(|(n, d)| (n.to_string(), d.to_vec()))
                    .collect(),
            },
        );
        id
    }

    fn record(&self, event: Event, method: &'static str) -> Result<()> {
        self.events.lock().unwrap().push(event);
        if *self.fail_on.lock().unwrap() == Some(method) {
            bail!("injected failure in {method}");
        }
        Ok(())
    }

    fn folder_info(id: &str, folder: &StoredFolder) -> FolderInfo {
        FolderInfo {
            folder_id: FolderId::new(id).unwrap(),
            name: folder.name.clone(),
            parent_id: folder.parent.as_deref().map(|p| FolderId::new(p).unwrap()),
            description: None,
        }
    }

    fn item_info(id: &str, item: &StoredItem) -> ItemInfo {
        ItemInfo {
            item_id: ItemId::new(id).unwrap(),
            name: item.name.clone(),
            size: Some(item.bitstreams.iter().map(|(_, d)| d.len() as u64).sum()),
        }
    }
}

fn next_id(state: &mut State) -> String {
    state.next_id += 1;
    state.next_id.to_string()
}

#[async_trait::async_trait]
impl ICommunicator for MockCommunicator {
    async fn server_version(&self) -> Result<String> {
        self.record(Event::Version, "server_version")?;
        Ok("3.4.2".to_string())
    }

    async fn get_default_api_key(&self, _email: &Email, password: &str) -> Result<ApiKey> {
        self.record(Event::DefaultApiKey, "get_default_api_key")?;
        if password != PASSWORD {
            bail!("Login failed");
        }
        Ok(ApiKey::new(DEFAULT_API_KEY)?)
    }

    async fn login_with_api_key(
        &self,
        _email: &Email,
        _api_key: &ApiKey,
        application: &str,
    ) -> Result<SessionToken> {
        self.record(
            Event::Login {
                application: application.to_string(),
            },
            "login_with_api_key",
        )?;
        let token = if self.mfa_enabled {
            TEMP_TOKEN
        } else {
            SESSION_TOKEN
        };
        Ok(SessionToken::new(token)?)
    }

    async fn mfa_otp_login(
        &self,
        temp_token: &SessionToken,
        one_time_password: &str,
    ) -> Result<SessionToken> {
        self.record(Event::MfaLogin, "mfa_otp_login")?;
        if temp_token.as_str() != TEMP_TOKEN || one_time_password != OTP {
            bail!("invalid one-time password");
        }
        Ok(SessionToken::new(SESSION_TOKEN)?)
    }

    async fn list_user_folders(&self, _token: &SessionToken) -> Result<Vec<FolderInfo>> {
        self.record(Event::ListUserFolders, "list_user_folders")?;
        let state = self.state.lock().unwrap();
        Ok(self
            .user_folders
            .iter()
            .filter_map(|id| state.folders.get(*id).map(|f| Self::folder_info(id, f)))
            .collect())
    }

    async fn folder_get(&self, _token: &SessionToken, folder_id: &FolderId) -> Result<FolderInfo> {
        self.record(Event::FolderGet(folder_id.to_string()), "folder_get")?;
        let state = self.state.lock().unwrap();
        state
            .folders
            .get(folder_id.as_str())
            .map(|f| Self::folder_info(folder_id.as_str(), f))
            .ok_or_else(|| anyhow!("no folder {folder_id}"))
    }

    async fn folder_children(
        &self,
        _token: &SessionToken,
        folder_id: &FolderId,
    ) -> Result<FolderChildren> {
        self.record(
            Event::FolderChildren(folder_id.to_string()),
            "folder_children",
        )?;
        let state = self.state.lock().unwrap();
        Ok(FolderChildren {
            folders: state
                .folders
                .iter()
                .filter(|(_, f)| f.parent.as_deref() == Some(folder_id.as_str()))
                .map(|(id, f)| Self::folder_info(id, f))
                .collect(),
            items: state
                .items
                .iter()
                .filter(|(_, i)| i.parent == folder_id.as_str())
                .map(|(id, i)| Self::item_info(id, i))
                .collect(),
        })
    }

    async fn create_folder(
        &self,
        _token: &SessionToken,
        name: &str,
        parent: &FolderId,
    ) -> Result<FolderInfo> {
        self.record(
            Event::CreateFolder {
                name: name.to_string(),
                parent: parent.to_string(),
            },
            "create_folder",
        )?;
        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state);
        let folder = StoredFolder {
            name: name.to_string(),
            parent: Some(parent.to_string()),
        };
        let info = Self::folder_info(&id, &folder);
        state.folders.insert(id, folder);
        Ok(info)
    }

    async fn create_item(
        &self,
        _token: &SessionToken,
        name: &str,
        parent: &FolderId,
    ) -> Result<ItemInfo> {
        self.record(
            Event::CreateItem {
                name: name.to_string(),
                parent: parent.to_string(),
            },
            "create_item",
        )?;
        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state);
        let item = StoredItem {
            name: name.to_string(),
            parent: parent.to_string(),
            bitstreams: Vec::new(),
        };
        let info = Self::item_info(&id, &item);
        state.items.insert(id, item);
        Ok(info)
    }

    async fn delete_item(&self, _token: &SessionToken, item_id: &ItemId) -> Result<()> {
        self.record(Event::DeleteItem(item_id.to_string()), "delete_item")?;
        self.state.lock().unwrap().items.remove(item_id.as_str());
        Ok(())
    }

    async fn generate_upload_token(
        &self,
        _token: &SessionToken,
        item_id: &ItemId,
        filename: &str,
        checksum: Option<&str>,
    ) -> Result<Option<UploadToken>> {
        self.record(
            Event::GenerateUploadToken {
                item: item_id.to_string(),
                filename: filename.to_string(),
            },
            "generate_upload_token",
        )?;
        let mut state = self.state.lock().unwrap();
        if checksum.is_some_and(|c| state.known_checksums.contains(c)) {
            if let Some(item) = state.items.get_mut(item_id.as_str()) {
                item.bitstreams.push((filename.to_string(), Vec::new()));
            }
            return Ok(None);
        }
        let upload_token = format!("upload-{}", next_id(&mut state));
        state
            .pending_uploads
            .insert(upload_token.clone(), item_id.to_string());
        Ok(Some(UploadToken::new(upload_token)?))
    }

    async fn perform_upload(
        &self,
        upload_token: &UploadToken,
        filename: &str,
        item_id: &ItemId,
        mut file: tokio::fs::File,
        length: u64,
    ) -> Result<()> {
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        if data.len() as u64 != length {
            bail!("declared length {length}, sent {}", data.len());
        }
        self.record(
            Event::PerformUpload {
                item: item_id.to_string(),
                filename: filename.to_string(),
                len: data.len(),
            },
            "perform_upload",
        )?;
        let mut state = self.state.lock().unwrap();
        match state.pending_uploads.remove(upload_token.as_str()) {
            Some(expected) if expected == item_id.as_str() => {}
            _ => bail!("invalid upload token"),
        }
        let item = state
            .items
            .get_mut(item_id.as_str())
            .ok_or_else(|| anyhow!("no item {item_id}"))?;
        item.bitstreams.push((filename.to_string(), data));
        Ok(())
    }

    async fn download_item(
        &self,
        _token: &SessionToken,
        item_id: &ItemId,
    ) -> Result<DownloadedItem> {
        self.record(Event::DownloadItem(item_id.to_string()), "download_item")?;
        let state = self.state.lock().unwrap();
        let item = state
            .items
            .get(item_id.as_str())
            .ok_or_else(|| anyhow!("no item {item_id}"))?;
        let (filename, content) = item
            .bitstreams
            .first()
            .cloned()
            .unwrap_or_else(|| (item.name.clone(), Vec::new()));
        let chunks: Vec<Result<Vec<u8>>> = content
            .chunks(DOWNLOAD_CHUNK)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        Ok(DownloadedItem {
            filename,
            content: stream::iter(chunks).boxed(),
        })
    }

    async fn get_user_by_name(&self, firstname: &str, lastname: &str) -> Result<UserInfo> {
        self.record(Event::GetUser, "get_user_by_name")?;
        if (firstname, lastname) != ("jane", "doe") {
            bail!("no such user");
        }
        Ok(UserInfo {
            user_id: UserId::new("7")?,
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            folder_id: FolderId::new(HOME_FOLDER)?,
        })
    }

    async fn get_community_by_name(&self, name: &str) -> Result<CommunityInfo> {
        self.record(Event::GetCommunity, "get_community_by_name")?;
        if name != "Imaging" {
            bail!("no such community");
        }
        Ok(CommunityInfo {
            community_id: CommunityId::new("9")?,
            name: name.to_string(),
            folder_id: FolderId::new(COMMUNITY_FOLDER)?,
        })
    }

    async fn extract_dicom_metadata(&self, _token: &SessionToken, item_id: &ItemId) -> Result<()> {
        self.record(
            Event::ExtractDicom(item_id.to_string()),
            "extract_dicom_metadata",
        )
    }
}

/// Callback that appends `Event::Callback` to a shared log
pub struct RecordingCallback {
    pub tag: &'static str,
    pub events: Arc<Mutex<Vec<Event>>>,
    pub fail: bool,
}

impl RecordingCallback {
    pub fn new(tag: &'static str, events: Arc<Mutex<Vec<Event>>>) -> Self {
        Self {
            tag,
            events,
            fail: false,
        }
    }

    pub fn failing(tag: &'static str, events: Arc<Mutex<Vec<Event>>>) -> Self {
        Self {
            tag,
            events,
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl IItemUploadCallback for RecordingCallback {
    async fn on_item_uploaded(
        &self,
        _communicator: &dyn ICommunicator,
        _token: &SessionToken,
        item_id: &ItemId,
    ) -> Result<()> {
        self.events.lock().unwrap().push(Event::Callback {
            tag: self.tag.to_string(),
            item: item_id.to_string(),
        });
        if self.fail {
            bail!("callback {} failed", self.tag);
        }
        Ok(())
    }
}
