use crate::error::{ClientError, ClientResult};
use pushsync_sdk::DeviceToken;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Preferences file (namespace) holding the device token.
pub const PREFS_NAMESPACE: &str = "push_prefs";
/// Key of the device token inside the preferences file.
pub const DEVICE_ID_KEY: &str = "device_id";

/// 设备令牌的本地持久化存储
///
/// Single key, last writer wins.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> ClientResult<Option<DeviceToken>>;
    fn set(&self, token: &DeviceToken) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Token store backed by a JSON preferences file.
pub struct FileTokenStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{PREFS_NAMESPACE}.json")),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_prefs(&self) -> ClientResult<BTreeMap<String, String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&text).map_err(|e| {
            ClientError::Storage(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write_prefs(&self, prefs: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let text = serde_json::to_string_pretty(prefs)
            .map_err(|e| ClientError::Storage(format!("Failed to encode preferences: {e}")))?;

        // 先写临时文件再重命名，读者不会看到写了一半的文件
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, text).map_err(|e| {
            ClientError::Storage(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            ClientError::Storage(format!("Failed to replace {}: {e}", self.path.display()))
        })
    }

    fn update<F>(&self, edit: F) -> ClientResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ClientError::Storage("token store lock poisoned".to_string()))?;
        let mut prefs = self.read_prefs()?;
        edit(&mut prefs);
        self.write_prefs(&prefs)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> ClientResult<Option<DeviceToken>> {
        let prefs = self.read_prefs()?;
        Ok(prefs.get(DEVICE_ID_KEY).cloned().and_then(DeviceToken::new))
    }

    fn set(&self, token: &DeviceToken) -> ClientResult<()> {
        self.update(|prefs| {
            prefs.insert(DEVICE_ID_KEY.to_string(), token.as_str().to_string());
        })?;
        debug!(path = %self.path.display(), token = %token.redacted(), "stored device token");
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        self.update(|prefs| {
            prefs.remove(DEVICE_ID_KEY);
        })?;
        debug!(path = %self.path.display(), "cleared device token");
        Ok(())
    }
}

/// In-process token store.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<DeviceToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: DeviceToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    fn slot(&self) -> ClientResult<std::sync::MutexGuard<'_, Option<DeviceToken>>> {
        self.token
            .lock()
            .map_err(|_| ClientError::Storage("token store lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> ClientResult<Option<DeviceToken>> {
        Ok(self.slot()?.clone())
    }

    fn set(&self, token: &DeviceToken) -> ClientResult<()> {
        *self.slot()? = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}
