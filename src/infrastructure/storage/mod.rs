//! File-based storage implementation

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{
    AdminAddition, AdminRemoval, ConfigRecord, CountryCode, Document, PanelCredentials, SenderId,
};
use crate::domain::traits::ConfigStore;

/// JSON file-backed config store.
///
/// The file is shared with the monitor process, so every call re-reads it
/// and every mutation writes it back (via a temp file and rename) while
/// holding the write lock. Without a path the store lives in memory only.
pub struct JsonConfigStore {
    path: Option<PathBuf>,
    record: Arc<RwLock<ConfigRecord>>,
}

impl JsonConfigStore {
    /// Opens the store at `path`. A missing file is not an error: it is
    /// created on the first mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let record = read_record(&path).await?.unwrap_or_default();
        tracing::debug!("Opened config store at {}", path.display());
        Ok(Self {
            path: Some(path),
            record: Arc::new(RwLock::new(record)),
        })
    }

    pub fn in_memory() -> Self {
        Self::with_record(ConfigRecord::default())
    }

    pub fn with_record(record: ConfigRecord) -> Self {
        Self {
            path: None,
            record: Arc::new(RwLock::new(record)),
        }
    }

    /// `BOT_TOKEN` kept in the record by the monitor's installer, if any
    pub async fn bot_token(&self) -> Result<Option<String>, StorageError> {
        let record = self.snapshot().await?;
        Ok(record
            .extra
            .get("BOT_TOKEN")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }

    async fn current(&self, cached: &ConfigRecord) -> Result<ConfigRecord, StorageError> {
        match &self.path {
            Some(path) => Ok(read_record(path).await?.unwrap_or_else(|| cached.clone())),
            None => Ok(cached.clone()),
        }
    }

    async fn snapshot(&self) -> Result<ConfigRecord, StorageError> {
        let cached = self.record.read().await;
        self.current(&cached).await
    }

    /// Applies `f` to the latest record and persists it if anything changed
    async fn mutate<T>(&self, f: impl FnOnce(&mut ConfigRecord) -> T) -> Result<T, StorageError> {
        let mut cached = self.record.write().await;
        let base = self.current(&cached).await?;
        let mut next = base.clone();
        let out = f(&mut next);
        if next != base {
            self.persist(&next).await?;
        }
        *cached = next;
        Ok(out)
    }

    async fn persist(&self, record: &ConfigRecord) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(record)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

async fn read_record(path: &Path) -> Result<Option<ConfigRecord>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn get_admins(&self) -> Result<Vec<SenderId>, StorageError> {
        Ok(self.snapshot().await?.admins)
    }

    async fn bootstrap_admin(&self, id: SenderId) -> Result<bool, StorageError> {
        self.mutate(|r| r.bootstrap_admin(id)).await
    }

    async fn add_admin(&self, id: SenderId) -> Result<AdminAddition, StorageError> {
        self.mutate(|r| r.add_admin(id)).await
    }

    async fn remove_admin(&self, id: SenderId) -> Result<AdminRemoval, StorageError> {
        self.mutate(|r| r.remove_admin(id)).await
    }

    async fn get_config(&self) -> Result<ConfigRecord, StorageError> {
        self.snapshot().await
    }

    async fn set_panel_credentials(&self, credentials: &PanelCredentials) -> Result<(), StorageError> {
        self.mutate(|r| r.set_panel_credentials(credentials)).await
    }

    async fn upsert_special_limit(&self, username: &str, limit: u32) -> Result<bool, StorageError> {
        self.mutate(|r| r.upsert_special_limit(username, limit)).await
    }

    async fn list_special_limits(&self) -> Result<Vec<(String, u32)>, StorageError> {
        Ok(self.snapshot().await?.special_limits.into_iter().collect())
    }

    async fn add_except_user(&self, username: &str) -> Result<bool, StorageError> {
        self.mutate(|r| r.add_except_user(username)).await
    }

    async fn remove_except_user(&self, username: &str) -> Result<bool, StorageError> {
        self.mutate(|r| r.remove_except_user(username)).await
    }

    async fn list_except_users(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.snapshot().await?.except_users)
    }

    async fn set_country_code(&self, code: CountryCode) -> Result<(), StorageError> {
        self.mutate(|r| r.country_code = code).await
    }

    async fn set_general_limit(&self, limit: u32) -> Result<(), StorageError> {
        self.mutate(|r| r.general_limit = limit).await
    }

    async fn set_check_interval(&self, seconds: u64) -> Result<(), StorageError> {
        self.mutate(|r| r.check_interval = seconds).await
    }

    async fn set_active_window(&self, seconds: u64) -> Result<(), StorageError> {
        self.mutate(|r| r.time_to_active_users = seconds).await
    }

    async fn backup(&self) -> Result<Option<Document>, StorageError> {
        let cached = self.record.read().await;
        let (file_name, bytes) = match &self.path {
            Some(path) => {
                let bytes = match tokio::fs::read(path).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "config.json".to_string());
                (name, bytes)
            }
            None => ("config.json".to_string(), serde_json::to_vec_pretty(&*cached)?),
        };
        Ok(Some(Document { file_name, bytes, caption: None }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("spernet-store-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[tokio::test]
    async fn test_missing_file_is_created_on_first_write() {
        let path = temp_path();
        let store = JsonConfigStore::open(&path).await.unwrap();
        assert!(store.backup().await.unwrap().is_none());

        assert!(store.bootstrap_admin(SenderId(42)).await.unwrap());
        let doc = store.backup().await.unwrap().unwrap();
        assert_eq!(doc.file_name, "config.json");

        let reopened = JsonConfigStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_admins().await.unwrap(), vec![SenderId(42)]);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_external_edits_are_preserved() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"ADMINS":[1],"BOT_TOKEN":"123:abc"}"#).unwrap();
        let store = JsonConfigStore::open(&path).await.unwrap();

        // The monitor rewrites the file behind our back.
        std::fs::write(&path, r#"{"ADMINS":[1],"BOT_TOKEN":"123:abc","GENERAL_LIMIT":9}"#).unwrap();
        store.set_check_interval(300).await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["GENERAL_LIMIT"], 9);
        assert_eq!(raw["CHECK_INTERVAL"], 300);
        assert_eq!(store.bot_token().await.unwrap().as_deref(), Some("123:abc"));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_bootstrap_admits_one() {
        let store = Arc::new(JsonConfigStore::in_memory());
        let mut handles = Vec::new();
        for id in 1..=8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.bootstrap_admin(SenderId(id)).await.unwrap() }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(store.get_admins().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_special_limit_upsert() {
        let store = JsonConfigStore::in_memory();
        assert!(!store.upsert_special_limit("alice", 4).await.unwrap());
        assert!(store.upsert_special_limit("alice", 7).await.unwrap());
        assert_eq!(store.list_special_limits().await.unwrap(), vec![("alice".to_string(), 7)]);
    }
}
