//! State correlation store
//!
//! Maps each logical resource name to the remote object created for it, so
//! a later delete can target the right remote resource. Two stores ship with
//! the crate: [`MemoryStateStore`] for embedding and tests, and
//! [`FileStateStore`], a JSON file shared across CLI invocations.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::resource::ResourceKind;

const STATE_VERSION: u32 = 1;

/// What is known about one created resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Platform-assigned numeric id, as a string
    pub remote_id: String,
    pub kind: ResourceKind,
    /// Zone of zonal kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Runtime facts discovered after creation, e.g. `ip`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(remote_id: impl Into<String>, kind: ResourceKind, zone: Option<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            kind,
            zone,
            attributes: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Durable map of logical name to [`StateRecord`]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert or replace the record for a logical name
    async fn put(&self, logical_name: &str, record: StateRecord) -> Result<()>;

    async fn get(&self, logical_name: &str) -> Result<Option<StateRecord>>;

    /// Remove the record, returning it if it existed
    async fn remove(&self, logical_name: &str) -> Result<Option<StateRecord>>;

    /// Every record, sorted by logical name
    async fn list(&self) -> Result<Vec<(String, StateRecord)>>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, StateRecord>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn put(&self, logical_name: &str, record: StateRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(logical_name.to_string(), record);
        Ok(())
    }

    async fn get(&self, logical_name: &str) -> Result<Option<StateRecord>> {
        Ok(self.records.lock().await.get(logical_name).cloned())
    }

    async fn remove(&self, logical_name: &str) -> Result<Option<StateRecord>> {
        Ok(self.records.lock().await.remove(logical_name))
    }

    async fn list(&self) -> Result<Vec<(String, StateRecord)>> {
        let records = self.records.lock().await;
        let mut entries: Vec<_> = records
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

/// On-disk layout of the state file
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    resources: BTreeMap<String, StateRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

/// JSON file store
///
/// Each mutation is a read-modify-write under an in-process lock. The new
/// content is written to a sibling temp file and renamed over the old one;
/// the previous version is kept as `<file>.backup`. Concurrent writers in
/// different processes are not coordinated.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    async fn load(&self) -> Result<StateFile> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("State file {} not found, starting empty", self.path.display());
            return Ok(StateFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| state_error("read", &self.path, e))?;
        let state: StateFile = serde_json::from_str(&content)
            .map_err(|e| state_error("parse", &self.path, e))?;

        if state.version > STATE_VERSION {
            return Err(CoreError::State(format!(
                "state file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }
        Ok(state)
    }

    async fn save(&self, mut state: StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| state_error("create directory for", &self.path, e))?;
        }

        state.updated_at = Utc::now();
        let content = serde_json::to_string_pretty(&state)
            .map_err(|e| state_error("serialize", &self.path, e))?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            fs::copy(&self.path, self.sibling(".backup"))
                .await
                .map_err(|e| state_error("back up", &self.path, e))?;
        }

        let tmp = self.sibling(".tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| state_error("write", &tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| state_error("replace", &self.path, e))?;

        debug!(
            "Saved {} record(s) to {}",
            state.resources.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn state_error(action: &str, path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::State(format!("failed to {} {}: {}", action, path.display(), err))
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn put(&self, logical_name: &str, record: StateRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        state.resources.insert(logical_name.to_string(), record);
        self.save(state).await
    }

    async fn get(&self, logical_name: &str) -> Result<Option<StateRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.resources.remove(logical_name))
    }

    async fn remove(&self, logical_name: &str) -> Result<Option<StateRecord>> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let removed = state.resources.remove(logical_name);
        if removed.is_some() {
            self.save(state).await?;
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<(String, StateRecord)>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.resources.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(id: &str) -> StateRecord {
        StateRecord::new(id, ResourceKind::Instance, Some("us-central1-a".to_string()))
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::new();
        assert!(store.get("web-1").await.unwrap().is_none());

        store.put("web-1", record("123456")).await.unwrap();
        store.put("db-1", record("789")).await.unwrap();
        assert_eq!(store.get("web-1").await.unwrap().unwrap().remote_id, "123456");

        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["db-1", "web-1"]);

        assert!(store.remove("web-1").await.unwrap().is_some());
        assert!(store.remove("web-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::new(&path);
        store
            .put("web-1", record("123456").with_attribute("ip", "10.0.0.2"))
            .await
            .unwrap();

        let reopened = FileStateStore::new(&path);
        let loaded = reopened.get("web-1").await.unwrap().unwrap();
        assert_eq!(loaded.remote_id, "123456");
        assert_eq!(loaded.kind, ResourceKind::Instance);
        assert_eq!(loaded.attribute("ip"), Some("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_file_store_backup_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = FileStateStore::new(&path);

        assert!(store.get("web-1").await.unwrap().is_none());
        assert!(store.remove("web-1").await.unwrap().is_none());
        assert!(!path.exists());

        store.put("web-1", record("1")).await.unwrap();
        store.put("web-2", record("2")).await.unwrap();
        assert!(dir.path().join("nested").join("state.json.backup").exists());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());

        let removed = store.remove("web-1").await.unwrap().unwrap();
        assert_eq!(removed.remote_id, "1");
        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["web-2"]);
    }

    #[tokio::test]
    async fn test_file_store_rejects_newer_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"version": 99, "updated_at": "2026-01-01T00:00:00Z", "resources": {}}"#,
        )
        .unwrap();

        let err = FileStateStore::new(&path).get("web-1").await.unwrap_err();
        assert!(matches!(err, CoreError::State(_)));
        assert!(err.to_string().contains("newer than supported"));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStateStore::new(&path).list().await.unwrap_err();
        assert!(matches!(err, CoreError::State(_)));
    }
}
