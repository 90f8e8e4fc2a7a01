//! Local snapshot persistence for the draft list and the clip bin.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storyshot_core::shot::Shot;
use tokio::sync::Mutex;

use crate::clip_bin::BinClip;
use crate::error::StorageError;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything persisted locally, serialized as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub version: u32,
    #[serde(default)]
    pub shots: Vec<Shot>,
    #[serde(default)]
    pub clips: Vec<BinClip>,
}

impl Default for DraftSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            shots: Vec::new(),
            clips: Vec::new(),
        }
    }
}

#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Read the stored snapshot. `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<DraftSnapshot>, StorageError>;

    async fn save(&self, snapshot: &DraftSnapshot) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// File storage
// ---------------------------------------------------------------------------

/// JSON file on disk, replaced atomically on every save.
pub struct FileSnapshotStorage {
    path: PathBuf,
}

impl FileSnapshotStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "drafts.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStorage for FileSnapshotStorage {
    async fn load(&self) -> Result<Option<DraftSnapshot>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, snapshot: &DraftSnapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory storage
// ---------------------------------------------------------------------------

/// Keeps the snapshot in memory. Used in tests and when no path is set.
#[derive(Default)]
pub struct MemorySnapshotStorage {
    snapshot: Mutex<Option<DraftSnapshot>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a snapshot, as if left by a previous run.
    pub fn with_snapshot(snapshot: DraftSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    pub async fn current(&self) -> Option<DraftSnapshot> {
        self.snapshot.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn load(&self) -> Result<Option<DraftSnapshot>, StorageError> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save(&self, snapshot: &DraftSnapshot) -> Result<(), StorageError> {
        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyshot_core::shot::DialogueBlock;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSnapshotStorage::new(dir.path().join("drafts.json"));
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_snapshot_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSnapshotStorage::new(dir.path().join("nested/drafts.json"));
        let snapshot = DraftSnapshot {
            shots: vec![Shot::new(
                "Opening",
                vec![DialogueBlock::new("charA", "Hello")],
                chrono::Utc::now(),
            )],
            ..Default::default()
        };

        storage.save(&snapshot).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), Some(snapshot));
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        std::fs::write(&path, b"{not json").unwrap();
        let storage = FileSnapshotStorage::new(path);
        assert!(matches!(storage.load().await, Err(StorageError::Format(_))));
    }
}
