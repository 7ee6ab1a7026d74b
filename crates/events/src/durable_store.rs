//! Durable connection state store backed by a JSON file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::state::ConnectionState;
use crate::store::ConnectionStateStore;

/// On-disk envelope around a [`ConnectionState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredState {
    #[serde(flatten)]
    state: ConnectionState,
    updated_at: DateTime<Utc>,
}

/// A state store that survives restarts of the operator process.
///
/// Each save writes a uniquely named sibling temp file, syncs it and renames
/// it over the target, so the file on disk always holds one complete record.
/// On Unix the file is readable by its owner only.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    /// Create a store that persists to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time of the last save, if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read().await?.map(|stored| stored.updated_at))
    }

    async fn read(&self) -> Result<Option<StoredState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(waltz_core::Error::file_read_failed(&self.path, e.to_string()).into())
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::serialization(e.to_string()))
    }
}

#[async_trait]
impl ConnectionStateStore for JsonFileStateStore {
    async fn load(&self) -> Result<ConnectionState> {
        Ok(self.read().await?.map(|stored| stored.state).unwrap_or_default())
    }

    async fn save(&self, state: &ConnectionState) -> Result<()> {
        let stored = StoredState {
            state: state.clone(),
            updated_at: Utc::now(),
        };
        let encoded =
            serde_json::to_vec_pretty(&stored).map_err(|e| Error::serialization(e.to_string()))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &encoded))
            .await
            .map_err(|e| Error::store_failed("save", e.to_string()))?
    }
}

/// Write `bytes` to `path` through a synced, owner-only temp file that is
/// renamed into place.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| waltz_core::Error::file_write_failed(dir, e.to_string()))?;

    let temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| waltz_core::Error::file_write_failed(dir, e.to_string()))?;

    // The record carries the database password.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(|e| waltz_core::Error::file_write_failed(temp.path(), e.to_string()))?;
    }

    let mut file = temp.as_file();
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| waltz_core::Error::file_write_failed(temp.path(), e.to_string()))?;

    temp.persist(path)
        .map_err(|e| Error::store_failed("save", e.error.to_string()))?;
    Ok(())
}
