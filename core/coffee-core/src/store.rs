//! Durable key-value storage for session and schedule state.
//!
//! Every value is a string; structured values are JSON encoded by the caller.
//! Operations are single-key and atomic. There are no transactions, so
//! concurrent writers to the same key get last-writer-wins semantics.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "caffeinate_pid": "4242",
//!     "monday": "{\"day\":\"monday\",...}"
//!   }
//! }
//! ```
//!
//! The file is re-read on every operation because the CLI and the detached
//! monitor process share it. Writes hold an exclusive lock on a sibling
//! `state.lock` for the whole read-modify-write, so writers to different keys
//! never lose each other's updates. Reads take no lock; the rename on commit
//! is atomic. Empty, corrupt or wrong-version files load as an empty store;
//! the next write overwrites them.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{CoffeeError, Result};

/// Persisted keys owned by the session controller.
pub mod keys {
    pub const SESSION_PID: &str = "caffeinate_pid";
    pub const SESSION_RESOURCE: &str = "caffeinate_resource";
    pub const SESSION_INFO: &str = "caffeination_info";
    pub const WATCH_MONITOR: &str = "watch_monitor";
}

const STORE_VERSION: u32 = 1;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: BTreeMap<String, String>,
}

impl Default for StoreFile {
    fn default() -> Self {
        StoreFile {
            version: STORE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON-file backed store.
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    pub fn new(path: &Path) -> Self {
        FileStore {
            path: path.to_path_buf(),
            lock_path: path.with_extension("lock"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> Result<&Path> {
        self.path
            .parent()
            .ok_or_else(|| CoffeeError::io("state store path has no parent", not_found()))
    }

    /// Blocks until no other writer, in this process or another, holds the
    /// store. The lock is released when the returned file is dropped.
    fn lock_for_write(&self) -> Result<fs::File> {
        fs::create_dir_all(self.parent_dir()?)
            .map_err(|e| CoffeeError::io("create state store directory", e))?;
        // Never truncated; only its lock matters.
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| CoffeeError::io("open state store lock", e))?;
        file.file()
            .lock_exclusive()
            .map_err(|e| CoffeeError::io("lock state store", e))?;
        Ok(file)
    }

    fn load(&self) -> StoreFile {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return StoreFile::default();
            }
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "Failed to read state store");
                return StoreFile::default();
            }
        };

        if content.trim().is_empty() {
            return StoreFile::default();
        }

        match serde_json::from_str::<StoreFile>(&content) {
            Ok(file) if file.version == STORE_VERSION => file,
            Ok(file) => {
                warn!(
                    version = file.version,
                    expected = STORE_VERSION,
                    "Unsupported state store version, treating as empty"
                );
                StoreFile::default()
            }
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "Corrupt state store, treating as empty");
                StoreFile::default()
            }
        }
    }

    fn save(&self, file: &StoreFile) -> Result<()> {
        let parent_dir = self.parent_dir()?;
        let content =
            serde_json::to_string_pretty(file).map_err(|e| CoffeeError::json("serialize state", e))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| CoffeeError::io("create temp state file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| CoffeeError::io("write temp state file", e))?;
        temp_file
            .flush()
            .map_err(|e| CoffeeError::io("flush temp state file", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| CoffeeError::io("commit state file", e.error))?;
        Ok(())
    }

    fn modify(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let _lock = self.lock_for_write()?;
        let mut file = self.load();
        if apply(&mut file.entries) {
            self.save(&file)?;
        }
        Ok(())
    }
}

fn not_found() -> std::io::Error {
    std::io::Error::from(std::io::ErrorKind::NotFound)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().entries.remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.modify(|entries| entries.remove(key).is_some())
    }
}

/// In-process store for tests and hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }
}

/// Reads and decodes a JSON value.
///
/// Missing keys are `Ok(None)`; undecodable values are `CorruptState` so the
/// caller can log them before treating them as absent.
pub fn get_json<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = store.get(key) else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CoffeeError::CorruptState {
            key: key.to_string(),
            details: e.to_string(),
        })
}

pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| CoffeeError::json(key.to_string(), e))?;
    store.set(key, &raw)
}
