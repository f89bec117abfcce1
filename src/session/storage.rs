//! Durable key-value storage for session credentials.
//!
//! Two backends:
//! - [`FileStorage`]: a single JSON object in `<work_dir>/session.json`
//!   (mode 0600 on unix), rewritten on every mutation.
//! - [`MemoryStorage`]: process memory; nothing survives the process.
//!
//! Calls are blocking but tiny; the session store never holds its lock
//! while calling into storage from async code paths that await.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Storage key holding the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "exeloka_token";
/// Storage key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "exeloka_refresh_token";
/// Storage key holding a serialised user fixture (testing bypass only).
pub const USER_FIXTURE_KEY: &str = "exeloka_user";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("cannot write {path}: {reason}")]
    Write { path: String, reason: String },
    #[error("malformed {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Pluggable credential storage.
pub trait Storage: Send + Sync {
    /// Backend name for logs (e.g. `"file"`).
    fn kind(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns `true` if the key existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

// ── File ──────────────────────────────────────────────────────────────────────

/// JSON-file storage. Every call re-reads the file so that two processes
/// sharing a work dir see each other's logins.
pub struct FileStorage {
    path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|e| StorageError::Read {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).map_err(|e| StorageError::Malformed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_err = |reason: String| StorageError::Write {
            path: self.path.display().to_string(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
            }
        }
        let data = serde_json::to_string_pretty(map).map_err(|e| write_err(e.to_string()))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // Applies only when the file is created.
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| write_err(e.to_string()))?;

        // A file created by an older build may still carry umask bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| write_err(format!("cannot set permissions: {e}")))?;
        }

        file.write_all(data.as_bytes()).map_err(|e| write_err(e.to_string()))?;

        Ok(())
    }
}

impl Storage for FileStorage {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map)?;
        }
        Ok(existed)
    }
}

// ── Memory ────────────────────────────────────────────────────────────────────

/// Ephemeral in-memory storage.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded storage, handy for hydration tests.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { data: Mutex::new(data) }
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data.remove(key).is_some())
    }
}
