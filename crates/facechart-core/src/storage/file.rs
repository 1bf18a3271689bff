//! File-based storage implementation.

use super::{PENDING_QUEUE_KEY, SessionRepository, StorageError, StorageResult};
use crate::config::StorageConfig;
use crate::model::TreatmentSession;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-based queue storage.
///
/// The queue is kept as one JSON array in `<base>/facechart_pending_sessions.json`.
pub struct FileStorage {
    /// Base directory for the queue file.
    base_path: PathBuf,
    /// Serializes read-modify-write cycles on the queue file.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/facechart/`
    /// On Windows: `%LOCALAPPDATA%\facechart\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("facechart"))
    }

    /// File storage in the configured data directory, or the default location.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        match &config.data_dir {
            Some(dir) => Self::new(dir.clone()),
            None => Self::default_location(),
        }
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the queue file.
    pub fn queue_path(&self) -> PathBuf {
        self.key_path(PENDING_QUEUE_KEY)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    fn read_queue(&self) -> StorageResult<Vec<TreatmentSession>> {
        let path = self.queue_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path).map_err(|e| {
            StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Staging file the queue is written to before replacing the real one.
    fn staging_path(&self) -> PathBuf {
        self.queue_path().with_extension("json.tmp")
    }

    /// Write the queue through a staging file. A write that fails partway
    /// leaves the previous queue in place.
    fn write_queue(&self, sessions: &[TreatmentSession]) -> StorageResult<()> {
        let path = self.queue_path();
        let staging = self.staging_path();
        let json = serde_json::to_string_pretty(sessions)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        fs::write(&staging, json).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        fs::rename(&staging, &path).map_err(|e| {
            StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))
    }
}

impl SessionRepository for FileStorage {
    fn save(&self, session: &TreatmentSession) -> StorageResult<()> {
        let _guard = self.lock()?;
        let mut queue = self.read_queue()?;
        queue.push(session.clone());
        self.write_queue(&queue)
    }

    fn load_pending_queue(&self) -> StorageResult<Vec<TreatmentSession>> {
        self.read_queue()
    }

    fn clear_pending_queue(&self) -> StorageResult<()> {
        let _guard = self.lock()?;
        let path = self.queue_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn replace_pending_queue(&self, sessions: &[TreatmentSession]) -> StorageResult<()> {
        let _guard = self.lock()?;
        self.write_queue(sessions)
    }
}
