//! Persistence for the pending-sync queue.
//!
//! Only completed sessions awaiting sync are durable. The in-progress chart is
//! deliberately not persisted.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSave, DEFAULT_AUTOSAVE_INTERVAL_SECS};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::model::TreatmentSession;
use thiserror::Error;

/// Namespaced key the pending queue is stored under.
pub const PENDING_QUEUE_KEY: &str = "facechart.pending_sessions";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Repository for sessions awaiting sync.
///
/// The queue is ordered by completion. Implementations must keep whole
/// sessions, including nested points, annotations, photos and notes.
pub trait SessionRepository: Send + Sync {
    /// Append a completed session to the persisted queue.
    fn save(&self, session: &TreatmentSession) -> StorageResult<()>;

    /// Load the persisted queue in completion order.
    fn load_pending_queue(&self) -> StorageResult<Vec<TreatmentSession>>;

    /// Remove every persisted session.
    fn clear_pending_queue(&self) -> StorageResult<()>;

    /// Replace the persisted queue with `sessions`.
    fn replace_pending_queue(&self, sessions: &[TreatmentSession]) -> StorageResult<()> {
        self.clear_pending_queue()?;
        sessions.iter().try_for_each(|s| self.save(s))
    }
}
