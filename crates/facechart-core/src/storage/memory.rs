//! In-memory storage implementation.

use super::{SessionRepository, StorageError, StorageResult};
use crate::model::TreatmentSession;
use std::sync::RwLock;

/// In-memory queue storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    sessions: RwLock<Vec<TreatmentSession>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemoryStorage {
    fn save(&self, session: &TreatmentSession) -> StorageResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        sessions.push(session.clone());
        Ok(())
    }

    fn load_pending_queue(&self) -> StorageResult<Vec<TreatmentSession>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(sessions.clone())
    }

    fn clear_pending_queue(&self) -> StorageResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        sessions.clear();
        Ok(())
    }

    fn replace_pending_queue(&self, replacement: &[TreatmentSession]) -> StorageResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        *sessions = replacement.to_vec();
        Ok(())
    }
}
