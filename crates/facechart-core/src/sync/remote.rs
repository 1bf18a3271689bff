//! Remote sync collaborator.

use crate::model::{SessionId, TreatmentSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

/// A boxed future for remote calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Successful batch acknowledgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// Sessions stored for the first time.
    pub accepted: usize,
    /// Sessions the remote had already stored.
    pub duplicates: usize,
}

impl BatchReceipt {
    pub fn new(accepted: usize, duplicates: usize) -> Self {
        Self {
            accepted,
            duplicates,
        }
    }
}

/// Error body returned by the remote on a rejected batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub error: String,
}

/// Remote call errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Batch rejected: {0}")]
    Rejected(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The system of record that completed sessions are drained to.
///
/// # Idempotency
///
/// Delivery is at-least-once. If a batch is accepted but the local
/// acknowledgment is lost, the same sessions are submitted again on the next
/// sync. Implementations must treat [`TreatmentSession::id`] as an
/// idempotency key: resubmitting a stored session is a success and must not
/// create a second record.
pub trait RemoteSync {
    /// Whether the remote is reachable.
    fn health_check(&self) -> BoxFuture<'_, bool>;

    /// Submit the whole batch. `Ok` acknowledges every session in it.
    fn submit_batch<'a>(
        &'a self,
        sessions: &'a [TreatmentSession],
    ) -> BoxFuture<'a, Result<BatchReceipt, RemoteError>>;
}

/// In-process remote for tests and demos.
///
/// Stores sessions by id, so resubmission is idempotent.
pub struct MemoryRemote {
    sessions: RwLock<HashMap<SessionId, TreatmentSession>>,
    reachable: AtomicBool,
    rejection: RwLock<Option<String>>,
    submissions: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// A reachable remote that accepts every batch.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            rejection: RwLock::new(None),
            submissions: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Reject every batch with `reason` until cleared with `None`.
    pub fn set_rejection(&self, reason: Option<String>) {
        if let Ok(mut rejection) = self.rejection.write() {
            *rejection = reason;
        }
    }

    /// Number of distinct sessions stored.
    pub fn stored_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn get(&self, id: SessionId) -> Option<TreatmentSession> {
        self.sessions.read().ok()?.get(&id).cloned()
    }

    /// Number of batches received, including rejected ones.
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    fn store_batch(&self, batch: &[TreatmentSession]) -> Result<BatchReceipt, RemoteError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let rejection = self
            .rejection
            .read()
            .map_err(|e| RemoteError::Transport(format!("Lock error: {}", e)))?
            .clone();
        if let Some(reason) = rejection {
            return Err(RemoteError::Rejected(reason));
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| RemoteError::Transport(format!("Lock error: {}", e)))?;
        let mut receipt = BatchReceipt::default();
        for session in batch {
            if sessions.contains_key(&session.id) {
                receipt.duplicates += 1;
            } else {
                sessions.insert(session.id, session.clone());
                receipt.accepted += 1;
            }
        }
        Ok(receipt)
    }
}

impl RemoteSync for MemoryRemote {
    fn health_check(&self) -> BoxFuture<'_, bool> {
        let reachable = self.reachable.load(Ordering::SeqCst);
        Box::pin(async move { reachable })
    }

    fn submit_batch<'a>(
        &'a self,
        sessions: &'a [TreatmentSession],
    ) -> BoxFuture<'a, Result<BatchReceipt, RemoteError>> {
        Box::pin(async move {
            if !self.reachable.load(Ordering::SeqCst) {
                return Err(RemoteError::Transport("remote unreachable".to_string()));
            }
            self.store_batch(sessions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductCategory;
    use crate::sync::tests::block_on;

    fn session() -> TreatmentSession {
        TreatmentSession::new("p-1".to_string(), "dr-1".to_string(), ProductCategory::Neurotoxin)
    }

    #[test]
    fn test_resubmission_is_idempotent() {
        let remote = MemoryRemote::new();
        let batch = vec![session(), session()];

        let first = block_on(remote.submit_batch(&batch)).unwrap();
        assert_eq!(first, BatchReceipt::new(2, 0));

        let again = block_on(remote.submit_batch(&batch)).unwrap();
        assert_eq!(again, BatchReceipt::new(0, 2));
        assert_eq!(remote.stored_count(), 2);
        assert_eq!(remote.submission_count(), 2);
    }

    #[test]
    fn test_rejection() {
        let remote = MemoryRemote::new();
        remote.set_rejection(Some("schema mismatch".to_string()));

        let result = block_on(remote.submit_batch(&[session()]));
        assert!(matches!(result, Err(RemoteError::Rejected(ref r)) if r == "schema mismatch"));
        assert_eq!(remote.stored_count(), 0);

        remote.set_rejection(None);
        assert!(block_on(remote.submit_batch(&[session()])).is_ok());
    }

    #[test]
    fn test_reachability() {
        let remote = MemoryRemote::new();
        assert!(block_on(remote.health_check()));
        remote.set_reachable(false);
        assert!(!block_on(remote.health_check()));
        assert!(block_on(remote.submit_batch(&[session()])).is_err());
    }

    #[test]
    fn test_receipt_wire_format() {
        let json = serde_json::to_string(&BatchReceipt::new(3, 1)).unwrap();
        assert_eq!(json, r#"{"accepted":3,"duplicates":1}"#);
        let err: BatchError = serde_json::from_str(r#"{"error":"bad"}"#).unwrap();
        assert_eq!(err.error, "bad");
    }
}
