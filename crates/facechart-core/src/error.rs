//! Errors raised by the charting store.

use crate::model::ModelError;
use thiserror::Error;

/// Precondition failures on store operations.
///
/// Lookups of unknown ids are not errors; the affected operations return
/// `false` instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("No active session; select a patient first")]
    NoActiveSession,
    #[error("A session is already in progress")]
    SessionInProgress,
    #[error("A provider id is required to start a session")]
    MissingProvider,
    #[error("Unknown zone: {0}")]
    UnknownZone(String),
    #[error("Photo consent has not been confirmed for this session")]
    ConsentRequired,
    #[error("Point placement does not match the target collection")]
    PlacementMismatch,
    #[error("Chart container has no area")]
    EmptyContainer,
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for store operations.
pub type ChartResult<T> = Result<T, ChartError>;
