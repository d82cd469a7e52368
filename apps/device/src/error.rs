//! Caller-facing error type for engine operations.

use thiserror::Error;

use crate::db::StoreError;
use crate::sync::SyncError;
use quiz_core::ScheduleError;

/// Errors surfaced by the [`Engine`](crate::engine::Engine) facade.
///
/// `InvalidInput` is a caller contract violation rejected before any state
/// change; the rest are operational and safe to retry per their docs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(SyncError),

    #[error("a sync run is already in progress")]
    AlreadyRunning,
}

impl From<SyncError> for EngineError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::AlreadyRunning => Self::AlreadyRunning,
            other => Self::Sync(other),
        }
    }
}
