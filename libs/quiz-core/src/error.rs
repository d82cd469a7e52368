//! Error types for quiz-core.

use thiserror::Error;

/// Errors from scheduler input validation.
///
/// These are caller contract violations, not operational failures: a grade
/// outside 0..=5 is rejected before any state is computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("quality grade {0} out of range (expected 0..=5)")]
    InvalidQuality(u8),
}
