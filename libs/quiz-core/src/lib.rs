//! Core quiz library shared by the on-device engine.
//!
//! Provides:
//! - SM-2 spaced repetition scheduler (pure, no I/O)
//! - Validated quality grades
//! - Shared catalog and repetition types (Item, Sm2State, etc.)

pub mod error;
pub mod sm2;
pub mod types;

pub use error::ScheduleError;
pub use sm2::{advance, Sm2Outcome};
pub use types::{Difficulty, Item, ItemKind, Quality, Reference, Sm2State};
