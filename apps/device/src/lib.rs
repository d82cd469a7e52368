//! On-device quiz learning engine.
//!
//! Local-first: every operation works against the SQLite store, and the
//! remote catalog is pulled incrementally when the device is online.
//! Scheduling math lives in the `quiz-core` crate; this crate adds the
//! store, the attempt recorder, the review selector, reporting stats and
//! the catalog sync engine, all behind the [`Engine`] facade.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod recorder;
pub mod selector;
pub mod stats;
pub mod sync;

pub use config::{EngineConfig, DEFAULT_PAGE_SIZE};
pub use db::{
    AttemptRecord, BundledDataset, CatalogRepository, DailyLog, DayCount, LogRepository,
    RepetitionRepository, RepetitionState, SqliteStore, StoreError, SyncStateRepository,
};
pub use engine::Engine;
pub use error::EngineError;
pub use stats::CategoryStat;
pub use sync::{CatalogPage, HttpCatalog, RemoteCatalog, SyncEngine, SyncError, SyncReport};
