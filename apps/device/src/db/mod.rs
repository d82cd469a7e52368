//! Local SQLite store: schema, migrations, repositories.

pub mod bundled;
pub mod codec;
pub mod error;
pub mod migrations;
pub mod repository;
pub mod schema;

pub use bundled::BundledDataset;
pub use error::StoreError;
pub use repository::{
    AttemptRecord, CatalogRepository, DailyLog, DayCount, LogRepository, RepetitionRepository,
    RepetitionState, SqliteStore, SyncStateRepository,
};
pub use schema::SCHEMA_VERSION;
