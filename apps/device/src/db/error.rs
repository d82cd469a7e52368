//! Local store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Disk or SQLite failure. The surrounding transaction is rolled back.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store file exists but is not a readable database. Recovery via
    /// [`SqliteStore::recreate`](crate::db::SqliteStore::recreate) loses
    /// per-learner history, so it is never taken implicitly.
    #[error("store file is corrupt or not a database: {0}")]
    SchemaCorrupt(String),

    /// Stored schema version is newer than this build understands.
    #[error("store schema version {found} is newer than supported version {supported}")]
    VersionFromFuture { found: i64, supported: i64 },

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
