//! Incremental catalog sync engine.
//!
//! Pulls remote catalog deltas since the local watermark and applies them
//! as idempotent upserts, one page per transaction. The watermark advances
//! only after a page is durably applied, so an interrupted run resumes by
//! re-fetching the unfinished page instead of skipping it.

pub mod http;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::Item;

use crate::db::{SqliteStore, StoreError, SyncStateRepository};

pub use http::HttpCatalog;

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote error: {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("sync already in progress")]
    AlreadyRunning,

    #[error("sync cancelled")]
    Cancelled,
}

/// One page of remote catalog changes, ascending by `updated_at`.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub items: Vec<Item>,
    /// Opaque continuation token for the next page, if the remote gave one.
    pub cursor: Option<String>,
}

/// Summary of one completed sync run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    pub imported_count: usize,
}

/// A paginated source of catalog changes.
///
/// Implementations return items with `updated_at > since` in ascending
/// `updated_at` order. An empty page ends the run.
pub trait RemoteCatalog: Send + Sync {
    fn fetch_page(
        &self,
        since: DateTime<Utc>,
        cursor: Option<&str>,
        page_size: usize,
    ) -> impl std::future::Future<Output = Result<CatalogPage, SyncError>> + Send;
}

/// Sync engine. At most one run in flight; a concurrent call fails fast
/// with [`SyncError::AlreadyRunning`] instead of queuing.
pub struct SyncEngine<R> {
    remote: R,
    page_size: usize,
    running: tokio::sync::Mutex<()>,
    cancel: AtomicBool,
}

impl<R: RemoteCatalog> SyncEngine<R> {
    pub fn new(remote: R, page_size: usize) -> Self {
        Self {
            remote,
            page_size,
            running: tokio::sync::Mutex::new(()),
            cancel: AtomicBool::new(false),
        }
    }

    /// Request cancellation of the in-flight run. Takes effect between
    /// pages; the current page still commits or rolls back whole.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Pull and apply all pending catalog changes.
    ///
    /// Safe to retry after any error: applied pages are behind the
    /// watermark, and page application is idempotent.
    pub async fn sync(&self, store: &Arc<Mutex<SqliteStore>>) -> Result<SyncReport, SyncError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;
        self.cancel.store(false, Ordering::SeqCst);

        let since = store
            .lock()
            .expect("store lock")
            .watermark()?
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        tracing::info!(since = %since, "sync started");

        let mut imported = 0usize;
        let mut cursor: Option<String> = None;

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!(imported, "sync cancelled between pages");
                return Err(SyncError::Cancelled);
            }

            let page = self
                .remote
                .fetch_page(since, cursor.as_deref(), self.page_size)
                .await?;

            let Some(page_max) = page.items.iter().map(|i| i.updated_at).max() else {
                break;
            };

            let applied = store
                .lock()
                .expect("store lock")
                .apply_sync_page(&page.items, page_max)?;
            imported += applied;

            tracing::debug!(applied, watermark = %page_max, "sync page applied");
            match page.cursor {
                Some(next) => cursor = Some(next),
                // No continuation token: that was the last page.
                None => break,
            }
        }

        tracing::info!(imported, "sync finished");
        Ok(SyncReport {
            imported_count: imported,
        })
    }
}
