//! Engine facade.
//!
//! Owns the store behind an `Arc<Mutex<_>>` so the synchronous recorder
//! and selector paths and the async sync engine share one connection.
//! The lock is never held across an await point.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use quiz_core::Quality;

use crate::config::EngineConfig;
use crate::db::{
    BundledDataset, CatalogRepository, LogRepository, RepetitionRepository, RepetitionState,
    SqliteStore,
};
use crate::error::EngineError;
use crate::stats::{self, CategoryStat};
use crate::sync::{HttpCatalog, RemoteCatalog, SyncEngine, SyncReport};
use crate::{recorder, selector};

type Result<T> = std::result::Result<T, EngineError>;

/// Top-level handle over the store, recorder, selector, stats and sync.
pub struct Engine<R: RemoteCatalog = HttpCatalog> {
    store: Arc<Mutex<SqliteStore>>,
    sync: SyncEngine<R>,
}

impl Engine<HttpCatalog> {
    /// Open (or create) the store at the configured path and wire the
    /// HTTP catalog client.
    pub fn open(config: &EngineConfig, bundled: &BundledDataset) -> Result<Self> {
        if let Some(parent) = config.store_path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::db::StoreError::Io)?;
        }
        let store = SqliteStore::open(&config.store_path, bundled)?;
        let remote = HttpCatalog::new(&config.remote_base_url, config.request_timeout)?;
        Ok(Self::with_remote(store, remote, config.page_size))
    }

    /// Open the store, rebuilding it from the bundled dataset when the
    /// file is unreadable. The flag reports whether learner history was
    /// lost to a rebuild.
    pub fn open_or_recreate(
        config: &EngineConfig,
        bundled: &BundledDataset,
    ) -> Result<(Self, bool)> {
        if let Some(parent) = config.store_path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::db::StoreError::Io)?;
        }
        let (store, recovered) = SqliteStore::open_or_recreate(&config.store_path, bundled)?;
        let remote = HttpCatalog::new(&config.remote_base_url, config.request_timeout)?;
        Ok((Self::with_remote(store, remote, config.page_size), recovered))
    }

    /// Delete the store file and rebuild it from the bundled dataset.
    ///
    /// The recovery path for [`StoreError::SchemaCorrupt`]; all learner
    /// history is lost.
    pub fn recreate(config: &EngineConfig, bundled: &BundledDataset) -> Result<Self> {
        let store = SqliteStore::recreate(&config.store_path, bundled)?;
        let remote = HttpCatalog::new(&config.remote_base_url, config.request_timeout)?;
        Ok(Self::with_remote(store, remote, config.page_size))
    }
}

impl<R: RemoteCatalog> Engine<R> {
    /// Build an engine over an already-open store and a custom catalog
    /// source. Test harnesses use this with a fake remote.
    pub fn with_remote(store: SqliteStore, remote: R, page_size: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            sync: SyncEngine::new(remote, page_size),
        }
    }

    /// Return the device learner id, minting one on first call.
    pub fn ensure_learner(&self) -> Result<String> {
        let mut store = self.store.lock().expect("store lock");
        Ok(store.ensure_learner(Utc::now())?)
    }

    /// Record a plain answer: attempt log, daily log, first-attempt latch.
    pub fn record_attempt(
        &self,
        learner_id: &str,
        item_id: &str,
        is_correct: bool,
    ) -> Result<()> {
        let mut store = self.store.lock().expect("store lock");
        Ok(recorder::record_attempt(
            &mut store, learner_id, item_id, is_correct,
        )?)
    }

    /// Record a graded review and advance the repetition schedule.
    ///
    /// `quality` is the raw 0..=5 grade; out-of-range values are rejected
    /// before any state changes.
    pub fn record_review(
        &self,
        learner_id: &str,
        item_id: &str,
        quality: u8,
    ) -> Result<RepetitionState> {
        let quality = Quality::new(quality)?;
        let mut store = self.store.lock().expect("store lock");
        Ok(recorder::record_review(
            &mut store, learner_id, item_id, quality,
        )?)
    }

    /// Build today's bounded review set.
    pub fn select_due(&self, learner_id: &str, limit: usize) -> Result<Vec<String>> {
        let store = self.store.lock().expect("store lock");
        Ok(selector::select_due(&store, learner_id, limit)?)
    }

    /// Enroll every already-attempted item into the repetition schedule.
    pub fn enroll_reviewed(&self, learner_id: &str) -> Result<usize> {
        let mut store = self.store.lock().expect("store lock");
        Ok(store.enroll_reviewed(learner_id, Utc::now())?)
    }

    /// Pull and apply pending catalog changes from the remote.
    pub async fn sync(&self) -> Result<SyncReport> {
        Ok(self.sync.sync(&self.store).await?)
    }

    /// Request cancellation of an in-flight sync run.
    pub fn cancel_sync(&self) {
        self.sync.cancel();
    }

    /// Most recent daily logs, newest first.
    pub fn recent_daily_logs(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<crate::db::DailyLog>> {
        let store = self.store.lock().expect("store lock");
        Ok(store.recent_daily_logs(learner_id, limit)?)
    }

    pub fn category_stats(&self, learner_id: &str) -> Result<Vec<CategoryStat>> {
        let store = self.store.lock().expect("store lock");
        Ok(stats::category_stats(&store, learner_id)?)
    }

    pub fn learning_streak(&self, learner_id: &str) -> Result<u32> {
        let store = self.store.lock().expect("store lock");
        Ok(stats::learning_streak(&store, learner_id)?)
    }

    pub fn item_count(&self) -> Result<usize> {
        let store = self.store.lock().expect("store lock");
        Ok(store.item_count()?)
    }

    pub fn get_item(&self, id: &str) -> Result<Option<quiz_core::Item>> {
        let store = self.store.lock().expect("store lock");
        Ok(store.get_item(id)?)
    }

    /// Shared store handle, for callers that need repository access
    /// beyond the facade.
    pub fn store(&self) -> Arc<Mutex<SqliteStore>> {
        Arc::clone(&self.store)
    }
}
