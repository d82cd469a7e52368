//! End-to-end flows through the recorder, scheduler and selector.

mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use quiz_core::Quality;
use quiz_device::{
    recorder, selector, EngineError, RepetitionRepository, SqliteStore,
};

use common::{at, catalog_item, mem_store_with};

fn store_with_ids(ids: &[&str]) -> SqliteStore {
    mem_store_with(ids.iter().map(|id| catalog_item(id, at(1, 0))).collect())
}

#[test]
fn failed_review_is_due_tomorrow_not_today() {
    let mut store = store_with_ids(&["q1"]);
    let now = at(10, 9);

    let state = recorder::record_review_at(&mut store, "u1", "q1", Quality::new(2).unwrap(), now)
        .unwrap();
    assert_eq!(state.repetition, 0);
    assert_eq!(state.interval_days, 1);
    assert_eq!(state.next_due_at, now + Duration::days(1));

    // Not overdue today. It still shows up through the missed tier.
    let today = selector::select_due_at(&store, "u1", 10, now + Duration::hours(1)).unwrap();
    assert_eq!(today, vec!["q1".to_string()]);

    // Tomorrow it is overdue proper.
    let tomorrow = selector::select_due_at(&store, "u1", 10, now + Duration::days(1)).unwrap();
    assert_eq!(tomorrow, vec!["q1".to_string()]);
}

#[test]
fn passing_reviews_walk_the_interval_ladder() {
    let mut store = store_with_ids(&["q1"]);

    let s1 = recorder::record_review_at(&mut store, "u1", "q1", Quality::new(4).unwrap(), at(1, 9))
        .unwrap();
    assert_eq!(s1.interval_days, 1);

    let s2 = recorder::record_review_at(&mut store, "u1", "q1", Quality::new(4).unwrap(), at(2, 9))
        .unwrap();
    assert_eq!(s2.interval_days, 6);
    assert_eq!(s2.next_due_at, at(8, 9));
    assert_eq!(s2.total_attempts, 2);
}

#[test]
fn attempts_accumulate_into_category_stats_and_streak() {
    let mut store = store_with_ids(&["q1", "q2"]);

    recorder::record_attempt_at(&mut store, "u1", "q1", true, Some(1200), at(10, 9)).unwrap();
    recorder::record_attempt_at(&mut store, "u1", "q2", false, None, at(10, 10)).unwrap();
    recorder::record_attempt_at(&mut store, "u1", "q1", true, None, at(11, 9)).unwrap();

    let stats = quiz_device::stats::category_stats(&store, "u1").unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].category, "networking");
    assert_eq!(stats[0].attempts, 3);
    assert_eq!(stats[0].correct, 2);

    assert_eq!(
        quiz_device::stats::learning_streak_at(&store, "u1", at(11, 20)).unwrap(),
        2
    );
}

#[test]
fn enroll_reviewed_feeds_the_selector() {
    let mut store = store_with_ids(&["q1", "q2"]);

    // Attempts recorded before the item was ever enrolled in review.
    recorder::record_attempt_at(&mut store, "u1", "q1", false, None, at(5, 9)).unwrap();

    let added = store.enroll_reviewed("u1", at(6, 9)).unwrap();
    assert_eq!(added, 1);

    let picked = selector::select_due_at(&store, "u1", 10, at(6, 10)).unwrap();
    assert_eq!(picked, vec!["q1".to_string()]);
}

#[test]
fn facade_rejects_out_of_range_quality() {
    let engine = quiz_device::Engine::with_remote(
        store_with_ids(&["q1"]),
        NoRemote,
        quiz_device::DEFAULT_PAGE_SIZE,
    );

    let err = engine.record_review("u1", "q1", 6).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // Nothing was recorded.
    let store = engine.store();
    let store = store.lock().unwrap();
    assert_eq!(store.get_state("u1", "q1").unwrap(), None);
}

#[test]
fn facade_mints_learner_id_once() {
    let engine = quiz_device::Engine::with_remote(
        store_with_ids(&["q1"]),
        NoRemote,
        quiz_device::DEFAULT_PAGE_SIZE,
    );

    let first = engine.ensure_learner().unwrap();
    let second = engine.ensure_learner().unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.item_count().unwrap(), 1);
}

struct NoRemote;

impl quiz_device::RemoteCatalog for NoRemote {
    async fn fetch_page(
        &self,
        _since: chrono::DateTime<chrono::Utc>,
        _cursor: Option<&str>,
        _page_size: usize,
    ) -> Result<quiz_device::CatalogPage, quiz_device::SyncError> {
        Ok(quiz_device::CatalogPage {
            items: vec![],
            cursor: None,
        })
    }
}
