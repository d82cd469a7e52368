//! Attempt recorder.
//!
//! Appends immutable attempt history and updates the mutable repetition
//! state for one (learner, item) pair, all inside a single transaction.
//! A failure aborts the whole unit; retrying is safe because the attempt
//! key includes a timestamp chosen fresh per call.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use quiz_core::{sm2, Quality};

use crate::db::repository::repetition_row;
use crate::db::{RepetitionState, SqliteStore, StoreError};

type Result<T> = std::result::Result<T, StoreError>;

/// Record a quiz-mode answer: attempt history, daily log, first-attempt
/// latch. Does not touch repetition state.
pub fn record_attempt(
    store: &mut SqliteStore,
    learner_id: &str,
    item_id: &str,
    is_correct: bool,
) -> Result<()> {
    record_attempt_at(store, learner_id, item_id, is_correct, None, Utc::now())
}

/// [`record_attempt`] with an explicit clock and optional answer latency.
pub fn record_attempt_at(
    store: &mut SqliteStore,
    learner_id: &str,
    item_id: &str,
    is_correct: bool,
    response_ms: Option<u32>,
    now: DateTime<Utc>,
) -> Result<()> {
    let tx = store.conn.transaction()?;

    append_attempt(&tx, learner_id, item_id, is_correct, response_ms, now)?;
    upsert_daily_log(&tx, learner_id, item_id, is_correct, now)?;
    latch_first_attempt(&tx, learner_id, item_id, is_correct, now)?;

    tx.commit()?;
    tracing::debug!(learner_id, item_id, is_correct, "attempt recorded");
    Ok(())
}

/// Record a graded review: everything [`record_attempt`] does, plus running
/// the scheduler and upserting the new repetition state.
pub fn record_review(
    store: &mut SqliteStore,
    learner_id: &str,
    item_id: &str,
    quality: Quality,
) -> Result<RepetitionState> {
    record_review_at(store, learner_id, item_id, quality, Utc::now())
}

/// [`record_review`] with an explicit clock.
pub fn record_review_at(
    store: &mut SqliteStore,
    learner_id: &str,
    item_id: &str,
    quality: Quality,
    now: DateTime<Utc>,
) -> Result<RepetitionState> {
    let is_correct = quality.is_pass();
    let tx = store.conn.transaction()?;

    append_attempt(&tx, learner_id, item_id, is_correct, None, now)?;
    upsert_daily_log(&tx, learner_id, item_id, is_correct, now)?;
    latch_first_attempt(&tx, learner_id, item_id, is_correct, now)?;

    let current = get_state_tx(&tx, learner_id, item_id)?
        .unwrap_or_else(|| RepetitionState::initial(learner_id, item_id, now));

    let outcome = sm2::advance(&current.sm2(), quality, now);
    let new_state = RepetitionState {
        learner_id: learner_id.to_string(),
        item_id: item_id.to_string(),
        repetition: outcome.state.repetition,
        interval_days: outcome.state.interval_days,
        ease_factor: outcome.state.ease_factor,
        next_due_at: outcome.next_due_at,
        last_quality: Some(quality.value()),
        total_attempts: current.total_attempts + 1,
        last_answered_at: Some(now),
    };
    upsert_state(&tx, &new_state)?;

    tx.commit()?;
    tracing::debug!(
        learner_id,
        item_id,
        quality = quality.value(),
        repetition = new_state.repetition,
        interval_days = new_state.interval_days,
        "review recorded"
    );
    Ok(new_state)
}

// === Transaction steps ===

pub(crate) fn append_attempt(
    conn: &Connection,
    learner_id: &str,
    item_id: &str,
    is_correct: bool,
    response_ms: Option<u32>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO attempts (learner_id, item_id, answered_at, is_correct, response_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            learner_id,
            item_id,
            now.to_rfc3339(),
            is_correct as i64,
            response_ms
        ],
    )?;
    Ok(())
}

pub(crate) fn upsert_daily_log(
    conn: &Connection,
    learner_id: &str,
    item_id: &str,
    is_correct: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    use crate::db::codec;
    use crate::db::DayCount;
    use std::collections::BTreeMap;

    let date = now.date_naive().format("%Y-%m-%d").to_string();
    let existing: Option<String> = conn
        .query_row(
            "SELECT answers_json FROM daily_logs WHERE learner_id = ?1 AND learning_date = ?2",
            params![learner_id, date],
            |row| row.get(0),
        )
        .optional()?;

    let mut answers: BTreeMap<String, DayCount> = match &existing {
        Some(raw) => codec::decode(raw)?,
        None => BTreeMap::new(),
    };
    let entry = answers.entry(item_id.to_string()).or_default();
    entry.attempts += 1;
    if is_correct {
        entry.correct += 1;
    }
    let raw = codec::encode(&answers)?;

    if existing.is_some() {
        conn.execute(
            "UPDATE daily_logs SET answers_json = ?1, updated_at = ?2
             WHERE learner_id = ?3 AND learning_date = ?4",
            params![raw, now.to_rfc3339(), learner_id, date],
        )?;
    } else {
        conn.execute(
            "INSERT INTO daily_logs (learner_id, learning_date, answers_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![learner_id, date, raw, now.to_rfc3339()],
        )?;
    }
    Ok(())
}

/// Latch the first-attempt fact once; later attempts never overwrite it.
pub(crate) fn latch_first_attempt(
    conn: &Connection,
    learner_id: &str,
    item_id: &str,
    is_correct: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO first_attempts (learner_id, item_id, is_correct, attempted_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(learner_id, item_id) DO NOTHING",
        params![learner_id, item_id, is_correct as i64, now.to_rfc3339()],
    )?;
    Ok(())
}

pub(crate) fn get_state_tx(
    conn: &Connection,
    learner_id: &str,
    item_id: &str,
) -> Result<Option<RepetitionState>> {
    conn.query_row(
        "SELECT learner_id, item_id, repetition, interval_days, ease_factor,
                next_due_at, last_quality, total_attempts, last_answered_at
         FROM repetition_states WHERE learner_id = ?1 AND item_id = ?2",
        params![learner_id, item_id],
        repetition_row,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn upsert_state(conn: &Connection, state: &RepetitionState) -> Result<()> {
    conn.execute(
        "INSERT INTO repetition_states
            (learner_id, item_id, repetition, interval_days, ease_factor,
             next_due_at, last_quality, total_attempts, last_answered_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(learner_id, item_id) DO UPDATE SET
            repetition = excluded.repetition,
            interval_days = excluded.interval_days,
            ease_factor = excluded.ease_factor,
            next_due_at = excluded.next_due_at,
            last_quality = excluded.last_quality,
            total_attempts = excluded.total_attempts,
            last_answered_at = excluded.last_answered_at",
        params![
            state.learner_id,
            state.item_id,
            state.repetition,
            state.interval_days,
            state.ease_factor,
            state.next_due_at.to_rfc3339(),
            state.last_quality,
            state.total_attempts,
            state.last_answered_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BundledDataset, DayCount, LogRepository, RepetitionRepository};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(&BundledDataset::empty()).unwrap()
    }

    fn q(v: u8) -> Quality {
        Quality::new(v).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn review_creates_state_lazily_with_defaults() {
        let mut store = store();
        let state = record_review_at(&mut store, "u1", "q1", q(4), at()).unwrap();

        assert_eq!(state.repetition, 1);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.total_attempts, 1);
        assert_eq!(state.last_quality, Some(4));
        assert_eq!(state.next_due_at, at() + Duration::days(1));
    }

    #[test]
    fn failing_review_resets_repetition() {
        let mut store = store();
        record_review_at(&mut store, "u1", "q1", q(4), at()).unwrap();
        record_review_at(&mut store, "u1", "q1", q(4), at() + Duration::seconds(1)).unwrap();
        let state =
            record_review_at(&mut store, "u1", "q1", q(2), at() + Duration::seconds(2)).unwrap();

        assert_eq!(state.repetition, 0);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.total_attempts, 3);
        assert_eq!(state.last_quality, Some(2));
    }

    #[test]
    fn attempt_does_not_touch_repetition_state() {
        let mut store = store();
        record_attempt_at(&mut store, "u1", "q1", true, None, at()).unwrap();
        assert!(store.get_state("u1", "q1").unwrap().is_none());
    }

    #[test]
    fn daily_log_accumulates_per_item() {
        let mut store = store();
        record_attempt_at(&mut store, "u1", "q1", true, None, at()).unwrap();
        record_attempt_at(&mut store, "u1", "q1", false, None, at() + Duration::seconds(1))
            .unwrap();
        record_attempt_at(&mut store, "u1", "q2", true, None, at() + Duration::seconds(2))
            .unwrap();

        let log = store
            .get_daily_log("u1", at().date_naive())
            .unwrap()
            .unwrap();
        assert_eq!(
            log.answers.get("q1"),
            Some(&DayCount {
                attempts: 2,
                correct: 1
            })
        );
        assert_eq!(
            log.answers.get("q2"),
            Some(&DayCount {
                attempts: 1,
                correct: 1
            })
        );
    }

    #[test]
    fn attempt_history_preserves_order_and_latency() {
        let mut store = store();
        record_attempt_at(&mut store, "u1", "q1", true, Some(850), at()).unwrap();
        record_attempt_at(&mut store, "u1", "q1", false, None, at() + Duration::seconds(30))
            .unwrap();

        let history = store.attempt_history("u1", "q1").unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].is_correct);
        assert_eq!(history[0].response_ms, Some(850));
        assert_eq!(history[0].answered_at, at());
        assert!(!history[1].is_correct);
    }

    #[test]
    fn recent_logs_come_back_newest_first() {
        let mut store = store();
        record_attempt_at(&mut store, "u1", "q1", true, None, at()).unwrap();
        record_attempt_at(&mut store, "u1", "q1", true, None, at() + Duration::days(1)).unwrap();
        record_attempt_at(&mut store, "u1", "q1", true, None, at() + Duration::days(2)).unwrap();

        let logs = store.recent_daily_logs("u1", 2).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].learning_date, (at() + Duration::days(2)).date_naive());
        assert_eq!(logs[1].learning_date, (at() + Duration::days(1)).date_naive());
    }

    #[test]
    fn first_attempt_fact_is_never_overwritten() {
        let mut store = store();
        record_attempt_at(&mut store, "u1", "q1", false, None, at()).unwrap();
        record_attempt_at(&mut store, "u1", "q1", true, None, at() + Duration::seconds(1))
            .unwrap();

        assert_eq!(store.first_attempt("u1", "q1").unwrap(), Some(false));
    }

    #[test]
    fn duplicate_timestamp_aborts_whole_review() {
        let mut store = store();
        record_review_at(&mut store, "u1", "q1", q(4), at()).unwrap();

        // Same key triggers a primary key conflict on the attempt append.
        let err = record_review_at(&mut store, "u1", "q1", q(2), at());
        assert!(err.is_err());

        // The failed call left no trace: state still reflects the first call.
        let state = store.get_state("u1", "q1").unwrap().unwrap();
        assert_eq!(state.repetition, 1);
        assert_eq!(state.total_attempts, 1);
        assert_eq!(state.last_quality, Some(4));
    }

    #[test]
    fn rolled_back_transaction_leaves_nothing_visible() {
        let mut store = store();

        {
            let tx = store.conn.transaction().unwrap();
            append_attempt(&tx, "u1", "q1", true, None, at()).unwrap();
            upsert_daily_log(&tx, "u1", "q1", true, at()).unwrap();
            // Simulated failure before the state upsert: drop without commit.
        }

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM attempts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(store.get_daily_log("u1", at().date_naive()).unwrap().is_none());
    }

    #[test]
    fn retry_with_fresh_timestamp_succeeds() {
        let mut store = store();
        record_review_at(&mut store, "u1", "q1", q(4), at()).unwrap();
        let state =
            record_review_at(&mut store, "u1", "q1", q(4), at() + Duration::milliseconds(5))
                .unwrap();
        assert_eq!(state.total_attempts, 2);
    }
}
