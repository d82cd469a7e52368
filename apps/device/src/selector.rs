//! Review selector.
//!
//! Builds the bounded daily review set from three priority tiers:
//! P1 overdue, P2 recently missed, P3 backfill. Tiers are a strict set
//! union with precedence; an id picked by an earlier tier never occupies
//! a later slot. Locked catalog items are never eligible.

use chrono::{DateTime, Utc};
use rusqlite::params;
use std::collections::HashSet;

use crate::db::{SqliteStore, StoreError};

type Result<T> = std::result::Result<T, StoreError>;

/// Fraction of `limit` reserved as the P2 cap (floor of half).
const MISSED_TIER_RATIO: f64 = 0.5;

/// Select up to `limit` item ids due for review, ordered by tier.
pub fn select_due(store: &SqliteStore, learner_id: &str, limit: usize) -> Result<Vec<String>> {
    select_due_at(store, learner_id, limit, Utc::now())
}

/// [`select_due`] with an explicit clock.
pub fn select_due_at(
    store: &SqliteStore,
    learner_id: &str,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut selected: Vec<String> = Vec::with_capacity(limit);
    let mut seen: HashSet<String> = HashSet::with_capacity(limit);

    // P1: overdue, most overdue first.
    let mut stmt = store.conn.prepare(
        "SELECT r.item_id
           FROM repetition_states r
           JOIN items i ON i.id = r.item_id
          WHERE r.learner_id = ?1 AND r.next_due_at <= ?2 AND i.locked = 0
          ORDER BY r.next_due_at ASC
          LIMIT ?3",
    )?;
    let overdue = stmt
        .query_map(params![learner_id, now.to_rfc3339(), limit], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for id in overdue {
        if seen.insert(id.clone()) {
            selected.push(id);
        }
    }

    // P2: recently missed, newest miss first, capped at half the limit.
    let missed_cap = ((limit as f64 * MISSED_TIER_RATIO).floor() as usize)
        .min(limit - selected.len());
    if missed_cap > 0 {
        let mut stmt = store.conn.prepare(
            "SELECT r.item_id
               FROM repetition_states r
               JOIN items i ON i.id = r.item_id
              WHERE r.learner_id = ?1
                AND r.last_quality IS NOT NULL AND r.last_quality < 3
                AND r.total_attempts > 0
                AND i.locked = 0
              ORDER BY r.last_answered_at DESC
              LIMIT ?2",
        )?;
        let missed = stmt
            .query_map(params![learner_id, missed_cap + selected.len()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut taken = 0;
        for id in missed {
            if taken == missed_cap {
                break;
            }
            if seen.insert(id.clone()) {
                selected.push(id);
                taken += 1;
            }
        }
    }

    // P3: backfill with any other reviewed item, random order.
    let remaining = limit - selected.len();
    if remaining > 0 {
        let mut stmt = store.conn.prepare(
            "SELECT r.item_id
               FROM repetition_states r
               JOIN items i ON i.id = r.item_id
              WHERE r.learner_id = ?1 AND r.total_attempts > 0 AND i.locked = 0
              ORDER BY RANDOM()
              LIMIT ?2",
        )?;
        let backfill = stmt
            .query_map(params![learner_id, remaining + selected.len()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut taken = 0;
        for id in backfill {
            if taken == remaining {
                break;
            }
            if seen.insert(id.clone()) {
                selected.push(id);
                taken += 1;
            }
        }
    }

    tracing::debug!(learner_id, limit, selected = selected.len(), "review set built");
    Ok(selected)
}
