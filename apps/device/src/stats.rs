//! Reporting aggregates over daily learning logs.
//!
//! Read-only; none of this feeds back into scheduling.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::params;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::db::{CatalogRepository, DayCount, SqliteStore, StoreError};

type Result<T> = std::result::Result<T, StoreError>;

/// Accuracy per catalog category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub category: String,
    pub attempts: u32,
    pub correct: u32,
    pub accuracy: f64,
}

/// Per-category accuracy accumulated over all daily logs.
///
/// An item counts toward every category it carries.
pub fn category_stats(store: &SqliteStore, learner_id: &str) -> Result<Vec<CategoryStat>> {
    let categories_by_item = store.item_categories()?;

    let mut stmt = store
        .conn
        .prepare("SELECT answers_json FROM daily_logs WHERE learner_id = ?1")?;
    let logs = stmt
        .query_map(params![learner_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut totals: BTreeMap<String, DayCount> = BTreeMap::new();
    for raw in logs {
        let answers: BTreeMap<String, DayCount> = crate::db::codec::decode(&raw)?;
        for (item_id, count) in answers {
            let Some(categories) = categories_by_item.get(&item_id) else {
                continue;
            };
            for category in categories {
                let entry = totals.entry(category.clone()).or_default();
                entry.attempts += count.attempts;
                entry.correct += count.correct;
            }
        }
    }

    Ok(totals
        .into_iter()
        .map(|(category, count)| CategoryStat {
            category,
            attempts: count.attempts,
            correct: count.correct,
            accuracy: if count.attempts > 0 {
                count.correct as f64 / count.attempts as f64
            } else {
                0.0
            },
        })
        .collect())
}

/// Consecutive days with at least one logged answer, counted back from today.
pub fn learning_streak(store: &SqliteStore, learner_id: &str) -> Result<u32> {
    learning_streak_at(store, learner_id, Utc::now())
}

/// [`learning_streak`] with an explicit clock.
pub fn learning_streak_at(
    store: &SqliteStore,
    learner_id: &str,
    now: DateTime<Utc>,
) -> Result<u32> {
    let mut stmt = store
        .conn
        .prepare("SELECT learning_date FROM daily_logs WHERE learner_id = ?1")?;
    let dates = stmt
        .query_map(params![learner_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;

    let mut streak = 0u32;
    let mut day: NaiveDate = now.date_naive();
    while dates.contains(&day.format("%Y-%m-%d").to_string()) {
        streak += 1;
        day -= Duration::days(1);
    }
    Ok(streak)
}
