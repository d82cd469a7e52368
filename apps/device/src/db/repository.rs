//! Repository pattern for local store access.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use quiz_core::{Difficulty, Item, ItemKind, Reference, Sm2State};

use super::bundled::BundledDataset;
use super::codec;
use super::error::StoreError;
use super::migrations;

type Result<T> = std::result::Result<T, StoreError>;

/// Spaced repetition row for one (learner, item) pair.
///
/// Created lazily on first review or enrollment; mutated only by the
/// attempt recorder inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionState {
    pub learner_id: String,
    pub item_id: String,
    pub repetition: u32,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub next_due_at: DateTime<Utc>,
    pub last_quality: Option<u8>,
    pub total_attempts: u32,
    pub last_answered_at: Option<DateTime<Utc>>,
}

impl RepetitionState {
    /// Initial state for a pair that has never been reviewed.
    pub fn initial(learner_id: &str, item_id: &str, now: DateTime<Utc>) -> Self {
        let sm2 = Sm2State::default();
        Self {
            learner_id: learner_id.to_string(),
            item_id: item_id.to_string(),
            repetition: sm2.repetition,
            interval_days: sm2.interval_days,
            ease_factor: sm2.ease_factor,
            next_due_at: now,
            last_quality: None,
            total_attempts: 0,
            last_answered_at: None,
        }
    }

    /// The scheduler's view of this row.
    pub fn sm2(&self) -> Sm2State {
        Sm2State {
            repetition: self.repetition,
            interval_days: self.interval_days,
            ease_factor: self.ease_factor,
        }
    }
}

/// One appended answer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub learner_id: String,
    pub item_id: String,
    pub answered_at: DateTime<Utc>,
    pub is_correct: bool,
    pub response_ms: Option<u32>,
}

/// Per-item tally inside a daily log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub attempts: u32,
    pub correct: u32,
}

/// One row per (learner, calendar day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub learner_id: String,
    pub learning_date: NaiveDate,
    pub answers: BTreeMap<String, DayCount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for catalog reads.
pub trait CatalogRepository {
    fn get_item(&self, id: &str) -> Result<Option<Item>>;
    fn item_count(&self) -> Result<usize>;
    /// Map from item id to its categories, for reporting aggregates.
    fn item_categories(&self) -> Result<BTreeMap<String, Vec<String>>>;
}

/// Repository for repetition state reads and enrollment.
pub trait RepetitionRepository {
    fn get_state(&self, learner_id: &str, item_id: &str) -> Result<Option<RepetitionState>>;
    /// Seed repetition states for every item the learner has already
    /// attempted but never enrolled, due immediately. Returns rows added.
    fn enroll_reviewed(&mut self, learner_id: &str, now: DateTime<Utc>) -> Result<usize>;
}

/// Repository for daily learning logs.
pub trait LogRepository {
    fn get_daily_log(&self, learner_id: &str, date: NaiveDate) -> Result<Option<DailyLog>>;
    fn recent_daily_logs(&self, learner_id: &str, limit: usize) -> Result<Vec<DailyLog>>;
}

/// Repository for the sync watermark and page application.
pub trait SyncStateRepository {
    /// Max remote `updated_at` durably applied, or `None` on a fresh store.
    fn watermark(&self) -> Result<Option<DateTime<Utc>>>;
    /// Apply one remote page and advance the watermark, atomically.
    ///
    /// Upserts replace every catalog field, so replaying a page leaves
    /// identical state. The watermark only moves forward.
    fn apply_sync_page(
        &mut self,
        items: &[Item],
        page_max: DateTime<Utc>,
    ) -> Result<usize>;
}

/// SQLite implementation of the repositories. One handle, one writer.
#[derive(Debug)]
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

impl SqliteStore {
    /// Open the store at `path`, migrating to the current schema version.
    ///
    /// An unreadable file surfaces as [`StoreError::SchemaCorrupt`];
    /// recovery is the caller's explicit decision via [`Self::recreate`].
    pub fn open<P: AsRef<Path>>(path: P, bundled: &BundledDataset) -> Result<Self> {
        let mut conn = Connection::open(&path).map_err(map_corruption)?;
        // Fails on files that are not SQLite databases.
        migrations::stored_version(&conn).map_err(|err| match err {
            StoreError::Sqlite(e) => map_corruption(e),
            other => other,
        })?;
        migrations::migrate(&mut conn, bundled)?;
        tracing::info!(path = %path.as_ref().display(), "store opened");
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory(bundled: &BundledDataset) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn, bundled)?;
        Ok(Self { conn })
    }

    /// Open the store, rebuilding it from the bundled dataset when the file
    /// is unreadable. The returned flag reports whether a rebuild happened,
    /// so the per-learner history loss is never silent.
    pub fn open_or_recreate<P: AsRef<Path>>(
        path: P,
        bundled: &BundledDataset,
    ) -> Result<(Self, bool)> {
        match Self::open(&path, bundled) {
            Err(StoreError::SchemaCorrupt(reason)) => {
                tracing::warn!(%reason, "store unreadable, rebuilding from bundled dataset");
                Ok((Self::recreate(path, bundled)?, true))
            }
            other => Ok((other?, false)),
        }
    }

    /// Delete the store file and rebuild it from the bundled dataset.
    ///
    /// This loses all per-learner history; callers reach here only after
    /// [`StoreError::SchemaCorrupt`].
    pub fn recreate<P: AsRef<Path>>(path: P, bundled: &BundledDataset) -> Result<Self> {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::warn!(
            path = %path.as_ref().display(),
            "recreating store from bundled dataset; learner history lost"
        );
        Self::open(path, bundled)
    }

    /// Return the latched learner id, creating one on first call.
    pub fn ensure_learner(&mut self, now: DateTime<Utc>) -> Result<String> {
        let existing: Option<String> = self
            .conn
            .query_row("SELECT learner_id FROM app_info LIMIT 1", [], |row| row.get(0))
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO app_info (learner_id, created_at) VALUES (?1, ?2)",
            params![id, now.to_rfc3339()],
        )?;
        tracing::info!(learner_id = %id, "created learner identity");
        Ok(id)
    }

    /// Full answer history for one item, oldest first.
    pub fn attempt_history(&self, learner_id: &str, item_id: &str) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT learner_id, item_id, answered_at, is_correct, response_ms
             FROM attempts WHERE learner_id = ?1 AND item_id = ?2
             ORDER BY answered_at ASC",
        )?;
        let rows = stmt
            .query_map(params![learner_id, item_id], |row| {
                Ok(AttemptRecord {
                    learner_id: row.get(0)?,
                    item_id: row.get(1)?,
                    answered_at: ts_column(row, 2)?,
                    is_correct: row.get::<_, i64>(3)? != 0,
                    response_ms: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latched first-attempt correctness for an item, if recorded.
    pub fn first_attempt(&self, learner_id: &str, item_id: &str) -> Result<Option<bool>> {
        self.conn
            .query_row(
                "SELECT is_correct FROM first_attempts WHERE learner_id = ?1 AND item_id = ?2",
                params![learner_id, item_id],
                |row| row.get::<_, i64>(0).map(|v| v != 0),
            )
            .optional()
            .map_err(Into::into)
    }
}

impl CatalogRepository for SqliteStore {
    fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, category_json, tag_json, difficulty, prompt, option_json,
                        correct_json, explanation, reference_json, pack_id, locked, updated_at
                 FROM items WHERE id = ?1",
                params![id],
                item_row,
            )
            .optional()?;

        row.map(decode_item_row).transpose()
    }

    fn item_count(&self) -> Result<usize> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count)
    }

    fn item_categories(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut stmt = self.conn.prepare("SELECT id, category_json FROM items")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut map = BTreeMap::new();
        for (id, raw) in rows {
            map.insert(id, codec::decode(&raw)?);
        }
        Ok(map)
    }
}

impl RepetitionRepository for SqliteStore {
    fn get_state(&self, learner_id: &str, item_id: &str) -> Result<Option<RepetitionState>> {
        self.conn
            .query_row(
                "SELECT learner_id, item_id, repetition, interval_days, ease_factor,
                        next_due_at, last_quality, total_attempts, last_answered_at
                 FROM repetition_states WHERE learner_id = ?1 AND item_id = ?2",
                params![learner_id, item_id],
                repetition_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn enroll_reviewed(&mut self, learner_id: &str, now: DateTime<Utc>) -> Result<usize> {
        let added = self.conn.execute(
            "INSERT INTO repetition_states
                (learner_id, item_id, repetition, interval_days, ease_factor, next_due_at, total_attempts)
             SELECT ?1, a.item_id, 0, 1, 2.5, ?2,
                    (SELECT COUNT(*) FROM attempts WHERE learner_id = ?1 AND item_id = a.item_id)
               FROM attempts a
              WHERE a.learner_id = ?1
              GROUP BY a.item_id
             ON CONFLICT(learner_id, item_id) DO NOTHING",
            params![learner_id, now.to_rfc3339()],
        )?;
        Ok(added)
    }
}

impl LogRepository for SqliteStore {
    fn get_daily_log(&self, learner_id: &str, date: NaiveDate) -> Result<Option<DailyLog>> {
        let row = self
            .conn
            .query_row(
                "SELECT learner_id, learning_date, answers_json, created_at, updated_at
                 FROM daily_logs WHERE learner_id = ?1 AND learning_date = ?2",
                params![learner_id, date.format("%Y-%m-%d").to_string()],
                daily_log_row,
            )
            .optional()?;

        row.map(decode_daily_log_row).transpose()
    }

    fn recent_daily_logs(&self, learner_id: &str, limit: usize) -> Result<Vec<DailyLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT learner_id, learning_date, answers_json, created_at, updated_at
             FROM daily_logs WHERE learner_id = ?1
             ORDER BY learning_date DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![learner_id, limit], daily_log_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_daily_log_row).collect()
    }
}

impl SyncStateRepository for SqliteStore {
    fn watermark(&self) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT watermark FROM sync_state WHERE id = 1", [], |row| {
                row.get(0)
            })?;

        match raw {
            Some(s) => Ok(Some(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| StoreError::SchemaCorrupt(format!("bad watermark: {e}")))?
                    .with_timezone(&Utc),
            )),
            None => Ok(None),
        }
    }

    fn apply_sync_page(
        &mut self,
        items: &[Item],
        page_max: DateTime<Utc>,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;

        for item in items {
            upsert_item(&tx, item)?;
        }

        // Monotonic: never move the watermark backward.
        let mark = page_max.to_rfc3339();
        tx.execute(
            "UPDATE sync_state SET watermark = ?1
             WHERE id = 1 AND (watermark IS NULL OR watermark < ?1)",
            params![mark],
        )?;

        tx.commit()?;
        Ok(items.len())
    }
}

// === Row mapping ===

/// Raw TEXT columns of an item row, decoded outside the rusqlite closure so
/// codec failures surface as StoreError instead of panics.
struct ItemRow {
    id: String,
    kind: String,
    category_json: String,
    tag_json: String,
    difficulty: Option<String>,
    prompt: String,
    option_json: String,
    correct_json: String,
    explanation: String,
    reference_json: String,
    pack: String,
    locked: bool,
    updated_at: String,
}

fn item_row(row: &rusqlite::Row) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        category_json: row.get(2)?,
        tag_json: row.get(3)?,
        difficulty: row.get(4)?,
        prompt: row.get(5)?,
        option_json: row.get(6)?,
        correct_json: row.get(7)?,
        explanation: row.get(8)?,
        reference_json: row.get(9)?,
        pack: row.get(10)?,
        locked: row.get::<_, i64>(11)? != 0,
        updated_at: row.get(12)?,
    })
}

fn decode_item_row(raw: ItemRow) -> Result<Item> {
    Ok(Item {
        kind: ItemKind::parse(&raw.kind).unwrap_or_default(),
        categories: codec::decode(&raw.category_json)?,
        tags: codec::decode(&raw.tag_json)?,
        difficulty: raw.difficulty.as_deref().and_then(Difficulty::parse),
        options: codec::decode(&raw.option_json)?,
        correct_answers: codec::decode(&raw.correct_json)?,
        references: codec::decode::<Vec<Reference>>(&raw.reference_json)?,
        updated_at: parse_ts(&raw.updated_at)?,
        id: raw.id,
        prompt: raw.prompt,
        explanation: raw.explanation,
        pack: raw.pack,
        locked: raw.locked,
    })
}

pub(crate) fn repetition_row(row: &rusqlite::Row) -> rusqlite::Result<RepetitionState> {
    Ok(RepetitionState {
        learner_id: row.get(0)?,
        item_id: row.get(1)?,
        repetition: row.get(2)?,
        interval_days: row.get(3)?,
        ease_factor: row.get(4)?,
        next_due_at: ts_column(row, 5)?,
        last_quality: row.get(6)?,
        total_attempts: row.get(7)?,
        last_answered_at: opt_ts_column(row, 8)?,
    })
}

struct DailyLogRow {
    learner_id: String,
    learning_date: String,
    answers_json: String,
    created_at: String,
    updated_at: String,
}

fn daily_log_row(row: &rusqlite::Row) -> rusqlite::Result<DailyLogRow> {
    Ok(DailyLogRow {
        learner_id: row.get(0)?,
        learning_date: row.get(1)?,
        answers_json: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn decode_daily_log_row(raw: DailyLogRow) -> Result<DailyLog> {
    let learning_date = NaiveDate::parse_from_str(&raw.learning_date, "%Y-%m-%d")
        .map_err(|e| StoreError::SchemaCorrupt(format!("bad learning_date: {e}")))?;
    Ok(DailyLog {
        learner_id: raw.learner_id,
        learning_date,
        answers: codec::decode(&raw.answers_json)?,
        created_at: parse_ts(&raw.created_at)?,
        updated_at: parse_ts(&raw.updated_at)?,
    })
}

// === Write helpers shared with migrations and the recorder ===

/// Structured item fields pre-encoded for the store boundary.
struct EncodedItem {
    category_json: String,
    tag_json: String,
    option_json: String,
    correct_json: String,
    reference_json: String,
}

fn encode_item(item: &Item) -> Result<EncodedItem> {
    Ok(EncodedItem {
        category_json: codec::encode(&item.categories)?,
        tag_json: codec::encode(&item.tags)?,
        option_json: codec::encode(&item.options)?,
        correct_json: codec::encode(&item.correct_answers)?,
        reference_json: codec::encode(&item.references)?,
    })
}

/// Full-replace upsert of one catalog row. Per-learner tables untouched.
pub(crate) fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    let enc = encode_item(item)?;
    conn.execute(
        "INSERT INTO items
            (id, kind, category_json, tag_json, difficulty, prompt, option_json,
             correct_json, explanation, reference_json, pack_id, locked, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            kind = excluded.kind,
            category_json = excluded.category_json,
            tag_json = excluded.tag_json,
            difficulty = excluded.difficulty,
            prompt = excluded.prompt,
            option_json = excluded.option_json,
            correct_json = excluded.correct_json,
            explanation = excluded.explanation,
            reference_json = excluded.reference_json,
            pack_id = excluded.pack_id,
            locked = excluded.locked,
            updated_at = excluded.updated_at",
        params![
            item.id,
            item.kind.as_str(),
            enc.category_json,
            enc.tag_json,
            item.difficulty.map(|d| d.as_str()),
            item.prompt,
            enc.option_json,
            enc.correct_json,
            item.explanation,
            enc.reference_json,
            item.pack,
            item.locked as i64,
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Insert a catalog row only if absent. Used by bundled-dataset merges.
/// Returns whether a row was inserted.
pub(crate) fn insert_item_if_absent(conn: &Connection, item: &Item) -> Result<bool> {
    let enc = encode_item(item)?;
    let inserted = conn.execute(
        "INSERT INTO items
            (id, kind, category_json, tag_json, difficulty, prompt, option_json,
             correct_json, explanation, reference_json, pack_id, locked, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO NOTHING",
        params![
            item.id,
            item.kind.as_str(),
            enc.category_json,
            enc.tag_json,
            item.difficulty.map(|d| d.as_str()),
            item.prompt,
            enc.option_json,
            enc.correct_json,
            item.explanation,
            enc.reference_json,
            item.pack,
            item.locked as i64,
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(inserted > 0)
}

/// Map SQLite "not a database" / corruption failures to the distinct
/// recovery-requiring error kind.
fn map_corruption(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg)
            if matches!(
                e.code,
                rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt
            ) =>
        {
            StoreError::SchemaCorrupt(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => StoreError::Sqlite(err),
    }
}

// === Timestamp helpers ===

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::SchemaCorrupt(format!("bad timestamp {raw:?}: {e}")))
}

pub(crate) fn ts_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn opt_ts_column(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
        None => Ok(None),
    }
}
