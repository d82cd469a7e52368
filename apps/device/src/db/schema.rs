//! SQLite schema definitions.

/// Current schema version. Bumped whenever `MIGRATIONS` grows.
pub const SCHEMA_VERSION: i64 = 2;

/// All tables and indexes, created by the v1 migration.
pub const CREATE_TABLES: &str = r#"
-- Catalog entries, written only by the sync engine and migrations
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    category_json TEXT NOT NULL,
    tag_json TEXT NOT NULL,
    difficulty TEXT,
    prompt TEXT NOT NULL,
    option_json TEXT NOT NULL,
    correct_json TEXT NOT NULL,
    explanation TEXT NOT NULL DEFAULT '',
    reference_json TEXT NOT NULL,
    pack_id TEXT NOT NULL DEFAULT 'core',
    locked INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Spaced repetition state, one row per (learner, item)
CREATE TABLE IF NOT EXISTS repetition_states (
    learner_id TEXT NOT NULL,
    item_id TEXT NOT NULL,
    repetition INTEGER NOT NULL DEFAULT 0,
    interval_days INTEGER NOT NULL DEFAULT 1,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    next_due_at TEXT NOT NULL,
    last_quality INTEGER,
    total_attempts INTEGER NOT NULL DEFAULT 0,
    last_answered_at TEXT,
    PRIMARY KEY (learner_id, item_id)
);

-- Append-only answer history; the timestamp in the key makes retries
-- distinguishable by content instead of overwriting
CREATE TABLE IF NOT EXISTS attempts (
    learner_id TEXT NOT NULL,
    item_id TEXT NOT NULL,
    answered_at TEXT NOT NULL,
    is_correct INTEGER NOT NULL,
    response_ms INTEGER,
    PRIMARY KEY (learner_id, item_id, answered_at)
);

-- First-attempt correctness, latched once and never overwritten
CREATE TABLE IF NOT EXISTS first_attempts (
    learner_id TEXT NOT NULL,
    item_id TEXT NOT NULL,
    is_correct INTEGER NOT NULL,
    attempted_at TEXT NOT NULL,
    PRIMARY KEY (learner_id, item_id)
);

-- Per-day answer tallies, used for streak and category accuracy
CREATE TABLE IF NOT EXISTS daily_logs (
    learner_id TEXT NOT NULL,
    learning_date TEXT NOT NULL,
    answers_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (learner_id, learning_date)
);

-- Sync watermark: max remote updated_at durably applied locally
CREATE TABLE IF NOT EXISTS sync_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    watermark TEXT
);

-- Local learner identity
CREATE TABLE IF NOT EXISTS app_info (
    learner_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_repetition_due ON repetition_states(learner_id, next_due_at);
CREATE INDEX IF NOT EXISTS idx_repetition_answered ON repetition_states(learner_id, last_answered_at);
CREATE INDEX IF NOT EXISTS idx_attempts_item ON attempts(learner_id, item_id);
"#;

/// Initialize the sync watermark row if not exists.
pub const INIT_SYNC_STATE: &str = r#"
INSERT OR IGNORE INTO sync_state (id, watermark) VALUES (1, NULL);
"#;
