/// A forward-only schema migration.
///
/// `sql` must be idempotent on its own (`IF NOT EXISTS` everywhere);
/// `columns` are added only when `PRAGMA table_info` does not list them.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
    pub columns: &'static [ColumnAddition],
}

/// A column added to an existing table by a later migration.
#[derive(Debug)]
pub struct ColumnAddition {
    pub table: &'static str,
    pub column: &'static str,
    pub definition: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Root annotation
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT,
    created_at TEXT NOT NULL
);

-- Canonical video records, one per path
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS note_timing (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    start REAL NOT NULL,
    "end" REAL NOT NULL,
    CHECK ("end" >= start)
);

CREATE TABLE IF NOT EXISTS note_videos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    path TEXT NOT NULL,
    duration REAL NOT NULL DEFAULT 0,
    stopped_at REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS note_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    note TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    zone TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_highlights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_tackles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    player TEXT NOT NULL,
    team TEXT,
    attempt INTEGER NOT NULL DEFAULT 1 CHECK (attempt > 0),
    outcome TEXT NOT NULL CHECK (outcome IN ('completed', 'missed', 'possible', 'other'))
);
"#;

// File metadata, the follow-up player on a tackle, and the link from a
// note's video row to its canonical record.
const MIGRATION_002: &str = "";

const MIGRATION_002_COLUMNS: &[ColumnAddition] = &[
    ColumnAddition {
        table: "note_videos",
        column: "size",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    ColumnAddition {
        table: "note_videos",
        column: "format",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    ColumnAddition {
        table: "note_videos",
        column: "video_id",
        definition: "INTEGER REFERENCES videos(id)",
    },
    ColumnAddition {
        table: "note_tackles",
        column: "followed",
        definition: "TEXT",
    },
];

const MIGRATION_003: &str = r#"
CREATE INDEX IF NOT EXISTS idx_note_timing_note_id ON note_timing(note_id);
CREATE INDEX IF NOT EXISTS idx_note_videos_note_id ON note_videos(note_id);
CREATE INDEX IF NOT EXISTS idx_note_videos_path ON note_videos(path);
CREATE INDEX IF NOT EXISTS idx_note_details_note_id ON note_details(note_id);
CREATE INDEX IF NOT EXISTS idx_note_zones_note_id ON note_zones(note_id);
CREATE INDEX IF NOT EXISTS idx_note_highlights_note_id ON note_highlights(note_id);
CREATE INDEX IF NOT EXISTS idx_note_tackles_note_id ON note_tackles(note_id);
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: MIGRATION_001,
        columns: &[],
    },
    Migration {
        version: 2,
        name: "video_metadata_and_followed",
        sql: MIGRATION_002,
        columns: MIGRATION_002_COLUMNS,
    },
    Migration {
        version: 3,
        name: "note_indices",
        sql: MIGRATION_003,
        columns: &[],
    },
];
