use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{
    detail_kind, ClipRow, NewNote, Note, NoteDetail, NoteEdit, NoteId, NoteSummary, NoteTackle,
    NoteTiming, NoteVideo, Outcome, TackleFilter, TackleRow, VideoId, HIGHLIGHT_STAR,
};

use super::migrations::{Migration, MIGRATIONS};

/// The annotation store: one SQLite connection with typed note-graph
/// operations.
///
/// A single writer is assumed. Every multi-row write runs in one
/// transaction, so a failed insert or edit leaves no partial rows.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and bring the schema
    /// up to date. Missing parent directories are created with mode 0755.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let conn = Connection::open(path)?;
        log::debug!("Opened annotation store at {}", path.display());
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Cascade deletes depend on this; it is per-connection, not per-file.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Whether foreign-key enforcement is active on this connection.
    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        Ok(self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get::<_, bool>(0))?)
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.apply_migration(migration)?;
            }
        }

        Ok(())
    }

    fn apply_migration(&self, migration: &Migration) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        if !migration.sql.trim().is_empty() {
            tx.execute_batch(migration.sql)?;
        }
        for addition in migration.columns {
            if !self.has_column(addition.table, addition.column)? {
                tx.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    addition.table, addition.column, addition.definition
                ))?;
            }
        }
        tx.execute(
            "INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT name FROM pragma_table_info('{table}')"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names.iter().any(|n| n == column))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(parent)?;
    Ok(())
}

// Note writes
impl Database {
    /// Insert a note and all of its children atomically.
    pub fn insert_note(&self, note: &NewNote) -> Result<NoteId> {
        note.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO notes (category, created_at) VALUES (?1, ?2)",
            params![note.category, Utc::now().to_rfc3339()],
        )?;
        let id = NoteId::new(tx.last_insert_rowid());

        for timing in &note.timings {
            tx.execute(
                r#"INSERT INTO note_timing (note_id, start, "end") VALUES (?1, ?2, ?3)"#,
                params![id, timing.start, timing.end],
            )?;
        }

        for video in &note.videos {
            tx.execute(
                "INSERT INTO videos (path) VALUES (?1) ON CONFLICT(path) DO NOTHING",
                [&video.path],
            )?;
            let video_id: i64 = tx.query_row(
                "SELECT id FROM videos WHERE path = ?1",
                [&video.path],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO note_videos (note_id, video_id, path, duration, stopped_at, size, format)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    video_id,
                    video.path,
                    video.duration,
                    video.stopped_at,
                    video.size,
                    video.format,
                ],
            )?;
        }

        for detail in &note.details {
            tx.execute(
                "INSERT INTO note_details (note_id, type, note) VALUES (?1, ?2, ?3)",
                params![id, detail.kind, detail.text],
            )?;
        }

        for zone in &note.zones {
            tx.execute(
                "INSERT INTO note_zones (note_id, zone) VALUES (?1, ?2)",
                params![id, zone],
            )?;
        }

        for highlight in &note.highlights {
            tx.execute(
                "INSERT INTO note_highlights (note_id, type) VALUES (?1, ?2)",
                params![id, highlight],
            )?;
        }

        for tackle in &note.tackles {
            tx.execute(
                "INSERT INTO note_tackles (note_id, player, team, attempt, outcome, followed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    tackle.player,
                    tackle.team,
                    i64::from(tackle.attempt),
                    tackle.outcome.as_str(),
                    tackle.followed,
                ],
            )?;
        }

        tx.commit()?;
        log::debug!("Inserted note {id}");
        Ok(id)
    }

    /// Replace a note's category and the detail kinds named in `edit`.
    pub fn update_note(&self, id: NoteId, edit: &NoteEdit) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM notes WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(not_found(id));
        }

        if let Some(category) = &edit.category {
            let category = Some(category.as_str()).filter(|c| !c.trim().is_empty());
            tx.execute(
                "UPDATE notes SET category = ?2 WHERE id = ?1",
                params![id, category],
            )?;
        }

        let mut cleared: Vec<&str> = Vec::new();
        for detail in &edit.details {
            if !cleared.contains(&detail.kind.as_str()) {
                tx.execute(
                    "DELETE FROM note_details WHERE note_id = ?1 AND type = ?2",
                    params![id, detail.kind],
                )?;
                cleared.push(&detail.kind);
            }
            if !detail.text.trim().is_empty() {
                tx.execute(
                    "INSERT INTO note_details (note_id, type, note) VALUES (?1, ?2, ?3)",
                    params![id, detail.kind, detail.text],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete a note; child rows go with it through the foreign-key cascade.
    ///
    /// Returns `false` when no note had that id.
    pub fn delete_note(&self, id: NoteId) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

// Note reads
impl Database {
    /// Load one note with every child row.
    pub fn get_note(&self, id: NoteId) -> Result<Note> {
        let root = self
            .conn
            .query_row(
                "SELECT category, created_at FROM notes WHERE id = ?1",
                [id],
                |row| Ok((row.get::<_, Option<String>>(0)?, parse_timestamp(row, 1)?)),
            )
            .optional()?;
        let Some((category, created_at)) = root else {
            return Err(not_found(id));
        };

        Ok(Note {
            id,
            category,
            created_at,
            timings: self.timings_for(id)?,
            videos: self.videos_for(id)?,
            details: self.details_for(id)?,
            zones: self.zones_for(id)?,
            highlights: self.highlights_for(id)?,
            tackles: self.tackles_for(id)?,
        })
    }

    pub fn timings_for(&self, id: NoteId) -> Result<Vec<NoteTiming>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT start, "end" FROM note_timing WHERE note_id = ?1 ORDER BY start, id"#,
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok(NoteTiming {
                    start: row.get(0)?,
                    end: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn videos_for(&self, id: NoteId) -> Result<Vec<NoteVideo>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, duration, stopped_at, size, format
             FROM note_videos WHERE note_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([id], |row| {
                Ok(NoteVideo {
                    path: row.get(0)?,
                    duration: row.get(1)?,
                    stopped_at: row.get(2)?,
                    size: row.get(3)?,
                    format: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn details_for(&self, id: NoteId) -> Result<Vec<NoteDetail>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type, note FROM note_details WHERE note_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([id], |row| {
                Ok(NoteDetail {
                    kind: row.get(0)?,
                    text: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn zones_for(&self, id: NoteId) -> Result<Vec<String>> {
        self.strings_for("SELECT zone FROM note_zones WHERE note_id = ?1 ORDER BY id", id)
    }

    pub fn highlights_for(&self, id: NoteId) -> Result<Vec<String>> {
        self.strings_for(
            "SELECT type FROM note_highlights WHERE note_id = ?1 ORDER BY id",
            id,
        )
    }

    pub fn tackles_for(&self, id: NoteId) -> Result<Vec<NoteTackle>> {
        let mut stmt = self.conn.prepare(
            "SELECT player, team, attempt, outcome, followed
             FROM note_tackles WHERE note_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([id], |row| row_to_tackle(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn strings_for(&self, sql: &str, id: NoteId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Canonical record id for a video path, if any note referenced it.
    pub fn video_id(&self, path: &str) -> Result<Option<VideoId>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM videos WHERE path = ?1", [path], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .map(VideoId::new))
    }

    /// All notes on one video, ordered by ascending start time.
    ///
    /// A note without timing sorts first (start 0).
    pub fn list_notes(&self, video_path: &str) -> Result<Vec<NoteSummary>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT n.id,
                      n.category,
                      MIN(COALESCE(t.start, 0)) AS start_at,
                      MAX(COALESCE(t."end", t.start, 0)) AS end_at,
                      n.created_at,
                      (SELECT d.note FROM note_details d
                        WHERE d.note_id = n.id
                        ORDER BY CASE d.type WHEN 'description' THEN 0 WHEN 'text' THEN 1 ELSE 2 END, d.id
                        LIMIT 1) AS text,
                      EXISTS (SELECT 1 FROM note_tackles k WHERE k.note_id = n.id) AS is_tackle
               FROM notes n
               JOIN note_videos v ON v.note_id = n.id
               LEFT JOIN note_timing t ON t.note_id = n.id
               WHERE v.path = ?1
               GROUP BY n.id
               ORDER BY start_at ASC, n.id ASC"#,
        )?;
        let rows = stmt
            .query_map([video_path], |row| {
                Ok(NoteSummary {
                    id: NoteId::new(row.get(0)?),
                    category: row.get(1)?,
                    start: row.get(2)?,
                    end: row.get(3)?,
                    created_at: parse_timestamp(row, 4)?,
                    text: row.get(5)?,
                    is_tackle: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Clips (notes with `end > start`) on one video, ordered by start.
    pub fn list_clips(&self, video_path: &str) -> Result<Vec<ClipRow>> {
        let sql = format!("{CLIP_SELECT} WHERE v.path = ?1 {CLIP_TAIL}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([video_path], row_to_clip)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// One clip by id, whatever video it belongs to.
    pub fn get_clip(&self, id: NoteId) -> Result<ClipRow> {
        let sql = format!("{CLIP_SELECT} WHERE n.id = ?1 {CLIP_TAIL}");
        self.conn
            .query_row(&sql, [id], row_to_clip)
            .optional()?
            .ok_or_else(|| Error::NotFound {
                entity: "clip",
                id: id.to_string(),
            })
    }

    /// Tackles on one video, filtered and ordered by start.
    pub fn list_tackles(&self, video_path: &str, filter: &TackleFilter) -> Result<Vec<TackleRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id,
                    MIN(COALESCE(t.start, 0)) AS start_at,
                    k.player, k.team, k.attempt, k.outcome, k.followed,
                    EXISTS (SELECT 1 FROM note_highlights h
                             WHERE h.note_id = n.id AND h.type = ?4) AS starred,
                    (SELECT z.zone FROM note_zones z WHERE z.note_id = n.id ORDER BY z.id LIMIT 1),
                    (SELECT d.note FROM note_details d
                      WHERE d.note_id = n.id AND d.type = ?5 ORDER BY d.id LIMIT 1)
             FROM note_tackles k
             JOIN notes n ON n.id = k.note_id
             JOIN note_videos v ON v.note_id = n.id
             LEFT JOIN note_timing t ON t.note_id = n.id
             WHERE v.path = ?1
               AND (?2 IS NULL OR k.player = ?2 COLLATE NOCASE)
               AND (?3 IS NULL OR k.outcome = ?3)
               AND (?6 = 0 OR EXISTS (SELECT 1 FROM note_highlights s
                                       WHERE s.note_id = n.id AND s.type = ?4))
             GROUP BY k.id
             ORDER BY start_at ASC, n.id ASC",
        )?;
        let rows = stmt
            .query_map(
                params![
                    video_path,
                    filter.player,
                    filter.outcome.map(Outcome::as_str),
                    HIGHLIGHT_STAR,
                    detail_kind::TACKLE_NOTES,
                    filter.starred_only,
                ],
                |row| {
                    Ok(TackleRow {
                        id: NoteId::new(row.get(0)?),
                        start: row.get(1)?,
                        tackle: row_to_tackle(row, 2)?,
                        starred: row.get(7)?,
                        zone: row.get(8)?,
                        notes: row.get(9)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

const CLIP_SELECT: &str = r#"SELECT n.id,
       MIN(t.start) AS start_at,
       MAX(t."end") AS end_at,
       (SELECT d.note FROM note_details d
         WHERE d.note_id = n.id AND d.type = 'description' ORDER BY d.id LIMIT 1),
       n.category,
       MIN(v.path)
FROM notes n
JOIN note_videos v ON v.note_id = n.id
JOIN note_timing t ON t.note_id = n.id"#;

const CLIP_TAIL: &str = r#"AND t."end" > t.start GROUP BY n.id ORDER BY start_at ASC, n.id ASC"#;

fn row_to_clip(row: &rusqlite::Row) -> rusqlite::Result<ClipRow> {
    Ok(ClipRow {
        id: NoteId::new(row.get(0)?),
        start: row.get(1)?,
        end: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        video_path: row.get(5)?,
    })
}

/// Read `player, team, attempt, outcome, followed` starting at `first`.
fn row_to_tackle(row: &rusqlite::Row, first: usize) -> rusqlite::Result<NoteTackle> {
    let outcome_str: String = row.get(first + 3)?;
    let outcome = outcome_str.parse::<Outcome>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(first + 3, Type::Text, Box::new(e))
    })?;
    Ok(NoteTackle {
        player: row.get(first)?,
        team: row.get(first + 1)?,
        attempt: row.get(first + 2)?,
        outcome,
        followed: row.get(first + 4)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(Into::into)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn not_found(id: NoteId) -> Error {
    Error::NotFound {
        entity: "note",
        id: id.to_string(),
    }
}
