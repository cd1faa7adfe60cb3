//! On-disk behaviour of the annotation store: directory creation,
//! idempotent schema bring-up across reopen, and cascade enforcement on
//! every fresh connection.

use filmroom_core::model::{detail_kind, NewNote, NoteTiming, NoteVideo};
use filmroom_core::schema::Database;
use tempfile::TempDir;

fn video(path: &str) -> NoteVideo {
    NoteVideo {
        path: path.to_string(),
        duration: 4800.0,
        stopped_at: 61.0,
        size: 0,
        format: "mp4".to_string(),
    }
}

#[test]
fn test_open_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("filmroom").join("data.db");

    Database::open(&db_path).expect("Failed to open database");

    assert!(db_path.exists());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(db_path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o700, 0o700);
        assert_eq!(mode & 0o022, 0, "directory must not be group/world writable");
    }
}

#[test]
fn test_reopen_keeps_data_and_schema() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("data.db");

    let id = {
        let db = Database::open(&db_path).unwrap();
        db.insert_note(
            &NewNote::new(NoteTiming::instant(61.0), video("/games/final.mp4"))
                .with_detail(detail_kind::TEXT, Some("kick-off".to_string())),
        )
        .unwrap()
    };

    let db = Database::open(&db_path).expect("Reopen should be a no-op for the schema");
    let notes = db.list_notes("/games/final.mp4").unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, id);
    assert_eq!(notes[0].text.as_deref(), Some("kick-off"));

    let migrations: i64 = db
        .conn()
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(migrations, 3);
}

#[test]
fn test_cascade_after_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("data.db");

    let id = {
        let db = Database::open(&db_path).unwrap();
        db.insert_note(
            &NewNote::new(NoteTiming::instant(5.0), video("/v.mp4"))
                .with_detail(detail_kind::TEXT, Some("x".to_string())),
        )
        .unwrap()
    };

    let db = Database::open(&db_path).unwrap();
    assert!(db.foreign_keys_enabled().unwrap());
    assert!(db.delete_note(id).unwrap());

    for table in [
        "note_timing",
        "note_videos",
        "note_details",
        "note_zones",
        "note_highlights",
        "note_tackles",
    ] {
        let count: i64 = db
            .conn()
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE note_id = ?1"),
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0, "orphaned rows left in {table}");
    }
}
