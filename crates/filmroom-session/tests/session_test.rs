//! Session verbs against an in-memory store and a scripted player.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use filmroom_core::model::{detail_kind, NoteEdit, Outcome, TackleFilter};
use filmroom_core::schema::Database;
use filmroom_player::{Player, PlayerError, PlayerResult, PropertyValue};
use filmroom_session::{
    ClipMarker, ErrorKind, Labels, Notebook, Session, SessionError, TackleInput,
};
use serde_json::{json, Value};

/// Answers property reads from a table and records every command.
#[derive(Debug, Default)]
struct FakePlayer {
    props: Mutex<HashMap<String, Value>>,
    log: Mutex<Vec<Vec<Value>>>,
}

impl FakePlayer {
    fn on(path: &str, time_pos: f64) -> Self {
        let player = Self::default();
        player.set("path", json!(path));
        player.set("time-pos", json!(time_pos));
        player.set("duration", json!(4800.0));
        player
    }

    fn set(&self, name: &str, value: Value) {
        self.props.lock().unwrap().insert(name.to_string(), value);
    }

    fn prop(&self, name: &str) -> Option<Value> {
        self.props.lock().unwrap().get(name).cloned()
    }

    fn commands(&self) -> Vec<Vec<Value>> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn command(&self, args: Vec<Value>) -> PlayerResult<PropertyValue> {
        self.log.lock().unwrap().push(args.clone());
        let name = args[0].as_str().unwrap_or_default().to_string();
        match name.as_str() {
            "get_property" => {
                let prop = args[1].as_str().unwrap_or_default();
                self.prop(prop)
                    .map(PropertyValue::from)
                    .ok_or_else(|| PlayerError::CommandFailed {
                        command: name.clone(),
                        message: "property unavailable".to_string(),
                    })
            }
            "set_property" => {
                self.set(args[1].as_str().unwrap_or_default(), args[2].clone());
                Ok(PropertyValue::Null)
            }
            "seek" => {
                self.set("time-pos", args[1].clone());
                Ok(PropertyValue::Null)
            }
            _ => Ok(PropertyValue::Null),
        }
    }
}

fn count(db: &Database, table: &str) -> i64 {
    db.conn()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[tokio::test]
async fn test_clip_round_trip() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/v.mp4", 10.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let marked = session.clip_start().await.unwrap();
    assert!((marked.start - 10.0).abs() < f64::EPSILON);
    assert!(marker.is_set());

    player.set("time-pos", json!(25.5));
    let id = session.clip_end("try", Labels::default()).await.unwrap();
    assert!(!marker.is_set());

    let clips = session.clip_list().await.unwrap();
    assert_eq!(clips.len(), 1);
    let clip = &clips[0];
    assert_eq!(clip.id, id);
    assert!((clip.start - 10.0).abs() < f64::EPSILON);
    assert!((clip.end - 25.5).abs() < f64::EPSILON);
    assert_eq!(clip.description.as_deref(), Some("try"));
    assert_eq!(clip.video_path, "/v.mp4");
    assert!((clip.duration() - 15.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_clip_end_refuses_changed_video() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/a.mp4", 5.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    session.clip_start().await.unwrap();
    player.set("path", json!("/b.mp4"));
    player.set("time-pos", json!(9.0));

    let err = session.clip_end("x", Labels::default()).await.unwrap_err();
    assert!(
        err.to_string()
            .contains("video changed since clip start was marked"),
        "{err}"
    );
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(count(&db, "notes"), 0);
    // Still marked, so the analyst can go back and finish the clip.
    assert!(marker.is_set());
}

#[tokio::test]
async fn test_clip_end_requires_later_end() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/v.mp4", 30.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    assert!(matches!(
        session.clip_end("early", Labels::default()).await,
        Err(SessionError::NoClipStart)
    ));

    session.clip_start().await.unwrap();
    for t in [30.0, 12.0] {
        player.set("time-pos", json!(t));
        assert!(matches!(
            session.clip_end("early", Labels::default()).await,
            Err(SessionError::InvalidRange { .. })
        ));
    }
    assert_eq!(count(&db, "notes"), 0);

    assert!(matches!(
        session
            .clip_add(8.0, 8.0, "zero", Labels::default())
            .await,
        Err(SessionError::InvalidRange { .. })
    ));
}

#[tokio::test]
async fn test_clip_add_play_stop() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/v.mp4", 0.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let labels = Labels {
        category: Some("attack".to_string()),
        player: Some("Ntamack".to_string()),
        team: None,
    };
    let id = session.clip_add(120.0, 131.5, "break", labels).await.unwrap();

    let note = session.note_show(id).unwrap();
    assert_eq!(note.category.as_deref(), Some("attack"));
    assert_eq!(note.detail(detail_kind::PLAYER), Some("Ntamack"));
    assert_eq!(note.detail(detail_kind::DESCRIPTION), Some("break"));

    let clip = session.clip_play(id).await.unwrap();
    assert!((clip.start - 120.0).abs() < f64::EPSILON);
    assert_eq!(player.prop("time-pos"), Some(json!(120.0)));
    assert_eq!(
        player.ab_loop().await.unwrap(),
        (Some(120.0), Some(131.5))
    );

    session.clip_stop().await.unwrap();
    assert_eq!(player.prop("ab-loop-a"), Some(json!("no")));
    assert_eq!(player.prop("ab-loop-b"), Some(json!("no")));
}

#[tokio::test]
async fn test_notes_are_scoped_and_ordered() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/games/final.mp4", 300.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let late = session
        .note_add(Some("scrum".to_string()), Labels::default())
        .await
        .unwrap();
    player.set("time-pos", json!(42.0));
    let early = session
        .note_add(Some("lineout".to_string()), Labels::default())
        .await
        .unwrap();

    player.set("path", json!("/games/semi.mp4"));
    session.note_add(None, Labels::default()).await.unwrap();

    player.set("path", json!("/games/final.mp4"));
    let notes = session.note_list().await.unwrap();
    let ids: Vec<_> = notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![early, late]);
    assert!(notes.windows(2).all(|w| w[0].start <= w[1].start));
    assert_eq!(notes[0].text.as_deref(), Some("lineout"));
}

#[tokio::test]
async fn test_note_goto_edit_delete() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/v.mp4", 61.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let id = session
        .note_add(Some("kick-off".to_string()), Labels::default())
        .await
        .unwrap();
    player.set("time-pos", json!(900.0));

    let note = session.note_goto(id).await.unwrap();
    assert!((note.start() - 61.0).abs() < f64::EPSILON);
    assert!(player
        .commands()
        .contains(&vec![json!("seek"), json!(61.0), json!("absolute")]));

    let edit = NoteEdit {
        category: Some("restart".to_string()),
        ..NoteEdit::default()
    }
    .with_detail(detail_kind::TEXT, Some("short kick-off".to_string()));
    let edited = session.note_edit(id, &edit).unwrap();
    assert_eq!(edited.category.as_deref(), Some("restart"));
    assert_eq!(edited.detail(detail_kind::TEXT), Some("short kick-off"));

    let err = session.note_edit(id, &NoteEdit::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    session.note_delete(id).unwrap();
    for table in ["notes", "note_timing", "note_videos", "note_details"] {
        assert_eq!(count(&db, table), 0, "{table}");
    }
    assert_eq!(session.note_delete(id).unwrap_err().kind(), ErrorKind::Store);
}

#[tokio::test]
async fn test_notebook_works_without_a_player() {
    let db = Database::open_in_memory().unwrap();
    let id = {
        let player = FakePlayer::on("/v.mp4", 12.0);
        let marker = ClipMarker::new();
        Session::new(&db, &player, &marker)
            .note_add(Some("ruck".to_string()), Labels::default())
            .await
            .unwrap()
    };

    let notebook = Notebook::new(&db);
    assert_eq!(
        notebook.edit(id, &NoteEdit::default()).unwrap_err().kind(),
        ErrorKind::Validation
    );

    let edit = NoteEdit::default().with_detail(detail_kind::TEAM, Some("Reds".to_string()));
    let note = notebook.edit(id, &edit).unwrap();
    assert_eq!(note.detail(detail_kind::TEAM), Some("Reds"));
    assert_eq!(note.detail(detail_kind::TEXT), Some("ruck"));

    notebook.delete(id).unwrap();
    assert_eq!(notebook.show(id).unwrap_err().kind(), ErrorKind::Store);
    assert_eq!(notebook.delete(id).unwrap_err().kind(), ErrorKind::Store);
}

#[tokio::test]
async fn test_tackles() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/v.mp4", 100.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let starred = session
        .tackle_add(&TackleInput {
            player: Some("Alldritt".to_string()),
            team: Some("FRA".to_string()),
            attempt: Some("2".to_string()),
            outcome: "completed".to_string(),
            star: true,
            zone: Some("22".to_string()),
            notes: Some("dominant".to_string()),
            ..TackleInput::default()
        })
        .await
        .unwrap();
    player.set("time-pos", json!(50.0));
    let missed = session
        .tackle_add(&TackleInput {
            player: Some("Jelonch".to_string()),
            outcome: "missed".to_string(),
            ..TackleInput::default()
        })
        .await
        .unwrap();

    let all = session.tackle_list(&TackleFilter::default()).await.unwrap();
    assert_eq!(
        all.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![missed, starred]
    );

    let stars = session
        .tackle_list(&TackleFilter {
            starred_only: true,
            ..TackleFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(stars.len(), 1);
    assert_eq!(stars[0].tackle.attempt, 2);
    assert_eq!(stars[0].zone.as_deref(), Some("22"));
    assert_eq!(stars[0].notes.as_deref(), Some("dominant"));

    let by_outcome = session
        .tackle_list(&TackleFilter {
            outcome: Some(Outcome::Missed),
            ..TackleFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_outcome.len(), 1);
    assert_eq!(by_outcome[0].tackle.player, "Jelonch");

    let notes = session.note_list().await.unwrap();
    assert!(notes.iter().all(|n| n.is_tackle));
}

#[tokio::test]
async fn test_invalid_tackle_writes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::on("/v.mp4", 100.0);
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let err = session
        .tackle_add(&TackleInput {
            player: Some("Alldritt".to_string()),
            outcome: "dropped".to_string(),
            ..TackleInput::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidOutcome(_)));
    assert!(player.commands().is_empty(), "player was consulted");
    assert_eq!(count(&db, "notes"), 0);
}

#[tokio::test]
async fn test_no_video_loaded() {
    let db = Database::open_in_memory().unwrap();
    let player = FakePlayer::default();
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    assert!(matches!(
        session.clip_start().await,
        Err(SessionError::NoVideoLoaded)
    ));
    assert!(!marker.is_set());
}
