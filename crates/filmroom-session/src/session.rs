//! The annotation verbs.
//!
//! Every verb reads what it needs from the live player, then performs one
//! store transaction. Nothing is written if either step fails.

use filmroom_core::model::{
    detail_kind, ClipRow, NewNote, Note, NoteEdit, NoteId, NoteSummary, NoteTackle, NoteTiming,
    NoteVideo, Outcome, TackleFilter, TackleRow, HIGHLIGHT_STAR,
};
use filmroom_core::schema::Database;
use filmroom_player::{Player, PlayerError};

use crate::error::{Result, SessionError};
use crate::export::{ExportOptions, ExportSummary, Exporter};
use crate::marker::{ClipMarker, MarkedStart};

/// Optional descriptive fields shared by notes and clips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    pub category: Option<String>,
    pub player: Option<String>,
    pub team: Option<String>,
}

impl Labels {
    fn apply(self, note: NewNote) -> NewNote {
        note.with_category(self.category)
            .with_detail(detail_kind::PLAYER, self.player)
            .with_detail(detail_kind::TEAM, self.team)
    }
}

/// Raw `tackle add` input, validated by [`Session::tackle_add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TackleInput {
    pub player: Option<String>,
    pub team: Option<String>,
    /// Defaults to 1 when absent.
    pub attempt: Option<String>,
    pub outcome: String,
    pub followed: Option<String>,
    pub star: bool,
    pub notes: Option<String>,
    pub zone: Option<String>,
}

impl TackleInput {
    /// Check the input and build the tackle row it describes.
    pub fn validate(&self) -> Result<NoteTackle> {
        let player = self
            .player
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(SessionError::MissingPlayer)?;

        let outcome: Outcome = self
            .outcome
            .parse()
            .map_err(|_| SessionError::InvalidOutcome(self.outcome.clone()))?;

        let attempt = match self.attempt.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| SessionError::InvalidAttempt(raw.to_string()))?,
        };

        Ok(NoteTackle {
            player: player.to_string(),
            team: non_blank(self.team.clone()),
            attempt,
            outcome,
            followed: non_blank(self.followed.clone()),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Live state read from the player for a write.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    path: String,
    time_pos: f64,
    duration: f64,
}

/// Note verbs that need the store but no player.
#[derive(Debug, Clone, Copy)]
pub struct Notebook<'a> {
    db: &'a Database,
}

impl<'a> Notebook<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn show(&self, id: NoteId) -> Result<Note> {
        Ok(self.db.get_note(id)?)
    }

    /// Apply `edit` and return the updated note. An empty edit is rejected.
    pub fn edit(&self, id: NoteId, edit: &NoteEdit) -> Result<Note> {
        if edit.is_empty() {
            return Err(filmroom_core::Error::Validation("nothing to change".to_string()).into());
        }
        self.db.update_note(id, edit)?;
        self.show(id)
    }

    pub fn delete(&self, id: NoteId) -> Result<()> {
        if self.db.delete_note(id)? {
            log::info!("Deleted note {id}");
            Ok(())
        } else {
            Err(filmroom_core::Error::NotFound {
                entity: "note",
                id: id.to_string(),
            }
            .into())
        }
    }
}

/// One analyst session: a store, a player and the pending clip start.
#[derive(Debug)]
pub struct Session<'a, P: Player + ?Sized> {
    db: &'a Database,
    player: &'a P,
    marker: &'a ClipMarker,
}

impl<'a, P: Player + ?Sized> Session<'a, P> {
    pub fn new(db: &'a Database, player: &'a P, marker: &'a ClipMarker) -> Self {
        Self { db, player, marker }
    }

    pub fn db(&self) -> &Database {
        self.db
    }

    pub fn player(&self) -> &P {
        self.player
    }

    pub fn marker(&self) -> &ClipMarker {
        self.marker
    }

    /// Path of the loaded video.
    pub async fn video_path(&self) -> Result<String> {
        match self.player.path().await {
            Ok(path) if !path.is_empty() => Ok(path),
            Ok(_) | Err(PlayerError::CommandFailed { .. }) => Err(SessionError::NoVideoLoaded),
            Err(e) => Err(e.into()),
        }
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let path = self.video_path().await?;
        let time_pos = self.player.time_pos().await?;
        let duration = self.player.duration().await?;
        Ok(Snapshot {
            path,
            time_pos,
            duration,
        })
    }

    // Clips

    /// Remember the current position as the start of the next clip.
    pub async fn clip_start(&self) -> Result<MarkedStart> {
        let path = self.video_path().await?;
        let start = self.player.time_pos().await?;
        self.marker.set(start, path.clone());
        log::info!("Clip start marked at {start:.3}s on {path}");
        Ok(MarkedStart {
            start,
            video_path: path,
        })
    }

    /// Close the pending clip at the current position.
    ///
    /// The marker survives a failed attempt, so the analyst can seek and
    /// retry.
    pub async fn clip_end(&self, description: &str, labels: Labels) -> Result<NoteId> {
        let now = self.snapshot().await?;
        self.marker.consume(|marked| {
            if marked.video_path != now.path {
                return Err(SessionError::VideoChanged {
                    marked: marked.video_path.clone(),
                    current: now.path.clone(),
                });
            }
            self.insert_clip(marked.start, now.time_pos, description, labels, &now)
        })
    }

    /// Store a clip between two explicit times on the loaded video.
    pub async fn clip_add(
        &self,
        start: f64,
        end: f64,
        description: &str,
        labels: Labels,
    ) -> Result<NoteId> {
        let path = self.video_path().await?;
        let now = Snapshot {
            path,
            time_pos: start,
            duration: 0.0,
        };
        self.insert_clip(start, end, description, labels, &now)
    }

    fn insert_clip(
        &self,
        start: f64,
        end: f64,
        description: &str,
        labels: Labels,
        now: &Snapshot,
    ) -> Result<NoteId> {
        if end <= start {
            return Err(SessionError::InvalidRange { start, end });
        }
        let video = NoteVideo::new(now.path.clone(), now.duration, now.time_pos);
        let note = labels
            .apply(NewNote::new(NoteTiming::span(start, end), video))
            .with_detail(detail_kind::DESCRIPTION, Some(description.to_string()));
        let id = self.db.insert_note(&note)?;
        log::info!("Stored clip {id} ({start:.3}s to {end:.3}s)");
        Ok(id)
    }

    /// Seek to a clip and loop it.
    pub async fn clip_play(&self, id: NoteId) -> Result<ClipRow> {
        let clip = self.db.get_clip(id)?;
        self.player.seek(clip.start).await?;
        self.player.set_ab_loop(clip.start, clip.end).await?;
        Ok(clip)
    }

    pub async fn clip_stop(&self) -> Result<()> {
        self.player.clear_ab_loop().await?;
        Ok(())
    }

    pub async fn clip_list(&self) -> Result<Vec<ClipRow>> {
        let path = self.video_path().await?;
        Ok(self.db.list_clips(&path)?)
    }

    /// Export every clip on the loaded video.
    pub async fn clip_export_all(
        &self,
        exporter: &Exporter,
        opts: &ExportOptions,
    ) -> Result<ExportSummary> {
        let clips = self.clip_list().await?;
        exporter.export_all(&clips, opts).await
    }

    // Notes

    /// Note the current position, with optional text and labels.
    pub async fn note_add(&self, text: Option<String>, labels: Labels) -> Result<NoteId> {
        let now = self.snapshot().await?;
        let video = NoteVideo::new(now.path, now.duration, now.time_pos);
        let note = labels
            .apply(NewNote::new(NoteTiming::instant(now.time_pos), video))
            .with_detail(detail_kind::TEXT, text);
        let id = self.db.insert_note(&note)?;
        log::info!("Stored note {id} at {:.3}s", now.time_pos);
        Ok(id)
    }

    pub async fn note_list(&self) -> Result<Vec<NoteSummary>> {
        let path = self.video_path().await?;
        Ok(self.db.list_notes(&path)?)
    }

    /// Seek to where a note was taken.
    pub async fn note_goto(&self, id: NoteId) -> Result<Note> {
        let note = self.db.get_note(id)?;
        self.player.seek(note.start()).await?;
        Ok(note)
    }

    pub fn note_show(&self, id: NoteId) -> Result<Note> {
        self.notebook().show(id)
    }

    pub fn note_edit(&self, id: NoteId, edit: &NoteEdit) -> Result<Note> {
        self.notebook().edit(id, edit)
    }

    /// Delete a note and everything attached to it.
    pub fn note_delete(&self, id: NoteId) -> Result<()> {
        self.notebook().delete(id)
    }

    /// The verbs that only touch the store.
    pub fn notebook(&self) -> Notebook<'a> {
        Notebook::new(self.db)
    }

    // Tackles

    /// Record a tackle at the current position.
    pub async fn tackle_add(&self, input: &TackleInput) -> Result<NoteId> {
        let tackle = input.validate()?;
        let now = self.snapshot().await?;

        let video = NoteVideo::new(now.path, now.duration, now.time_pos);
        let mut note = NewNote::new(NoteTiming::instant(now.time_pos), video)
            .with_zone(input.zone.clone())
            .with_detail(detail_kind::TACKLE_NOTES, input.notes.clone())
            .with_tackle(tackle);
        if input.star {
            note = note.with_highlight(HIGHLIGHT_STAR);
        }

        let id = self.db.insert_note(&note)?;
        log::info!("Stored tackle {id} at {:.3}s", now.time_pos);
        Ok(id)
    }

    pub async fn tackle_list(&self, filter: &TackleFilter) -> Result<Vec<TackleRow>> {
        let path = self.video_path().await?;
        Ok(self.db.list_tackles(&path, filter)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(outcome: &str) -> TackleInput {
        TackleInput {
            player: Some("Dupont".to_string()),
            outcome: outcome.to_string(),
            ..TackleInput::default()
        }
    }

    #[test]
    fn test_tackle_defaults() {
        let tackle = input("Completed").validate().unwrap();
        assert_eq!(tackle.player, "Dupont");
        assert_eq!(tackle.attempt, 1);
        assert_eq!(tackle.outcome, Outcome::Completed);
        assert!(tackle.team.is_none());
    }

    #[test]
    fn test_tackle_validation() {
        assert!(matches!(
            input("dropped").validate(),
            Err(SessionError::InvalidOutcome(o)) if o == "dropped"
        ));

        let mut bad = input("missed");
        bad.player = Some("  ".to_string());
        assert!(matches!(bad.validate(), Err(SessionError::MissingPlayer)));

        for attempt in ["0", "-2", "1.5", "two"] {
            let mut bad = input("missed");
            bad.attempt = Some(attempt.to_string());
            assert!(
                matches!(bad.validate(), Err(SessionError::InvalidAttempt(_))),
                "{attempt}"
            );
        }

        let mut ok = input("possible");
        ok.attempt = Some("3".to_string());
        ok.team = Some(String::new());
        let tackle = ok.validate().unwrap();
        assert_eq!(tackle.attempt, 3);
        assert!(tackle.team.is_none());
    }
}
