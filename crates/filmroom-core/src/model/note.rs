use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::NoteId;
use crate::model::tackle::NoteTackle;

/// Well-known values for [`NoteDetail::kind`].
pub mod detail_kind {
    /// Free-form note text (`note add -x`).
    pub const TEXT: &str = "text";
    /// Clip description.
    pub const DESCRIPTION: &str = "description";
    pub const PLAYER: &str = "player";
    pub const TEAM: &str = "team";
    /// Extra remarks attached to a tackle.
    pub const TACKLE_NOTES: &str = "notes";
}

/// Highlight type used for starred tackles.
pub const HIGHLIGHT_STAR: &str = "star";

/// A time interval on the video, in seconds.
///
/// Single-instant annotations have `end == start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteTiming {
    pub start: f64,
    pub end: f64,
}

impl NoteTiming {
    #[must_use]
    pub const fn instant(at: f64) -> Self {
        Self { start: at, end: at }
    }

    #[must_use]
    pub const fn span(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// The video a note was taken on, as reported by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteVideo {
    /// Path exactly as the player reported it.
    pub path: String,
    pub duration: f64,
    /// Playback position when the note was taken.
    pub stopped_at: f64,
    /// File size in bytes (0 when the file could not be inspected).
    pub size: i64,
    /// Container format, derived from the file extension.
    pub format: String,
}

impl NoteVideo {
    #[must_use]
    pub fn new(path: impl Into<String>, duration: f64, stopped_at: f64) -> Self {
        let path = path.into();
        let format = std::path::Path::new(&path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let size = std::fs::metadata(&path)
            .ok()
            .and_then(|m| i64::try_from(m.len()).ok())
            .unwrap_or(0);
        Self {
            path,
            duration,
            stopped_at,
            size,
            format,
        }
    }
}

/// Typed free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDetail {
    pub kind: String,
    pub text: String,
}

impl NoteDetail {
    #[must_use]
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
        }
    }
}

/// Input graph for a note insert. Every child is written in the same
/// transaction as the root row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNote {
    pub category: Option<String>,
    pub timings: Vec<NoteTiming>,
    pub videos: Vec<NoteVideo>,
    pub details: Vec<NoteDetail>,
    pub zones: Vec<String>,
    pub highlights: Vec<String>,
    pub tackles: Vec<NoteTackle>,
}

impl NewNote {
    #[must_use]
    pub fn new(timing: NoteTiming, video: NoteVideo) -> Self {
        Self {
            timings: vec![timing],
            videos: vec![video],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.trim().is_empty());
        self
    }

    /// Add a detail row, skipping blank text.
    #[must_use]
    pub fn with_detail(mut self, kind: &str, text: Option<String>) -> Self {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            self.details.push(NoteDetail::new(kind, text));
        }
        self
    }

    #[must_use]
    pub fn with_zone(mut self, zone: Option<String>) -> Self {
        if let Some(zone) = zone.filter(|z| !z.trim().is_empty()) {
            self.zones.push(zone);
        }
        self
    }

    #[must_use]
    pub fn with_highlight(mut self, kind: &str) -> Self {
        self.highlights.push(kind.to_string());
        self
    }

    #[must_use]
    pub fn with_tackle(mut self, tackle: NoteTackle) -> Self {
        self.tackles.push(tackle);
        self
    }

    /// Check the structural invariants before anything touches the store.
    pub fn validate(&self) -> crate::Result<()> {
        if self.timings.is_empty() {
            return Err(crate::Error::Validation(
                "a note needs at least one timing".to_string(),
            ));
        }
        if self.videos.is_empty() {
            return Err(crate::Error::Validation(
                "a note needs at least one video".to_string(),
            ));
        }
        if let Some(t) = self.timings.iter().find(|t| t.end < t.start) {
            return Err(crate::Error::Validation(format!(
                "timing end {} is before start {}",
                t.end, t.start
            )));
        }
        Ok(())
    }
}

/// Replacement values for an existing note.
///
/// Details are replaced per kind: every kind present in `details` has its
/// existing rows deleted before the new ones are written. A blank text
/// clears that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEdit {
    pub category: Option<String>,
    pub details: Vec<NoteDetail>,
}

impl NoteEdit {
    #[must_use]
    pub fn with_detail(mut self, kind: &str, text: Option<String>) -> Self {
        if let Some(text) = text {
            self.details.push(NoteDetail::new(kind, text));
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.details.is_empty()
    }
}

/// A fully loaded note with all of its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub timings: Vec<NoteTiming>,
    pub videos: Vec<NoteVideo>,
    pub details: Vec<NoteDetail>,
    pub zones: Vec<String>,
    pub highlights: Vec<String>,
    pub tackles: Vec<NoteTackle>,
}

impl Note {
    /// Start of the first timing, or 0 for a note without one.
    #[must_use]
    pub fn start(&self) -> f64 {
        self.timings.first().map_or(0.0, |t| t.start)
    }

    /// First detail of the given kind.
    #[must_use]
    pub fn detail(&self, kind: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.text.as_str())
    }
}

/// One row of a note listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub category: Option<String>,
    pub start: f64,
    pub end: f64,
    /// First text-like detail, for display.
    pub text: Option<String>,
    pub is_tackle: bool,
    pub created_at: DateTime<Utc>,
}

impl NoteSummary {
    /// Clips are notes whose timing spans a real interval.
    #[must_use]
    pub fn is_clip(&self) -> bool {
        self.end > self.start
    }
}

/// A clip as listed and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRow {
    pub id: NoteId,
    pub start: f64,
    pub end: f64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub video_path: String,
}

impl ClipRow {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> NoteVideo {
        NoteVideo {
            path: "/v.mp4".to_string(),
            duration: 100.0,
            stopped_at: 10.0,
            size: 0,
            format: "mp4".to_string(),
        }
    }

    #[test]
    fn test_note_video_derives_format() {
        let v = NoteVideo::new("/does/not/exist/Match.MKV", 10.0, 1.0);
        assert_eq!(v.format, "mkv");
        assert_eq!(v.size, 0);
        assert_eq!(v.path, "/does/not/exist/Match.MKV");
    }

    #[test]
    fn test_new_note_skips_blank_details() {
        let note = NewNote::new(NoteTiming::instant(1.0), video())
            .with_detail(detail_kind::TEXT, Some("  ".to_string()))
            .with_detail(detail_kind::PLAYER, None)
            .with_detail(detail_kind::TEAM, Some("Blues".to_string()))
            .with_category(Some(String::new()));
        assert_eq!(note.details, vec![NoteDetail::new("team", "Blues")]);
        assert!(note.category.is_none());
    }

    #[test]
    fn test_validate_requires_timing_and_video() {
        let mut note = NewNote::new(NoteTiming::instant(1.0), video());
        assert!(note.validate().is_ok());

        note.timings.clear();
        assert!(note.validate().is_err());

        let mut note = NewNote::new(NoteTiming::instant(1.0), video());
        note.videos.clear();
        assert!(note.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_reversed_timing() {
        let note = NewNote::new(NoteTiming::span(5.0, 4.0), video());
        assert!(note.validate().unwrap_err().is_validation());
    }
}
