//! Session error types and their user-facing classification.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use filmroom_core::model::NoteId;
use filmroom_player::PlayerError;
use thiserror::Error;

/// Errors returned by session verbs.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error(transparent)]
    Store(#[from] filmroom_core::Error),

    #[error("no clip start marked (run `clip start` first)")]
    NoClipStart,

    #[error("video changed since clip start was marked ({marked} -> {current})")]
    VideoChanged { marked: String, current: String },

    #[error("clip end {end:.3}s must be after start {start:.3}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("invalid tackle outcome {0:?} (expected completed, missed, possible or other)")]
    InvalidOutcome(String),

    #[error("invalid attempt {0:?} (expected a positive integer)")]
    InvalidAttempt(String),

    #[error("a tackle needs a player")]
    MissingPlayer,

    #[error("unknown export format {0:?} (expected mp4, webm or mkv)")]
    UnknownFormat(String),

    #[error("no video is loaded in the player")]
    NoVideoLoaded,

    #[error("export of clip {clip_id} failed ({status})")]
    ExportFailed { clip_id: NoteId, status: ExitStatus },

    #[error("failed to start encoder {bin}: {source}")]
    EncoderSpawn {
        bin: String,
        source: std::io::Error,
    },

    #[error("cannot create export directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Broad classes of failure, used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoPlayer,
    Wire,
    CommandFailed,
    Store,
    Validation,
    Subprocess,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoPlayer => "no-player",
            Self::Wire => "wire",
            Self::CommandFailed => "command-failed",
            Self::Store => "store",
            Self::Validation => "validation",
            Self::Subprocess => "subprocess",
        })
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Player(e) if e.is_no_player() => ErrorKind::NoPlayer,
            Self::Player(e) if e.is_command_failure() => ErrorKind::CommandFailed,
            Self::Player(PlayerError::Spawn { .. } | PlayerError::Exited(_)) => {
                ErrorKind::Subprocess
            }
            Self::Player(_) => ErrorKind::Wire,
            Self::Store(e) if e.is_validation() => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Store,
            Self::ExportFailed { .. } | Self::EncoderSpawn { .. } | Self::OutputDir { .. } => {
                ErrorKind::Subprocess
            }
            Self::NoClipStart
            | Self::VideoChanged { .. }
            | Self::InvalidRange { .. }
            | Self::InvalidOutcome(_)
            | Self::InvalidAttempt(_)
            | Self::MissingPlayer
            | Self::UnknownFormat(_)
            | Self::NoVideoLoaded => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
