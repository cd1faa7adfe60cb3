//! Player control error types.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the player control channel and launcher.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Nothing is accepting connections at the control endpoint.
    #[error("cannot connect to the player at {endpoint}: {source} (is the player running with a video open?)")]
    NoPlayer {
        endpoint: String,
        source: std::io::Error,
    },

    /// A command was issued while the channel was not ready.
    #[error("player channel is not connected")]
    NotConnected,

    /// The channel shut down while the command was waiting.
    #[error("player channel closed")]
    ChannelClosed,

    /// No response arrived in time; the channel is closed afterwards.
    #[error("player did not answer {command:?} within {after:?}")]
    Timeout { command: String, after: Duration },

    /// Malformed traffic on the stream.
    #[error("wire error: {0}")]
    Wire(String),

    /// The player answered with a non-success error string.
    #[error("player command {command:?} failed: {message}")]
    CommandFailed { command: String, message: String },

    /// A property came back as a different kind than its contract says.
    #[error("property {property} is {found}, expected {expected}")]
    UnexpectedType {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to start {bin}: {source}")]
    Spawn {
        bin: String,
        source: std::io::Error,
    },

    #[error("player exited before its control endpoint came up ({0})")]
    Exited(ExitStatus),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    /// Returns `true` when the endpoint was not accepting connections.
    pub fn is_no_player(&self) -> bool {
        matches!(self, Self::NoPlayer { .. })
    }

    /// Returns `true` for transport-level failures (the channel is gone).
    pub fn is_wire(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ChannelClosed | Self::Timeout { .. } | Self::Wire(_)
        )
    }

    /// Returns `true` when the player rejected the command but the channel
    /// is still usable.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::UnexpectedType { .. })
    }
}

/// Convenience alias for player results.
pub type PlayerResult<T> = std::result::Result<T, PlayerError>;
