//! Control of an external media player over its JSON IPC endpoint.
//!
//! [`PlayerChannel`] speaks the newline-delimited request/response protocol,
//! correlating responses by request id on a single background reader while
//! spontaneous events fan out to subscribers. [`Player`] is the typed surface
//! the rest of filmroom programs against, and [`launcher`] starts a player
//! process with the endpoint enabled.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod channel;
pub mod endpoint;
pub mod error;
pub mod launcher;
pub mod player;
pub mod protocol;

pub use channel::{ChannelState, PlayerChannel, DEFAULT_COMMAND_TIMEOUT};
pub use error::{PlayerError, PlayerResult};
pub use launcher::{launch, LaunchOptions, PlayerProcess};
pub use player::{property, Player};
pub use protocol::{PlayerEvent, PropertyValue};
