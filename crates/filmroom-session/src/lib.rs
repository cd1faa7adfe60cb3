//! Annotation sessions for filmroom.
//!
//! A [`Session`] ties the annotation store to a live [`filmroom_player::Player`]
//! and carries the one piece of mutable state an analyst builds up between
//! actions, the pending clip start. Front-ends (the command line and the
//! TUI) call the same verbs.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod export;
pub mod marker;
pub mod session;

pub use config::Config;
pub use error::{ErrorKind, Result, SessionError};
pub use export::{ExportFormat, ExportOptions, ExportSummary, Exporter};
pub use marker::{ClipMarker, MarkedStart};
pub use session::{Labels, Notebook, Session, TackleInput};
