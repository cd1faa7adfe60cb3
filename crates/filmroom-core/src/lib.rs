//! Core annotation model for filmroom.
//!
//! This crate defines the note graph (notes with timing, video, detail,
//! zone, highlight and tackle children), the SQLite schema backing it,
//! and the timestamp codec shared by every front-end.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;
pub mod time;

pub use error::{Error, Result};
