//! The pending clip start.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Where and when `clip start` was run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkedStart {
    pub start: f64,
    pub video_path: String,
}

/// Single-slot holder for the pending clip start.
///
/// Setting, inspecting and consuming the marker all go through one lock.
#[derive(Debug, Default)]
pub struct ClipMarker {
    slot: Mutex<Option<MarkedStart>>,
}

impl ClipMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(start: MarkedStart) -> Self {
        Self {
            slot: Mutex::new(Some(start)),
        }
    }

    pub fn set(&self, start: f64, video_path: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(MarkedStart {
            start,
            video_path: video_path.into(),
        });
    }

    pub fn get(&self) -> Option<MarkedStart> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    pub fn clear(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Run `f` against the marked start while holding the lock, clearing
    /// the marker only if `f` succeeds.
    pub fn consume<T>(&self, f: impl FnOnce(&MarkedStart) -> Result<T>) -> Result<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let marked = slot.as_ref().ok_or(SessionError::NoClipStart)?;
        let value = f(marked)?;
        *slot = None;
        Ok(value)
    }

    /// Restore a marker saved by [`ClipMarker::save`]. A missing file is an
    /// unset marker.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let start: MarkedStart = serde_json::from_str(&contents)
                    .map_err(filmroom_core::Error::Serialization)?;
                Ok(Self::with_start(start))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(filmroom_core::Error::Io(e).into()),
        }
    }

    /// Persist the marker, or remove the file when it is unset.
    pub fn save(&self, path: &Path) -> Result<()> {
        match self.get() {
            Some(start) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(filmroom_core::Error::Io)?;
                }
                let json =
                    serde_json::to_string(&start).map_err(filmroom_core::Error::Serialization)?;
                std::fs::write(path, json).map_err(filmroom_core::Error::Io)?;
            }
            None => match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(filmroom_core::Error::Io(e).into()),
            },
        }
        Ok(())
    }
}
