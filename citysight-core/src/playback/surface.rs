//! Playback surface boundary
//!
//! A surface is the host's video element for one tile. Commands go in
//! through [`PlaybackSurface`]; lifecycle callbacks come back as
//! [`SurfaceEvent`] values posted to the session queue.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::DeviceId;

/// Media element driven by a tile controller.
///
/// Every method is a non-blocking command; results arrive later as
/// [`SurfaceEvent`]s. A surface reports `Ready` after each `load` and
/// each `seek` once it is positioned.
pub trait PlaybackSurface: Send {
    /// Loads `locator` and positions it at `offset_ms` into the clip.
    fn load(&mut self, locator: &str, offset_ms: i64);

    /// Starts or resumes playback.
    fn play(&mut self);

    /// Pauses playback.
    fn pause(&mut self);

    /// Repositions the loaded clip to `offset_ms`.
    fn seek(&mut self, offset_ms: i64);
}

/// Creates surfaces for tiles entering the page.
pub trait SurfaceFactory: Send {
    /// Creates the surface shown in `slot` for `device`.
    fn create(&mut self, device: &DeviceId, slot: usize) -> Box<dyn PlaybackSurface>;
}

/// Lifecycle callbacks emitted by a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// Media is positioned and can start
    Ready,
    /// Playback stalled (buffering)
    Waiting,
    /// Playback is progressing
    Playing,
    /// Position inside the current clip
    TimeUpdate {
        /// Offset from the clip start
        offset_ms: i64,
    },
    /// The current clip is exhausted
    Ended,
    /// The clip could not be decoded or played
    Error {
        /// Surface-provided description
        message: String,
    },
}

impl fmt::Display for SurfaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::TimeUpdate { offset_ms } => write!(f, "time_update({offset_ms})"),
            Self::Ended => write!(f, "ended"),
            Self::Error { message } => write!(f, "error({message})"),
        }
    }
}

/// A command issued to a surface, as recorded by test and simulated surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SurfaceCommand {
    /// `load(locator, offset_ms)`
    Load {
        /// Clip locator
        locator: String,
        /// Offset into the clip
        offset_ms: i64,
    },
    /// `play()`
    Play,
    /// `pause()`
    Pause,
    /// `seek(offset_ms)`
    Seek {
        /// Offset into the loaded clip
        offset_ms: i64,
    },
}
