//! Error types for `CitySight`
//!
//! Each concern owns a `thiserror` enum; [`CitySightError`] wraps them for
//! callers that only need a single error type (the CLI, embedding hosts).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DeviceId;

/// Tile-level failure categories published through `TileStatus::error_kind`.
///
/// These never propagate out of a tile controller; they are data, rendered
/// by the host as per-tile placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Device has no clip history or is unknown to the clip directory
    UnknownDevice,
    /// Clip query returned nothing for the requested range
    NoFootage,
    /// Transient directory or network failure
    Unavailable,
    /// The surface could not decode or play a located clip
    PlaybackFailure,
}

impl ErrorKind {
    /// Returns true if the tile should show the "no data" placeholder.
    #[must_use]
    pub const fn is_no_data(self) -> bool {
        matches!(self, Self::UnknownDevice | Self::NoFootage)
    }

    /// Returns true if an explicit seek or a page revisit may retry the load.
    ///
    /// Retries are never scheduled on a timer.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice => write!(f, "unknown device"),
            Self::NoFootage => write!(f, "no footage"),
            Self::Unavailable => write!(f, "clip directory unavailable"),
            Self::PlaybackFailure => write!(f, "playback failure"),
        }
    }
}

/// Errors returned by a clip directory implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The directory does not know the device
    #[error("device not found: {0}")]
    NotFound(DeviceId),

    /// The directory could not answer (network, timeout, malformed reply)
    #[error("clip directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Maps a directory error onto the tile-level error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::UnknownDevice,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

/// Errors raised while editing the selection set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The selection already contains this device
    #[error("device already selected: {0}")]
    DuplicateDevice(DeviceId),

    /// The device is not part of the selection
    #[error("device not selected: {0}")]
    DeviceNotSelected(DeviceId),

    /// Pin target outside the current grid
    #[error("slot {slot} is outside the {grid_size}-slot grid")]
    SlotOutOfRange {
        /// Requested slot
        slot: u32,
        /// Current grid size
        grid_size: u32,
    },

    /// Unrecognized split mode
    #[error("invalid split mode: {0} (expected 1, 4, 9 or 16)")]
    InvalidSplitMode(String),
}

/// Errors returned by a live stream source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveError {
    /// The source does not know the device
    #[error("no live stream for device: {0}")]
    NotFound(DeviceId),

    /// The stream could not be opened
    #[error("live stream unavailable: {0}")]
    Unavailable(String),
}

impl LiveError {
    /// Maps a live source error onto the tile-level error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::UnknownDevice,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

/// Errors raised by layout persistence and settings files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config directory could not be determined
    #[error("could not determine config directory")]
    NoConfigDir,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or catalogue parse error
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: String,
        /// Parser message
        message: String,
    },

    /// TOML serialization error
    #[error("failed to serialize configuration: {0}")]
    Serialize(String),

    /// Stored layout failed validation
    #[error("invalid stored layout: {0}")]
    InvalidLayout(#[from] LayoutError),

    /// Stored layout was written by a newer format
    #[error("unsupported layout version: expected at most {expected}, got {actual}")]
    UnsupportedVersion {
        /// Newest version understood by this build
        expected: u32,
        /// Version found on disk
        actual: u32,
    },
}

/// Errors raised by the shared playback clock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// A non-leader tried to advance the clock
    #[error("clock update from {source_device} rejected: leader is {leader:?}")]
    NotLeader {
        /// Device that attempted the write
        source_device: DeviceId,
        /// Leader at the time of the write
        leader: Option<DeviceId>,
    },

    /// Range where `from` is after `to`
    #[error("invalid playback range: {from} > {to}")]
    InvalidRange {
        /// Range start (ms)
        from: i64,
        /// Range end (ms)
        to: i64,
    },
}

/// Errors raised by the session runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The runtime event queue is closed
    #[error("session runtime has stopped")]
    Stopped,
}

/// Crate-level error wrapping every concern.
#[derive(Debug, Error)]
pub enum CitySightError {
    /// Selection/layout error
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Clip directory error
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Live stream error
    #[error(transparent)]
    Live(#[from] LiveError),

    /// Clock error
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// Runtime error
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for crate-level operations
pub type CitySightResult<T> = Result<T, CitySightError>;
