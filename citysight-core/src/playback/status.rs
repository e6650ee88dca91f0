//! Published per-tile status and role

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Status a tile publishes for the elector, autoplay and the UI.
///
/// Single writer (the owning controller), many readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileStatus {
    /// The surface is positioned and able to play
    pub can_play: bool,
    /// Current failure, if any
    pub error_kind: Option<ErrorKind>,
    /// Target of a seek that has not completed yet
    pub changing_start_time_ms: Option<i64>,
    /// Start of the next clip after the current one
    pub next_clip_start_ms: Option<i64>,
}

impl TileStatus {
    /// Returns true while a seek is in flight.
    #[must_use]
    pub const fn is_seeking(&self) -> bool {
        self.changing_start_time_ms.is_some()
    }
}

/// Clock role of a tile, recomputed after every status or time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileRole {
    /// Media progress drives the shared clock
    Leader,
    /// Follows the shared clock
    #[default]
    Follower,
}

impl TileRole {
    /// Returns true for the leader.
    #[must_use]
    pub const fn is_leader(self) -> bool {
        matches!(self, Self::Leader)
    }
}

impl fmt::Display for TileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => write!(f, "leader"),
            Self::Follower => write!(f, "follower"),
        }
    }
}
