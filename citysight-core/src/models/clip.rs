//! Recorded clip descriptors

use serde::{Deserialize, Serialize};

/// One recorded, time-bounded piece of footage.
///
/// Clips of one device never overlap but are not assumed to abut; the
/// space between two clips is a gap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoClip {
    /// Wall-clock start in epoch milliseconds
    pub start_ms: i64,
    /// Length in milliseconds
    pub duration_ms: i64,
    /// Where the surface loads the media from
    pub locator: String,
}

impl VideoClip {
    /// Creates a clip descriptor.
    #[must_use]
    pub fn new(start_ms: i64, duration_ms: i64, locator: impl Into<String>) -> Self {
        Self {
            start_ms,
            duration_ms,
            locator: locator.into(),
        }
    }

    /// Wall-clock end (exclusive).
    #[must_use]
    pub const fn end_ms(&self) -> i64 {
        self.start_ms + self.duration_ms
    }

    /// Returns true if `t` falls inside the clip.
    #[must_use]
    pub const fn covers(&self, t: i64) -> bool {
        t >= self.start_ms && t < self.end_ms()
    }

    /// Offset into the clip for wall-clock time `t`.
    #[must_use]
    pub const fn offset_of(&self, t: i64) -> i64 {
        t - self.start_ms
    }
}
