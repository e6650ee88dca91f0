//! Shared playback timeline

use serde::{Deserialize, Serialize};

use crate::error::ClockError;
use crate::models::DeviceId;

/// The single timeline every tile follows in playback mode.
///
/// Only the elected leader may move the clock from media progress; user
/// seeks and leader jumps go through [`PlaybackClock::seek`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackClock {
    range_from: i64,
    range_to: i64,
    current_ms: i64,
    paused: bool,
}

impl PlaybackClock {
    /// Creates a running clock positioned at `range_from`.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::InvalidRange` if `range_from > range_to`.
    pub const fn new(range_from: i64, range_to: i64) -> Result<Self, ClockError> {
        if range_from > range_to {
            return Err(ClockError::InvalidRange {
                from: range_from,
                to: range_to,
            });
        }
        Ok(Self {
            range_from,
            range_to,
            current_ms: range_from,
            paused: false,
        })
    }

    /// Start of the valid range.
    #[must_use]
    pub const fn range_from(&self) -> i64 {
        self.range_from
    }

    /// End of the valid range.
    #[must_use]
    pub const fn range_to(&self) -> i64 {
        self.range_to
    }

    /// Current position.
    #[must_use]
    pub const fn current_ms(&self) -> i64 {
        self.current_ms
    }

    /// Returns true while paused (by the user or at the range end).
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns true once the clock sits at the end of its range.
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.current_ms >= self.range_to
    }

    /// Advances the clock from a tile's media progress.
    ///
    /// Returns true if the clock reached `range_to` and paused itself.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::NotLeader` when `source` is not `leader`.
    pub fn update_from(
        &mut self,
        source: &DeviceId,
        leader: Option<&DeviceId>,
        ms: i64,
    ) -> Result<bool, ClockError> {
        if leader != Some(source) {
            return Err(ClockError::NotLeader {
                source_device: source.clone(),
                leader: leader.cloned(),
            });
        }
        Ok(self.set(ms))
    }

    /// Moves the clock to `ms` regardless of the leader.
    ///
    /// Returns true if the clock reached `range_to` and paused itself.
    pub fn seek(&mut self, ms: i64) -> bool {
        self.set(ms)
    }

    /// Pauses the clock.
    pub const fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes the clock; resuming at the range end restarts from `range_from`.
    pub const fn resume(&mut self) {
        if self.at_end() {
            self.current_ms = self.range_from;
        }
        self.paused = false;
    }

    /// Replaces the valid range and rewinds to its start.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::InvalidRange` if `from > to`.
    pub const fn set_range(&mut self, from: i64, to: i64) -> Result<(), ClockError> {
        if from > to {
            return Err(ClockError::InvalidRange { from, to });
        }
        self.range_from = from;
        self.range_to = to;
        self.current_ms = from;
        Ok(())
    }

    fn set(&mut self, ms: i64) -> bool {
        self.current_ms = ms.clamp(self.range_from, self.range_to);
        if self.at_end() && !self.paused {
            self.paused = true;
            tracing::info!(clock_ms = self.current_ms, "Playback clock reached range end");
            return true;
        }
        false
    }
}
