//! Automatic page rotation
//!
//! [`AutoplayTimer`] holds the user's autoplay settings and decides whether
//! rotation is meaningful for the current layout. [`start_ticker`] is the
//! tokio loop that posts a tick into the session queue every interval.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::SelectionSet;
use crate::pagination::rotating_slot_count;

/// Shortest accepted autoplay interval in seconds
pub const MIN_AUTOPLAY_SECS: u32 = 5;

/// Longest accepted autoplay interval in seconds
pub const MAX_AUTOPLAY_SECS: u32 = 3600;

/// Why autoplay was switched off automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayBlock {
    /// Every selected device already fits on one page
    SelectionFitsGrid,
    /// Every slot is pinned, nothing can rotate
    NothingRotates,
    /// A split-mode change dropped pins the rotation relied on
    PinsCleared,
}

impl fmt::Display for AutoplayBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectionFitsGrid => write!(f, "all selected devices fit on one page"),
            Self::NothingRotates => write!(f, "every slot is pinned"),
            Self::PinsCleared => write!(f, "pins were cleared by the split-mode change"),
        }
    }
}

/// Returns why rotation is meaningless for this layout, if it is.
#[must_use]
pub fn rotation_block(selection: &SelectionSet, grid_size: u32) -> Option<AutoplayBlock> {
    if selection.len() <= grid_size as usize {
        Some(AutoplayBlock::SelectionFitsGrid)
    } else if rotating_slot_count(selection, grid_size) == 0 {
        Some(AutoplayBlock::NothingRotates)
    } else {
        None
    }
}

/// Autoplay settings and gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoplayTimer {
    enabled: bool,
    interval_secs: u32,
}

impl Default for AutoplayTimer {
    fn default() -> Self {
        Self::new(false, 30)
    }
}

impl AutoplayTimer {
    /// Creates a timer.
    #[must_use]
    pub const fn new(enabled: bool, interval_secs: u32) -> Self {
        Self {
            enabled,
            interval_secs,
        }
    }

    /// Returns true if autoplay is on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured interval in seconds.
    #[must_use]
    pub const fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    /// Interval clamped to the accepted range.
    #[must_use]
    pub const fn effective_interval_secs(&self) -> u32 {
        if self.interval_secs < MIN_AUTOPLAY_SECS {
            MIN_AUTOPLAY_SECS
        } else if self.interval_secs > MAX_AUTOPLAY_SECS {
            MAX_AUTOPLAY_SECS
        } else {
            self.interval_secs
        }
    }

    /// Interval as a duration.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.effective_interval_secs()))
    }

    /// Turns autoplay on or off as requested by the user.
    ///
    /// Enabling is refused when rotation is meaningless; the reason is
    /// returned and autoplay stays off.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
        selection: &SelectionSet,
        grid_size: u32,
    ) -> Option<AutoplayBlock> {
        if enabled && let Some(block) = rotation_block(selection, grid_size) {
            self.enabled = false;
            return Some(block);
        }
        self.enabled = enabled;
        None
    }

    /// Turns autoplay off.
    pub const fn disable(&mut self) {
        self.enabled = false;
    }

    /// Changes the interval.
    pub const fn set_interval_secs(&mut self, interval_secs: u32) {
        self.interval_secs = interval_secs;
    }

    /// Forces autoplay off when the layout no longer supports rotation.
    ///
    /// Returns the reason only if autoplay was on and got switched off.
    pub fn enforce(&mut self, selection: &SelectionSet, grid_size: u32) -> Option<AutoplayBlock> {
        if !self.enabled {
            return None;
        }
        let block = rotation_block(selection, grid_size)?;
        self.enabled = false;
        tracing::warn!(reason = %block, "Autoplay disabled");
        Some(block)
    }

    /// Returns true if a tick should flip the page.
    #[must_use]
    pub const fn should_advance(&self, clock_paused: bool) -> bool {
        self.enabled && !clock_paused
    }
}

/// Handle to a running autoplay ticker.
#[derive(Debug)]
pub struct TickerHandle {
    stop_tx: mpsc::Sender<()>,
}

impl TickerHandle {
    /// Signals the ticker to stop.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }

    /// Returns true once the ticker loop has exited.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop_tx.is_closed()
    }
}

/// Posts `tick` into `events` every `interval` until stopped.
///
/// The first tick fires one full interval after start. The loop also ends
/// when the receiving side of `events` is dropped.
pub fn start_ticker<T>(interval: Duration, events: mpsc::Sender<T>, tick: T) -> TickerHandle
where
    T: Clone + Send + 'static,
{
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop_rx.recv() => {
                    tracing::debug!("Autoplay ticker stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if events.send(tick.clone()).await.is_err() {
                        break; // session gone
                    }
                }
            }
        }
    });

    TickerHandle { stop_tx }
}
