//! Session inputs and outputs
//!
//! Everything that can change session state arrives as a [`SessionEvent`]
//! on one ordered queue. Handling an event returns [`SessionEffect`]s for
//! the host: fetches to start, timers to arm, notices to show.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::autoplay::AutoplayBlock;
use crate::clips::SortedClips;
use crate::error::ErrorKind;
use crate::models::{DeviceId, SplitMode};
use crate::pagination::{PageAssignment, PageDirection};
use crate::playback::SurfaceEvent;

/// User-driven mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Append a device to the selection
    AddDevice(DeviceId),
    /// Remove a device from the selection
    RemoveDevice(DeviceId),
    /// Pin a device to a slot
    Pin {
        /// Device to pin
        device: DeviceId,
        /// Target slot
        slot: u32,
    },
    /// Clear a device's pin
    Unpin(DeviceId),
    /// Change the grid size
    SetSplitMode(SplitMode),
    /// Turn autoplay on or off
    SetAutoplay(bool),
    /// Change the autoplay interval
    SetAutoplayInterval(u32),
    /// Flip the page manually
    Page(PageDirection),
    /// Move the shared clock
    Seek(i64),
    /// Pause every tile
    Pause,
    /// Resume every tile
    Resume,
    /// Replace the playback range
    SetRange {
        /// New range start
        from: i64,
        /// New range end
        to: i64,
    },
}

/// One entry of the session queue.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Lifecycle callback from a tile surface
    Surface {
        /// Device whose surface fired
        device: DeviceId,
        /// The callback
        event: SurfaceEvent,
    },
    /// Answer to a [`SessionEffect::FetchClips`]
    ClipsLoaded {
        /// Device the clips belong to
        device: DeviceId,
        /// Range start of the request
        from: i64,
        /// Range end of the request
        to: i64,
        /// Sorted clips or the failure kind
        result: Result<SortedClips, ErrorKind>,
    },
    /// A deferred retarget fired
    RetargetTimer {
        /// Owning device
        device: DeviceId,
        /// Generation the timer was armed with
        generation: u64,
    },
    /// The autoplay interval elapsed
    AutoplayTick,
    /// A user command
    Command(UserCommand),
}

/// Work the host performs on behalf of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Query the clip directory and post `ClipsLoaded`
    FetchClips {
        /// Device to query
        device: DeviceId,
        /// Range start
        from: i64,
        /// Range end
        to: i64,
    },
    /// Post `RetargetTimer` after `delay`
    ScheduleRetarget {
        /// Owning device
        device: DeviceId,
        /// Generation to echo back
        generation: u64,
        /// Delay before posting
        delay: Duration,
    },
    /// (Re)start the autoplay ticker, or stop it when `None`
    Autoplay {
        /// Tick interval
        interval: Option<Duration>,
    },
    /// Something the user should see
    Notice(SessionNotice),
}

/// User-visible session notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum SessionNotice {
    /// A leader skipped a gap nobody else could cover
    JumpingToNextFootage {
        /// Jumping device
        device: DeviceId,
        /// Boundary jumped to
        target_ms: i64,
    },
    /// A tile has nothing more to play
    TileFailed {
        /// Failed device
        device: DeviceId,
        /// Failure category
        kind: ErrorKind,
    },
    /// Autoplay was switched off
    AutoplayDisabled {
        /// Why
        reason: AutoplayBlock,
    },
    /// Pins outside the new grid were dropped
    PinsCleared {
        /// Devices that lost their pin
        devices: Vec<DeviceId>,
    },
    /// Pinning a slot unpinned its previous holder
    PinDisplaced {
        /// Device that lost its pin
        device: DeviceId,
    },
    /// The visible page changed
    PageChanged {
        /// New cursor
        cursor: usize,
        /// New assignment
        page: PageAssignment,
    },
    /// The clock leader changed
    LeaderChanged {
        /// New leader, `None` freezes the clock
        leader: Option<DeviceId>,
    },
    /// The clock reached the end of the range
    RangeEnded {
        /// Final clock position
        clock_ms: i64,
    },
    /// A user command was rejected
    CommandRejected {
        /// Reason
        message: String,
    },
    /// The layout could not be saved
    PersistFailed {
        /// Store error
        message: String,
    },
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JumpingToNextFootage { device, target_ms } => {
                write!(f, "{device}: jumping to next available footage at {target_ms}")
            }
            Self::TileFailed { device, kind } => write!(f, "{device}: {kind}"),
            Self::AutoplayDisabled { reason } => write!(f, "autoplay disabled: {reason}"),
            Self::PinsCleared { devices } => {
                let names: Vec<&str> = devices.iter().map(DeviceId::as_str).collect();
                write!(f, "pins cleared: {}", names.join(", "))
            }
            Self::PinDisplaced { device } => write!(f, "{device} was unpinned"),
            Self::PageChanged { cursor, page } => {
                write!(f, "page changed (cursor {cursor}, {} tiles)", page.occupied_count())
            }
            Self::LeaderChanged { leader: Some(leader) } => write!(f, "leader is now {leader}"),
            Self::LeaderChanged { leader: None } => write!(f, "no leader, clock frozen"),
            Self::RangeEnded { clock_ms } => write!(f, "end of range reached at {clock_ms}"),
            Self::CommandRejected { message } => write!(f, "command rejected: {message}"),
            Self::PersistFailed { message } => write!(f, "failed to save layout: {message}"),
        }
    }
}
