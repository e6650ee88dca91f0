//! Per-tile playback state machine
//!
//! A [`TileSyncController`] owns one surface and walks it across the clip
//! list of its device: loading the covering clip, waiting out gaps,
//! following the shared clock and reporting failures as status data.
//!
//! Controllers never touch the clock or talk to each other. Every handler
//! returns [`TileEffect`]s that the session applies in order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clips::SortedClips;
use crate::error::ErrorKind;
use crate::models::DeviceId;

use super::status::{TileRole, TileStatus};
use super::surface::{PlaybackSurface, SurfaceEvent};

/// Why a tile is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitReason {
    /// No footage until the next clip boundary
    Gap,
    /// The current clip failed to decode
    Error,
}

/// Lifecycle state of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum TileState {
    /// Not started
    Idle,
    /// Clip list requested
    Loading,
    /// A clip is loaded on the surface
    Playing,
    /// Parked until the next clip boundary
    Waiting(WaitReason),
    /// Nothing more to play
    Failed(ErrorKind),
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Playing => write!(f, "playing"),
            Self::Waiting(WaitReason::Gap) => write!(f, "waiting(gap)"),
            Self::Waiting(WaitReason::Error) => write!(f, "waiting(error)"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Thresholds shared by every tile of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileThresholds {
    /// Gaps shorter than this are skipped immediately
    pub gap_ms: i64,
    /// Followers reseek once they drift this far from the clock
    pub drift_ms: i64,
}

impl Default for TileThresholds {
    fn default() -> Self {
        Self {
            gap_ms: 1000,
            drift_ms: 1000,
        }
    }
}

/// Session state a controller needs to make a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileContext {
    /// Role from the latest election
    pub role: TileRole,
    /// Shared clock position
    pub clock_ms: i64,
    /// End of the playback range
    pub range_to: i64,
    /// Whether the clock is paused
    pub paused: bool,
    /// Whether any other on-page tile can play right now
    pub sibling_can_play: bool,
}

/// Side effects requested by a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEffect {
    /// Fetch the clip list for the playback range
    RequestClips {
        /// Requesting device
        device: DeviceId,
    },
    /// Media progress from what the tile believes is the leader
    AdvanceClock {
        /// Reporting device
        device: DeviceId,
        /// Wall-clock position
        ms: i64,
    },
    /// Leader skipped a gap; move the clock to the boundary
    JumpClock {
        /// Jumping device
        device: DeviceId,
        /// New clock position
        ms: i64,
    },
    /// Fire `on_retarget_timer(generation)` after `delay_ms`
    ScheduleRetarget {
        /// Owning device
        device: DeviceId,
        /// Generation the timer belongs to
        generation: u64,
        /// Retarget destination
        target_ms: i64,
        /// Delay before firing
        delay_ms: i64,
    },
    /// User-visible "jumping to next available footage"
    JumpingToNextFootage {
        /// Jumping device
        device: DeviceId,
        /// Boundary jumped to
        target_ms: i64,
    },
    /// The tile entered a terminal failure
    Failed {
        /// Failed device
        device: DeviceId,
        /// Failure category
        kind: ErrorKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapCause {
    Seek,
    Ended,
    DecodeError,
}

impl GapCause {
    const fn terminal_kind(self) -> ErrorKind {
        match self {
            Self::Seek | Self::Ended => ErrorKind::NoFootage,
            Self::DecodeError => ErrorKind::PlaybackFailure,
        }
    }

    const fn wait_reason(self) -> WaitReason {
        match self {
            Self::Seek | Self::Ended => WaitReason::Gap,
            Self::DecodeError => WaitReason::Error,
        }
    }
}

/// Drives one tile's surface across its device's clips.
pub struct TileSyncController {
    device_id: DeviceId,
    slot: usize,
    surface: Box<dyn PlaybackSurface>,
    thresholds: TileThresholds,
    state: TileState,
    status: TileStatus,
    clips: Option<SortedClips>,
    current_clip: Option<usize>,
    surface_clip: Option<usize>,
    generation: u64,
    pending_target_ms: Option<i64>,
    local_time_ms: Option<i64>,
}

impl fmt::Debug for TileSyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileSyncController")
            .field("device_id", &self.device_id)
            .field("slot", &self.slot)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("current_clip", &self.current_clip)
            .field("generation", &self.generation)
            .field("local_time_ms", &self.local_time_ms)
            .finish_non_exhaustive()
    }
}

impl TileSyncController {
    /// Creates an idle controller for `device` shown in `slot`.
    #[must_use]
    pub fn new(
        device_id: DeviceId,
        slot: usize,
        surface: Box<dyn PlaybackSurface>,
        thresholds: TileThresholds,
    ) -> Self {
        Self {
            device_id,
            slot,
            surface,
            thresholds,
            state: TileState::Idle,
            status: TileStatus::default(),
            clips: None,
            current_clip: None,
            surface_clip: None,
            generation: 0,
            pending_target_ms: None,
            local_time_ms: None,
        }
    }

    /// Starts the generation counter at `generation`.
    ///
    /// A session uses this so a tile re-created for the same device never
    /// reuses a generation an old timer may still carry.
    #[must_use]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Device shown by this tile.
    #[must_use]
    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Slot the tile occupies.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Moves the tile to another slot without reloading it.
    pub const fn set_slot(&mut self, slot: usize) {
        self.slot = slot;
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TileState {
        self.state
    }

    /// Published status.
    #[must_use]
    pub const fn status(&self) -> &TileStatus {
        &self.status
    }

    /// Generation of the latest retarget; deferred timers carry it.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Last known wall-clock position of the surface.
    #[must_use]
    pub const fn local_time_ms(&self) -> Option<i64> {
        self.local_time_ms
    }

    /// Target of the pending deferred retarget, if any.
    #[must_use]
    pub const fn pending_target_ms(&self) -> Option<i64> {
        self.pending_target_ms
    }

    /// Loaded clip list.
    #[must_use]
    pub const fn clips(&self) -> Option<&SortedClips> {
        self.clips.as_ref()
    }

    /// Returns true while waiting for the clip list.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, TileState::Loading)
    }

    /// Starts an idle tile by requesting its clips.
    pub fn start(&mut self, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        if matches!(self.state, TileState::Idle) {
            self.begin_load(ctx.clock_ms, &mut effects);
        }
        effects
    }

    /// Drops the clip list and loads it again (after a range change).
    pub fn reload(&mut self, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        self.clips = None;
        self.surface_clip = None;
        self.surface.pause();
        self.begin_load(ctx.clock_ms, &mut effects);
        effects
    }

    /// Applies the answer to a clip request.
    pub fn on_clips_loaded(
        &mut self,
        result: Result<SortedClips, ErrorKind>,
        ctx: &TileContext,
    ) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        if !self.is_loading() {
            tracing::debug!(device_id = %self.device_id, state = %self.state, "Ignoring late clip list");
            return effects;
        }
        match result {
            Ok(clips) => {
                self.clips = Some(clips);
                self.retarget(ctx.clock_ms, GapCause::Seek, ctx, &mut effects);
            }
            Err(kind) => self.fail(kind, &mut effects),
        }
        effects
    }

    /// Handles a lifecycle callback from the surface.
    pub fn on_surface_event(&mut self, event: &SurfaceEvent, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        if !matches!(self.state, TileState::Playing) {
            tracing::trace!(device_id = %self.device_id, %event, state = %self.state, "Surface event ignored");
            return effects;
        }

        match event {
            SurfaceEvent::Ready => {
                self.status.can_play = true;
                self.status.error_kind = None;
                self.status.changing_start_time_ms = None;
                if ctx.paused {
                    self.surface.pause();
                } else {
                    self.surface.play();
                }
            }
            SurfaceEvent::Waiting => self.status.can_play = false,
            SurfaceEvent::Playing => self.status.can_play = true,
            SurfaceEvent::TimeUpdate { offset_ms } => {
                let Some(clip) = self.current_clip.and_then(|i| self.clip_at(i)) else {
                    return effects;
                };
                let local = clip.start_ms + offset_ms;
                self.local_time_ms = Some(local);
                if ctx.role.is_leader() && !self.status.is_seeking() {
                    effects.push(TileEffect::AdvanceClock {
                        device: self.device_id.clone(),
                        ms: local,
                    });
                }
            }
            SurfaceEvent::Ended => {
                if let Some((index, clip_end, _)) = self.current_bounds() {
                    let boundary = self.next_boundary(index);
                    self.enter_gap(boundary, clip_end, GapCause::Ended, ctx, &mut effects);
                }
            }
            SurfaceEvent::Error { message } => {
                tracing::warn!(device_id = %self.device_id, error = %message, "Surface failed to play clip");
                self.status.error_kind = Some(ErrorKind::PlaybackFailure);
                if let Some((index, _, clip_start)) = self.current_bounds() {
                    let boundary = self.next_boundary(index);
                    let from = self.local_time_ms.unwrap_or(clip_start);
                    self.enter_gap(boundary, from, GapCause::DecodeError, ctx, &mut effects);
                }
            }
        }
        effects
    }

    /// Handles a deferred retarget; stale generations are ignored.
    ///
    /// A tile demoted since the timer was armed follows the shared clock
    /// instead of running ahead of it to its boundary.
    pub fn on_retarget_timer(&mut self, generation: u64, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        if generation != self.generation || !matches!(self.state, TileState::Waiting(_)) {
            tracing::debug!(
                device_id = %self.device_id,
                generation,
                current_generation = self.generation,
                "Stale retarget timer ignored"
            );
            return effects;
        }
        if let Some(target) = self.pending_target_ms {
            let target = if ctx.role.is_leader() {
                target.max(ctx.clock_ms)
            } else {
                ctx.clock_ms
            };
            self.retarget(target, GapCause::Seek, ctx, &mut effects);
        }
        effects
    }

    /// Reacts to a change of the shared clock.
    ///
    /// Waiting tiles resume once the clock crosses their next boundary;
    /// followers reseek when they drift too far from the clock.
    pub fn on_clock(&mut self, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        match self.state {
            TileState::Waiting(_) => {
                if self
                    .status
                    .next_clip_start_ms
                    .is_some_and(|boundary| ctx.clock_ms >= boundary)
                {
                    self.retarget(ctx.clock_ms, GapCause::Seek, ctx, &mut effects);
                }
            }
            TileState::Playing if !ctx.role.is_leader() => {
                if self.status.is_seeking() || self.pending_target_ms == Some(ctx.clock_ms) {
                    return effects;
                }
                if let Some(local) = self.local_time_ms
                    && (local - ctx.clock_ms).abs() >= self.thresholds.drift_ms
                {
                    tracing::debug!(
                        device_id = %self.device_id,
                        local_ms = local,
                        clock_ms = ctx.clock_ms,
                        "Follower drifted, reseeking"
                    );
                    self.retarget(ctx.clock_ms, GapCause::Seek, ctx, &mut effects);
                }
            }
            _ => {}
        }
        effects
    }

    /// Reacts to an election result, including a re-elected leader.
    ///
    /// A leader parked in a gap with nobody else playing jumps to its next
    /// boundary right away. Any armed retarget timer goes stale.
    pub fn on_role_change(&mut self, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        if ctx.role.is_leader()
            && matches!(self.state, TileState::Waiting(_))
            && !ctx.sibling_can_play
            && let Some(boundary) = self.status.next_clip_start_ms
        {
            self.jump_to(boundary, ctx, &mut effects);
        }
        effects
    }

    /// Explicit seek from a user scrub or page change.
    ///
    /// A tile that failed with a retryable error loads its clips again.
    pub fn seek(&mut self, target_ms: i64, ctx: &TileContext) -> Vec<TileEffect> {
        let mut effects = Vec::new();
        match self.state {
            TileState::Idle => {}
            TileState::Loading => self.status.changing_start_time_ms = Some(target_ms),
            TileState::Failed(kind) if self.clips.is_none() => {
                if kind.is_retryable() {
                    tracing::info!(device_id = %self.device_id, "Retrying clip load after seek");
                    self.begin_load(target_ms, &mut effects);
                }
            }
            TileState::Failed(_) | TileState::Playing | TileState::Waiting(_) => {
                self.retarget(target_ms, GapCause::Seek, ctx, &mut effects);
            }
        }
        effects
    }

    /// Pauses the surface.
    pub fn pause(&mut self) {
        if matches!(self.state, TileState::Playing) {
            self.surface.pause();
        }
    }

    /// Resumes the surface if it is positioned.
    pub fn resume(&mut self) {
        if matches!(self.state, TileState::Playing) && self.status.can_play {
            self.surface.play();
        }
    }

    /// Stops the surface before the tile leaves the page.
    ///
    /// Bumps the generation so outstanding timers become stale.
    pub fn shutdown(&mut self) {
        self.generation += 1;
        self.pending_target_ms = None;
        self.surface.pause();
    }

    fn begin_load(&mut self, target_ms: i64, effects: &mut Vec<TileEffect>) {
        self.generation += 1;
        self.state = TileState::Loading;
        self.status = TileStatus {
            changing_start_time_ms: Some(target_ms),
            ..TileStatus::default()
        };
        self.current_clip = None;
        self.pending_target_ms = None;
        effects.push(TileEffect::RequestClips {
            device: self.device_id.clone(),
        });
    }

    fn retarget(
        &mut self,
        target_ms: i64,
        cause: GapCause,
        ctx: &TileContext,
        effects: &mut Vec<TileEffect>,
    ) {
        self.generation += 1;
        self.pending_target_ms = None;
        let Some(clips) = self.clips.clone() else {
            return;
        };

        match clips.closest_index(target_ms) {
            Some(index) if clips.get(index).is_some_and(|clip| clip.covers(target_ms)) => {
                self.play_clip(&clips, index, target_ms);
            }
            Some(index) => {
                self.enter_gap(clips.next_boundary_after(index), target_ms, cause, ctx, effects);
            }
            None => self.enter_gap(clips.first_start(), target_ms, cause, ctx, effects),
        }
    }

    fn play_clip(&mut self, clips: &SortedClips, index: usize, target_ms: i64) {
        let Some(clip) = clips.get(index) else {
            return;
        };
        let offset = clip.offset_of(target_ms);
        if self.surface_clip == Some(index) {
            self.surface.seek(offset);
        } else {
            self.surface.load(&clip.locator, offset);
            self.surface_clip = Some(index);
        }
        tracing::debug!(
            device_id = %self.device_id,
            clip_index = index,
            offset_ms = offset,
            "Retargeted tile"
        );

        self.state = TileState::Playing;
        self.current_clip = Some(index);
        self.local_time_ms = Some(target_ms);
        self.status.can_play = false;
        self.status.changing_start_time_ms = Some(target_ms);
        self.status.next_clip_start_ms = clips.next_boundary_after(index);
    }

    fn enter_gap(
        &mut self,
        boundary: Option<i64>,
        from_ms: i64,
        cause: GapCause,
        ctx: &TileContext,
        effects: &mut Vec<TileEffect>,
    ) {
        self.generation += 1;
        self.current_clip = None;
        self.status.can_play = false;
        self.status.changing_start_time_ms = None;

        let Some(boundary) = boundary.filter(|&b| b <= ctx.range_to) else {
            self.fail(cause.terminal_kind(), effects);
            return;
        };
        self.status.next_clip_start_ms = Some(boundary);

        let gap = boundary - from_ms;
        if gap < self.thresholds.gap_ms {
            tracing::debug!(device_id = %self.device_id, gap_ms = gap, "Skipping short gap");
            self.retarget(boundary, cause, ctx, effects);
            return;
        }

        self.surface.pause();
        self.state = TileState::Waiting(cause.wait_reason());

        if !ctx.role.is_leader() {
            self.pending_target_ms = Some(boundary);
            tracing::debug!(device_id = %self.device_id, next_clip_start_ms = boundary, "Follower waiting for footage");
        } else if ctx.sibling_can_play {
            self.pending_target_ms = Some(boundary);
            effects.push(TileEffect::ScheduleRetarget {
                device: self.device_id.clone(),
                generation: self.generation,
                target_ms: boundary,
                delay_ms: gap,
            });
        } else {
            self.jump_to(boundary, ctx, effects);
        }
    }

    fn jump_to(&mut self, boundary: i64, ctx: &TileContext, effects: &mut Vec<TileEffect>) {
        tracing::info!(device_id = %self.device_id, target_ms = boundary, "Jumping to next available footage");
        effects.push(TileEffect::JumpingToNextFootage {
            device: self.device_id.clone(),
            target_ms: boundary,
        });
        effects.push(TileEffect::JumpClock {
            device: self.device_id.clone(),
            ms: boundary,
        });
        self.retarget(boundary, GapCause::Seek, ctx, effects);
    }

    fn fail(&mut self, kind: ErrorKind, effects: &mut Vec<TileEffect>) {
        self.generation += 1;
        self.state = TileState::Failed(kind);
        self.current_clip = None;
        self.pending_target_ms = None;
        self.status.can_play = false;
        self.status.error_kind = Some(kind);
        self.status.changing_start_time_ms = None;
        self.status.next_clip_start_ms = None;
        self.surface.pause();
        tracing::info!(device_id = %self.device_id, error_kind = %kind, "Tile failed");
        effects.push(TileEffect::Failed {
            device: self.device_id.clone(),
            kind,
        });
    }

    fn clip_at(&self, index: usize) -> Option<&crate::models::VideoClip> {
        self.clips.as_ref()?.get(index)
    }

    fn current_bounds(&self) -> Option<(usize, i64, i64)> {
        let index = self.current_clip?;
        let clip = self.clip_at(index)?;
        Some((index, clip.end_ms(), clip.start_ms))
    }

    fn next_boundary(&self, index: usize) -> Option<i64> {
        self.clips.as_ref()?.next_boundary_after(index)
    }
}
