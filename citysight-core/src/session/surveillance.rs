//! The split-screen session
//!
//! [`SurveillanceSession`] is the composition root: it owns the selection,
//! the cursor, the shared clock, the tile controllers of the visible page
//! and the autoplay settings. It is a synchronous state machine; the host
//! feeds it [`SessionEvent`]s one at a time and performs the returned
//! [`SessionEffect`]s.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::autoplay::{AutoplayBlock, AutoplayTimer, rotation_block};
use crate::clips::{ClipStore, SortedClips};
use crate::config::{EngineSettings, LAYOUT_VERSION, LayoutConfig, LayoutStore};
use crate::error::{CitySightResult, ClockError, ErrorKind};
use crate::live::{LiveStreamSource, LiveTile};
use crate::models::{DeviceId, SelectionSet, SplitMode};
use crate::pagination::{
    PageAssignment, PageDirection, advance_cursor, assign_page, normalize_cursor,
};
use crate::playback::{
    PlaybackClock, SurfaceEvent, SurfaceFactory, TileContext, TileEffect, TileRole, TileState,
    TileStatus, TileSyncController, elect,
};

use crate::tracing::span_names;

use super::event::{SessionEffect, SessionEvent, SessionNotice, UserCommand};

/// Upper bound on election/clock rounds after one event.
const MAX_SETTLE_ROUNDS: usize = 8;

/// What the session plays.
pub enum SessionMode {
    /// Recorded footage on a shared clock
    Playback {
        /// Range start (epoch ms)
        range_from: i64,
        /// Range end (epoch ms)
        range_to: i64,
        /// Creates a surface per tile
        surfaces: Box<dyn SurfaceFactory>,
    },
    /// Live streams, no clock
    Live {
        /// Opens live streams
        source: Box<dyn LiveStreamSource>,
    },
}

impl fmt::Debug for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playback {
                range_from,
                range_to,
                ..
            } => f
                .debug_struct("Playback")
                .field("range_from", range_from)
                .field("range_to", range_to)
                .finish_non_exhaustive(),
            Self::Live { .. } => f.debug_struct("Live").finish_non_exhaustive(),
        }
    }
}

/// Read-only view of one visible tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileSnapshot {
    /// Slot on the page
    pub slot: usize,
    /// Device shown
    pub device_id: DeviceId,
    /// Clock role
    pub role: TileRole,
    /// Lifecycle state (`None` for live tiles)
    pub state: Option<TileState>,
    /// Published status
    pub status: TileStatus,
}

/// One split-screen view.
pub struct SurveillanceSession {
    settings: EngineSettings,
    selection: SelectionSet,
    split_mode: SplitMode,
    cursor: usize,
    page: PageAssignment,
    autoplay: AutoplayTimer,
    clock: Option<PlaybackClock>,
    leader: Option<DeviceId>,
    last_broadcast_ms: Option<i64>,
    live_paused: bool,
    tiles: HashMap<DeviceId, TileSyncController>,
    live_tiles: HashMap<DeviceId, LiveTile>,
    clip_store: ClipStore,
    surfaces: Option<Box<dyn SurfaceFactory>>,
    live_source: Option<Box<dyn LiveStreamSource>>,
    layout_store: Box<dyn LayoutStore>,
    generation_floor: u64,
}

impl fmt::Debug for SurveillanceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveillanceSession")
            .field("split_mode", &self.split_mode)
            .field("cursor", &self.cursor)
            .field("page", &self.page)
            .field("autoplay", &self.autoplay)
            .field("clock", &self.clock)
            .field("leader", &self.leader)
            .field("tiles", &self.tiles)
            .field("live_tiles", &self.live_tiles)
            .finish_non_exhaustive()
    }
}

impl SurveillanceSession {
    /// Creates a session from a layout. Call [`Self::start`] to build the
    /// first page.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::InvalidRange` for an inverted playback range.
    pub fn new(
        layout: LayoutConfig,
        settings: EngineSettings,
        mode: SessionMode,
        layout_store: Box<dyn LayoutStore>,
    ) -> Result<Self, ClockError> {
        let (clock, surfaces, live_source) = match mode {
            SessionMode::Playback {
                range_from,
                range_to,
                surfaces,
            } => (
                Some(PlaybackClock::new(range_from, range_to)?),
                Some(surfaces),
                None,
            ),
            SessionMode::Live { source } => (None, None, Some(source)),
        };
        let clip_store = ClipStore::new(settings.effective_lookback_ms(), settings.fetch_timeout());

        Ok(Self {
            page: PageAssignment::empty(layout.split_mode.grid_size()),
            autoplay: AutoplayTimer::new(layout.autoplay, layout.autoplay_in_seconds),
            selection: layout.selection,
            split_mode: layout.split_mode,
            cursor: 0,
            settings,
            clock,
            leader: None,
            last_broadcast_ms: None,
            live_paused: false,
            tiles: HashMap::new(),
            live_tiles: HashMap::new(),
            clip_store,
            surfaces,
            live_source,
            layout_store,
            generation_floor: 0,
        })
    }

    /// Creates a session from the layout saved in `layout_store`, or an
    /// empty layout if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored layout cannot be read or the range
    /// is inverted.
    pub fn restore(
        settings: EngineSettings,
        mode: SessionMode,
        layout_store: Box<dyn LayoutStore>,
    ) -> CitySightResult<Self> {
        let _span = crate::trace_operation_debug!(span_names::LAYOUT_LOAD).entered();
        let layout = layout_store.read_layout()?.unwrap_or_else(|| LayoutConfig {
            autoplay_in_seconds: settings.default_autoplay_secs,
            ..LayoutConfig::default()
        });
        Ok(Self::new(layout, settings, mode, layout_store)?)
    }

    /// Builds the first page and arms autoplay.
    pub fn start(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        tracing::info!(
            devices = self.selection.len(),
            split_mode = %self.split_mode,
            live = self.is_live(),
            "Starting surveillance session"
        );
        self.sync_page(&mut effects);
        self.enforce_autoplay(&mut effects);
        if self.autoplay.is_enabled() {
            self.push_autoplay(&mut effects);
        }
        self.settle(&mut effects);
        effects
    }

    /// Handles one queued event.
    ///
    /// Rejected user commands are reported as
    /// [`SessionNotice::CommandRejected`].
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        match event {
            SessionEvent::Surface { device, event } => {
                self.on_surface_event(&device, &event, &mut effects);
            }
            SessionEvent::ClipsLoaded {
                device,
                from,
                to,
                result,
            } => self.on_clips_loaded(device, from, to, result, &mut effects),
            SessionEvent::RetargetTimer { device, generation } => {
                self.on_retarget_timer(&device, generation, &mut effects);
            }
            SessionEvent::AutoplayTick => self.on_autoplay_tick(&mut effects),
            SessionEvent::Command(command) => {
                if let Err(err) = self.apply_command(command, &mut effects) {
                    tracing::warn!(error = %err, "User command rejected");
                    effects.push(SessionEffect::Notice(SessionNotice::CommandRejected {
                        message: err.to_string(),
                    }));
                }
            }
        }
        self.settle(&mut effects);
        effects
    }

    /// Applies a user command, returning its error instead of a notice.
    ///
    /// # Errors
    ///
    /// Returns layout errors for invalid selection edits and clock errors
    /// for invalid ranges.
    pub fn execute(&mut self, command: UserCommand) -> CitySightResult<Vec<SessionEffect>> {
        let mut effects = Vec::new();
        self.apply_command(command, &mut effects)?;
        self.settle(&mut effects);
        Ok(effects)
    }

    /// Engine settings in use.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Current split mode.
    #[must_use]
    pub const fn split_mode(&self) -> SplitMode {
        self.split_mode
    }

    /// Number of slots.
    #[must_use]
    pub const fn grid_size(&self) -> u32 {
        self.split_mode.grid_size()
    }

    /// Rotation cursor.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Visible page.
    #[must_use]
    pub const fn page(&self) -> &PageAssignment {
        &self.page
    }

    /// Autoplay settings.
    #[must_use]
    pub const fn autoplay(&self) -> &AutoplayTimer {
        &self.autoplay
    }

    /// Shared clock (`None` in live mode).
    #[must_use]
    pub const fn clock(&self) -> Option<&PlaybackClock> {
        self.clock.as_ref()
    }

    /// Current leader.
    #[must_use]
    pub const fn leader(&self) -> Option<&DeviceId> {
        self.leader.as_ref()
    }

    /// Returns true in live mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live_source.is_some()
    }

    /// Returns true while playback is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.clock
            .as_ref()
            .map_or(self.live_paused, PlaybackClock::is_paused)
    }

    /// Controller of a visible playback tile.
    #[must_use]
    pub fn tile(&self, device: &DeviceId) -> Option<&TileSyncController> {
        self.tiles.get(device)
    }

    /// Visible live tile.
    #[must_use]
    pub fn live_tile(&self, device: &DeviceId) -> Option<&LiveTile> {
        self.live_tiles.get(device)
    }

    /// Snapshot of every visible tile in slot order.
    #[must_use]
    pub fn tile_snapshots(&self) -> Vec<TileSnapshot> {
        self.page
            .occupied()
            .filter_map(|(slot, device)| {
                let role = self.role_of(device);
                if let Some(tile) = self.tiles.get(device) {
                    Some(TileSnapshot {
                        slot,
                        device_id: device.clone(),
                        role,
                        state: Some(tile.state()),
                        status: tile.status().clone(),
                    })
                } else {
                    self.live_tiles.get(device).map(|tile| TileSnapshot {
                        slot,
                        device_id: device.clone(),
                        role,
                        state: None,
                        status: tile.status().clone(),
                    })
                }
            })
            .collect()
    }

    /// The layout as it would be persisted now.
    #[must_use]
    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig {
            version: LAYOUT_VERSION,
            saved_at: Utc::now(),
            split_mode: self.split_mode,
            autoplay: self.autoplay.is_enabled(),
            autoplay_in_seconds: self.autoplay.interval_secs(),
            selection: self.selection.clone(),
        }
    }

    // ========== User commands ==========

    fn apply_command(
        &mut self,
        command: UserCommand,
        effects: &mut Vec<SessionEffect>,
    ) -> CitySightResult<()> {
        tracing::debug!(?command, "Applying user command");
        match command {
            UserCommand::AddDevice(device) => {
                self.selection.add(device)?;
                self.layout_changed(effects);
            }
            UserCommand::RemoveDevice(device) => {
                let index = self.selection.remove(&device)?;
                self.clip_store.invalidate(&device);
                if index < self.cursor {
                    self.cursor -= 1;
                }
                self.cursor = normalize_cursor(self.cursor, self.selection.len());
                self.layout_changed(effects);
            }
            UserCommand::Pin { device, slot } => {
                let displaced = self.selection.pin(&device, slot, self.grid_size())?;
                if let Some(displaced) = displaced {
                    effects.push(SessionEffect::Notice(SessionNotice::PinDisplaced {
                        device: displaced,
                    }));
                }
                self.layout_changed(effects);
            }
            UserCommand::Unpin(device) => {
                if self.selection.unpin(&device)? {
                    self.layout_changed(effects);
                }
            }
            UserCommand::SetSplitMode(mode) => self.change_split_mode(mode, effects),
            UserCommand::SetAutoplay(enabled) => {
                if let Some(reason) =
                    self.autoplay
                        .set_enabled(enabled, &self.selection, self.grid_size())
                {
                    tracing::warn!(%reason, "Autoplay cannot be enabled");
                    effects.push(SessionEffect::Notice(SessionNotice::AutoplayDisabled {
                        reason,
                    }));
                }
                self.push_autoplay(effects);
                self.persist(effects);
            }
            UserCommand::SetAutoplayInterval(secs) => {
                self.autoplay.set_interval_secs(secs);
                if self.autoplay.is_enabled() {
                    self.push_autoplay(effects);
                }
                self.persist(effects);
            }
            UserCommand::Page(direction) => {
                self.flip_page(direction, effects);
                if self.autoplay.is_enabled() {
                    self.push_autoplay(effects);
                }
            }
            UserCommand::Seek(ms) => self.seek(ms, effects),
            UserCommand::Pause => self.pause(),
            UserCommand::Resume => self.resume(effects),
            UserCommand::SetRange { from, to } => self.set_range(from, to, effects)?,
        }
        Ok(())
    }

    fn layout_changed(&mut self, effects: &mut Vec<SessionEffect>) {
        self.sync_page(effects);
        self.enforce_autoplay(effects);
        self.persist(effects);
    }

    fn change_split_mode(&mut self, mode: SplitMode, effects: &mut Vec<SessionEffect>) {
        let grid_size = mode.grid_size();
        let cleared = self.selection.clear_pins_outside(grid_size);
        tracing::info!(
            from = %self.split_mode,
            to = %mode,
            cleared_pins = cleared.len(),
            "Changing split mode"
        );
        self.split_mode = mode;
        self.cursor = 0;

        if self.autoplay.is_enabled() {
            let reason = rotation_block(&self.selection, grid_size)
                .or_else(|| (!cleared.is_empty()).then_some(AutoplayBlock::PinsCleared));
            if let Some(reason) = reason {
                self.autoplay.disable();
                tracing::warn!(%reason, "Autoplay disabled by split-mode change");
                effects.push(SessionEffect::Notice(SessionNotice::AutoplayDisabled {
                    reason,
                }));
                effects.push(SessionEffect::Autoplay { interval: None });
            }
        }
        if !cleared.is_empty() {
            effects.push(SessionEffect::Notice(SessionNotice::PinsCleared {
                devices: cleared,
            }));
        }

        self.sync_page(effects);
        self.persist(effects);
    }

    fn flip_page(&mut self, direction: PageDirection, effects: &mut Vec<SessionEffect>) {
        if self.selection.is_empty() {
            return;
        }
        self.cursor = advance_cursor(&self.selection, &self.page, self.cursor, direction);
        tracing::debug!(%direction, cursor = self.cursor, "Flipping page");
        self.sync_page(effects);
    }

    fn seek(&mut self, ms: i64, effects: &mut Vec<SessionEffect>) {
        let Some(clock) = self.clock.as_mut() else {
            tracing::debug!("Seek ignored in live mode");
            return;
        };
        if clock.seek(ms) {
            effects.push(SessionEffect::Notice(SessionNotice::RangeEnded {
                clock_ms: clock.current_ms(),
            }));
        }
        let clock_ms = clock.current_ms();
        tracing::info!(clock_ms, "Seeking all tiles");

        for device in self.page.device_ids() {
            let ctx = self.tile_context(&device);
            if let Some(tile) = self.tiles.get_mut(&device) {
                let tile_effects = tile.seek(clock_ms, &ctx);
                self.apply_tile_effects(tile_effects, effects);
            }
        }
        self.last_broadcast_ms = Some(clock_ms);
    }

    fn pause(&mut self) {
        if let Some(clock) = self.clock.as_mut() {
            clock.pause();
        } else {
            self.live_paused = true;
        }
        for tile in self.tiles.values_mut() {
            tile.pause();
        }
        for tile in self.live_tiles.values_mut() {
            tile.pause();
        }
    }

    fn resume(&mut self, effects: &mut Vec<SessionEffect>) {
        self.live_paused = false;
        for tile in self.live_tiles.values_mut() {
            tile.resume();
        }
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        let before = clock.current_ms();
        clock.resume();
        let after = clock.current_ms();

        if after == before {
            for tile in self.tiles.values_mut() {
                tile.resume();
            }
        } else {
            // Resumed at the range end: the clock rewound
            self.seek(after, effects);
        }
    }

    fn set_range(
        &mut self,
        from: i64,
        to: i64,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<(), ClockError> {
        let Some(clock) = self.clock.as_mut() else {
            return Ok(());
        };
        clock.set_range(from, to)?;
        tracing::info!(from, to, "Playback range changed");
        self.clip_store.clear();
        self.last_broadcast_ms = None;

        for device in self.page.device_ids() {
            let ctx = self.tile_context(&device);
            if let Some(tile) = self.tiles.get_mut(&device) {
                let tile_effects = tile.reload(&ctx);
                self.apply_tile_effects(tile_effects, effects);
            }
        }
        Ok(())
    }

    // ========== Queue events ==========

    fn on_surface_event(
        &mut self,
        device: &DeviceId,
        event: &SurfaceEvent,
        effects: &mut Vec<SessionEffect>,
    ) {
        if let Some(tile) = self.live_tiles.get_mut(device) {
            tile.on_surface_event(event);
            return;
        }
        let ctx = self.tile_context(device);
        if let Some(tile) = self.tiles.get_mut(device) {
            let tile_effects = tile.on_surface_event(event, &ctx);
            self.apply_tile_effects(tile_effects, effects);
        }
    }

    fn on_clips_loaded(
        &mut self,
        device: DeviceId,
        from: i64,
        to: i64,
        result: Result<SortedClips, ErrorKind>,
        effects: &mut Vec<SessionEffect>,
    ) {
        if self.range() != Some((from, to)) {
            tracing::debug!(device_id = %device, from, to, "Dropping clips for an old range");
            return;
        }
        if let Ok(clips) = &result {
            self.clip_store.insert(device.clone(), from, to, clips.clone());
        }
        self.deliver_clips(&device, result, effects);
    }

    fn on_retarget_timer(
        &mut self,
        device: &DeviceId,
        generation: u64,
        effects: &mut Vec<SessionEffect>,
    ) {
        let ctx = self.tile_context(device);
        if let Some(tile) = self.tiles.get_mut(device) {
            let tile_effects = tile.on_retarget_timer(generation, &ctx);
            self.apply_tile_effects(tile_effects, effects);
        }
    }

    fn on_autoplay_tick(&mut self, effects: &mut Vec<SessionEffect>) {
        if !self.autoplay.is_enabled() {
            return;
        }
        if let Some(reason) = self.autoplay.enforce(&self.selection, self.grid_size()) {
            effects.push(SessionEffect::Notice(SessionNotice::AutoplayDisabled {
                reason,
            }));
            effects.push(SessionEffect::Autoplay { interval: None });
            return;
        }
        if !self.autoplay.should_advance(self.is_paused()) {
            tracing::debug!("Autoplay tick skipped while paused");
            return;
        }
        self.flip_page(PageDirection::Next, effects);
    }

    // ========== Page and tiles ==========

    fn sync_page(&mut self, effects: &mut Vec<SessionEffect>) {
        self.cursor = normalize_cursor(self.cursor, self.selection.len());
        let _span =
            crate::trace_operation_debug!(span_names::PAGE_ASSIGN, cursor = self.cursor).entered();
        let page = assign_page(&self.selection, self.cursor, self.grid_size());
        let changed = page != self.page;

        let departing: Vec<DeviceId> = self
            .tiles
            .keys()
            .chain(self.live_tiles.keys())
            .filter(|device| !page.contains(device))
            .cloned()
            .collect();
        for device in departing {
            if let Some(mut tile) = self.tiles.remove(&device) {
                self.generation_floor = self.generation_floor.max(tile.generation());
                tile.shutdown();
            }
            if let Some(mut tile) = self.live_tiles.remove(&device) {
                tile.shutdown();
            }
            tracing::debug!(device_id = %device, "Tile left the page");
        }
        self.page = page;

        let occupied: Vec<(usize, DeviceId)> = self
            .page
            .occupied()
            .map(|(slot, device)| (slot, device.clone()))
            .collect();
        for (slot, device) in occupied {
            self.place_tile(slot, device, effects);
        }

        if changed {
            tracing::info!(
                cursor = self.cursor,
                tiles = self.page.occupied_count(),
                "Page assigned"
            );
            effects.push(SessionEffect::Notice(SessionNotice::PageChanged {
                cursor: self.cursor,
                page: self.page.clone(),
            }));
        }
    }

    fn place_tile(&mut self, slot: usize, device: DeviceId, effects: &mut Vec<SessionEffect>) {
        if let Some(source) = self.live_source.as_mut() {
            if let Some(tile) = self.live_tiles.get_mut(&device) {
                tile.set_slot(slot);
            } else {
                let mut tile = LiveTile::open(source.as_mut(), device.clone(), slot);
                if self.live_paused {
                    tile.pause();
                }
                self.live_tiles.insert(device, tile);
            }
            return;
        }

        if let Some(tile) = self.tiles.get_mut(&device) {
            tile.set_slot(slot);
            return;
        }
        let Some(factory) = self.surfaces.as_mut() else {
            return;
        };
        let surface = factory.create(&device, slot);
        let tile = TileSyncController::new(device.clone(), slot, surface, self.settings.thresholds())
            .with_generation(self.generation_floor);
        self.tiles.insert(device.clone(), tile);

        let ctx = self.tile_context(&device);
        if let Some(tile) = self.tiles.get_mut(&device) {
            let tile_effects = tile.start(&ctx);
            self.apply_tile_effects(tile_effects, effects);
        }
    }

    fn request_clips(&mut self, device: DeviceId, effects: &mut Vec<SessionEffect>) {
        let Some((from, to)) = self.range() else {
            return;
        };
        if let Some(clips) = self.clip_store.cached(&device, from, to) {
            tracing::trace!(device_id = %device, "Serving clips from cache");
            self.deliver_clips(&device, Ok(clips), effects);
        } else {
            effects.push(SessionEffect::FetchClips { device, from, to });
        }
    }

    fn deliver_clips(
        &mut self,
        device: &DeviceId,
        result: Result<SortedClips, ErrorKind>,
        effects: &mut Vec<SessionEffect>,
    ) {
        let ctx = self.tile_context(device);
        if let Some(tile) = self.tiles.get_mut(device) {
            let tile_effects = tile.on_clips_loaded(result, &ctx);
            self.apply_tile_effects(tile_effects, effects);
        }
    }

    fn apply_tile_effects(&mut self, tile_effects: Vec<TileEffect>, effects: &mut Vec<SessionEffect>) {
        for effect in tile_effects {
            match effect {
                TileEffect::RequestClips { device } => self.request_clips(device, effects),
                TileEffect::AdvanceClock { device, ms } => self.advance_clock(&device, ms, effects),
                TileEffect::JumpClock { device, ms } => self.jump_clock(&device, ms, effects),
                TileEffect::ScheduleRetarget {
                    device,
                    generation,
                    delay_ms,
                    ..
                } => effects.push(SessionEffect::ScheduleRetarget {
                    device,
                    generation,
                    delay: Duration::from_millis(u64::try_from(delay_ms).unwrap_or(0)),
                }),
                TileEffect::JumpingToNextFootage { device, target_ms } => {
                    effects.push(SessionEffect::Notice(SessionNotice::JumpingToNextFootage {
                        device,
                        target_ms,
                    }));
                }
                TileEffect::Failed { device, kind } => {
                    effects.push(SessionEffect::Notice(SessionNotice::TileFailed { device, kind }));
                }
            }
        }
    }

    // ========== Clock and leader ==========

    fn advance_clock(&mut self, device: &DeviceId, ms: i64, effects: &mut Vec<SessionEffect>) {
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        match clock.update_from(device, self.leader.as_ref(), ms) {
            Ok(true) => {
                let clock_ms = clock.current_ms();
                self.range_ended(clock_ms, effects);
            }
            Ok(false) => {}
            Err(err) => tracing::trace!(error = %err, "Clock update rejected"),
        }
    }

    fn jump_clock(&mut self, device: &DeviceId, ms: i64, effects: &mut Vec<SessionEffect>) {
        if self.leader.as_ref() != Some(device) {
            tracing::debug!(device_id = %device, "Jump from non-leader ignored");
            return;
        }
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        if clock.seek(ms) {
            let clock_ms = clock.current_ms();
            self.range_ended(clock_ms, effects);
        }
    }

    fn range_ended(&mut self, clock_ms: i64, effects: &mut Vec<SessionEffect>) {
        for tile in self.tiles.values_mut() {
            tile.pause();
        }
        effects.push(SessionEffect::Notice(SessionNotice::RangeEnded { clock_ms }));
    }

    /// Re-elects and rebroadcasts until leader and clock are stable.
    fn settle(&mut self, effects: &mut Vec<SessionEffect>) {
        if self.clock.is_none() {
            return;
        }
        for _ in 0..MAX_SETTLE_ROUNDS {
            let leader_changed = self.reelect(effects);
            let clock_ms = self.clock_ms();
            let clock_moved = self.last_broadcast_ms != Some(clock_ms);
            if clock_moved {
                self.last_broadcast_ms = Some(clock_ms);
                self.broadcast_clock(effects);
            }
            if !leader_changed && !clock_moved {
                return;
            }
        }
        tracing::debug!("Session still settling after {MAX_SETTLE_ROUNDS} rounds");
    }

    fn reelect(&mut self, effects: &mut Vec<SessionEffect>) -> bool {
        let on_page = self.page.device_ids();
        let statuses: HashMap<DeviceId, TileStatus> = self
            .tiles
            .iter()
            .map(|(device, tile)| (device.clone(), tile.status().clone()))
            .collect();
        let elected = elect(self.leader.as_ref(), &on_page, &statuses, self.clock_ms());
        if elected == self.leader {
            // Siblings may have stopped playing since the leader parked.
            if let Some(leader) = elected {
                let ctx = self.tile_context(&leader);
                if let Some(tile) = self.tiles.get_mut(&leader) {
                    let tile_effects = tile.on_role_change(&ctx);
                    self.apply_tile_effects(tile_effects, effects);
                }
            }
            return false;
        }

        tracing::info!(
            previous = ?self.leader,
            leader = ?elected,
            clock_ms = self.clock_ms(),
            "Clock leader changed"
        );
        self.leader = elected.clone();
        effects.push(SessionEffect::Notice(SessionNotice::LeaderChanged { leader: elected }));

        for device in on_page {
            let ctx = self.tile_context(&device);
            if let Some(tile) = self.tiles.get_mut(&device) {
                let tile_effects = tile.on_role_change(&ctx);
                self.apply_tile_effects(tile_effects, effects);
            }
        }
        true
    }

    fn broadcast_clock(&mut self, effects: &mut Vec<SessionEffect>) {
        for device in self.page.device_ids() {
            let ctx = self.tile_context(&device);
            if let Some(tile) = self.tiles.get_mut(&device) {
                let tile_effects = tile.on_clock(&ctx);
                self.apply_tile_effects(tile_effects, effects);
            }
        }
    }

    // ========== Helpers ==========

    fn tile_context(&self, device: &DeviceId) -> TileContext {
        let (clock_ms, range_to, paused) = self.clock.as_ref().map_or(
            (0, i64::MAX, self.live_paused),
            |clock| (clock.current_ms(), clock.range_to(), clock.is_paused()),
        );
        TileContext {
            role: self.role_of(device),
            clock_ms,
            range_to,
            paused,
            sibling_can_play: self
                .tiles
                .iter()
                .any(|(id, tile)| id != device && tile.status().can_play),
        }
    }

    fn role_of(&self, device: &DeviceId) -> TileRole {
        if self.leader.as_ref() == Some(device) {
            TileRole::Leader
        } else {
            TileRole::Follower
        }
    }

    fn clock_ms(&self) -> i64 {
        self.clock.as_ref().map_or(0, PlaybackClock::current_ms)
    }

    fn range(&self) -> Option<(i64, i64)> {
        self.clock
            .as_ref()
            .map(|clock| (clock.range_from(), clock.range_to()))
    }

    fn push_autoplay(&self, effects: &mut Vec<SessionEffect>) {
        effects.push(SessionEffect::Autoplay {
            interval: self
                .autoplay
                .is_enabled()
                .then(|| self.autoplay.interval()),
        });
    }

    fn enforce_autoplay(&mut self, effects: &mut Vec<SessionEffect>) {
        if let Some(reason) = self.autoplay.enforce(&self.selection, self.grid_size()) {
            effects.push(SessionEffect::Notice(SessionNotice::AutoplayDisabled {
                reason,
            }));
            effects.push(SessionEffect::Autoplay { interval: None });
        }
    }

    fn persist(&mut self, effects: &mut Vec<SessionEffect>) {
        let layout = self.layout();
        if let Err(err) = self.layout_store.write_layout(&layout) {
            tracing::warn!(error = %err, "Failed to persist layout");
            effects.push(SessionEffect::Notice(SessionNotice::PersistFailed {
                message: err.to_string(),
            }));
        }
    }
}
