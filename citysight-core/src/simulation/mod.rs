//! Deterministic virtual-time simulation
//!
//! [`Simulator`] hosts a [`SurveillanceSession`] without real media or
//! timers: [`SimulatedSurface`]s report `Ready` after every load and seek,
//! advance their position while playing and report `Ended` at the end of
//! the clip. Clip fetches run against any [`ClipDirectory`] and retarget
//! timers fire in virtual time. The CLI `simulate` command and the
//! integration tests drive sessions through it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clips::{ClipDirectory, InMemoryClipDirectory, fetch_clips};
use crate::config::{EngineSettings, LayoutConfig, LayoutStore};
use crate::error::CitySightResult;
use crate::models::DeviceId;
use crate::playback::{PlaybackSurface, SurfaceCommand, SurfaceEvent, SurfaceFactory};
use crate::session::{
    SessionEffect, SessionEvent, SessionMode, SessionNotice, SurveillanceSession, UserCommand,
};

/// Upper bound on events handled in one drain.
const MAX_EVENTS_PER_DRAIN: usize = 10_000;

/// Observable state of a simulated surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// Loaded clip locator
    pub locator: Option<String>,
    /// Offset inside the loaded clip
    pub position_ms: i64,
    /// Whether the surface is playing
    pub playing: bool,
    /// A load or seek has not been acknowledged yet
    pub ready_pending: bool,
    /// Every command received, in order
    pub commands: Vec<SurfaceCommand>,
}

/// A surface that only tracks commands and position.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl SimulatedSurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> SurfaceState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Commands received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.state().commands
    }

    fn update<R>(&self, f: impl FnOnce(&mut SurfaceState) -> R) -> Option<R> {
        self.state.lock().ok().map(|mut state| f(&mut state))
    }
}

impl PlaybackSurface for SimulatedSurface {
    fn load(&mut self, locator: &str, offset_ms: i64) {
        self.update(|state| {
            state.commands.push(SurfaceCommand::Load {
                locator: locator.to_string(),
                offset_ms,
            });
            state.locator = Some(locator.to_string());
            state.position_ms = offset_ms;
            state.playing = false;
            state.ready_pending = true;
        });
    }

    fn play(&mut self) {
        self.update(|state| {
            state.commands.push(SurfaceCommand::Play);
            state.playing = state.locator.is_some();
        });
    }

    fn pause(&mut self) {
        self.update(|state| {
            state.commands.push(SurfaceCommand::Pause);
            state.playing = false;
        });
    }

    fn seek(&mut self, offset_ms: i64) {
        self.update(|state| {
            state.commands.push(SurfaceCommand::Seek { offset_ms });
            state.position_ms = offset_ms;
            state.ready_pending = true;
        });
    }
}

/// Creates [`SimulatedSurface`]s and keeps a handle to the latest one per
/// device. Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSurfaceFactory {
    surfaces: Arc<Mutex<HashMap<DeviceId, SimulatedSurface>>>,
}

impl SimulatedSurfaceFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest surface created for `device`.
    #[must_use]
    pub fn surface(&self, device: &DeviceId) -> Option<SimulatedSurface> {
        self.surfaces
            .lock()
            .ok()
            .and_then(|surfaces| surfaces.get(device).cloned())
    }

    /// Every registered surface, ordered by device.
    #[must_use]
    pub fn surfaces(&self) -> Vec<(DeviceId, SimulatedSurface)> {
        let mut surfaces: Vec<_> = self
            .surfaces
            .lock()
            .map(|surfaces| {
                surfaces
                    .iter()
                    .map(|(device, surface)| (device.clone(), surface.clone()))
                    .collect()
            })
            .unwrap_or_default();
        surfaces.sort_by(|a, b| a.0.cmp(&b.0));
        surfaces
    }
}

impl SurfaceFactory for SimulatedSurfaceFactory {
    fn create(&mut self, device: &DeviceId, _slot: usize) -> Box<dyn PlaybackSurface> {
        let surface = SimulatedSurface::new();
        if let Ok(mut surfaces) = self.surfaces.lock() {
            surfaces.insert(device.clone(), surface.clone());
        }
        Box::new(surface)
    }
}

#[derive(Debug)]
struct PendingTimer {
    due_ms: i64,
    seq: u64,
    event: SessionEvent,
}

/// Drives a playback session in virtual time.
pub struct Simulator<D = InMemoryClipDirectory> {
    session: SurveillanceSession,
    directory: D,
    surfaces: SimulatedSurfaceFactory,
    durations: HashMap<String, i64>,
    broken: HashSet<String>,
    now_ms: i64,
    queue: VecDeque<SessionEvent>,
    timers: Vec<PendingTimer>,
    timer_seq: u64,
    autoplay: Option<(i64, i64)>,
    notices: Vec<SessionNotice>,
}

impl<D> fmt::Debug for Simulator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("session", &self.session)
            .field("now_ms", &self.now_ms)
            .field("queued", &self.queue.len())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

impl<D: ClipDirectory> Simulator<D> {
    /// Builds a playback session over `[range_from, range_to]`.
    ///
    /// Simulated surfaces learn clip durations from fetched clip lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted.
    pub fn new(
        directory: D,
        layout: LayoutConfig,
        settings: EngineSettings,
        range_from: i64,
        range_to: i64,
        layout_store: Box<dyn LayoutStore>,
    ) -> CitySightResult<Self> {
        let surfaces = SimulatedSurfaceFactory::new();
        let session = SurveillanceSession::new(
            layout,
            settings,
            SessionMode::Playback {
                range_from,
                range_to,
                surfaces: Box::new(surfaces.clone()),
            },
            layout_store,
        )?;
        Ok(Self {
            session,
            directory,
            surfaces,
            durations: HashMap::new(),
            broken: HashSet::new(),
            now_ms: 0,
            queue: VecDeque::new(),
            timers: Vec::new(),
            timer_seq: 0,
            autoplay: None,
            notices: Vec::new(),
        })
    }

    /// Makes surfaces fail to decode `locator`.
    #[must_use]
    pub fn with_broken_locator(mut self, locator: impl Into<String>) -> Self {
        self.broken.insert(locator.into());
        self
    }

    /// The hosted session.
    #[must_use]
    pub const fn session(&self) -> &SurveillanceSession {
        &self.session
    }

    /// The clip directory.
    #[must_use]
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Latest surface of `device`.
    #[must_use]
    pub fn surface(&self, device: &DeviceId) -> Option<SimulatedSurface> {
        self.surfaces.surface(device)
    }

    /// Virtual time elapsed since start.
    #[must_use]
    pub const fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// Shared clock position.
    #[must_use]
    pub fn clock_ms(&self) -> Option<i64> {
        self.session.clock().map(|clock| clock.current_ms())
    }

    /// Notices raised so far.
    #[must_use]
    pub fn notices(&self) -> &[SessionNotice] {
        &self.notices
    }

    /// Returns and forgets the notices raised so far.
    pub fn take_notices(&mut self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Starts the session and settles it.
    pub async fn start(&mut self) {
        let effects = self.session.start();
        self.perform(effects).await;
        self.drain().await;
    }

    /// Queues a user command and settles.
    pub async fn send(&mut self, command: UserCommand) {
        self.queue.push_back(SessionEvent::Command(command));
        self.drain().await;
    }

    /// Advances virtual time by `step_ms`.
    pub async fn step(&mut self, step_ms: i64) {
        self.now_ms += step_ms;
        for (device, surface) in self.surfaces.surfaces() {
            let events = self.advance_surface(&surface, step_ms);
            self.queue
                .extend(events.into_iter().map(|event| SessionEvent::Surface {
                    device: device.clone(),
                    event,
                }));
        }
        self.drain().await;

        self.fire_due_timers();
        self.drain().await;
    }

    /// Runs `steps` steps of `step_ms` each.
    pub async fn run(&mut self, steps: usize, step_ms: i64) {
        for _ in 0..steps {
            self.step(step_ms).await;
        }
    }

    fn advance_surface(&self, surface: &SimulatedSurface, step_ms: i64) -> Vec<SurfaceEvent> {
        surface
            .update(|state| {
                if !state.playing || state.ready_pending {
                    return Vec::new();
                }
                let duration = state
                    .locator
                    .as_ref()
                    .and_then(|locator| self.durations.get(locator))
                    .copied()
                    .unwrap_or(i64::MAX);
                state.position_ms = state.position_ms.saturating_add(step_ms).min(duration);
                let update = SurfaceEvent::TimeUpdate {
                    offset_ms: state.position_ms,
                };
                if state.position_ms >= duration {
                    state.playing = false;
                    vec![update, SurfaceEvent::Ended]
                } else {
                    vec![update]
                }
            })
            .unwrap_or_default()
    }

    fn fire_due_timers(&mut self) {
        self.timers.sort_by_key(|timer| (timer.due_ms, timer.seq));
        let split = self
            .timers
            .iter()
            .position(|timer| timer.due_ms > self.now_ms)
            .unwrap_or(self.timers.len());
        let due: Vec<PendingTimer> = self.timers.drain(..split).collect();
        self.queue.extend(due.into_iter().map(|timer| timer.event));

        if let Some((interval_ms, next_due)) = self.autoplay.as_mut() {
            while *next_due <= self.now_ms {
                self.queue.push_back(SessionEvent::AutoplayTick);
                *next_due += *interval_ms;
            }
        }
    }

    /// Surfaces acknowledge pending loads and seeks.
    fn acknowledge_surfaces(&mut self) {
        for (device, surface) in self.surfaces.surfaces() {
            let acknowledged = surface
                .update(|state| {
                    if !state.ready_pending {
                        return None;
                    }
                    state.ready_pending = false;
                    let broken = state
                        .locator
                        .as_ref()
                        .is_some_and(|locator| self.broken.contains(locator));
                    Some(if broken {
                        SurfaceEvent::Error {
                            message: "cannot decode clip".to_string(),
                        }
                    } else {
                        SurfaceEvent::Ready
                    })
                })
                .flatten();
            if let Some(event) = acknowledged {
                self.queue.push_back(SessionEvent::Surface { device, event });
            }
        }
    }

    async fn drain(&mut self) {
        let mut handled = 0;
        loop {
            if self.queue.is_empty() {
                self.acknowledge_surfaces();
            }
            let Some(event) = self.queue.pop_front() else {
                return;
            };
            let effects = self.session.handle(event);
            self.perform(effects).await;

            handled += 1;
            if handled >= MAX_EVENTS_PER_DRAIN {
                tracing::warn!(handled, "Simulation did not settle, dropping queued events");
                self.queue.clear();
                return;
            }
        }
    }

    async fn perform(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::FetchClips { device, from, to } => {
                    let settings = self.session.settings();
                    let result = fetch_clips(
                        &self.directory as &dyn ClipDirectory,
                        &device,
                        from,
                        to,
                        settings.effective_lookback_ms(),
                        settings.fetch_timeout(),
                    )
                    .await;
                    if let Ok(clips) = &result {
                        self.durations.extend(
                            clips
                                .as_slice()
                                .iter()
                                .map(|clip| (clip.locator.clone(), clip.duration_ms)),
                        );
                    }
                    self.queue.push_back(SessionEvent::ClipsLoaded {
                        device,
                        from,
                        to,
                        result,
                    });
                }
                SessionEffect::ScheduleRetarget {
                    device,
                    generation,
                    delay,
                } => {
                    self.timer_seq += 1;
                    self.timers.push(PendingTimer {
                        due_ms: self.now_ms + duration_ms(delay),
                        seq: self.timer_seq,
                        event: SessionEvent::RetargetTimer { device, generation },
                    });
                }
                SessionEffect::Autoplay { interval } => {
                    self.autoplay = interval.map(|interval| {
                        let interval_ms = duration_ms(interval).max(1);
                        (interval_ms, self.now_ms + interval_ms)
                    });
                }
                SessionEffect::Notice(notice) => {
                    tracing::info!(at_ms = self.now_ms, %notice, "Session notice");
                    self.notices.push(notice);
                }
            }
        }
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryLayoutStore;
    use crate::models::{SelectionSet, SplitMode, VideoClip};

    fn simulator(directory: InMemoryClipDirectory, devices: &[&str]) -> Simulator {
        let layout = LayoutConfig::new(
            SelectionSet::from_devices(devices.iter().copied()).unwrap(),
            SplitMode::Four,
        );
        Simulator::new(
            directory,
            layout,
            EngineSettings::default(),
            0,
            60_000,
            Box::new(MemoryLayoutStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn surface_tracks_commands() {
        let mut surface = SimulatedSurface::new();
        surface.load("clip", 500);
        surface.play();
        let state = surface.state();
        assert_eq!(state.locator.as_deref(), Some("clip"));
        assert!(state.playing);
        assert!(state.ready_pending);
        assert_eq!(state.commands.len(), 2);
    }

    #[test]
    fn factory_keeps_latest_surface() {
        let mut factory = SimulatedSurfaceFactory::new();
        let device = DeviceId::from("cam");
        let mut first = factory.create(&device, 0);
        first.load("a", 0);
        factory.create(&device, 0);
        assert!(factory.surface(&device).unwrap().commands().is_empty());
    }

    #[tokio::test]
    async fn single_device_plays_and_drives_clock() {
        let directory =
            InMemoryClipDirectory::new().with_clips("cam", vec![VideoClip::new(0, 30_000, "cam-0")]);
        let mut sim = simulator(directory, &["cam"]);
        sim.start().await;
        sim.run(5, 500).await;

        assert_eq!(sim.clock_ms(), Some(2500));
        let surface = sim.surface(&DeviceId::from("cam")).unwrap();
        assert!(surface.state().playing);
    }

    #[tokio::test]
    async fn broken_clip_reports_playback_failure() {
        let directory =
            InMemoryClipDirectory::new().with_clips("cam", vec![VideoClip::new(0, 30_000, "bad")]);
        let mut sim = simulator(directory, &["cam"]).with_broken_locator("bad");
        sim.start().await;

        assert!(sim.notices().iter().any(|notice| matches!(
            notice,
            SessionNotice::TileFailed {
                kind: crate::error::ErrorKind::PlaybackFailure,
                ..
            }
        )));
    }
}
