//! Async host for a session
//!
//! [`SessionRuntime`] owns a [`SurveillanceSession`] on a tokio task and
//! feeds it from one ordered queue. Effects become spawned work: clip
//! fetches and retarget timers post their answers back onto the queue, and
//! autoplay runs a ticker that does the same. The session itself never
//! awaits anything, so state changes stay strictly sequential.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::autoplay::{TickerHandle, start_ticker};
use crate::clips::{ClipDirectory, fetch_clips};
use crate::error::RuntimeError;
use crate::models::DeviceId;
use crate::playback::SurfaceEvent;
use crate::session::{SessionEffect, SessionEvent, SessionNotice, SurveillanceSession, UserCommand};
use crate::tracing::span_names;

/// Capacity of the session event queue
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Capacity of the notice channel
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Cloneable sender onto a session's event queue.
///
/// Hand one to every surface so its callbacks reach the session.
#[derive(Debug, Clone)]
pub struct SessionSender {
    events: mpsc::Sender<SessionEvent>,
}

impl SessionSender {
    /// Posts an event.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` once the runtime has exited.
    pub async fn send(&self, event: SessionEvent) -> Result<(), RuntimeError> {
        self.events
            .send(event)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    /// Posts a user command.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` once the runtime has exited.
    pub async fn command(&self, command: UserCommand) -> Result<(), RuntimeError> {
        self.send(SessionEvent::Command(command)).await
    }

    /// Posts a surface callback without waiting, for use from media
    /// callbacks that cannot await.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` if the queue is closed or full.
    pub fn surface_event(&self, device: DeviceId, event: SurfaceEvent) -> Result<(), RuntimeError> {
        self.events
            .try_send(SessionEvent::Surface { device, event })
            .map_err(|_| RuntimeError::Stopped)
    }
}

/// Handle to a running session.
#[derive(Debug)]
pub struct RuntimeHandle {
    id: Uuid,
    sender: SessionSender,
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<SurveillanceSession>,
}

impl RuntimeHandle {
    /// Identifier recorded on every log line of this session.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// A sender for surfaces and other producers.
    #[must_use]
    pub fn sender(&self) -> SessionSender {
        self.sender.clone()
    }

    /// Posts a user command.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` once the runtime has exited.
    pub async fn command(&self, command: UserCommand) -> Result<(), RuntimeError> {
        self.sender.command(command).await
    }

    /// Stops the runtime and returns the session.
    ///
    /// Events already queued before the stop signal may be dropped.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` if the runtime task panicked or was
    /// cancelled.
    pub async fn stop(self) -> Result<SurveillanceSession, RuntimeError> {
        let _ = self.stop_tx.send(()).await;
        self.task.await.map_err(|err| {
            tracing::error!(session_id = %self.id, error = %err, "Session runtime task failed");
            RuntimeError::Stopped
        })
    }
}

/// Runs a session on the tokio runtime.
pub struct SessionRuntime {
    session: SurveillanceSession,
    directory: Arc<dyn ClipDirectory>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    stop_rx: mpsc::Receiver<()>,
    notices: mpsc::Sender<SessionNotice>,
    ticker: Option<TickerHandle>,
}

impl SessionRuntime {
    /// Spawns `session` and returns its handle plus the notice stream.
    ///
    /// Notices are dropped (with a debug log) if the receiver falls
    /// behind.
    pub fn spawn(
        session: SurveillanceSession,
        directory: Arc<dyn ClipDirectory>,
    ) -> (RuntimeHandle, mpsc::Receiver<SessionNotice>) {
        let id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (notices_tx, notices_rx) = mpsc::channel(NOTICE_CHANNEL_CAPACITY);

        let runtime = Self {
            session,
            directory,
            events_tx: events_tx.clone(),
            events_rx,
            stop_rx,
            notices: notices_tx,
            ticker: None,
        };
        let span = crate::trace_operation!(span_names::SESSION, session_id = %id);
        let task = tokio::spawn(runtime.run().instrument(span));

        let handle = RuntimeHandle {
            id,
            sender: SessionSender { events: events_tx },
            stop_tx,
            task,
        };
        (handle, notices_rx)
    }

    async fn run(mut self) -> SurveillanceSession {
        tracing::info!("Session runtime started");
        let effects = self.session.start();
        self.perform(effects).await;

        loop {
            tokio::select! {
                _ = self.stop_rx.recv() => break,
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    let effects = self.session.handle(event);
                    self.perform(effects).await;
                }
            }
        }

        if let Some(ticker) = self.ticker.take() {
            ticker.stop().await;
        }
        tracing::info!("Session runtime stopped");
        self.session
    }

    async fn perform(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::FetchClips { device, from, to } => self.spawn_fetch(device, from, to),
                SessionEffect::ScheduleRetarget {
                    device,
                    generation,
                    delay,
                } => self.spawn_timer(device, generation, delay),
                SessionEffect::Autoplay { interval } => self.restart_ticker(interval).await,
                SessionEffect::Notice(notice) => {
                    tracing::info!(%notice, "Session notice");
                    if self.notices.try_send(notice).is_err() {
                        tracing::debug!("Notice dropped, receiver is gone or full");
                    }
                }
            }
        }
    }

    fn spawn_fetch(&self, device: DeviceId, from: i64, to: i64) {
        let directory = Arc::clone(&self.directory);
        let events = self.events_tx.clone();
        let settings = self.session.settings();
        let lookback_ms = settings.effective_lookback_ms();
        let timeout = settings.fetch_timeout();

        tokio::spawn(
            async move {
                let result =
                    fetch_clips(directory.as_ref(), &device, from, to, lookback_ms, timeout).await;
                let loaded = SessionEvent::ClipsLoaded {
                    device,
                    from,
                    to,
                    result,
                };
                if events.send(loaded).await.is_err() {
                    tracing::debug!("Session gone before clips arrived");
                }
            }
            .in_current_span(),
        );
    }

    fn spawn_timer(&self, device: DeviceId, generation: u64, delay: Duration) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events
                .send(SessionEvent::RetargetTimer { device, generation })
                .await;
        });
    }

    async fn restart_ticker(&mut self, interval: Option<Duration>) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop().await;
        }
        if let Some(interval) = interval {
            tracing::debug!(interval_secs = interval.as_secs(), "Autoplay ticker armed");
            self.ticker = Some(start_ticker(
                interval,
                self.events_tx.clone(),
                SessionEvent::AutoplayTick,
            ));
        }
    }
}
