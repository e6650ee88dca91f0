//! Live mode tiles
//!
//! In live mode there is no clock, no clip lookup and no leader. Each tile
//! opens a stream from the [`LiveStreamSource`] and plays as soon as the
//! surface reports `Ready`.

use std::collections::HashMap;
use std::fmt;

use crate::error::{ErrorKind, LiveError};
use crate::models::DeviceId;
use crate::playback::{PlaybackSurface, SurfaceEvent, TileStatus};

/// Opens live streams for devices.
pub trait LiveStreamSource: Send {
    /// Opens the live stream of `device` on a new surface.
    ///
    /// # Errors
    ///
    /// Returns `LiveError::NotFound` for unknown devices and
    /// `LiveError::Unavailable` when the stream cannot be opened.
    fn open_live(&mut self, device: &DeviceId) -> Result<Box<dyn PlaybackSurface>, LiveError>;
}

/// One tile showing a live stream.
pub struct LiveTile {
    device_id: DeviceId,
    slot: usize,
    surface: Option<Box<dyn PlaybackSurface>>,
    status: TileStatus,
    paused: bool,
}

impl fmt::Debug for LiveTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveTile")
            .field("device_id", &self.device_id)
            .field("slot", &self.slot)
            .field("status", &self.status)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl LiveTile {
    /// Opens the stream for `device`; failures become the tile's status.
    pub fn open(source: &mut dyn LiveStreamSource, device_id: DeviceId, slot: usize) -> Self {
        let mut status = TileStatus::default();
        let surface = match source.open_live(&device_id) {
            Ok(surface) => Some(surface),
            Err(err) => {
                tracing::warn!(device_id = %device_id, error = %err, "Failed to open live stream");
                status.error_kind = Some(err.kind());
                None
            }
        };
        Self {
            device_id,
            slot,
            surface,
            status,
            paused: false,
        }
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

    /// Moves the tile to another slot.
    pub const fn set_slot(&mut self, slot: usize) {
        self.slot = slot;
    }

    /// Published status.
    #[must_use]
    pub const fn status(&self) -> &TileStatus {
        &self.status
    }

    /// Handles a surface callback.
    pub fn on_surface_event(&mut self, event: &SurfaceEvent) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match event {
            SurfaceEvent::Ready => {
                self.status.can_play = true;
                self.status.error_kind = None;
                if !self.paused {
                    surface.play();
                }
            }
            SurfaceEvent::Playing => self.status.can_play = true,
            SurfaceEvent::Waiting | SurfaceEvent::Ended => self.status.can_play = false,
            SurfaceEvent::TimeUpdate { .. } => {}
            SurfaceEvent::Error { message } => {
                tracing::warn!(device_id = %self.device_id, error = %message, "Live stream failed");
                self.status.can_play = false;
                self.status.error_kind = Some(ErrorKind::PlaybackFailure);
            }
        }
    }

    /// Pauses the stream.
    pub fn pause(&mut self) {
        self.paused = true;
        if let Some(surface) = self.surface.as_mut() {
            surface.pause();
        }
    }

    /// Resumes the stream.
    pub fn resume(&mut self) {
        self.paused = false;
        if self.status.can_play
            && let Some(surface) = self.surface.as_mut()
        {
            surface.play();
        }
    }

    /// Stops the surface before the tile leaves the page.
    pub fn shutdown(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.pause();
        }
    }
}

/// Live source backed by a table of per-device surface constructors.
///
/// Useful for embedding hosts that register streams up front, and for
/// tests.
#[derive(Default)]
pub struct StaticLiveSource {
    streams: HashMap<DeviceId, Box<dyn FnMut() -> Box<dyn PlaybackSurface> + Send>>,
}

impl fmt::Debug for StaticLiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLiveSource")
            .field("devices", &self.streams.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StaticLiveSource {
    /// Creates a source with no streams.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream for `device`.
    #[must_use]
    pub fn with_stream<F>(mut self, device: impl Into<DeviceId>, open: F) -> Self
    where
        F: FnMut() -> Box<dyn PlaybackSurface> + Send + 'static,
    {
        self.streams.insert(device.into(), Box::new(open));
        self
    }
}

impl LiveStreamSource for StaticLiveSource {
    fn open_live(&mut self, device: &DeviceId) -> Result<Box<dyn PlaybackSurface>, LiveError> {
        self.streams
            .get_mut(device)
            .map(|open| open())
            .ok_or_else(|| LiveError::NotFound(device.clone()))
    }
}
