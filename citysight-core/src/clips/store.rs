//! Sorted clip lists and the per-device clip cache

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::error::ErrorKind;
use crate::models::{DeviceId, VideoClip};
use crate::tracing::span_names;

use super::directory::ClipDirectory;

/// Cameras may report clip boundaries early, so queries reach back this far
/// before the requested start.
pub const LOOKBACK_MARGIN_MS: i64 = 60 * 60 * 1000;

/// Default bound on one directory query.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Index of the clip with the greatest `start_ms <= t`.
///
/// Returns `None` when `t` precedes every clip.
#[must_use]
pub fn closest_clip_index(clips: &[VideoClip], t: i64) -> Option<usize> {
    clips.partition_point(|clip| clip.start_ms <= t).checked_sub(1)
}

/// Start of the clip following `index`, if there is one.
#[must_use]
pub fn next_boundary_after(clips: &[VideoClip], index: usize) -> Option<i64> {
    clips.get(index + 1).map(|clip| clip.start_ms)
}

/// Clips of one device ordered by start time.
///
/// Cheap to clone; the cache and the tile controller share the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedClips {
    clips: Arc<[VideoClip]>,
}

impl SortedClips {
    /// Sorts clips by `start_ms`.
    #[must_use]
    pub fn from_unsorted(mut clips: Vec<VideoClip>) -> Self {
        clips.sort_by_key(|clip| clip.start_ms);
        Self {
            clips: clips.into(),
        }
    }

    /// Clips in start order.
    #[must_use]
    pub fn as_slice(&self) -> &[VideoClip] {
        &self.clips
    }

    /// Number of clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Returns true if there is no footage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clip at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&VideoClip> {
        self.clips.get(index)
    }

    /// See [`closest_clip_index`].
    #[must_use]
    pub fn closest_index(&self, t: i64) -> Option<usize> {
        closest_clip_index(&self.clips, t)
    }

    /// See [`next_boundary_after`].
    #[must_use]
    pub fn next_boundary_after(&self, index: usize) -> Option<i64> {
        next_boundary_after(&self.clips, index)
    }

    /// Start of the earliest clip.
    #[must_use]
    pub fn first_start(&self) -> Option<i64> {
        self.clips.first().map(|clip| clip.start_ms)
    }
}

/// Queries the directory for `device` and sorts the answer.
///
/// The query window starts `lookback_ms` before `from`. The whole call is
/// bounded by `timeout`; a query that does not answer in time counts as
/// `Unavailable`.
///
/// # Errors
///
/// `NoFootage` for an empty answer, `UnknownDevice` when the directory does
/// not know the device, `Unavailable` otherwise.
pub async fn fetch_clips(
    directory: &dyn ClipDirectory,
    device: &DeviceId,
    from: i64,
    to: i64,
    lookback_ms: i64,
    timeout: Duration,
) -> Result<SortedClips, ErrorKind> {
    let query_from = from.saturating_sub(lookback_ms);
    let span = crate::trace_operation_debug!(
        span_names::CLIP_FETCH,
        device_id = %device,
        from = query_from,
        to
    );

    async {
        let answer =
            tokio::time::timeout(timeout, directory.get_clips(device, query_from, to)).await;

        let clips = match answer {
            Ok(Ok(clips)) => clips,
            Ok(Err(err)) => {
                tracing::warn!(device_id = %device, error = %err, "Clip directory query failed");
                return Err(err.kind());
            }
            Err(_) => {
                tracing::warn!(
                    device_id = %device,
                    timeout_ms = timeout.as_millis() as u64,
                    "Clip directory query timed out"
                );
                return Err(ErrorKind::Unavailable);
            }
        };

        if clips.is_empty() {
            tracing::info!(device_id = %device, "No footage in requested range");
            return Err(ErrorKind::NoFootage);
        }

        tracing::debug!(device_id = %device, clip_count = clips.len(), "Clips loaded");
        Ok(SortedClips::from_unsorted(clips))
    }
    .instrument(span)
    .await
}

#[derive(Debug, Clone)]
struct CachedClips {
    from: i64,
    to: i64,
    clips: SortedClips,
}

/// Per-device cache of successfully loaded clip lists.
///
/// Failures are never cached, so a transient `Unavailable` is retried the
/// next time the device is requested.
#[derive(Debug, Clone)]
pub struct ClipStore {
    entries: HashMap<DeviceId, CachedClips>,
    lookback_ms: i64,
    timeout: Duration,
}

impl Default for ClipStore {
    fn default() -> Self {
        Self::new(LOOKBACK_MARGIN_MS, DEFAULT_FETCH_TIMEOUT)
    }
}

impl ClipStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(lookback_ms: i64, timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lookback_ms,
            timeout,
        }
    }

    /// Lookback margin applied to every query.
    #[must_use]
    pub const fn lookback_ms(&self) -> i64 {
        self.lookback_ms
    }

    /// Bound on one directory query.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cached clips for `device` if a cached window covers `[from, to]`.
    #[must_use]
    pub fn cached(&self, device: &DeviceId, from: i64, to: i64) -> Option<SortedClips> {
        self.entries
            .get(device)
            .filter(|entry| entry.from <= from && entry.to >= to)
            .map(|entry| entry.clips.clone())
    }

    /// Records a successful load.
    pub fn insert(&mut self, device: DeviceId, from: i64, to: i64, clips: SortedClips) {
        self.entries.insert(device, CachedClips { from, to, clips });
    }

    /// Drops the cached list for `device`.
    pub fn invalidate(&mut self, device: &DeviceId) {
        self.entries.remove(device);
    }

    /// Drops every cached list.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns cached clips or fetches and caches them.
    ///
    /// # Errors
    ///
    /// See [`fetch_clips`].
    pub async fn load(
        &mut self,
        directory: &dyn ClipDirectory,
        device: &DeviceId,
        from: i64,
        to: i64,
    ) -> Result<SortedClips, ErrorKind> {
        if let Some(clips) = self.cached(device, from, to) {
            tracing::trace!(device_id = %device, cache_hit = true, "Clip cache hit");
            return Ok(clips);
        }
        let clips = fetch_clips(directory, device, from, to, self.lookback_ms, self.timeout).await?;
        self.insert(device.clone(), from, to, clips.clone());
        Ok(clips)
    }
}
