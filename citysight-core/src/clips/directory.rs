//! Clip directory boundary
//!
//! The clip directory is the external service that knows which recorded
//! clips exist for a device. The engine only consumes it through the
//! [`ClipDirectory`] trait.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DirectoryError};
use crate::models::{DeviceId, VideoClip};

/// Answers "which clips exist for this device in this window".
///
/// Results may arrive in any order; callers sort them.
#[async_trait]
pub trait ClipDirectory: Send + Sync {
    /// Returns clips overlapping `[from_ms, to_ms]`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the device is unknown, `Unavailable` for anything else.
    async fn get_clips(
        &self,
        device: &DeviceId,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<VideoClip>, DirectoryError>;
}

/// Serialized clip catalogue, keyed by device.
///
/// ```json
/// { "devices": { "cam-1": [ { "start_ms": 0, "duration_ms": 60000, "locator": "..." } ] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipCatalog {
    /// Clips per device
    #[serde(default)]
    pub devices: HashMap<DeviceId, Vec<VideoClip>>,
}

impl ClipCatalog {
    /// Clips of `device` overlapping `[from_ms, to_ms]`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::NotFound` if the device has no entry.
    pub fn clips_in_window(
        &self,
        device: &DeviceId,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<VideoClip>, DirectoryError> {
        let clips = self
            .devices
            .get(device)
            .ok_or_else(|| DirectoryError::NotFound(device.clone()))?;

        Ok(clips
            .iter()
            .filter(|clip| clip.end_ms() > from_ms && clip.start_ms <= to_ms)
            .cloned()
            .collect())
    }
}

/// Directory backed by an in-memory catalogue.
///
/// Devices can be marked unavailable to exercise transient failures.
#[derive(Debug, Default)]
pub struct InMemoryClipDirectory {
    catalog: ClipCatalog,
    unavailable: HashSet<DeviceId>,
    fetch_count: AtomicUsize,
}

impl InMemoryClipDirectory {
    /// Creates an empty directory (every device is unknown).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers clips for a device (appending to any existing ones).
    #[must_use]
    pub fn with_clips(mut self, device: impl Into<DeviceId>, clips: Vec<VideoClip>) -> Self {
        self.catalog
            .devices
            .entry(device.into())
            .or_default()
            .extend(clips);
        self
    }

    /// Makes every query for `device` fail as unavailable.
    #[must_use]
    pub fn with_unavailable(mut self, device: impl Into<DeviceId>) -> Self {
        self.unavailable.insert(device.into());
        self
    }

    /// Number of queries answered so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipDirectory for InMemoryClipDirectory {
    async fn get_clips(
        &self,
        device: &DeviceId,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<VideoClip>, DirectoryError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.contains(device) {
            return Err(DirectoryError::Unavailable(format!(
                "directory offline for {device}"
            )));
        }

        self.catalog.clips_in_window(device, from_ms, to_ms)
    }
}

/// Directory backed by a JSON catalogue file, re-read on every query so
/// edits to the file show up on the next fetch.
#[derive(Debug, Clone)]
pub struct JsonClipDirectory {
    path: PathBuf,
}

impl JsonClipDirectory {
    /// Creates a directory reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a directory after checking that `path` holds a valid
    /// catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str::<ClipCatalog>(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { path })
    }
}

#[async_trait]
impl ClipDirectory for JsonClipDirectory {
    async fn get_clips(
        &self,
        device: &DeviceId,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<VideoClip>, DirectoryError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DirectoryError::Unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let catalog: ClipCatalog = serde_json::from_str(&content).map_err(|e| {
            DirectoryError::Unavailable(format!("malformed catalogue {}: {e}", self.path.display()))
        })?;
        catalog.clips_in_window(device, from_ms, to_ms)
    }
}
