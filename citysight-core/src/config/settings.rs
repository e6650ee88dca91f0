//! Engine tuning settings (stored in `settings.toml`)

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::playback::TileThresholds;

/// Tunables shared by every session.
///
/// Missing keys fall back to their defaults, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Gaps shorter than this are skipped without waiting (default: 1000)
    #[serde(default = "default_gap_threshold_ms")]
    pub gap_threshold_ms: i64,
    /// Follower drift that triggers a reseek (default: 1000)
    #[serde(default = "default_drift_threshold_ms")]
    pub drift_threshold_ms: i64,
    /// How far before the range start clip queries reach (default: one hour)
    #[serde(default = "default_lookback_ms")]
    pub lookback_ms: i64,
    /// Bound on one clip directory query in seconds (1–120, default: 10)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u32,
    /// Autoplay interval for layouts that never set one (default: 30)
    #[serde(default = "default_autoplay_secs")]
    pub default_autoplay_secs: u32,
}

const fn default_gap_threshold_ms() -> i64 {
    1000
}

const fn default_drift_threshold_ms() -> i64 {
    1000
}

const fn default_lookback_ms() -> i64 {
    crate::clips::LOOKBACK_MARGIN_MS
}

const fn default_fetch_timeout_secs() -> u32 {
    10
}

const fn default_autoplay_secs() -> u32 {
    30
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gap_threshold_ms: default_gap_threshold_ms(),
            drift_threshold_ms: default_drift_threshold_ms(),
            lookback_ms: default_lookback_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            default_autoplay_secs: default_autoplay_secs(),
        }
    }
}

impl EngineSettings {
    /// Gap threshold clamped to 0–60 000 ms.
    #[must_use]
    pub const fn effective_gap_threshold_ms(&self) -> i64 {
        clamp_i64(self.gap_threshold_ms, 0, 60_000)
    }

    /// Drift threshold clamped to 100–60 000 ms.
    #[must_use]
    pub const fn effective_drift_threshold_ms(&self) -> i64 {
        clamp_i64(self.drift_threshold_ms, 100, 60_000)
    }

    /// Lookback margin clamped to 0–24 h.
    #[must_use]
    pub const fn effective_lookback_ms(&self) -> i64 {
        clamp_i64(self.lookback_ms, 0, 24 * 60 * 60 * 1000)
    }

    /// Fetch timeout clamped to 1–120 s.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.fetch_timeout_secs.clamp(1, 120)))
    }

    /// Thresholds handed to tile controllers.
    #[must_use]
    pub const fn thresholds(&self) -> TileThresholds {
        TileThresholds {
            gap_ms: self.effective_gap_threshold_ms(),
            drift_ms: self.effective_drift_threshold_ms(),
        }
    }

    /// Loads settings from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Writes settings to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

const fn clamp_i64(value: i64, min: i64, max: i64) -> i64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
