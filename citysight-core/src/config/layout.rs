//! Persisted split-screen layout

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::models::{SelectionSet, SplitMode};

/// Current version of the layout format
pub const LAYOUT_VERSION: u32 = 1;

/// Everything the user arranged in the split screen.
///
/// Written after every user edit of the selection, pins, split mode or
/// autoplay settings. Clock position and leader are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Format version
    pub version: u32,
    /// When the layout was last written
    pub saved_at: DateTime<Utc>,
    /// Grid size
    #[serde(default)]
    pub split_mode: SplitMode,
    /// Whether pages rotate automatically
    #[serde(default)]
    pub autoplay: bool,
    /// Seconds between automatic page flips
    #[serde(default = "default_autoplay_in_seconds")]
    pub autoplay_in_seconds: u32,
    /// Selected devices in rotation order
    #[serde(default)]
    pub selection: SelectionSet,
}

const fn default_autoplay_in_seconds() -> u32 {
    30
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            version: LAYOUT_VERSION,
            saved_at: Utc::now(),
            split_mode: SplitMode::default(),
            autoplay: false,
            autoplay_in_seconds: default_autoplay_in_seconds(),
            selection: SelectionSet::default(),
        }
    }
}

impl LayoutConfig {
    /// Creates a layout for `selection` in `split_mode` with autoplay off.
    #[must_use]
    pub fn new(selection: SelectionSet, split_mode: SplitMode) -> Self {
        Self {
            selection,
            split_mode,
            ..Self::default()
        }
    }

    /// Updates the `saved_at` timestamp.
    pub fn touch(&mut self) {
        self.saved_at = Utc::now();
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Parses TOML, rejecting layouts written by a newer format.
    ///
    /// `source` names the input in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML, duplicate devices or an
    /// unsupported version.
    pub fn from_toml(content: &str, source: &str) -> ConfigResult<Self> {
        let layout: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        if layout.version > LAYOUT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                expected: LAYOUT_VERSION,
                actual: layout.version,
            });
        }
        Ok(layout)
    }
}
