//! Layout persistence backends

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, ConfigResult};
use crate::tracing::span_names;

use super::layout::LayoutConfig;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "CITYSIGHT_CONFIG_DIR";

/// File name of the persisted layout
pub const LAYOUT_FILE_NAME: &str = "layout.toml";

/// File name of the engine settings
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Resolves the config directory.
///
/// `CITYSIGHT_CONFIG_DIR` wins, then the platform config directory with a
/// `citysight` subdirectory.
///
/// # Errors
///
/// Returns `ConfigError::NoConfigDir` if neither is available.
pub fn default_config_dir() -> ConfigResult<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("citysight"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Where layouts are read from and written to.
pub trait LayoutStore: Send {
    /// Returns the stored layout, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored layout exists but cannot be read.
    fn read_layout(&self) -> ConfigResult<Option<LayoutConfig>>;

    /// Replaces the stored layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot be written.
    fn write_layout(&mut self, layout: &LayoutConfig) -> ConfigResult<()>;
}

/// Stores the layout as TOML in a config directory.
#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    config_dir: PathBuf,
}

impl FileLayoutStore {
    /// Creates a store rooted at `config_dir`.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Creates a store in [`default_config_dir`].
    ///
    /// # Errors
    ///
    /// Returns an error if no config directory can be determined.
    pub fn from_default_dir() -> ConfigResult<Self> {
        default_config_dir().map(Self::new)
    }

    /// Config directory of this store.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of the layout file.
    #[must_use]
    pub fn layout_path(&self) -> PathBuf {
        self.config_dir.join(LAYOUT_FILE_NAME)
    }

    /// Full path of the settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE_NAME)
    }
}

impl LayoutStore for FileLayoutStore {
    fn read_layout(&self) -> ConfigResult<Option<LayoutConfig>> {
        let path = self.layout_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        LayoutConfig::from_toml(&content, &path.display().to_string()).map(Some)
    }

    fn write_layout(&mut self, layout: &LayoutConfig) -> ConfigResult<()> {
        let _span = crate::trace_operation_debug!(span_names::LAYOUT_SAVE).entered();
        let content = layout.to_toml()?;
        std::fs::create_dir_all(&self.config_dir)?;

        // Atomic replace
        let path = self.layout_path();
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), "Layout saved");
        Ok(())
    }
}

/// In-memory store; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStore {
    layout: Arc<Mutex<Option<LayoutConfig>>>,
    fail_writes: bool,
}

impl MemoryLayoutStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `layout`.
    #[must_use]
    pub fn with_layout(layout: LayoutConfig) -> Self {
        Self {
            layout: Arc::new(Mutex::new(Some(layout))),
            fail_writes: false,
        }
    }

    /// Makes every write fail, for exercising persistence errors.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Last written layout.
    #[must_use]
    pub fn snapshot(&self) -> Option<LayoutConfig> {
        self.layout.lock().ok().and_then(|guard| guard.clone())
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn read_layout(&self) -> ConfigResult<Option<LayoutConfig>> {
        Ok(self.snapshot())
    }

    fn write_layout(&mut self, layout: &LayoutConfig) -> ConfigResult<()> {
        if self.fail_writes {
            return Err(ConfigError::Io(std::io::Error::other("layout store is read-only")));
        }
        let mut guard = self
            .layout
            .lock()
            .map_err(|_| ConfigError::Io(std::io::Error::other("layout store lock poisoned")))?;
        *guard = Some(layout.clone());
        Ok(())
    }
}
