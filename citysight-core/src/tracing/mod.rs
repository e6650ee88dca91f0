//! Tracing setup for structured logging
//!
//! The engine logs through the `tracing` macros everywhere; this module
//! installs the `tracing-subscriber` stack once per process and defines the
//! span names shared by the session, the clip store and the CLI.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Set once the global subscriber is installed
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum TracingError {
    /// The subscriber could not be installed
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// The filter directive did not parse
    #[error("Invalid filter directive: {0}")]
    InvalidFilter(String),

    /// Tracing was already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// The log file could not be created
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Verbosity of the engine's own targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Lifecycle events: page flips, leader changes, notices
    #[default]
    Info,
    /// Per-tile decisions
    Debug,
    /// Every surface callback
    Trace,
}

impl TracingLevel {
    /// Converts to the `tracing` level
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Maps a `-v` count onto a level (`0` keeps warnings only).
    #[must_use]
    pub const fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard output
    Stdout,
    /// Standard error
    #[default]
    Stderr,
    /// A log file, truncated on start
    File(PathBuf),
}

/// Subscriber configuration
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Level for the `citysight_*` targets
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Prefix lines with the thread id
    pub thread_ids: bool,
    /// Custom `EnvFilter` directive, overrides `level`
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates the default configuration (info, stderr)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables thread ids
    #[must_use]
    pub const fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Sets a custom filter directive
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Builds the `EnvFilter` for this configuration.
    ///
    /// # Errors
    ///
    /// Returns `TracingError::InvalidFilter` for a malformed custom filter.
    pub fn env_filter(&self) -> TracingResult<EnvFilter> {
        match &self.filter {
            Some(custom) => {
                EnvFilter::try_new(custom).map_err(|e| TracingError::InvalidFilter(e.to_string()))
            }
            None => Ok(EnvFilter::new(format!(
                "warn,citysight_core={level},citysight_cli={level}",
                level = self.level
            ))),
        }
    }
}

/// Installs the global subscriber.
///
/// Call once at startup; later calls fail with `AlreadyInitialized`.
///
/// # Errors
///
/// Returns an error if tracing is already initialized, the filter is
/// invalid, the log file cannot be created, or another subscriber is
/// already installed.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let installed = install(config);
    if installed.is_err() {
        TRACING_INITIALIZED.store(false, Ordering::SeqCst);
        return installed;
    }

    tracing::debug!(level = %config.level, output = ?config.output, "Tracing initialized");
    Ok(())
}

fn install(config: &TracingConfig) -> TracingResult<()> {
    let filter = config.env_filter()?;
    let (writer, ansi) = match &config.output {
        TracingOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        TracingOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        TracingOutput::File(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| TracingError::FileCreationFailed(format!("{}: {e}", path.display())))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(config.thread_ids)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))
}

/// Creates an info-level span with one of the [`span_names`].
///
/// ```ignore
/// let span = trace_operation!(span_names::PAGE_ASSIGN, cursor = cursor);
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        ::tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        ::tracing::info_span!($name, $($field)*)
    };
}

/// Debug-level variant of `trace_operation!`.
#[macro_export]
macro_rules! trace_operation_debug {
    ($name:expr) => {
        ::tracing::debug_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        ::tracing::debug_span!($name, $($field)*)
    };
}

/// Span names
pub mod span_names {
    /// Session runtime lifetime
    pub const SESSION: &str = "session";
    /// Clip directory query
    pub const CLIP_FETCH: &str = "clips.fetch";
    /// Page assignment after a layout change
    pub const PAGE_ASSIGN: &str = "page.assign";
    /// Layout load
    pub const LAYOUT_LOAD: &str = "layout.load";
    /// Layout save
    pub const LAYOUT_SAVE: &str = "layout.save";
    /// Simulation run
    pub const SIMULATION: &str = "simulation.run";
}
