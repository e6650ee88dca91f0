//! `CitySight` Core Library
//!
//! Engine of a split-screen surveillance viewer: it decides which cameras
//! occupy which tiles of a 1/4/9/16 grid, rotates through selections larger
//! than the grid, and keeps recorded footage of every visible tile in step
//! on one shared clock.
//!
//! # Crate Structure
//!
//! - [`models`] - Device ids, selection with pins, split modes, clips
//! - [`pagination`] - Deterministic page assignment and cursor rotation
//! - [`clips`] - Clip directory boundary, sorted clip lists, per-device cache
//! - [`playback`] - Tile controllers, leader election, the shared clock
//! - [`autoplay`] - Automatic page rotation rules and the ticker
//! - [`live`] - Live-stream tiles (no clock)
//! - [`session`] - The event-driven split-screen session
//! - [`runtime`] - Tokio host running a session behind a queue
//! - [`simulation`] - Virtual-time host for tests and the CLI
//! - [`config`] - Engine settings and layout persistence
//! - [`tracing`] - Subscriber setup and span names

#![warn(missing_docs)]

pub mod autoplay;
pub mod clips;
pub mod config;
pub mod error;
pub mod live;
pub mod models;
pub mod pagination;
pub mod playback;
pub mod runtime;
pub mod session;
pub mod simulation;
pub mod tracing;

// =============================================================================
// Convenience re-exports
//
// Flat re-exports for embedding hosts and the test suites. The CLI imports
// through module paths.
// =============================================================================

pub use autoplay::{AutoplayBlock, AutoplayTimer, rotation_block};
pub use clips::{
    ClipCatalog, ClipDirectory, ClipStore, InMemoryClipDirectory, JsonClipDirectory, SortedClips,
    fetch_clips,
};
pub use config::{
    EngineSettings, FileLayoutStore, LAYOUT_VERSION, LayoutConfig, LayoutStore, MemoryLayoutStore,
};
pub use error::{
    CitySightError, CitySightResult, ClockError, ConfigError, ConfigResult, DirectoryError,
    ErrorKind, LayoutError, LayoutResult, LiveError, RuntimeError,
};
pub use live::{LiveStreamSource, LiveTile, StaticLiveSource};
pub use models::{DeviceId, SelectionEntry, SelectionSet, SplitMode, VideoClip};
pub use pagination::{PageAssignment, PageDirection, advance_cursor, assign_page};
pub use playback::{
    PlaybackClock, PlaybackSurface, SurfaceEvent, SurfaceFactory, TileRole, TileState, TileStatus,
    TileSyncController,
};
pub use runtime::{RuntimeHandle, SessionRuntime, SessionSender};
pub use session::{
    SessionEffect, SessionEvent, SessionMode, SessionNotice, SurveillanceSession, TileSnapshot,
    UserCommand,
};
pub use simulation::{SimulatedSurface, SimulatedSurfaceFactory, Simulator};
pub use tracing::{TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing};
