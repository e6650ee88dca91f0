//! Synchronized playback across tiles
//!
//! Tiles play recorded footage independently, yet must stay on one shared
//! timeline. One tile is elected leader and its media progress drives the
//! [`PlaybackClock`]; every other tile follows the clock and reseeks when
//! it drifts.
//!
//! # Architecture
//!
//! - **Surfaces**: host media elements behind [`PlaybackSurface`]
//! - **Controllers**: one [`TileSyncController`] per visible tile, a pure
//!   state machine returning [`TileEffect`]s
//! - **Election**: [`elect`] picks the leader from published statuses
//! - **Clock**: [`PlaybackClock`] accepts progress from the leader only
//!
//! # Module Structure
//!
//! - `surface` - Surface trait, events and recorded commands
//! - `status` - Published tile status and role
//! - `tile` - Tile state machine
//! - `leader` - Leader election
//! - `clock` - Shared clock

mod clock;
mod leader;
mod status;
mod surface;
mod tile;

pub use clock::PlaybackClock;
pub use leader::elect;
pub use status::{TileRole, TileStatus};
pub use surface::{PlaybackSurface, SurfaceCommand, SurfaceEvent, SurfaceFactory};
pub use tile::{
    TileContext, TileEffect, TileState, TileSyncController, TileThresholds, WaitReason,
};
