//! Core data structures for `CitySight`
//!
//! Identity and layout types shared by the pagination engine, the clip
//! store and the session.

mod clip;
mod device;
mod selection;
mod split_mode;

pub use clip::VideoClip;
pub use device::DeviceId;
pub use selection::{SelectionEntry, SelectionSet};
pub use split_mode::SplitMode;
