//! Recorded footage lookup
//!
//! Footage for one device is a sequence of disjoint clips. This module
//! fetches clip lists from the external directory, keeps them sorted and
//! cached per device, and answers the two questions playback needs: which
//! clip covers a time, and where the next clip starts.

mod directory;
mod store;

pub use directory::{ClipCatalog, ClipDirectory, InMemoryClipDirectory, JsonClipDirectory};
pub use store::{
    ClipStore, DEFAULT_FETCH_TIMEOUT, LOOKBACK_MARGIN_MS, SortedClips, closest_clip_index,
    fetch_clips, next_boundary_after,
};
