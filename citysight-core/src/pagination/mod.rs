//! Slot pagination for the split-screen grid
//!
//! This module maps an ordered camera selection onto the fixed slots of a
//! page and computes where the round-robin scan resumes when the user (or
//! autoplay) flips pages.
//!
//! # Architecture
//!
//! - **Pinned slots**: a pin fixes a device to one slot and exempts it from rotation
//! - **Round-robin fill**: remaining slots take unpinned devices in selection order
//! - **Cursor**: the selection index where the next scan starts
//!
//! # Module Structure
//!
//! - `page` - Slot assignment type (`PageAssignment`)
//! - `engine` - Pure assignment and cursor functions

mod engine;
mod page;

pub use engine::{
    PageDirection, advance_cursor, assign_page, effective_pins, normalize_cursor,
    rotating_slot_count,
};
pub use page::PageAssignment;
