//! Slot assignment and round-robin cursor advancement
//!
//! Both operations are pure: the same selection, cursor and grid size
//! always yield the same page.
//!
//! # Example
//!
//! ```
//! use citysight_core::models::{DeviceId, SelectionEntry, SelectionSet};
//! use citysight_core::pagination::{PageDirection, advance_cursor, assign_page};
//!
//! let selection = SelectionSet::from_entries(vec![
//!     SelectionEntry::new("a"),
//!     SelectionEntry::pinned("b", 0),
//!     SelectionEntry::new("c"),
//! ])
//! .unwrap();
//!
//! let page = assign_page(&selection, 0, 4);
//! assert_eq!(page.slot(0), Some(&DeviceId::from("b")));
//! assert_eq!(page.slot(1), Some(&DeviceId::from("a")));
//! assert_eq!(page.slot(2), Some(&DeviceId::from("c")));
//! assert_eq!(page.slot(3), None);
//!
//! // Two rotating devices fit on one page, so paging wraps to the start
//! let next = advance_cursor(&selection, &page, 0, PageDirection::Next);
//! assert_eq!(next, 0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::SelectionSet;

use super::page::PageAssignment;

/// Direction of a manual or automatic page flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageDirection {
    /// Forward in selection order
    Next,
    /// Backward in selection order
    Previous,
}

impl fmt::Display for PageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next => write!(f, "next"),
            Self::Previous => write!(f, "previous"),
        }
    }
}

/// Pins that are honored for `grid_size`, indexed like the selection.
///
/// A pin outside the grid, or a second claim on an already claimed slot,
/// is ignored and the entry rotates like any unpinned entry. The first
/// claim in selection order wins.
#[must_use]
pub fn effective_pins(selection: &SelectionSet, grid_size: u32) -> Vec<Option<u32>> {
    let mut claimed = vec![false; grid_size as usize];
    selection
        .iter()
        .map(|entry| match entry.pinned_slot {
            Some(slot) if slot < grid_size && !claimed[slot as usize] => {
                claimed[slot as usize] = true;
                Some(slot)
            }
            _ => None,
        })
        .collect()
}

/// Number of slots left for rotation once honored pins are placed.
#[must_use]
pub fn rotating_slot_count(selection: &SelectionSet, grid_size: u32) -> usize {
    let pinned = effective_pins(selection, grid_size)
        .iter()
        .filter(|p| p.is_some())
        .count();
    (grid_size as usize).saturating_sub(pinned)
}

/// Reduces `cursor` into `0..len`, or `0` for an empty selection.
#[must_use]
pub const fn normalize_cursor(cursor: usize, len: usize) -> usize {
    if len == 0 { 0 } else { cursor % len }
}

/// Selection indices visited by one circular scan starting at `start`.
fn circle_from(start: usize, len: usize) -> impl Iterator<Item = usize> {
    (0..len).map(move |step| (start + step) % len)
}

/// Maps the selection onto a page of `grid_size` slots.
///
/// Honored pins are placed first; the remaining slots are filled in slot
/// order with unpinned devices collected by one circular scan of the
/// selection starting at `cursor`.
#[must_use]
pub fn assign_page(selection: &SelectionSet, cursor: usize, grid_size: u32) -> PageAssignment {
    let mut slots = vec![None; grid_size as usize];
    if selection.is_empty() {
        return PageAssignment::new(slots);
    }

    let pins = effective_pins(selection, grid_size);
    for (entry, pin) in selection.iter().zip(&pins) {
        if let Some(slot) = pin {
            slots[*slot as usize] = Some(entry.device_id.clone());
        }
    }

    let need = slots.iter().filter(|s| s.is_none()).count();
    let start = normalize_cursor(cursor, selection.len());
    let mut rotation = circle_from(start, selection.len())
        .filter(|&i| pins[i].is_none())
        .take(need)
        .map(|i| selection.entries()[i].device_id.clone());

    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        match rotation.next() {
            Some(device) => *slot = Some(device),
            None => break,
        }
    }

    PageAssignment::new(slots)
}

/// Selection indices of the rotating (non-pinned) devices on `page`, in
/// slot order.
fn rotating_indices_on_page(
    selection: &SelectionSet,
    page: &PageAssignment,
    pins: &[Option<u32>],
) -> Vec<usize> {
    page.occupied()
        .filter_map(|(slot, device)| {
            let index = selection.position(device)?;
            (pins[index] != Some(slot as u32)).then_some(index)
        })
        .collect()
}

/// Computes the cursor from which the next (or previous) page is scanned.
///
/// `Next` resumes right after the last rotating device on the page, so
/// consecutive pages partition the circular selection order. `Previous`
/// walks backwards from the first rotating device far enough to fill the
/// rotating slots of one page. A page without rotating devices leaves the
/// cursor unchanged.
#[must_use]
pub fn advance_cursor(
    selection: &SelectionSet,
    page: &PageAssignment,
    cursor: usize,
    direction: PageDirection,
) -> usize {
    let len = selection.len();
    if len == 0 {
        return 0;
    }
    let grid_size = page.len() as u32;
    let pins = effective_pins(selection, grid_size);
    let on_page = rotating_indices_on_page(selection, page, &pins);

    let (Some(&first), Some(&last)) = (on_page.first(), on_page.last()) else {
        return normalize_cursor(cursor, len);
    };

    match direction {
        PageDirection::Next => circle_from(last + 1, len)
            .find(|&i| pins[i].is_none())
            .unwrap_or_else(|| normalize_cursor(cursor, len)),
        PageDirection::Previous => {
            let need = rotating_slot_count(selection, grid_size);
            (1..len)
                .map(|step| (first + len - step) % len)
                .filter(|&i| pins[i].is_none())
                .take(need)
                .last()
                .unwrap_or(first)
        }
    }
}
