//! Concrete slot → device assignment for one page

use serde::{Deserialize, Serialize};

use crate::models::DeviceId;

/// Fixed-size array of slots, each holding at most one device.
///
/// A slot is `None` only when the selection has fewer usable devices than
/// the grid has slots. No device appears in more than one slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageAssignment {
    slots: Vec<Option<DeviceId>>,
}

impl PageAssignment {
    /// Wraps a slot array.
    #[must_use]
    pub const fn new(slots: Vec<Option<DeviceId>>) -> Self {
        Self { slots }
    }

    /// An all-empty page of `grid_size` slots.
    #[must_use]
    pub fn empty(grid_size: u32) -> Self {
        Self {
            slots: vec![None; grid_size as usize],
        }
    }

    /// Number of slots (the grid size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the page has no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot contents in slot order.
    #[must_use]
    pub fn slots(&self) -> &[Option<DeviceId>] {
        &self.slots
    }

    /// Device in `slot`, if any.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<&DeviceId> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots as `(slot, device)` pairs in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &DeviceId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, device)| device.as_ref().map(|d| (slot, d)))
    }

    /// Devices on the page in slot order.
    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.occupied().map(|(_, d)| d.clone()).collect()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Slot holding `device`, if it is on the page.
    #[must_use]
    pub fn slot_of(&self, device: &DeviceId) -> Option<usize> {
        self.slots.iter().position(|s| s.as_ref() == Some(device))
    }

    /// Returns true if `device` is on the page.
    #[must_use]
    pub fn contains(&self, device: &DeviceId) -> bool {
        self.slot_of(device).is_some()
    }

    /// Devices on this page that are absent from `other`.
    #[must_use]
    pub fn devices_not_in(&self, other: &Self) -> Vec<DeviceId> {
        self.occupied()
            .filter(|(_, d)| !other.contains(d))
            .map(|(_, d)| d.clone())
            .collect()
    }
}
