//! Ordered camera selection with optional slot pins
//!
//! The order of entries is the round-robin order used to fill unpinned
//! slots, so every editing operation preserves the relative order of the
//! remaining entries.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};

use super::device::DeviceId;

/// One selected device, optionally pinned to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Selected device
    pub device_id: DeviceId,
    /// Slot this device is fixed to (exempt from rotation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_slot: Option<u32>,
}

impl SelectionEntry {
    /// Creates an unpinned entry.
    #[must_use]
    pub fn new(device_id: impl Into<DeviceId>) -> Self {
        Self {
            device_id: device_id.into(),
            pinned_slot: None,
        }
    }

    /// Creates an entry pinned to `slot`.
    #[must_use]
    pub fn pinned(device_id: impl Into<DeviceId>, slot: u32) -> Self {
        Self {
            device_id: device_id.into(),
            pinned_slot: Some(slot),
        }
    }

    /// Returns true if the entry carries a pin.
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned_slot.is_some()
    }
}

/// Ordered, duplicate-free list of selected devices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SelectionEntry>", into = "Vec<SelectionEntry>")]
pub struct SelectionSet {
    entries: Vec<SelectionEntry>,
}

impl SelectionSet {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a selection from entries, rejecting duplicate devices.
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::DuplicateDevice` for the first repeated device.
    pub fn from_entries(entries: Vec<SelectionEntry>) -> LayoutResult<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(&entry.device_id) {
                return Err(LayoutError::DuplicateDevice(entry.device_id.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Builds an unpinned selection from device IDs.
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::DuplicateDevice` for the first repeated device.
    pub fn from_devices<I, D>(devices: I) -> LayoutResult<Self>
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceId>,
    {
        Self::from_entries(devices.into_iter().map(SelectionEntry::new).collect())
    }

    /// Number of selected devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in round-robin order.
    #[must_use]
    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    /// Iterates entries in round-robin order.
    pub fn iter(&self) -> std::slice::Iter<'_, SelectionEntry> {
        self.entries.iter()
    }

    /// Entry at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SelectionEntry> {
        self.entries.get(index)
    }

    /// Position of `device` in the selection.
    #[must_use]
    pub fn position(&self, device: &DeviceId) -> Option<usize> {
        self.entries.iter().position(|e| &e.device_id == device)
    }

    /// Returns true if `device` is selected.
    #[must_use]
    pub fn contains(&self, device: &DeviceId) -> bool {
        self.position(device).is_some()
    }

    /// Number of entries carrying a pin (valid for the grid or not).
    #[must_use]
    pub fn pinned_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pinned()).count()
    }

    /// Appends a device at the end of the round-robin order.
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::DuplicateDevice` if the device is already selected.
    pub fn add(&mut self, device: DeviceId) -> LayoutResult<()> {
        if self.contains(&device) {
            return Err(LayoutError::DuplicateDevice(device));
        }
        self.entries.push(SelectionEntry::new(device));
        Ok(())
    }

    /// Removes a device, returning the index it occupied.
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::DeviceNotSelected` if the device is not selected.
    pub fn remove(&mut self, device: &DeviceId) -> LayoutResult<usize> {
        let index = self
            .position(device)
            .ok_or_else(|| LayoutError::DeviceNotSelected(device.clone()))?;
        self.entries.remove(index);
        Ok(index)
    }

    /// Pins `device` to `slot`.
    ///
    /// A device already pinned to the same slot loses its pin and is
    /// returned so the caller can report it.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not selected or the slot is
    /// outside the grid.
    pub fn pin(
        &mut self,
        device: &DeviceId,
        slot: u32,
        grid_size: u32,
    ) -> LayoutResult<Option<DeviceId>> {
        if slot >= grid_size {
            return Err(LayoutError::SlotOutOfRange { slot, grid_size });
        }
        let index = self
            .position(device)
            .ok_or_else(|| LayoutError::DeviceNotSelected(device.clone()))?;

        let mut displaced = None;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i != index && entry.pinned_slot == Some(slot) {
                entry.pinned_slot = None;
                displaced = Some(entry.device_id.clone());
            }
        }
        self.entries[index].pinned_slot = Some(slot);
        Ok(displaced)
    }

    /// Clears the pin on `device`. Returns true if a pin was removed.
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::DeviceNotSelected` if the device is not selected.
    pub fn unpin(&mut self, device: &DeviceId) -> LayoutResult<bool> {
        let index = self
            .position(device)
            .ok_or_else(|| LayoutError::DeviceNotSelected(device.clone()))?;
        Ok(self.entries[index].pinned_slot.take().is_some())
    }

    /// Clears every pin at or beyond `grid_size`, returning affected devices.
    pub fn clear_pins_outside(&mut self, grid_size: u32) -> Vec<DeviceId> {
        self.entries
            .iter_mut()
            .filter(|e| e.pinned_slot.is_some_and(|slot| slot >= grid_size))
            .map(|e| {
                e.pinned_slot = None;
                e.device_id.clone()
            })
            .collect()
    }
}

impl TryFrom<Vec<SelectionEntry>> for SelectionSet {
    type Error = LayoutError;

    fn try_from(entries: Vec<SelectionEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<SelectionSet> for Vec<SelectionEntry> {
    fn from(selection: SelectionSet) -> Self {
        selection.entries
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a SelectionEntry;
    type IntoIter = std::slice::Iter<'a, SelectionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
