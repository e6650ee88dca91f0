//! Property tests for page assignment and cursor rotation

use std::collections::HashSet;

use citysight_core::models::{DeviceId, SelectionEntry, SelectionSet, SplitMode};
use citysight_core::pagination::{
    PageDirection, advance_cursor, assign_page, effective_pins, rotating_slot_count,
};
use proptest::prelude::*;

// ============================================================================
// Test Strategies
// ============================================================================

fn split_mode_strategy() -> impl Strategy<Value = SplitMode> {
    prop_oneof![
        Just(SplitMode::One),
        Just(SplitMode::Four),
        Just(SplitMode::Nine),
        Just(SplitMode::Sixteen),
    ]
}

/// Selections of up to 40 devices; roughly one in four carries a pin,
/// some of them outside smaller grids or colliding with each other.
fn selection_strategy() -> impl Strategy<Value = SelectionSet> {
    proptest::collection::vec(prop::option::weighted(0.25, 0u32..16), 0..40).prop_map(|pins| {
        let entries = pins
            .into_iter()
            .enumerate()
            .map(|(i, pin)| SelectionEntry {
                device_id: DeviceId::new(format!("cam-{i:02}")),
                pinned_slot: pin,
            })
            .collect();
        SelectionSet::from_entries(entries).unwrap()
    })
}

fn rotating_devices(selection: &SelectionSet, grid_size: u32) -> HashSet<DeviceId> {
    let pins = effective_pins(selection, grid_size);
    selection
        .iter()
        .zip(pins)
        .filter(|(_, pin)| pin.is_none())
        .map(|(entry, _)| entry.device_id.clone())
        .collect()
}

// ============================================================================
// Assignment
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the same inputs always yield the same page
    #[test]
    fn assignment_is_deterministic(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
    ) {
        let first = assign_page(&selection, cursor, mode.grid_size());
        let second = assign_page(&selection, cursor, mode.grid_size());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), mode.grid_size() as usize);
    }

    /// Property: every honored pin sits in its slot on every page
    #[test]
    fn honored_pins_hold_their_slot(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
    ) {
        let grid_size = mode.grid_size();
        let page = assign_page(&selection, cursor, grid_size);
        for (entry, pin) in selection.iter().zip(effective_pins(&selection, grid_size)) {
            if let Some(slot) = pin {
                prop_assert_eq!(page.slot(slot as usize), Some(&entry.device_id));
            }
        }
    }

    /// Property: no device appears in two slots
    #[test]
    fn no_device_is_shown_twice(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
    ) {
        let page = assign_page(&selection, cursor, mode.grid_size());
        let devices = page.device_ids();
        let unique: HashSet<_> = devices.iter().collect();
        prop_assert_eq!(unique.len(), devices.len());
    }

    /// Property: a page is only left with empty slots when the selection
    /// has no more rotating devices to offer
    #[test]
    fn empty_slots_only_when_selection_is_exhausted(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
    ) {
        let grid_size = mode.grid_size();
        let page = assign_page(&selection, cursor, grid_size);
        let rotating = rotating_devices(&selection, grid_size).len();
        let need = rotating_slot_count(&selection, grid_size);
        prop_assert_eq!(page.len() - page.occupied_count(), need.saturating_sub(rotating));
    }
}

// ============================================================================
// Rotation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: paging forward shows every rotating device within
    /// ceil(rotating / need) pages
    #[test]
    fn round_robin_covers_every_device(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
    ) {
        let grid_size = mode.grid_size();
        let need = rotating_slot_count(&selection, grid_size);
        let rotating = rotating_devices(&selection, grid_size);
        prop_assume!(need > 0 && !rotating.is_empty());

        let pages = rotating.len().div_ceil(need);
        let mut seen = HashSet::new();
        let mut cursor = cursor;
        for _ in 0..pages {
            let page = assign_page(&selection, cursor, grid_size);
            seen.extend(page.device_ids());
            cursor = advance_cursor(&selection, &page, cursor, PageDirection::Next);
        }
        prop_assert!(rotating.is_subset(&seen));
    }

    /// Property: Previous undoes Next when the selection overflows the page
    #[test]
    fn previous_undoes_next(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
    ) {
        let grid_size = mode.grid_size();
        let need = rotating_slot_count(&selection, grid_size);
        prop_assume!(need > 0 && rotating_devices(&selection, grid_size).len() > need);

        let page = assign_page(&selection, cursor, grid_size);
        let next = advance_cursor(&selection, &page, cursor, PageDirection::Next);
        let next_page = assign_page(&selection, next, grid_size);
        let back = advance_cursor(&selection, &next_page, next, PageDirection::Previous);
        prop_assert_eq!(assign_page(&selection, back, grid_size), page);
    }

    /// Property: the advanced cursor is always a valid selection index
    #[test]
    fn advanced_cursor_stays_in_range(
        selection in selection_strategy(),
        cursor in 0usize..64,
        mode in split_mode_strategy(),
        forward in any::<bool>(),
    ) {
        let page = assign_page(&selection, cursor, mode.grid_size());
        let direction = if forward { PageDirection::Next } else { PageDirection::Previous };
        let advanced = advance_cursor(&selection, &page, cursor, direction);
        prop_assert!(advanced < selection.len().max(1));
    }
}

// ============================================================================
// Examples
// ============================================================================

#[test]
fn pinned_device_takes_slot_zero() {
    let selection = SelectionSet::from_entries(vec![
        SelectionEntry::new("A"),
        SelectionEntry::pinned("B", 0),
        SelectionEntry::new("C"),
    ])
    .unwrap();
    let page = assign_page(&selection, 0, 4);
    let slots: Vec<Option<&str>> = page
        .slots()
        .iter()
        .map(|slot| slot.as_ref().map(DeviceId::as_str))
        .collect();
    assert_eq!(slots, vec![Some("B"), Some("A"), Some("C"), None]);
}
