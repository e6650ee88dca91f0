//! Property tests for autoplay eligibility

use citysight_core::autoplay::{
    AutoplayBlock, AutoplayTimer, MAX_AUTOPLAY_SECS, MIN_AUTOPLAY_SECS, rotation_block,
};
use citysight_core::models::{SelectionSet, SplitMode};
use proptest::prelude::*;

fn split_mode_strategy() -> impl Strategy<Value = SplitMode> {
    prop::sample::select(SplitMode::ALL.to_vec())
}

fn selection(count: usize) -> SelectionSet {
    SelectionSet::from_devices((0..count).map(|i| format!("cam-{i}"))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: autoplay cannot be enabled while the selection fits the grid
    #[test]
    fn fitting_selection_blocks_autoplay(mode in split_mode_strategy(), count in 0usize..=16) {
        let grid_size = mode.grid_size();
        prop_assume!(count <= grid_size as usize);
        let selection = selection(count);

        let mut timer = AutoplayTimer::default();
        let refused = timer.set_enabled(true, &selection, grid_size);
        prop_assert_eq!(refused, Some(AutoplayBlock::SelectionFitsGrid));
        prop_assert!(!timer.is_enabled());
        prop_assert!(!timer.should_advance(false));
    }

    /// Property: an overflowing unpinned selection always allows autoplay
    #[test]
    fn overflowing_selection_allows_autoplay(mode in split_mode_strategy(), extra in 1usize..20) {
        let grid_size = mode.grid_size();
        let selection = selection(grid_size as usize + extra);

        prop_assert_eq!(rotation_block(&selection, grid_size), None);
        let mut timer = AutoplayTimer::default();
        prop_assert_eq!(timer.set_enabled(true, &selection, grid_size), None);
        prop_assert!(timer.should_advance(false));
        prop_assert!(!timer.should_advance(true));
    }

    /// Property: the effective interval is always within bounds
    #[test]
    fn interval_is_clamped(secs in any::<u32>()) {
        let timer = AutoplayTimer::new(true, secs);
        let effective = timer.effective_interval_secs();
        prop_assert!((MIN_AUTOPLAY_SECS..=MAX_AUTOPLAY_SECS).contains(&effective));
        prop_assert_eq!(timer.interval().as_secs(), u64::from(effective));
    }

    /// Property: shrinking the selection into the grid switches autoplay off
    #[test]
    fn enforce_disables_when_selection_shrinks(mode in split_mode_strategy(), count in 0usize..=16) {
        let grid_size = mode.grid_size();
        prop_assume!(count <= grid_size as usize);

        let mut timer = AutoplayTimer::new(true, 30);
        prop_assert_eq!(
            timer.enforce(&selection(count), grid_size),
            Some(AutoplayBlock::SelectionFitsGrid)
        );
        prop_assert!(!timer.is_enabled());
        prop_assert_eq!(timer.enforce(&selection(count), grid_size), None);
    }
}
