//! Property tests for clip lookup

use citysight_core::clips::{ClipStore, SortedClips, closest_clip_index, next_boundary_after};
use citysight_core::models::{DeviceId, VideoClip};
use proptest::prelude::*;

/// Disjoint clips built from (gap, duration) pairs, then shuffled.
fn clips_strategy() -> impl Strategy<Value = Vec<VideoClip>> {
    proptest::collection::vec((0i64..10_000, 1i64..10_000), 1..30)
        .prop_map(|spans| {
            let mut start = 0;
            spans
                .into_iter()
                .enumerate()
                .map(|(i, (gap, duration))| {
                    start += gap;
                    let clip = VideoClip::new(start, duration, format!("clip-{i}"));
                    start += duration;
                    clip
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: sorting orders clips by start time and keeps them all
    #[test]
    fn sorted_clips_are_ordered(clips in clips_strategy()) {
        let sorted = SortedClips::from_unsorted(clips.clone());
        prop_assert_eq!(sorted.len(), clips.len());
        prop_assert!(sorted.as_slice().windows(2).all(|w| w[0].start_ms < w[1].start_ms));
    }

    /// Property: the closest clip is the last one starting at or before t
    #[test]
    fn closest_clip_starts_at_or_before_t(
        clips in clips_strategy(),
        t in -1_000i64..600_000,
    ) {
        let sorted = SortedClips::from_unsorted(clips);
        let slice = sorted.as_slice();
        match closest_clip_index(slice, t) {
            Some(index) => {
                prop_assert!(slice[index].start_ms <= t);
                if let Some(next) = slice.get(index + 1) {
                    prop_assert!(next.start_ms > t);
                }
            }
            None => prop_assert!(slice.iter().all(|clip| clip.start_ms > t)),
        }
    }

    /// Property: the next boundary is after the current clip's end
    #[test]
    fn next_boundary_follows_current_clip(clips in clips_strategy(), pick in any::<prop::sample::Index>()) {
        let sorted = SortedClips::from_unsorted(clips);
        let slice = sorted.as_slice();
        let index = pick.index(slice.len());
        match next_boundary_after(slice, index) {
            Some(boundary) => prop_assert!(boundary >= slice[index].end_ms()),
            None => prop_assert_eq!(index, slice.len() - 1),
        }
    }

    /// Property: the cache answers windows inside the loaded one only
    #[test]
    fn cache_answers_covered_windows(
        clips in clips_strategy(),
        from in 0i64..1_000,
        to in 1_000i64..2_000,
        shrink in 0i64..500,
    ) {
        let mut store = ClipStore::default();
        let device = DeviceId::from("cam");
        let sorted = SortedClips::from_unsorted(clips);
        store.insert(device.clone(), from, to, sorted.clone());

        prop_assert_eq!(store.cached(&device, from + shrink, to - shrink), Some(sorted));
        prop_assert_eq!(store.cached(&device, from, to + 1), None);
        prop_assert_eq!(store.cached(&device, from - 1, to), None);
    }
}

#[test]
fn gap_example_resolves_closest_and_boundary() {
    let clips = SortedClips::from_unsorted(vec![
        VideoClip::new(5000, 1000, "b"),
        VideoClip::new(0, 1000, "a"),
    ]);
    let index = clips.closest_index(2000);
    assert_eq!(index, Some(0));
    assert_eq!(clips.next_boundary_after(0), Some(5000));
}
