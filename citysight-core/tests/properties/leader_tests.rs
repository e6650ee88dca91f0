//! Property tests for leader election

use std::collections::HashMap;

use citysight_core::models::DeviceId;
use citysight_core::playback::{TileStatus, elect};
use proptest::prelude::*;

// ============================================================================
// Test Strategies
// ============================================================================

fn status_strategy() -> impl Strategy<Value = TileStatus> {
    (
        any::<bool>(),
        prop::option::weighted(0.2, 0i64..100_000),
        prop::option::weighted(0.6, 0i64..100_000),
    )
        .prop_map(|(can_play, seeking, next_clip)| TileStatus {
            can_play,
            error_kind: None,
            changing_start_time_ms: seeking,
            next_clip_start_ms: next_clip,
        })
}

/// A page of 2..=16 devices with one status each.
fn page_strategy() -> impl Strategy<Value = (Vec<DeviceId>, HashMap<DeviceId, TileStatus>)> {
    proptest::collection::vec(status_strategy(), 2..=16).prop_map(|statuses| {
        let devices: Vec<DeviceId> = (0..statuses.len())
            .map(|i| DeviceId::new(format!("cam-{i:02}")))
            .collect();
        let map = devices.iter().cloned().zip(statuses).collect();
        (devices, map)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a previous leader that can still play keeps the role
    #[test]
    fn playing_leader_is_stable(
        (devices, mut statuses) in page_strategy(),
        pick in any::<prop::sample::Index>(),
        clock_ms in 0i64..100_000,
    ) {
        let previous = devices[pick.index(devices.len())].clone();
        if let Some(status) = statuses.get_mut(&previous) {
            status.can_play = true;
        }
        prop_assert_eq!(elect(Some(&previous), &devices, &statuses, clock_ms), Some(previous));
    }

    /// Property: the leader is always a device on the page
    #[test]
    fn leader_is_on_the_page(
        (devices, statuses) in page_strategy(),
        clock_ms in 0i64..100_000,
    ) {
        if let Some(leader) = elect(None, &devices, &statuses, clock_ms) {
            prop_assert!(devices.contains(&leader));
        }
    }

    /// Property: whenever some tile can play, a playing tile leads
    #[test]
    fn playing_tile_preferred_over_deputy(
        (devices, statuses) in page_strategy(),
        clock_ms in 0i64..100_000,
    ) {
        prop_assume!(statuses.values().any(|s| s.can_play));
        let leader = elect(None, &devices, &statuses, clock_ms).unwrap();
        prop_assert!(statuses[&leader].can_play);
    }

    /// Property: with nobody playing, the deputy has the earliest upcoming
    /// boundary among non-seeking tiles
    #[test]
    fn deputy_has_earliest_boundary(
        (devices, mut statuses) in page_strategy(),
        clock_ms in 0i64..100_000,
    ) {
        for status in statuses.values_mut() {
            status.can_play = false;
        }
        let candidates: Vec<(i64, &DeviceId)> = devices
            .iter()
            .filter_map(|device| {
                let status = &statuses[device];
                if status.is_seeking() {
                    return None;
                }
                status
                    .next_clip_start_ms
                    .filter(|&b| b > clock_ms)
                    .map(|b| (b, device))
            })
            .collect();

        let elected = elect(None, &devices, &statuses, clock_ms);
        let expected = candidates.iter().min().map(|(_, device)| (*device).clone());
        prop_assert_eq!(elected, expected);
    }

    /// Property: with nobody playing, a leader that is mid-seek keeps the
    /// role instead of handing it to a deputy
    #[test]
    fn seeking_leader_survives_when_nobody_plays(
        (devices, mut statuses) in page_strategy(),
        pick in any::<prop::sample::Index>(),
        target_ms in 0i64..100_000,
    ) {
        for status in statuses.values_mut() {
            status.can_play = false;
        }
        let previous = devices[pick.index(devices.len())].clone();
        if let Some(status) = statuses.get_mut(&previous) {
            status.changing_start_time_ms = Some(target_ms);
        }
        prop_assert_eq!(elect(Some(&previous), &devices, &statuses, target_ms), Some(previous));
    }
}

#[test]
fn single_device_always_leads() {
    let device = DeviceId::from("only");
    let statuses = HashMap::new();
    assert_eq!(
        elect(None, std::slice::from_ref(&device), &statuses, 0),
        Some(device)
    );
}
