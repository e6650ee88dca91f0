//! Leader election
//!
//! The leader is the tile whose media progress is authoritative for the
//! shared clock. Election is a pure function of the previous leader, the
//! devices on the page and their published statuses; it runs after every
//! status or time change.

use std::collections::HashMap;

use crate::models::DeviceId;

use super::status::TileStatus;

/// Elects the clock leader for the current page.
///
/// In order of preference:
/// 1. the only device on the page
/// 2. the previous leader, if still on the page and able to play
/// 3. the first device in slot order able to play
/// 4. the previous leader, if still on the page and mid-seek
/// 5. a deputy: the device whose next clip starts soonest after
///    `clock_ms`, skipping tiles mid-seek (ties go to the lowest id)
///
/// A leader that just jumped the clock is mid-seek until its surface is
/// ready again, so it keeps leading instead of handing over to a deputy
/// whose later boundary would jump the clock a second time.
///
/// Returns `None` when nobody qualifies, which freezes the clock.
#[must_use]
pub fn elect(
    previous: Option<&DeviceId>,
    on_page: &[DeviceId],
    statuses: &HashMap<DeviceId, TileStatus>,
    clock_ms: i64,
) -> Option<DeviceId> {
    if let [only] = on_page {
        return Some(only.clone());
    }

    let can_play = |device: &DeviceId| statuses.get(device).is_some_and(|s| s.can_play);

    if let Some(previous) = previous
        && on_page.contains(previous)
        && can_play(previous)
    {
        return Some(previous.clone());
    }

    if let Some(first) = on_page.iter().find(|device| can_play(device)) {
        return Some(first.clone());
    }

    if let Some(previous) = previous
        && on_page.contains(previous)
        && statuses.get(previous).is_some_and(TileStatus::is_seeking)
    {
        return Some(previous.clone());
    }

    on_page
        .iter()
        .filter_map(|device| {
            let status = statuses.get(device)?;
            if status.is_seeking() {
                return None;
            }
            let boundary = status.next_clip_start_ms.filter(|&b| b > clock_ms)?;
            Some((boundary, device))
        })
        .min()
        .map(|(_, device)| device.clone())
}
