//! Session scenarios driven through the public API

use citysight_core::clips::SortedClips;
use citysight_core::config::{EngineSettings, LayoutConfig, MemoryLayoutStore};
use citysight_core::live::StaticLiveSource;
use citysight_core::models::{DeviceId, SelectionEntry, SelectionSet, SplitMode, VideoClip};
use citysight_core::pagination::{PageAssignment, PageDirection};
use citysight_core::playback::{
    PlaybackSurface, SurfaceCommand, SurfaceEvent, TileContext, TileEffect, TileRole, TileState,
    TileSyncController, TileThresholds, WaitReason,
};
use citysight_core::session::{
    SessionEffect, SessionEvent, SessionMode, SessionNotice, SurveillanceSession, UserCommand,
};
use citysight_core::simulation::{SimulatedSurface, SimulatedSurfaceFactory};

// ========== Helpers ==========

fn playback(layout: LayoutConfig) -> (SurveillanceSession, MemoryLayoutStore) {
    let store = MemoryLayoutStore::new();
    let session = SurveillanceSession::new(
        layout,
        EngineSettings::default(),
        SessionMode::Playback {
            range_from: 0,
            range_to: 60_000,
            surfaces: Box::new(SimulatedSurfaceFactory::new()),
        },
        Box::new(store.clone()),
    )
    .unwrap();
    (session, store)
}

fn names(page: &PageAssignment) -> Vec<Option<String>> {
    page.slots()
        .iter()
        .map(|slot| slot.as_ref().map(ToString::to_string))
        .collect()
}

fn some(name: &str) -> Option<String> {
    Some(name.to_string())
}

fn gap_clips() -> SortedClips {
    SortedClips::from_unsorted(vec![
        VideoClip::new(0, 1000, "a"),
        VideoClip::new(5000, 1000, "b"),
    ])
}

fn context(role: TileRole, sibling_can_play: bool) -> TileContext {
    TileContext {
        role,
        clock_ms: 2000,
        range_to: 60_000,
        paused: false,
        sibling_can_play,
    }
}

// ========== Pagination scenarios ==========

#[test]
fn pinned_device_leads_the_page() {
    let selection = SelectionSet::from_entries(vec![
        SelectionEntry::new("A"),
        SelectionEntry::pinned("B", 0),
        SelectionEntry::new("C"),
    ])
    .unwrap();
    let (mut session, _) = playback(LayoutConfig::new(selection, SplitMode::Four));
    session.start();

    assert_eq!(
        names(session.page()),
        vec![some("B"), some("A"), some("C"), None]
    );
}

#[test]
fn shrinking_to_four_clears_pin_ten_and_resets_cursor() {
    let mut entries: Vec<SelectionEntry> = (0..20)
        .map(|i| SelectionEntry::new(format!("cam-{i:02}")))
        .collect();
    entries[5].pinned_slot = Some(10);
    entries[6].pinned_slot = Some(2);
    let (mut session, store) = playback(LayoutConfig::new(
        SelectionSet::from_entries(entries).unwrap(),
        SplitMode::Sixteen,
    ));
    session.start();
    session
        .execute(UserCommand::Page(PageDirection::Next))
        .unwrap();
    assert_ne!(session.cursor(), 0);

    let effects = session
        .execute(UserCommand::SetSplitMode(SplitMode::Four))
        .unwrap();

    assert_eq!(session.cursor(), 0);
    assert_eq!(session.grid_size(), 4);
    let pins: Vec<_> = session
        .selection()
        .iter()
        .filter_map(|entry| entry.pinned_slot)
        .collect();
    assert_eq!(pins, vec![2]);
    assert_eq!(session.page().slot(2), Some(&DeviceId::from("cam-06")));
    assert!(effects.contains(&SessionEffect::Notice(SessionNotice::PinsCleared {
        devices: vec![DeviceId::from("cam-05")],
    })));
    assert_eq!(store.snapshot().unwrap().split_mode, SplitMode::Four);
}

#[test]
fn paging_cycles_through_the_whole_selection() {
    let selection = SelectionSet::from_devices((0..10).map(|i| format!("cam-{i}"))).unwrap();
    let (mut session, _) = playback(LayoutConfig::new(selection, SplitMode::Four));
    session.start();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..3 {
        seen.extend(session.page().device_ids());
        session
            .execute(UserCommand::Page(PageDirection::Next))
            .unwrap();
    }
    assert_eq!(seen.len(), 10);
}

#[test]
fn departing_tiles_are_shut_down() {
    let selection = SelectionSet::from_devices(["a", "b", "c"]).unwrap();
    let factory = SimulatedSurfaceFactory::new();
    let mut session = SurveillanceSession::new(
        LayoutConfig::new(selection, SplitMode::One),
        EngineSettings::default(),
        SessionMode::Playback {
            range_from: 0,
            range_to: 60_000,
            surfaces: Box::new(factory.clone()),
        },
        Box::new(MemoryLayoutStore::new()),
    )
    .unwrap();
    session.start();
    let first = factory.surface(&DeviceId::from("a")).unwrap();

    session
        .execute(UserCommand::Page(PageDirection::Next))
        .unwrap();

    assert!(session.tile(&DeviceId::from("a")).is_none());
    assert!(session.tile(&DeviceId::from("b")).is_some());
    assert_eq!(first.commands().last(), Some(&SurfaceCommand::Pause));
}

// ========== Gap handling ==========

#[test]
fn follower_waits_in_gap() {
    let mut tile = TileSyncController::new(
        DeviceId::from("cam"),
        0,
        Box::new(SimulatedSurface::new()),
        TileThresholds::default(),
    );
    let ctx = context(TileRole::Follower, true);
    tile.start(&ctx);
    let effects = tile.on_clips_loaded(Ok(gap_clips()), &ctx);

    assert!(effects.is_empty());
    assert_eq!(tile.state(), TileState::Waiting(WaitReason::Gap));
    assert_eq!(tile.status().next_clip_start_ms, Some(5000));
    assert_eq!(tile.pending_target_ms(), Some(5000));
}

#[test]
fn leader_with_playing_sibling_schedules_retarget() {
    let mut tile = TileSyncController::new(
        DeviceId::from("cam"),
        0,
        Box::new(SimulatedSurface::new()),
        TileThresholds::default(),
    );
    let ctx = context(TileRole::Leader, true);
    tile.start(&ctx);
    let effects = tile.on_clips_loaded(Ok(gap_clips()), &ctx);

    assert!(matches!(
        effects.as_slice(),
        [TileEffect::ScheduleRetarget {
            target_ms: 5000,
            delay_ms: 3000,
            ..
        }]
    ));
}

// ========== Shared gaps ==========

/// Two cameras with a short clip at zero, then footage resuming at
/// 20 s for `a` and 30 s for `b`.
fn staggered_pair(factory: &SimulatedSurfaceFactory) -> SurveillanceSession {
    let selection = SelectionSet::from_devices(["a", "b"]).unwrap();
    let mut session = SurveillanceSession::new(
        LayoutConfig::new(selection, SplitMode::Four),
        EngineSettings::default(),
        SessionMode::Playback {
            range_from: 0,
            range_to: 60_000,
            surfaces: Box::new(factory.clone()),
        },
        Box::new(MemoryLayoutStore::new()),
    )
    .unwrap();
    session.start();

    for (device, resume_ms) in [("a", 20_000), ("b", 30_000)] {
        let clips = SortedClips::from_unsorted(vec![
            VideoClip::new(0, 1000, format!("{device}-0")),
            VideoClip::new(resume_ms, 10_000, format!("{device}-1")),
        ]);
        session.handle(SessionEvent::ClipsLoaded {
            device: DeviceId::from(device),
            from: 0,
            to: 60_000,
            result: Ok(clips),
        });
    }
    session
}

fn ready(session: &mut SurveillanceSession, device: &str) -> Vec<SessionEffect> {
    session.handle(SessionEvent::Surface {
        device: DeviceId::from(device),
        event: SurfaceEvent::Ready,
    })
}

fn jumps(effects: &[SessionEffect]) -> Vec<i64> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            SessionEffect::Notice(SessionNotice::JumpingToNextFootage { target_ms, .. }) => {
                Some(*target_ms)
            }
            _ => None,
        })
        .collect()
}

fn clock_ms(session: &SurveillanceSession) -> i64 {
    session.clock().map(|clock| clock.current_ms()).unwrap()
}

#[test]
fn seek_into_shared_gap_jumps_to_earliest_footage() {
    let factory = SimulatedSurfaceFactory::new();
    let mut session = staggered_pair(&factory);
    ready(&mut session, "a");
    ready(&mut session, "b");
    assert_eq!(session.leader(), Some(&DeviceId::from("a")));

    let effects = session.execute(UserCommand::Seek(2000)).unwrap();

    assert_eq!(jumps(&effects), vec![20_000]);
    assert_eq!(clock_ms(&session), 20_000);
    assert_eq!(session.leader(), Some(&DeviceId::from("a")));
    let a = session.tile(&DeviceId::from("a")).unwrap();
    assert_eq!(a.state(), TileState::Playing);
    assert_eq!(a.local_time_ms(), Some(20_000));
    assert_eq!(
        session.tile(&DeviceId::from("b")).unwrap().state(),
        TileState::Waiting(WaitReason::Gap)
    );
    assert!(
        factory
            .surface(&DeviceId::from("a"))
            .unwrap()
            .commands()
            .contains(&SurfaceCommand::Load {
                locator: "a-1".into(),
                offset_ms: 0
            })
    );
}

#[test]
fn second_seek_does_not_jump_past_earliest_footage() {
    let factory = SimulatedSurfaceFactory::new();
    let mut session = staggered_pair(&factory);
    ready(&mut session, "a");
    ready(&mut session, "b");

    session.execute(UserCommand::Seek(500)).unwrap();
    assert_eq!(session.leader(), Some(&DeviceId::from("a")));
    let effects = session.execute(UserCommand::Seek(2000)).unwrap();

    assert_eq!(jumps(&effects), vec![20_000]);
    assert_eq!(clock_ms(&session), 20_000);
    assert_eq!(session.leader(), Some(&DeviceId::from("a")));
    assert_eq!(
        session.tile(&DeviceId::from("b")).unwrap().state(),
        TileState::Waiting(WaitReason::Gap)
    );

    // Once `a` is ready again it drives the clock towards `b`'s footage.
    ready(&mut session, "a");
    session.handle(SessionEvent::Surface {
        device: DeviceId::from("a"),
        event: SurfaceEvent::TimeUpdate { offset_ms: 500 },
    });
    assert_eq!(clock_ms(&session), 20_500);
    assert_eq!(session.leader(), Some(&DeviceId::from("a")));
}

#[test]
fn timer_armed_before_leaving_the_page_is_stale_on_return() {
    let selection = SelectionSet::from_entries(
        std::iter::once(SelectionEntry::pinned("b", 0))
            .chain(["a", "c", "d", "e", "f", "g"].map(SelectionEntry::new))
            .collect(),
    )
    .unwrap();
    let factory = SimulatedSurfaceFactory::new();
    let mut session = SurveillanceSession::new(
        LayoutConfig::new(selection, SplitMode::Four),
        EngineSettings::default(),
        SessionMode::Playback {
            range_from: 0,
            range_to: 60_000,
            surfaces: Box::new(factory.clone()),
        },
        Box::new(MemoryLayoutStore::new()),
    )
    .unwrap();
    session.start();
    let a = DeviceId::from("a");
    let b = DeviceId::from("b");
    for (device, clips) in [
        (a.clone(), gap_clips()),
        (
            b.clone(),
            SortedClips::from_unsorted(vec![VideoClip::new(0, 60_000, "b")]),
        ),
    ] {
        session.handle(SessionEvent::ClipsLoaded {
            device,
            from: 0,
            to: 60_000,
            result: Ok(clips),
        });
    }
    ready(&mut session, "a");
    ready(&mut session, "b");
    assert_eq!(session.leader(), Some(&a));

    // `a` reaches its gap while `b` plays, so it arms a timer.
    let effects = session.handle(SessionEvent::Surface {
        device: a.clone(),
        event: SurfaceEvent::Ended,
    });
    let armed = effects
        .iter()
        .find_map(|effect| match effect {
            SessionEffect::ScheduleRetarget {
                device, generation, ..
            } if *device == a => Some(*generation),
            _ => None,
        })
        .unwrap();
    assert_eq!(session.leader(), Some(&b));
    session.handle(SessionEvent::Surface {
        device: b.clone(),
        event: SurfaceEvent::TimeUpdate { offset_ms: 2000 },
    });
    assert_eq!(clock_ms(&session), 2000);

    session
        .execute(UserCommand::Page(PageDirection::Next))
        .unwrap();
    assert!(session.tile(&a).is_none());
    session
        .execute(UserCommand::Page(PageDirection::Previous))
        .unwrap();

    let returned = session.tile(&a).unwrap();
    assert_eq!(returned.state(), TileState::Waiting(WaitReason::Gap));
    assert!(returned.generation() > armed);
    let surface = factory.surface(&a).unwrap();
    let before = surface.commands();

    let effects = session.handle(SessionEvent::RetargetTimer {
        device: a.clone(),
        generation: armed,
    });

    assert!(effects.is_empty());
    assert_eq!(surface.commands(), before);
    let tile = session.tile(&a).unwrap();
    assert_eq!(tile.state(), TileState::Waiting(WaitReason::Gap));
    assert_eq!(tile.pending_target_ms(), Some(5000));
    assert_eq!(session.leader(), Some(&b));
}

// ========== Live mode ==========

#[test]
fn live_session_opens_streams_without_a_clock() {
    let a = SimulatedSurface::new();
    let handle = a.clone();
    let source = StaticLiveSource::new().with_stream("a", move || -> Box<dyn PlaybackSurface> {
        Box::new(handle.clone())
    });
    let selection = SelectionSet::from_devices(["a", "ghost"]).unwrap();
    let mut session = SurveillanceSession::new(
        LayoutConfig::new(selection, SplitMode::Four),
        EngineSettings::default(),
        SessionMode::Live {
            source: Box::new(source),
        },
        Box::new(MemoryLayoutStore::new()),
    )
    .unwrap();
    session.start();

    assert!(session.is_live());
    assert!(session.clock().is_none());
    assert!(session.leader().is_none());

    session.handle(SessionEvent::Surface {
        device: DeviceId::from("a"),
        event: SurfaceEvent::Ready,
    });
    assert_eq!(a.commands(), vec![SurfaceCommand::Play]);

    let snapshots = session.tile_snapshots();
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0].status.can_play);
    assert_eq!(
        snapshots[1].status.error_kind,
        Some(citysight_core::ErrorKind::UnknownDevice)
    );

    session.handle(SessionEvent::Command(UserCommand::Pause));
    assert!(session.is_paused());
    assert_eq!(a.commands().last(), Some(&SurfaceCommand::Pause));
}
