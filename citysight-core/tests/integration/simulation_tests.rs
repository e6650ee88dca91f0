//! Virtual-time playback scenarios

use citysight_core::clips::InMemoryClipDirectory;
use citysight_core::config::{EngineSettings, LayoutConfig, MemoryLayoutStore};
use citysight_core::models::{DeviceId, SelectionSet, SplitMode, VideoClip};
use citysight_core::session::{SessionNotice, UserCommand};
use citysight_core::simulation::Simulator;
use citysight_core::ErrorKind;

const STEP_MS: i64 = 500;

fn simulator(
    directory: InMemoryClipDirectory,
    devices: &[&str],
    split_mode: SplitMode,
    range_to: i64,
) -> Simulator {
    let selection = SelectionSet::from_devices(devices.iter().copied()).unwrap();
    Simulator::new(
        directory,
        LayoutConfig::new(selection, split_mode),
        EngineSettings::default(),
        0,
        range_to,
        Box::new(MemoryLayoutStore::new()),
    )
    .unwrap()
}

fn gapped_directory() -> InMemoryClipDirectory {
    InMemoryClipDirectory::new()
        .with_clips(
            "a",
            vec![VideoClip::new(0, 1000, "a0"), VideoClip::new(5000, 1000, "a1")],
        )
        .with_clips("b", vec![VideoClip::new(0, 10_000, "b0")])
}

fn locator(sim: &Simulator, device: &str) -> Option<String> {
    sim.surface(&DeviceId::from(device))
        .and_then(|surface| surface.state().locator)
}

#[tokio::test]
async fn lone_leader_jumps_over_gap() {
    let directory = InMemoryClipDirectory::new().with_clips(
        "a",
        vec![VideoClip::new(0, 1000, "a0"), VideoClip::new(5000, 1000, "a1")],
    );
    let mut sim = simulator(directory, &["a"], SplitMode::One, 20_000);
    sim.start().await;
    sim.run(3, STEP_MS).await;

    assert!(sim.notices().iter().any(|notice| matches!(
        notice,
        SessionNotice::JumpingToNextFootage { target_ms: 5000, .. }
    )));
    assert!(sim.clock_ms().unwrap() >= 5000);
    assert_eq!(locator(&sim, "a").as_deref(), Some("a1"));
}

#[tokio::test]
async fn leadership_moves_to_sibling_during_gap() {
    let mut sim = simulator(gapped_directory(), &["a", "b"], SplitMode::Four, 20_000);
    sim.start().await;
    assert_eq!(sim.session().leader(), Some(&DeviceId::from("a")));

    sim.run(4, STEP_MS).await;
    assert_eq!(sim.session().leader(), Some(&DeviceId::from("b")));
    assert!(sim.notices().iter().all(|notice| !matches!(
        notice,
        SessionNotice::JumpingToNextFootage { .. }
    )));

    sim.run(7, STEP_MS).await;
    assert!(sim.clock_ms().unwrap() >= 5000);
    assert_eq!(locator(&sim, "a").as_deref(), Some("a1"));
}

#[tokio::test]
async fn footage_running_out_fails_tile() {
    let directory =
        InMemoryClipDirectory::new().with_clips("a", vec![VideoClip::new(0, 1000, "a0")]);
    let mut sim = simulator(directory, &["a"], SplitMode::One, 20_000);
    sim.start().await;
    sim.run(4, STEP_MS).await;

    assert!(sim.notices().contains(&SessionNotice::TileFailed {
        device: DeviceId::from("a"),
        kind: ErrorKind::NoFootage,
    }));
}

#[tokio::test]
async fn range_end_pauses_and_resume_rewinds() {
    let directory =
        InMemoryClipDirectory::new().with_clips("a", vec![VideoClip::new(0, 30_000, "a0")]);
    let mut sim = simulator(directory, &["a"], SplitMode::One, 2000);
    sim.start().await;
    sim.run(6, STEP_MS).await;

    assert!(sim.notices().iter().any(|notice| matches!(
        notice,
        SessionNotice::RangeEnded { .. }
    )));
    assert_eq!(sim.clock_ms(), Some(2000));

    sim.send(UserCommand::Resume).await;
    assert_eq!(sim.clock_ms(), Some(0));
}

#[tokio::test]
async fn autoplay_rotates_in_virtual_time() {
    let directory = (0..6).fold(InMemoryClipDirectory::new(), |directory, i| {
        directory.with_clips(
            format!("cam-{i}"),
            vec![VideoClip::new(0, 60_000, format!("clip-{i}"))],
        )
    });
    let selection = SelectionSet::from_devices((0..6).map(|i| format!("cam-{i}"))).unwrap();
    let layout = LayoutConfig {
        autoplay: true,
        autoplay_in_seconds: 5,
        ..LayoutConfig::new(selection, SplitMode::Four)
    };
    let mut sim = Simulator::new(
        directory,
        layout,
        EngineSettings::default(),
        0,
        60_000,
        Box::new(MemoryLayoutStore::new()),
    )
    .unwrap();
    sim.start().await;

    sim.run(11, STEP_MS).await;
    assert_eq!(sim.session().cursor(), 4);
    assert!(sim.session().autoplay().is_enabled());
}

#[tokio::test]
async fn unavailable_device_retries_on_seek() {
    let directory = InMemoryClipDirectory::new().with_unavailable("a");
    let mut sim = simulator(directory, &["a"], SplitMode::One, 20_000);
    sim.start().await;

    assert!(sim.notices().contains(&SessionNotice::TileFailed {
        device: DeviceId::from("a"),
        kind: ErrorKind::Unavailable,
    }));
    let before = sim.directory().fetch_count();

    sim.send(UserCommand::Seek(1000)).await;
    assert!(sim.directory().fetch_count() > before);
}

#[tokio::test]
async fn broken_clip_is_skipped_to_next_footage() {
    let directory = InMemoryClipDirectory::new().with_clips(
        "a",
        vec![VideoClip::new(0, 1000, "a0"), VideoClip::new(1500, 1000, "a1")],
    );
    let mut sim =
        simulator(directory, &["a"], SplitMode::One, 20_000).with_broken_locator("a0");
    sim.start().await;
    sim.step(STEP_MS).await;

    assert_eq!(locator(&sim, "a").as_deref(), Some("a1"));
}
