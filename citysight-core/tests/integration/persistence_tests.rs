//! Layout and settings persistence on disk

use citysight_core::config::{
    EngineSettings, FileLayoutStore, LayoutConfig, LayoutStore, LAYOUT_VERSION,
};
use citysight_core::models::{DeviceId, SelectionEntry, SelectionSet, SplitMode};
use citysight_core::session::{SessionMode, SurveillanceSession, UserCommand};
use citysight_core::simulation::SimulatedSurfaceFactory;
use citysight_core::{CitySightError, ConfigError};
use tempfile::TempDir;

fn playback_mode() -> SessionMode {
    SessionMode::Playback {
        range_from: 0,
        range_to: 60_000,
        surfaces: Box::new(SimulatedSurfaceFactory::new()),
    }
}

fn restore(dir: &TempDir, settings: EngineSettings) -> SurveillanceSession {
    SurveillanceSession::restore(
        settings,
        playback_mode(),
        Box::new(FileLayoutStore::new(dir.path())),
    )
    .unwrap()
}

#[test]
fn fresh_directory_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = EngineSettings {
        default_autoplay_secs: 45,
        ..EngineSettings::default()
    };
    let mut session = restore(&dir, settings);
    session.start();

    assert!(session.selection().is_empty());
    assert_eq!(session.split_mode(), SplitMode::default());
    assert_eq!(session.autoplay().interval_secs(), 45);
    assert!(!FileLayoutStore::new(dir.path()).layout_path().exists());
}

#[test]
fn edits_are_written_and_restored() {
    let dir = TempDir::new().unwrap();
    {
        let mut session = restore(&dir, EngineSettings::default());
        session.start();
        for device in ["north-gate", "lobby", "garage"] {
            session
                .execute(UserCommand::AddDevice(DeviceId::from(device)))
                .unwrap();
        }
        session
            .execute(UserCommand::Pin {
                device: DeviceId::from("garage"),
                slot: 0,
            })
            .unwrap();
        session
            .execute(UserCommand::SetSplitMode(SplitMode::Nine))
            .unwrap();
    }

    let restored = restore(&dir, EngineSettings::default());
    assert_eq!(restored.split_mode(), SplitMode::Nine);
    let devices: Vec<&str> = restored
        .selection()
        .iter()
        .map(|entry| entry.device_id.as_str())
        .collect();
    assert_eq!(devices, vec!["north-gate", "lobby", "garage"]);
    assert_eq!(
        restored.selection().get(2).and_then(|entry| entry.pinned_slot),
        Some(0)
    );
}

#[test]
fn playback_commands_do_not_write() {
    let dir = TempDir::new().unwrap();
    let mut store = FileLayoutStore::new(dir.path());
    let selection = SelectionSet::from_devices(["a", "b"]).unwrap();
    store
        .write_layout(&LayoutConfig::new(selection, SplitMode::Four))
        .unwrap();
    let path = store.layout_path();
    let before = std::fs::read_to_string(&path).unwrap();

    let mut session = restore(&dir, EngineSettings::default());
    session.start();
    session.execute(UserCommand::Seek(1000)).unwrap();
    session.execute(UserCommand::Pause).unwrap();
    session.execute(UserCommand::Resume).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert!(!path.with_extension("toml.tmp").exists());
}

#[test]
fn newer_layout_version_refuses_to_restore() {
    let dir = TempDir::new().unwrap();
    let store = FileLayoutStore::new(dir.path());
    std::fs::write(
        store.layout_path(),
        format!(
            "version = {}\nsaved_at = \"2026-01-01T00:00:00Z\"\n",
            LAYOUT_VERSION + 1
        ),
    )
    .unwrap();

    let result = SurveillanceSession::restore(
        EngineSettings::default(),
        playback_mode(),
        Box::new(store),
    );
    assert!(matches!(
        result,
        Err(CitySightError::Config(ConfigError::UnsupportedVersion { .. }))
    ));
}

#[test]
fn stored_pins_survive_roundtrip() {
    let dir = TempDir::new().unwrap();
    let mut store = FileLayoutStore::new(dir.path());
    let selection = SelectionSet::from_entries(vec![
        SelectionEntry::new("a"),
        SelectionEntry::pinned("b", 3),
    ])
    .unwrap();
    let layout = LayoutConfig::new(selection, SplitMode::Four);
    store.write_layout(&layout).unwrap();

    assert_eq!(store.read_layout().unwrap(), Some(layout));
}

#[test]
fn settings_roundtrip_through_file() {
    let dir = TempDir::new().unwrap();
    let path = FileLayoutStore::new(dir.path()).settings_path();
    let settings = EngineSettings {
        gap_threshold_ms: 2500,
        fetch_timeout_secs: 30,
        ..EngineSettings::default()
    };
    settings.save(&path).unwrap();

    assert_eq!(EngineSettings::load(&path).unwrap(), settings);
}
