//! Shared utility functions used across command modules.

use std::path::Path;

use citysight_core::config::{EngineSettings, FileLayoutStore, LayoutConfig, LayoutStore};
use citysight_core::session::{
    SessionEffect, SessionMode, SessionNotice, SurveillanceSession, UserCommand,
};
use citysight_core::simulation::SimulatedSurfaceFactory;

use crate::error::CliError;

/// Creates a layout store using the optional custom config directory
/// from CLI args.
pub fn create_layout_store(config_path: Option<&Path>) -> Result<FileLayoutStore, CliError> {
    match config_path {
        Some(path) => Ok(FileLayoutStore::new(path)),
        None => FileLayoutStore::from_default_dir()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads engine settings stored next to the layout.
pub fn load_settings(store: &FileLayoutStore) -> Result<EngineSettings, CliError> {
    Ok(EngineSettings::load(&store.settings_path())?)
}

/// Reads the saved layout, falling back to an empty one.
pub fn load_layout(store: &FileLayoutStore) -> Result<LayoutConfig, CliError> {
    let stored = store.read_layout()?;
    match stored {
        Some(layout) => Ok(layout),
        None => {
            let settings = load_settings(store)?;
            Ok(LayoutConfig {
                autoplay_in_seconds: settings.default_autoplay_secs,
                ..LayoutConfig::default()
            })
        }
    }
}

/// Opens an offline session over the saved layout.
///
/// Tiles are backed by simulated surfaces and nothing is fetched; the
/// session only applies edits and writes them back through the store.
pub fn open_session(config_path: Option<&Path>) -> Result<SurveillanceSession, CliError> {
    let store = create_layout_store(config_path)?;
    let settings = load_settings(&store)?;
    let mode = SessionMode::Playback {
        range_from: 0,
        range_to: 0,
        surfaces: Box::new(SimulatedSurfaceFactory::new()),
    };
    Ok(SurveillanceSession::restore(settings, mode, Box::new(store))?)
}

/// Applies one edit, returning the notices it raised.
///
/// A layout that could not be written fails the command.
pub fn apply(
    session: &mut SurveillanceSession,
    command: UserCommand,
) -> Result<Vec<SessionNotice>, CliError> {
    let notices: Vec<SessionNotice> = session
        .execute(command)?
        .into_iter()
        .filter_map(|effect| match effect {
            SessionEffect::Notice(notice) => Some(notice),
            _ => None,
        })
        .collect();

    if let Some(SessionNotice::PersistFailed { message }) = notices
        .iter()
        .find(|notice| matches!(notice, SessionNotice::PersistFailed { .. }))
    {
        return Err(CliError::Config(format!("Failed to save layout: {message}")));
    }
    Ok(notices)
}

/// Formats epoch milliseconds as an RFC 3339 UTC timestamp.
pub fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map_or_else(|| format!("{ms} ms"), |t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}
