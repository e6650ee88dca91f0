//! Configuration and layout persistence for `CitySight`
//!
//! Engine tunables live in `settings.toml`, the user's split-screen
//! arrangement in `layout.toml`, both in the same config directory.

mod layout;
mod settings;
mod store;

pub use layout::{LAYOUT_VERSION, LayoutConfig};
pub use settings::EngineSettings;
pub use store::{
    CONFIG_DIR_ENV, FileLayoutStore, LAYOUT_FILE_NAME, LayoutStore, MemoryLayoutStore,
    SETTINGS_FILE_NAME, default_config_dir,
};
