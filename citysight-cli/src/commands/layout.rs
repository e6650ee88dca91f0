//! Layout editing commands.

use std::path::Path;

use citysight_core::config::LayoutConfig;
use citysight_core::models::{DeviceId, SplitMode};
use citysight_core::session::{SessionNotice, UserCommand};

use crate::cli::{LayoutCommands, OutputFormat};
use crate::error::CliError;
use crate::util::{apply, open_session};

/// Layout command handler
pub fn cmd_layout(config_path: Option<&Path>, subcmd: LayoutCommands) -> Result<(), CliError> {
    match subcmd {
        LayoutCommands::Show { format } => cmd_layout_show(config_path, format),
        LayoutCommands::Add { devices } => {
            let commands = devices
                .into_iter()
                .map(|device| UserCommand::AddDevice(DeviceId::new(device)))
                .collect();
            edit(config_path, commands)
        }
        LayoutCommands::Remove { device } => edit(
            config_path,
            vec![UserCommand::RemoveDevice(DeviceId::new(device))],
        ),
        LayoutCommands::Pin { device, slot } => edit(
            config_path,
            vec![UserCommand::Pin {
                device: DeviceId::new(device),
                slot,
            }],
        ),
        LayoutCommands::Unpin { device } => {
            edit(config_path, vec![UserCommand::Unpin(DeviceId::new(device))])
        }
        LayoutCommands::Split { mode } => {
            let mode: SplitMode = mode.parse()?;
            edit(config_path, vec![UserCommand::SetSplitMode(mode)])
        }
        LayoutCommands::Autoplay { state, interval } => {
            let mut commands = Vec::new();
            if let Some(secs) = interval {
                commands.push(UserCommand::SetAutoplayInterval(secs));
            }
            commands.push(UserCommand::SetAutoplay(state.is_on()));
            edit(config_path, commands)
        }
    }
}

fn edit(config_path: Option<&Path>, commands: Vec<UserCommand>) -> Result<(), CliError> {
    let mut session = open_session(config_path)?;
    for command in commands {
        let enabling = command == UserCommand::SetAutoplay(true);
        let description = describe(&command);
        let notices = apply(&mut session, command)?;
        tracing::debug!(notices = notices.len(), "Layout edit applied");
        if enabling && !session.autoplay().is_enabled() {
            println!("Autoplay left off");
        } else {
            println!("{description}");
        }
        for notice in notices.iter().filter(|notice| is_user_facing(notice)) {
            println!("  note: {notice}");
        }
    }
    Ok(())
}

fn describe(command: &UserCommand) -> String {
    match command {
        UserCommand::AddDevice(device) => format!("Added '{device}' to the selection"),
        UserCommand::RemoveDevice(device) => format!("Removed '{device}' from the selection"),
        UserCommand::Pin { device, slot } => format!("Pinned '{device}' to slot {slot}"),
        UserCommand::Unpin(device) => format!("Unpinned '{device}'"),
        UserCommand::SetSplitMode(mode) => {
            format!("Grid set to {mode} ({} tiles)", mode.grid_size())
        }
        UserCommand::SetAutoplay(true) => "Autoplay enabled".to_string(),
        UserCommand::SetAutoplay(false) => "Autoplay disabled".to_string(),
        UserCommand::SetAutoplayInterval(secs) => format!("Autoplay interval set to {secs}s"),
        other => format!("{other:?}"),
    }
}

/// Page and leader changes are noise for a one-shot edit.
const fn is_user_facing(notice: &SessionNotice) -> bool {
    matches!(
        notice,
        SessionNotice::AutoplayDisabled { .. }
            | SessionNotice::PinsCleared { .. }
            | SessionNotice::PinDisplaced { .. }
    )
}

fn cmd_layout_show(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let session = open_session(config_path)?;
    let layout = session.layout();

    match format {
        OutputFormat::Table => print_layout_table(&layout),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&layout)?),
    }
    Ok(())
}

fn print_layout_table(layout: &LayoutConfig) {
    println!("Layout:");
    println!(
        "  Grid:     {} ({} tiles)",
        layout.split_mode,
        layout.split_mode.grid_size()
    );
    let autoplay = if layout.autoplay { "on" } else { "off" };
    println!(
        "  Autoplay: {autoplay} (every {}s)",
        layout.autoplay_in_seconds
    );
    println!(
        "  Devices:  {} ({} pinned)",
        layout.selection.len(),
        layout.selection.pinned_count()
    );
    println!();

    if layout.selection.is_empty() {
        println!("No devices selected.");
        return;
    }

    let name_width = layout
        .selection
        .iter()
        .map(|entry| entry.device_id.as_str().len())
        .max()
        .unwrap_or(6)
        .max(6);

    println!("{:<4}  {:<name_width$}  PIN", "#", "DEVICE");
    println!("{:-<4}  {:-<name_width$}  {:-<3}", "", "", "");
    for (index, entry) in layout.selection.iter().enumerate() {
        let pin = entry
            .pinned_slot
            .map_or_else(|| "-".to_string(), |slot| slot.to_string());
        println!("{index:<4}  {:<name_width$}  {pin}", entry.device_id.as_str());
    }
}
