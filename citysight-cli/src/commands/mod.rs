//! Command handler modules for the CLI.

mod completions;
mod layout;
mod page;
mod simulate;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Layout(subcmd) => layout::cmd_layout(config_path, subcmd),
        Commands::Page {
            cursor,
            next,
            previous,
            format,
        } => page::cmd_page(config_path, cursor, page::flips(next, previous), format),
        Commands::Simulate {
            clips,
            from,
            to,
            steps,
            step_ms,
            format,
        } => simulate::cmd_simulate(
            config_path,
            simulate::SimulateParams {
                clips: &clips,
                from,
                to,
                steps,
                step_ms,
                format,
            },
        ),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
