//! `CitySight` CLI - command-line interface for the `CitySight` playback engine
//!
//! Provides commands for editing the saved camera layout, inspecting page
//! assignments and simulating synchronized playback against a clip
//! catalogue.

mod cli;
mod commands;
mod error;
mod util;

use citysight_core::tracing::{TracingConfig, TracingLevel, init_tracing};
use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    if cli.verbose > 0 && !cli.quiet {
        let config = TracingConfig::new().with_level(TracingLevel::from_verbosity(cli.verbose));
        if let Err(e) = init_tracing(&config) {
            eprintln!("Warning: {e}");
        }
    }

    let result = commands::dispatch(config_path, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
