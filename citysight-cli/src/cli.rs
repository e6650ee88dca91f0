//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// `CitySight` command-line interface for editing camera layouts
#[derive(Parser)]
#[command(name = "citysight-cli")]
#[command(author, version, about = "CitySight command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true, env = "CITYSIGHT_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or edit the saved layout
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// Show which devices a page displays
    #[command(about = "Show the page assignment for the saved layout")]
    Page {
        /// Selection index the page starts from
        #[arg(long, default_value = "0")]
        cursor: usize,

        /// Flip forward this many pages
        #[arg(long, value_name = "N", conflicts_with = "previous")]
        next: Option<usize>,

        /// Flip backward this many pages
        #[arg(long, value_name = "N")]
        previous: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Play the saved layout against a clip catalogue in virtual time
    #[command(about = "Simulate synchronized playback of the saved layout")]
    Simulate {
        /// JSON clip catalogue
        #[arg(long, value_name = "FILE")]
        clips: PathBuf,

        /// Range start in epoch milliseconds
        #[arg(long, allow_hyphen_values = true)]
        from: i64,

        /// Range end in epoch milliseconds
        #[arg(long, allow_hyphen_values = true)]
        to: i64,

        /// Number of simulation steps
        #[arg(long, default_value = "20")]
        steps: usize,

        /// Virtual milliseconds per step
        #[arg(long, default_value = "500")]
        step_ms: i64,

        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Layout subcommands
#[derive(Subcommand)]
pub enum LayoutCommands {
    /// Show the saved layout
    #[command(about = "Show the selection, pins, grid and autoplay settings")]
    Show {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Add devices to the selection
    #[command(about = "Append devices to the end of the rotation")]
    Add {
        /// Device identifiers
        #[arg(required = true)]
        devices: Vec<String>,
    },

    /// Remove a device from the selection
    #[command(about = "Remove a device from the selection")]
    Remove {
        /// Device identifier
        device: String,
    },

    /// Pin a device to a slot
    #[command(about = "Pin a device to a grid slot")]
    Pin {
        /// Device identifier
        device: String,

        /// Slot index, counted from the top-left
        slot: u32,
    },

    /// Clear a device's pin
    #[command(about = "Return a pinned device to the rotation")]
    Unpin {
        /// Device identifier
        device: String,
    },

    /// Change the grid size
    #[command(about = "Change the grid size (1, 4, 9 or 16 tiles)")]
    Split {
        /// Grid size: 1, 4, 9, 16 or 2x2 style
        mode: String,
    },

    /// Configure autoplay
    #[command(about = "Turn automatic page rotation on or off")]
    Autoplay {
        /// Desired state
        #[arg(value_enum)]
        state: Toggle,

        /// Seconds between page flips
        #[arg(long)]
        interval: Option<u32>,
    },
}

/// Output format for reporting commands
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Display as formatted table
    Table,
    /// Output as JSON
    Json,
}

/// On/off switch
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    /// Enable
    On,
    /// Disable
    Off,
}

impl Toggle {
    /// Returns true for `On`.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}
