//! Virtual-time playback simulation.

use std::path::Path;

use citysight_core::clips::JsonClipDirectory;
use citysight_core::config::MemoryLayoutStore;
use citysight_core::session::{SessionNotice, TileSnapshot};
use citysight_core::simulation::Simulator;
use citysight_core::tracing::span_names;
use serde::Serialize;
use tracing::Instrument;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{create_layout_store, format_ms, load_layout, load_settings};

/// Parameters for the simulate command
pub struct SimulateParams<'a> {
    /// JSON clip catalogue
    pub clips: &'a Path,
    /// Range start
    pub from: i64,
    /// Range end
    pub to: i64,
    /// Number of steps to run
    pub steps: usize,
    /// Virtual milliseconds per step
    pub step_ms: i64,
    /// Output format
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct StepReport {
    elapsed_ms: i64,
    clock_ms: Option<i64>,
    leader: Option<String>,
}

#[derive(Serialize)]
struct SimulationReport {
    steps: Vec<StepReport>,
    notices: Vec<SessionNotice>,
    tiles: Vec<TileSnapshot>,
}

/// Simulate command handler
pub fn cmd_simulate(config_path: Option<&Path>, params: SimulateParams<'_>) -> Result<(), CliError> {
    if params.step_ms <= 0 {
        return Err(CliError::Simulation(format!(
            "step must be positive, got {} ms",
            params.step_ms
        )));
    }

    let store = create_layout_store(config_path)?;
    let layout = load_layout(&store)?;
    let settings = load_settings(&store)?;
    let directory = JsonClipDirectory::open(params.clips)?;

    // The simulation must never rewrite the saved layout
    let scratch = MemoryLayoutStore::with_layout(layout.clone());
    let mut simulator = Simulator::new(
        directory,
        layout,
        settings,
        params.from,
        params.to,
        Box::new(scratch),
    )?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Simulation(format!("Failed to create async runtime: {e}")))?;

    let span = citysight_core::trace_operation!(
        span_names::SIMULATION,
        steps = params.steps,
        step_ms = params.step_ms
    );
    let report = runtime.block_on(
        run(&mut simulator, params.steps, params.step_ms).instrument(span),
    );

    match params.format {
        OutputFormat::Table => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

async fn run(
    simulator: &mut Simulator<JsonClipDirectory>,
    steps: usize,
    step_ms: i64,
) -> SimulationReport {
    simulator.start().await;
    let mut reports = Vec::with_capacity(steps);
    for _ in 0..steps {
        simulator.step(step_ms).await;
        reports.push(StepReport {
            elapsed_ms: simulator.now_ms(),
            clock_ms: simulator.clock_ms(),
            leader: simulator.session().leader().map(ToString::to_string),
        });
    }
    SimulationReport {
        steps: reports,
        notices: simulator.take_notices(),
        tiles: simulator.session().tile_snapshots(),
    }
}

fn print_report(report: &SimulationReport) {
    println!("{:<10}  {:<25}  LEADER", "ELAPSED", "CLOCK");
    println!("{:-<10}  {:-<25}  {:-<10}", "", "", "");
    for step in &report.steps {
        let clock = step.clock_ms.map_or_else(|| "-".to_string(), format_ms);
        let leader = step.leader.as_deref().unwrap_or("-");
        println!("{:<10}  {clock:<25}  {leader}", format!("{}ms", step.elapsed_ms));
    }

    println!("\nTiles:");
    for tile in &report.tiles {
        let state = tile
            .state
            .map_or_else(|| "live".to_string(), |state| state.to_string());
        println!(
            "  [{}] {:<20} {:<8} {state}",
            tile.slot,
            tile.device_id.as_str(),
            tile.role.to_string()
        );
    }

    if !report.notices.is_empty() {
        println!("\nNotices:");
        for notice in &report.notices {
            println!("  {notice}");
        }
    }
}
