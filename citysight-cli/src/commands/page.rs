//! Page inspection command.

use std::path::Path;

use citysight_core::config::LayoutConfig;
use citysight_core::pagination::{PageAssignment, PageDirection, advance_cursor, assign_page};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{create_layout_store, load_layout};

/// Requested page flips: a direction and how many times.
pub type Flips = Option<(PageDirection, usize)>;

/// Folds the mutually exclusive `--next` / `--previous` flags.
pub const fn flips(next: Option<usize>, previous: Option<usize>) -> Flips {
    match (next, previous) {
        (Some(n), _) => Some((PageDirection::Next, n)),
        (None, Some(n)) => Some((PageDirection::Previous, n)),
        (None, None) => None,
    }
}

#[derive(Serialize)]
struct PageReport<'a> {
    split_mode: String,
    cursor: usize,
    page: &'a PageAssignment,
}

/// Page command handler
pub fn cmd_page(
    config_path: Option<&Path>,
    cursor: usize,
    flips: Flips,
    format: OutputFormat,
) -> Result<(), CliError> {
    let store = create_layout_store(config_path)?;
    let layout = load_layout(&store)?;
    let (cursor, page) = resolve(&layout, cursor, flips);

    match format {
        OutputFormat::Table => print_page_table(&layout, cursor, &page),
        OutputFormat::Json => {
            let report = PageReport {
                split_mode: layout.split_mode.to_string(),
                cursor,
                page: &page,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn resolve(layout: &LayoutConfig, cursor: usize, flips: Flips) -> (usize, PageAssignment) {
    let grid_size = layout.split_mode.grid_size();
    let selection = &layout.selection;
    let mut cursor = if selection.is_empty() {
        0
    } else {
        cursor % selection.len()
    };
    let mut page = assign_page(selection, cursor, grid_size);

    if let Some((direction, count)) = flips
        && !selection.is_empty()
    {
        for _ in 0..count {
            cursor = advance_cursor(selection, &page, cursor, direction);
            page = assign_page(selection, cursor, grid_size);
        }
    }
    (cursor, page)
}

fn print_page_table(layout: &LayoutConfig, cursor: usize, page: &PageAssignment) {
    println!(
        "Page at cursor {cursor} ({}, {} of {} devices shown)",
        layout.split_mode,
        page.occupied_count(),
        layout.selection.len()
    );
    println!();
    println!("{:<4}  {:<24}  PINNED", "SLOT", "DEVICE");
    println!("{:-<4}  {:-<24}  {:-<6}", "", "", "");
    for (slot, device) in page.slots().iter().enumerate() {
        let Some(device) = device else {
            println!("{slot:<4}  {:<24}  -", "(empty)");
            continue;
        };
        let pinned = layout
            .selection
            .iter()
            .any(|entry| &entry.device_id == device && entry.pinned_slot.is_some());
        let pinned = if pinned { "yes" } else { "no" };
        println!("{slot:<4}  {:<24}  {pinned}", device.as_str());
    }
}
