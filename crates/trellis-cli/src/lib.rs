//! CLI logic for the Trellis snapshot resolver.
//!
//! Loads a snapshot, validates every viewable cell through the view and
//! writes the resolved states as a JSON report.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;

use log::{debug, info};
use serde::Serialize;

use trellis::{
    CellState, Graph, StructuralError, TrellisError,
    cell::TerminalEnd,
    geometry::Point,
    identifier::Id,
};

/// Absolute bounds of one state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundsReport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resolved state of one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateReport {
    pub id: Id,
    pub kind: &'static str,
    pub bounds: BoundsReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_source: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_target: Option<Id>,
}

impl StateReport {
    fn new(state: &CellState) -> Self {
        let bounds = state.bounds();
        Self {
            id: state.cell(),
            kind: if state.is_edge() { "edge" } else { "node" },
            bounds: BoundsReport {
                x: bounds.min_x(),
                y: bounds.min_y(),
                width: bounds.width(),
                height: bounds.height(),
            },
            points: state.points().to_vec(),
            visible_source: state.visible_terminal(TerminalEnd::Source),
            visible_target: state.visible_terminal(TerminalEnd::Target),
        }
    }
}

/// Every reported state, in model pre-order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub cells: Vec<StateReport>,
}

/// Builds the report for one cell, or for every viewable cell.
///
/// # Errors
///
/// Returns [`StructuralError::UnknownCell`] when `only` names no cell.
pub fn build_report(graph: &mut Graph, only: Option<Id>) -> Result<Report, TrellisError> {
    let ids = match only {
        Some(id) if !graph.model().contains(id) => {
            return Err(StructuralError::UnknownCell(id).into());
        }
        Some(id) => vec![id],
        None => graph.model().pre_order(),
    };

    let recomputed = graph.validate_all();
    debug!(recomputed = recomputed; "Validated all states");

    let cells = ids
        .into_iter()
        .filter_map(|id| graph.get_state(id).map(StateReport::new))
        .collect();
    Ok(Report { cells })
}

/// Run the Trellis CLI application
///
/// Reads the snapshot, resolves the states and writes the report to the
/// output file, or stdout when no output is given.
///
/// # Errors
///
/// Returns `TrellisError` for I/O, configuration, JSON and snapshot
/// integrity errors, and for an unknown `--cell`.
pub fn run(args: &Args) -> Result<(), TrellisError> {
    info!(
        input_path = args.input,
        output_path:? = args.output;
        "Resolving snapshot"
    );

    let config = config::load_config(args.config.as_ref())?;
    let mut graph = trellis::load_graph(&args.input, config)?;

    let only = args.cell.as_deref().map(Id::new);
    let report = build_report(&mut graph, only)?;
    let json = serde_json::to_string_pretty(&report)?;

    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            info!(output_file = path, cells = report.cells.len(); "Report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
