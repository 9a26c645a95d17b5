//! Trellis - a transactional diagram model with an incremental routing view.
//!
//! A [`Graph`] owns a tree of cells (nodes and edges), records every
//! mutation as a [`Change`], and commits changes in transactions that feed
//! the undo history and the event stream. Its [`View`] computes absolute
//! bounds and routed edge points lazily, recomputing only what a change
//! made dirty.
//!
//! # Examples
//!
//! ```
//! use trellis::{Graph, cell::Geometry, geometry::Point};
//!
//! let mut graph = Graph::default();
//! let a = graph.add_node(Geometry::new(0.0, 0.0, 80.0, 30.0), None)?;
//! let b = graph.add_node(Geometry::new(200.0, 0.0, 80.0, 30.0), None)?;
//! let edge = graph.add_edge(a, b, None)?;
//!
//! graph.set_geometry(b, Geometry::new(200.0, 100.0, 80.0, 30.0))?;
//! let points = graph.get_state(edge).expect("visible").points().to_vec();
//! assert_eq!(points.len(), 2);
//!
//! graph.undo()?;
//! let state = graph.get_state(edge).expect("visible");
//! assert_eq!(state.points()[1], Point::new(200.0, 15.0));
//! # Ok::<(), trellis::TrellisError>(())
//! ```

pub mod config;
pub mod events;
pub mod hooks;
pub mod model;
pub mod snapshot;
pub mod undo;
pub mod validator;
pub mod view;

mod error;
mod graph;
mod transaction;

pub use trellis_core::{cell, geometry, identifier, routing, style};

pub use error::{ConnectionError, IntegrityError, StructuralError, TrellisError};
pub use events::{GraphEvent, SubscriptionId};
pub use graph::Graph;
pub use model::{Change, ChangeSet, Model};
pub use snapshot::Snapshot;
pub use transaction::Transaction;
pub use view::{CellState, View};

use std::{fs, path::Path};

use log::{debug, info};

use config::GraphConfig;

/// Reads a JSON snapshot from a file.
///
/// # Errors
///
/// Returns [`TrellisError::Io`] when the file cannot be read and
/// [`TrellisError::Json`] when it is not a snapshot.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Snapshot, TrellisError> {
    let path = path.as_ref();
    info!(path:? = path; "Reading snapshot");
    let json = fs::read_to_string(path)?;
    let snapshot = Snapshot::from_json(&json)?;
    debug!(cells = snapshot.cells.len(); "Snapshot parsed");
    Ok(snapshot)
}

/// Writes a snapshot to a file as pretty-printed JSON.
pub fn write_snapshot(path: impl AsRef<Path>, snapshot: &Snapshot) -> Result<(), TrellisError> {
    let path = path.as_ref();
    fs::write(path, snapshot.to_json()?)?;
    info!(path:? = path; "Snapshot written");
    Ok(())
}

/// Builds a graph from a snapshot file.
///
/// # Errors
///
/// I/O, JSON and [`IntegrityError`]s are returned as [`TrellisError`].
pub fn load_graph(path: impl AsRef<Path>, config: GraphConfig) -> Result<Graph, TrellisError> {
    let snapshot = read_snapshot(path)?;
    let mut graph = Graph::new(config);
    graph.import_snapshot(&snapshot)?;
    Ok(graph)
}
