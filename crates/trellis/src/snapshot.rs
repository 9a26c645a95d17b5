//! JSON snapshots of a model.
//!
//! A [`Snapshot`] is an ordered list of [`CellRecord`]s in pre-order
//! (parents before children, children in order). Importing rebuilds the
//! tree with exactly that sibling order, so exporting an imported snapshot
//! yields the same snapshot again.
//!
//! # Format
//!
//! ```json
//! {
//!   "cells": [
//!     { "id": "root", "kind": "node" },
//!     { "id": "a", "kind": "node", "parent": "root",
//!       "geometry": { "x": 0, "y": 0, "width": 80, "height": 30 } },
//!     { "id": "e", "kind": "edge", "parent": "root",
//!       "terminals": { "source": { "cell": "a" }, "target": { "point": { "x": 5, "y": 5 } } } }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use trellis_core::{
    cell::{Cell, Constraint, Geometry, Terminal, TerminalEnd, TerminalRef},
    identifier::Id,
    style::Style,
};

use crate::{error::IntegrityError, model::Model};

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_true() -> bool {
    true
}

/// Whether a record is a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Node,
    Edge,
}

/// Both ends of an edge record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalsRecord {
    pub source: TerminalRef,
    pub target: TerminalRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_constraint: Option<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_constraint: Option<Constraint>,
}

impl TerminalsRecord {
    fn terminal(&self, end: TerminalEnd) -> Terminal {
        let (end, constraint) = match end {
            TerminalEnd::Source => (self.source, self.source_constraint),
            TerminalEnd::Target => (self.target, self.target_constraint),
        };
        let mut terminal = Terminal::new(end);
        terminal.set_constraint(constraint);
        terminal
    }

    fn cells(&self) -> impl Iterator<Item = Id> {
        [self.source.cell(), self.target.cell()].into_iter().flatten()
    }
}

/// Connectable flags of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectableRecord {
    #[serde(default = "default_true")]
    pub incoming: bool,
    #[serde(default = "default_true")]
    pub outgoing: bool,
}

impl Default for ConnectableRecord {
    fn default() -> Self {
        Self {
            incoming: true,
            outgoing: true,
        }
    }
}

impl ConnectableRecord {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// One cell of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: Id,
    pub kind: RecordKind,
    /// `None` only for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id>,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminals: Option<TerminalsRecord>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "ConnectableRecord::is_default")]
    pub connectable: ConnectableRecord,
}

impl CellRecord {
    fn from_cell(cell: &Cell, parent: Option<Id>) -> Self {
        let terminals = cell.ends().map(|_| {
            let source = cell.terminal(TerminalEnd::Source);
            let target = cell.terminal(TerminalEnd::Target);
            TerminalsRecord {
                source: source.map_or(TerminalRef::Point(Default::default()), Terminal::end),
                target: target.map_or(TerminalRef::Point(Default::default()), Terminal::end),
                source_constraint: source.and_then(Terminal::constraint),
                target_constraint: target.and_then(Terminal::constraint),
            }
        });
        let (incoming, outgoing) = cell.connectable();
        Self {
            id: cell.id(),
            kind: if cell.is_edge() {
                RecordKind::Edge
            } else {
                RecordKind::Node
            },
            parent,
            geometry: cell.geometry().clone(),
            style: cell.style().clone(),
            data: cell.data().clone(),
            terminals,
            visible: cell.is_visible(),
            collapsed: cell.is_collapsed(),
            connectable: ConnectableRecord { incoming, outgoing },
        }
    }

    fn to_cell(&self) -> Result<Cell, IntegrityError> {
        let cell = match (self.kind, &self.terminals) {
            (RecordKind::Node, None) => Cell::node(self.id, self.geometry.clone()),
            (RecordKind::Node, Some(_)) => return Err(IntegrityError::TerminalsOnNode(self.id)),
            (RecordKind::Edge, None) => return Err(IntegrityError::MissingTerminals(self.id)),
            (RecordKind::Edge, Some(terminals)) => Cell::edge(
                self.id,
                terminals.terminal(TerminalEnd::Source),
                terminals.terminal(TerminalEnd::Target),
            )
            .with_geometry(self.geometry.clone()),
        };
        Ok(cell
            .with_style(self.style.clone())
            .with_data(self.data.clone())
            .with_visible(self.visible)
            .with_collapsed(self.collapsed)
            .with_connectable(self.connectable.incoming, self.connectable.outgoing))
    }
}

/// A serializable copy of a whole model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cells: Vec<CellRecord>,
}

impl Snapshot {
    /// Records every cell of `model` in pre-order.
    pub fn from_model(model: &Model) -> Self {
        let cells = model
            .pre_order()
            .into_iter()
            .filter_map(|id| {
                let cell = model.cell(id)?;
                Some(CellRecord::from_cell(cell, model.parent(id)))
            })
            .collect();
        Self { cells }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Checks the records and builds a fresh model from them.
    ///
    /// # Errors
    ///
    /// Returns an [`IntegrityError`] for duplicate ids, a missing or
    /// ambiguous root, an edge root, unknown parents, parent cycles, unknown
    /// or invalid terminals, node/edge records with mismatched terminals, and
    /// records that are not in pre-order.
    pub fn build_model(&self) -> Result<Model, IntegrityError> {
        let mut by_id: HashMap<Id, &CellRecord> = HashMap::with_capacity(self.cells.len());
        for record in &self.cells {
            if by_id.insert(record.id, record).is_some() {
                return Err(IntegrityError::DuplicateId(record.id));
            }
        }

        let mut roots = self.cells.iter().filter(|record| record.parent.is_none());
        let root = roots.next().ok_or(IntegrityError::MissingRoot)?;
        if let Some(second) = roots.next() {
            return Err(IntegrityError::MultipleRoots {
                first: root.id,
                second: second.id,
            });
        }
        if root.kind != RecordKind::Node {
            return Err(IntegrityError::EdgeRoot(root.id));
        }

        let parent_of = |id: Id| by_id.get(&id).and_then(|record| record.parent);

        for record in &self.cells {
            if let Some(parent) = record.parent {
                if !by_id.contains_key(&parent) {
                    return Err(IntegrityError::UnknownParent {
                        cell: record.id,
                        parent,
                    });
                }
            }
        }

        // With a single root and known parents, every chain that does not
        // reach the root within `len` steps is a cycle.
        for record in &self.cells {
            let mut current = record.id;
            let mut steps = 0;
            while let Some(parent) = parent_of(current) {
                current = parent;
                steps += 1;
                if steps > self.cells.len() {
                    return Err(IntegrityError::Cycle(record.id));
                }
            }
        }

        let is_ancestor_or_self = |ancestor: Id, mut cell: Id| loop {
            if cell == ancestor {
                break true;
            }
            match parent_of(cell) {
                Some(parent) => cell = parent,
                None => break false,
            }
        };

        for record in &self.cells {
            let Some(terminals) = &record.terminals else {
                continue;
            };
            for terminal in terminals.cells() {
                if !by_id.contains_key(&terminal) {
                    return Err(IntegrityError::UnknownTerminal {
                        edge: record.id,
                        terminal,
                    });
                }
                if is_ancestor_or_self(record.id, terminal) {
                    return Err(IntegrityError::InvalidTerminal {
                        edge: record.id,
                        terminal,
                    });
                }
            }
        }

        let cells: HashMap<Id, Cell> = self
            .cells
            .iter()
            .map(|record| record.to_cell().map(|cell| (record.id, cell)))
            .collect::<Result<_, IntegrityError>>()?;

        let mut children: HashMap<Id, Vec<Id>> = HashMap::new();
        for record in &self.cells {
            if let Some(parent) = record.parent {
                children.entry(parent).or_default().push(record.id);
            }
        }

        let root_cell = cells
            .get(&root.id)
            .cloned()
            .ok_or(IntegrityError::MissingRoot)?;
        let mut model = Model::with_root(root_cell);

        let mut inserted = HashSet::new();
        let mut stack: Vec<Id> = children
            .get(&root.id)
            .map(|ids| ids.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if !inserted.insert(id) {
                return Err(IntegrityError::Cycle(id));
            }
            let parent = parent_of(id).ok_or(IntegrityError::MissingRoot)?;
            let cell = cells
                .get(&id)
                .cloned()
                .ok_or(IntegrityError::UnknownParent { cell: id, parent })?;
            model
                .insert(cell, parent, None)
                .map_err(|_| IntegrityError::UnknownParent { cell: id, parent })?;
            if let Some(ids) = children.get(&id) {
                stack.extend(ids.iter().rev().copied());
            }
        }

        // Export always writes pre-order, so anything else would not survive
        // a round trip unchanged.
        if let Some((record, _)) = self
            .cells
            .iter()
            .zip(model.pre_order())
            .find(|(record, id)| record.id != *id)
        {
            return Err(IntegrityError::OutOfOrder(record.id));
        }

        debug!(cells = model.len(); "Built model from snapshot");
        Ok(model)
    }
}
