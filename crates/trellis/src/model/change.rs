//! Change records produced by model mutations.
//!
//! Every record carries both the value before and after the mutation, so
//! [`Change::inverse`] is a pure swap and replaying a [`ChangeSet`] forwards
//! or backwards never consults the model.

use trellis_core::{
    cell::{Cell, Geometry, Terminal, TerminalEnd},
    identifier::Id,
    style::Style,
};

/// Where a cell sits in the tree: its parent and its index among the
/// parent's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    parent: Id,
    index: usize,
}

impl Position {
    pub fn new(parent: Id, index: usize) -> Self {
        Self { parent, index }
    }

    pub fn parent(&self) -> Id {
        self.parent
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// One cell of an added or removed subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeEntry {
    cell: Cell,
    parent: Id,
}

impl SubtreeEntry {
    pub fn new(cell: Cell, parent: Id) -> Self {
        Self { cell, parent }
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn parent(&self) -> Id {
        self.parent
    }
}

/// A single model mutation.
///
/// `CellAdded` and `CellRemoved` carry the whole subtree in pre-order
/// (parents before children, siblings in order); the first entry is the
/// subtree root, inserted at `position`, and every later entry is appended
/// to its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    CellAdded {
        cell: Id,
        position: Position,
        subtree: Vec<SubtreeEntry>,
    },
    CellRemoved {
        cell: Id,
        position: Position,
        subtree: Vec<SubtreeEntry>,
    },
    GeometryChanged {
        cell: Id,
        previous: Geometry,
        current: Geometry,
    },
    StyleChanged {
        cell: Id,
        previous: Style,
        current: Style,
    },
    TerminalChanged {
        edge: Id,
        end: TerminalEnd,
        previous: Terminal,
        current: Terminal,
    },
    VisibilityChanged {
        cell: Id,
        previous: bool,
        current: bool,
    },
    CollapsedChanged {
        cell: Id,
        previous: bool,
        current: bool,
    },
    ParentChanged {
        cell: Id,
        previous: Position,
        current: Position,
    },
    DataChanged {
        cell: Id,
        previous: serde_json::Value,
        current: serde_json::Value,
    },
    /// Connectable flags as `(incoming, outgoing)`.
    ConnectableChanged {
        cell: Id,
        previous: (bool, bool),
        current: (bool, bool),
    },
}

impl Change {
    /// The cell the change applies to.
    pub fn cell(&self) -> Id {
        match self {
            Self::CellAdded { cell, .. }
            | Self::CellRemoved { cell, .. }
            | Self::GeometryChanged { cell, .. }
            | Self::StyleChanged { cell, .. }
            | Self::VisibilityChanged { cell, .. }
            | Self::CollapsedChanged { cell, .. }
            | Self::ParentChanged { cell, .. }
            | Self::DataChanged { cell, .. }
            | Self::ConnectableChanged { cell, .. } => *cell,
            Self::TerminalChanged { edge, .. } => *edge,
        }
    }

    /// Short name of the variant, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CellAdded { .. } => "cell-added",
            Self::CellRemoved { .. } => "cell-removed",
            Self::GeometryChanged { .. } => "geometry-changed",
            Self::StyleChanged { .. } => "style-changed",
            Self::TerminalChanged { .. } => "terminal-changed",
            Self::VisibilityChanged { .. } => "visibility-changed",
            Self::CollapsedChanged { .. } => "collapsed-changed",
            Self::ParentChanged { .. } => "parent-changed",
            Self::DataChanged { .. } => "data-changed",
            Self::ConnectableChanged { .. } => "connectable-changed",
        }
    }

    /// The change that undoes this one.
    pub fn inverse(&self) -> Self {
        match self.clone() {
            Self::CellAdded {
                cell,
                position,
                subtree,
            } => Self::CellRemoved {
                cell,
                position,
                subtree,
            },
            Self::CellRemoved {
                cell,
                position,
                subtree,
            } => Self::CellAdded {
                cell,
                position,
                subtree,
            },
            Self::GeometryChanged {
                cell,
                previous,
                current,
            } => Self::GeometryChanged {
                cell,
                previous: current,
                current: previous,
            },
            Self::StyleChanged {
                cell,
                previous,
                current,
            } => Self::StyleChanged {
                cell,
                previous: current,
                current: previous,
            },
            Self::TerminalChanged {
                edge,
                end,
                previous,
                current,
            } => Self::TerminalChanged {
                edge,
                end,
                previous: current,
                current: previous,
            },
            Self::VisibilityChanged {
                cell,
                previous,
                current,
            } => Self::VisibilityChanged {
                cell,
                previous: current,
                current: previous,
            },
            Self::CollapsedChanged {
                cell,
                previous,
                current,
            } => Self::CollapsedChanged {
                cell,
                previous: current,
                current: previous,
            },
            Self::ParentChanged {
                cell,
                previous,
                current,
            } => Self::ParentChanged {
                cell,
                previous: current,
                current: previous,
            },
            Self::DataChanged {
                cell,
                previous,
                current,
            } => Self::DataChanged {
                cell,
                previous: current,
                current: previous,
            },
            Self::ConnectableChanged {
                cell,
                previous,
                current,
            } => Self::ConnectableChanged {
                cell,
                previous: current,
                current: previous,
            },
        }
    }
}

/// The ordered changes of one committed transaction.
///
/// This is also the unit the undo manager stores: undoing a set applies the
/// inverse of every change in reverse order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// The set that undoes this one: inverses in reverse order.
    pub fn inverse(&self) -> Self {
        Self {
            changes: self.changes.iter().rev().map(Change::inverse).collect(),
        }
    }

    /// Whether any change touches `cell` directly.
    pub fn touches(&self, cell: Id) -> bool {
        self.changes.iter().any(|change| change.cell() == cell)
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
