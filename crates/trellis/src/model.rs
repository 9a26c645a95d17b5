//! The cell store: a rooted tree of cells plus an edge connection index.
//!
//! [`Model`] only knows how to answer structural queries and how to apply a
//! [`Change`]. Validating a mutation and turning it into a change record is
//! the job of [`crate::Graph`], which is the only writer.

mod change;

pub use change::{Change, ChangeSet, Position, SubtreeEntry};

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use log::trace;

use trellis_core::{
    cell::{Cell, Geometry, Routable, Terminal, TerminalEnd},
    identifier::Id,
};

use crate::error::StructuralError;

/// Id of the root cell of a default model.
pub const DEFAULT_ROOT: &str = "root";

#[derive(Debug, Clone)]
struct CellEntry {
    cell: Cell,
    parent: Option<Id>,
    children: Vec<Id>,
}

/// Hierarchical cell store.
///
/// Every cell except the root has exactly one parent and appears exactly
/// once in that parent's ordered children. Edges are additionally indexed by
/// the cells their terminals point at.
#[derive(Debug, Clone)]
pub struct Model {
    cells: IndexMap<Id, CellEntry>,
    root: Id,
    next_anonymous: usize,
    /// Terminal cell -> edges whose source or target is that cell.
    connections: HashMap<Id, IndexSet<Id>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(Id::new(DEFAULT_ROOT))
    }
}

impl Model {
    /// Creates a model holding only an empty root node.
    pub fn new(root: Id) -> Self {
        Self::with_root(Cell::node(root, Geometry::default()))
    }

    pub(crate) fn with_root(root: Cell) -> Self {
        let id = root.id();
        let mut cells = IndexMap::new();
        cells.insert(
            id,
            CellEntry {
                cell: root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            cells,
            root: id,
            next_anonymous: 0,
            connections: HashMap::new(),
        }
    }

    pub fn root(&self) -> Id {
        self.root
    }

    /// Number of cells, root included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.cells.contains_key(&id)
    }

    pub fn cell(&self, id: Id) -> Option<&Cell> {
        self.cells.get(&id).map(|entry| &entry.cell)
    }

    /// Cells in insertion order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().map(|entry| &entry.cell)
    }

    pub fn parent(&self, id: Id) -> Option<Id> {
        self.cells.get(&id).and_then(|entry| entry.parent)
    }

    /// Ordered children; empty for leaves and unknown ids.
    pub fn children(&self, id: Id) -> &[Id] {
        self.cells
            .get(&id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or_default()
    }

    /// The cell's parent and index among its siblings. `None` for the root.
    pub fn position(&self, id: Id) -> Option<Position> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|child| *child == id)?;
        Some(Position::new(parent, index))
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        std::iter::successors(self.parent(id), |current| self.parent(*current))
    }

    /// True when `ancestor` is `cell` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: Id, cell: Id) -> bool {
        self.contains(cell) && (ancestor == cell || self.ancestors(cell).any(|a| a == ancestor))
    }

    /// All descendants in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: Id) -> Vec<Id> {
        let mut out = Vec::new();
        let mut stack: Vec<Id> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// `id` followed by its descendants in pre-order.
    pub fn subtree(&self, id: Id) -> Vec<Id> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = vec![id];
        out.extend(self.descendants(id));
        out
    }

    /// Every cell in pre-order, starting at the root.
    pub fn pre_order(&self) -> Vec<Id> {
        self.subtree(self.root)
    }

    /// Edges whose source or target is `id`, in connection order.
    pub fn edges_of(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        self.connections
            .get(&id)
            .into_iter()
            .flat_map(|edges| edges.iter().copied())
    }

    /// Edges from `source` to `target`. Unless `directed`, edges from
    /// `target` to `source` are included too.
    pub fn edges_between(&self, source: Id, target: Id, directed: bool) -> Vec<Id> {
        self.edges_of(source)
            .filter(|edge| {
                let Some(cell) = self.cell(*edge) else {
                    return false;
                };
                let s = cell.terminal_cell(TerminalEnd::Source);
                let t = cell.terminal_cell(TerminalEnd::Target);
                (s == Some(source) && t == Some(target))
                    || (!directed && s == Some(target) && t == Some(source))
            })
            .collect()
    }

    pub fn terminal(&self, edge: Id, end: TerminalEnd) -> Option<&Terminal> {
        self.cell(edge).and_then(|cell| cell.terminal(end))
    }

    /// Returns an unused anonymous id (`__<n>`).
    pub fn next_id(&mut self) -> Id {
        loop {
            let id = Id::anonymous(self.next_anonymous);
            self.next_anonymous += 1;
            if !self.contains(id) {
                return id;
            }
        }
    }

    /// The subtree rooted at `id` as change entries, pre-order.
    pub(crate) fn subtree_entries(&self, id: Id) -> Vec<SubtreeEntry> {
        self.subtree(id)
            .into_iter()
            .filter_map(|current| {
                let entry = self.cells.get(&current)?;
                let parent = entry.parent.unwrap_or(current);
                Some(SubtreeEntry::new(entry.cell.clone(), parent))
            })
            .collect()
    }

    fn entry_mut(&mut self, id: Id) -> Result<&mut CellEntry, StructuralError> {
        self.cells
            .get_mut(&id)
            .ok_or(StructuralError::UnknownCell(id))
    }

    fn cell_mut(&mut self, id: Id) -> Result<&mut Cell, StructuralError> {
        self.entry_mut(id).map(|entry| &mut entry.cell)
    }

    /// Inserts a detached cell under `parent`, at `index` or appended.
    pub(crate) fn insert(
        &mut self,
        cell: Cell,
        parent: Id,
        index: Option<usize>,
    ) -> Result<(), StructuralError> {
        let id = cell.id();
        if self.contains(id) {
            return Err(StructuralError::DuplicateId(id));
        }
        let siblings = &mut self
            .cells
            .get_mut(&parent)
            .ok_or(StructuralError::UnknownParent(parent))?
            .children;
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(index, id);

        let connected: Vec<Id> = cell
            .ends()
            .map(|ends| ends.connected_cells().collect())
            .unwrap_or_default();
        self.cells.insert(
            id,
            CellEntry {
                cell,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        for terminal in connected {
            self.connections.entry(terminal).or_default().insert(id);
        }
        Ok(())
    }

    fn detach(&mut self, id: Id) {
        if let Some(parent) = self.parent(id) {
            if let Some(entry) = self.cells.get_mut(&parent) {
                entry.children.retain(|child| *child != id);
            }
        }
    }

    fn connected_cells(&self, edge: Id) -> Vec<Id> {
        self.cell(edge)
            .and_then(Cell::ends)
            .map(|ends| ends.connected_cells().collect())
            .unwrap_or_default()
    }

    fn unindex_edge(&mut self, edge: Id) {
        for terminal in self.connected_cells(edge) {
            if let Some(edges) = self.connections.get_mut(&terminal) {
                edges.shift_remove(&edge);
                if edges.is_empty() {
                    self.connections.remove(&terminal);
                }
            }
        }
    }

    fn index_edge(&mut self, edge: Id) {
        for terminal in self.connected_cells(edge) {
            self.connections.entry(terminal).or_default().insert(edge);
        }
    }

    /// Applies a change record. The record is trusted to be valid for the
    /// current model; failures only report ids that no longer resolve.
    pub(crate) fn apply(&mut self, change: &Change) -> Result<(), StructuralError> {
        trace!(change = change.name(), cell:% = change.cell(); "Applying change");
        match change {
            Change::CellAdded {
                position, subtree, ..
            } => {
                for (i, entry) in subtree.iter().enumerate() {
                    let (parent, index) = if i == 0 {
                        (position.parent(), Some(position.index()))
                    } else {
                        (entry.parent(), None)
                    };
                    self.insert(entry.cell().clone(), parent, index)?;
                }
            }
            Change::CellRemoved { cell, subtree, .. } => {
                if !self.contains(*cell) {
                    return Err(StructuralError::UnknownCell(*cell));
                }
                self.detach(*cell);
                for entry in subtree.iter().rev() {
                    let id = entry.cell().id();
                    self.unindex_edge(id);
                    self.cells.shift_remove(&id);
                }
            }
            Change::GeometryChanged { cell, current, .. } => {
                self.cell_mut(*cell)?.set_geometry(current.clone());
            }
            Change::StyleChanged { cell, current, .. } => {
                self.cell_mut(*cell)?.set_style(current.clone());
            }
            Change::TerminalChanged {
                edge, end, current, ..
            } => {
                self.unindex_edge(*edge);
                let result = self
                    .cell_mut(*edge)
                    .and_then(|cell| cell.ends_mut().ok_or(StructuralError::NotAnEdge(*edge)))
                    .map(|ends| {
                        ends.replace_terminal(*end, *current);
                    });
                self.index_edge(*edge);
                result?;
            }
            Change::VisibilityChanged { cell, current, .. } => {
                self.cell_mut(*cell)?.set_visible(*current);
            }
            Change::CollapsedChanged { cell, current, .. } => {
                self.cell_mut(*cell)?.set_collapsed(*current);
            }
            Change::ParentChanged { cell, current, .. } => {
                if !self.contains(*cell) {
                    return Err(StructuralError::UnknownCell(*cell));
                }
                let parent = current.parent();
                if !self.contains(parent) {
                    return Err(StructuralError::UnknownParent(parent));
                }
                self.detach(*cell);
                let siblings = &mut self.entry_mut(parent)?.children;
                let index = current.index().min(siblings.len());
                siblings.insert(index, *cell);
                self.entry_mut(*cell)?.parent = Some(parent);
            }
            Change::DataChanged { cell, current, .. } => {
                self.cell_mut(*cell)?.set_data(current.clone());
            }
            Change::ConnectableChanged { cell, current, .. } => {
                let (incoming, outgoing) = *current;
                self.cell_mut(*cell)?.set_connectable(incoming, outgoing);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::geometry::Point;

    use super::*;

    fn node(name: &str) -> Cell {
        Cell::node(Id::new(name), Geometry::new(0.0, 0.0, 10.0, 10.0))
    }

    fn model_with(cells: &[(&str, &str)]) -> Model {
        let mut model = Model::default();
        for (name, parent) in cells {
            model
                .insert(node(name), Id::new(parent), None)
                .expect("valid insert");
        }
        model
    }

    #[test]
    fn test_insert_and_children_order() {
        let mut model = model_with(&[("a", "root"), ("b", "root")]);
        model
            .insert(node("c"), model.root(), Some(1))
            .expect("valid insert");
        model
            .insert(node("d"), model.root(), Some(99))
            .expect("index clamps");

        assert_eq!(
            model.children(model.root()),
            &[Id::new("a"), Id::new("c"), Id::new("b"), Id::new("d")]
        );
        assert_eq!(
            model.position(Id::new("c")),
            Some(Position::new(model.root(), 1))
        );
    }

    #[test]
    fn test_insert_errors() {
        let mut model = model_with(&[("a", "root")]);
        assert_eq!(
            model.insert(node("a"), model.root(), None),
            Err(StructuralError::DuplicateId(Id::new("a")))
        );
        assert_eq!(
            model.insert(node("x"), Id::new("missing"), None),
            Err(StructuralError::UnknownParent(Id::new("missing")))
        );
    }

    #[test]
    fn test_ancestry() {
        let model = model_with(&[("g", "root"), ("a", "g"), ("b", "a"), ("c", "g")]);
        assert!(model.is_ancestor(Id::new("g"), Id::new("b")));
        assert!(model.is_ancestor(Id::new("b"), Id::new("b")));
        assert!(!model.is_ancestor(Id::new("c"), Id::new("b")));
        assert_eq!(
            model.descendants(Id::new("g")),
            vec![Id::new("a"), Id::new("b"), Id::new("c")]
        );
        let ancestors: Vec<Id> = model.ancestors(Id::new("b")).collect();
        assert_eq!(ancestors, vec![Id::new("a"), Id::new("g"), model.root()]);
    }

    #[test]
    fn test_connection_index() {
        let mut model = model_with(&[("a", "root"), ("b", "root")]);
        let edge = Cell::edge(Id::new("e"), Id::new("a"), Id::new("b"));
        model.insert(edge, model.root(), None).expect("valid insert");

        assert_eq!(model.edges_of(Id::new("a")).collect::<Vec<_>>(), vec![Id::new("e")]);
        assert_eq!(
            model.edges_between(Id::new("a"), Id::new("b"), true),
            vec![Id::new("e")]
        );
        assert!(model.edges_between(Id::new("b"), Id::new("a"), true).is_empty());
        assert_eq!(
            model.edges_between(Id::new("b"), Id::new("a"), false),
            vec![Id::new("e")]
        );
    }

    #[test]
    fn test_terminal_change_reindexes() {
        let mut model = model_with(&[("a", "root"), ("b", "root"), ("c", "root")]);
        let edge = Cell::edge(Id::new("e"), Id::new("a"), Id::new("b"));
        model.insert(edge, model.root(), None).expect("valid insert");

        let change = Change::TerminalChanged {
            edge: Id::new("e"),
            end: TerminalEnd::Target,
            previous: Terminal::new(Id::new("b")),
            current: Terminal::new(Id::new("c")),
        };
        model.apply(&change).expect("valid change");
        assert_eq!(model.edges_of(Id::new("b")).count(), 0);
        assert_eq!(model.edges_of(Id::new("c")).count(), 1);

        model.apply(&change.inverse()).expect("valid change");
        assert_eq!(model.edges_of(Id::new("b")).count(), 1);
        assert_eq!(model.edges_of(Id::new("c")).count(), 0);
    }

    #[test]
    fn test_self_loop_index_survives_one_end_moving() {
        let mut model = model_with(&[("a", "root"), ("b", "root")]);
        let edge = Cell::edge(Id::new("loop"), Id::new("a"), Id::new("a"));
        model.insert(edge, model.root(), None).expect("valid insert");

        model
            .apply(&Change::TerminalChanged {
                edge: Id::new("loop"),
                end: TerminalEnd::Target,
                previous: Terminal::new(Id::new("a")),
                current: Terminal::new(Point::new(5.0, 5.0)),
            })
            .expect("valid change");

        assert_eq!(model.edges_of(Id::new("a")).count(), 1);
    }

    #[test]
    fn test_remove_and_restore_subtree() {
        let mut model = model_with(&[("g", "root"), ("a", "g"), ("b", "g"), ("x", "root")]);
        let position = model.position(Id::new("g")).expect("has parent");
        let subtree = model.subtree_entries(Id::new("g"));
        let removed = Change::CellRemoved {
            cell: Id::new("g"),
            position,
            subtree,
        };

        model.apply(&removed).expect("valid change");
        assert!(!model.contains(Id::new("a")));
        assert_eq!(model.children(model.root()), &[Id::new("x")]);

        model.apply(&removed.inverse()).expect("valid change");
        assert_eq!(model.children(model.root()), &[Id::new("g"), Id::new("x")]);
        assert_eq!(model.children(Id::new("g")), &[Id::new("a"), Id::new("b")]);
    }

    #[test]
    fn test_parent_change_round_trip() {
        let mut model = model_with(&[("a", "root"), ("b", "root"), ("c", "root")]);
        let change = Change::ParentChanged {
            cell: Id::new("a"),
            previous: Position::new(model.root(), 0),
            current: Position::new(Id::new("c"), 0),
        };

        model.apply(&change).expect("valid change");
        assert_eq!(model.parent(Id::new("a")), Some(Id::new("c")));
        assert_eq!(model.children(model.root()), &[Id::new("b"), Id::new("c")]);

        model.apply(&change.inverse()).expect("valid change");
        assert_eq!(
            model.children(model.root()),
            &[Id::new("a"), Id::new("b"), Id::new("c")]
        );
    }

    #[test]
    fn test_next_id_skips_taken() {
        let mut model = Model::default();
        model
            .insert(node("__0"), model.root(), None)
            .expect("valid insert");
        assert_eq!(model.next_id(), Id::anonymous(1));
        assert_eq!(model.next_id(), Id::anonymous(2));
    }
}
