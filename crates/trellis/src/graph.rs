//! The [`Graph`] facade: the single writer of a model.
//!
//! Every mutation goes through a transaction. Mutations called outside an
//! explicit [`Transaction`] open a one-operation transaction of their own.
//! Only the outermost commit records an undo entry and emits an event; inner
//! commits only decrement the nesting level.

use std::{collections::HashSet, rc::Rc};

use indexmap::IndexSet;
use log::{debug, info, trace, warn};

use trellis_core::{
    cell::{Cell, Geometry, Terminal, TerminalEnd},
    geometry::Point,
    identifier::Id,
    routing::Registry,
    style::Style,
};

use crate::{
    config::GraphConfig,
    error::{ConnectionError, StructuralError, TrellisError},
    events::{EventDispatcher, GraphEvent, SubscriptionId},
    hooks::Hooks,
    model::{Change, ChangeSet, Model, Position, SubtreeEntry},
    snapshot::Snapshot,
    transaction::Transaction,
    undo::UndoManager,
    validator::Validator,
    view::{CellState, View},
};

/// A diagram: cell model, view cache, undo history, validator and event
/// feed behind one mutation API.
///
/// # Examples
///
/// ```
/// use trellis::{Graph, cell::Geometry, cell::TerminalEnd, geometry::Point};
///
/// let mut graph = Graph::default();
/// let a = graph.add_node(Geometry::new(0.0, 0.0, 80.0, 30.0), None)?;
/// let b = graph.add_node(Geometry::new(200.0, 0.0, 80.0, 30.0), None)?;
/// let edge = graph.add_edge(a, b, None)?;
///
/// let state = graph.get_state(edge).expect("edge is visible");
/// assert_eq!(
///     state.points(),
///     &[Point::new(80.0, 15.0), Point::new(200.0, 15.0)]
/// );
///
/// graph.undo()?;
/// assert!(!graph.model().contains(edge));
/// # Ok::<(), trellis::TrellisError>(())
/// ```
#[derive(Debug)]
pub struct Graph {
    model: Model,
    view: View,
    undo: UndoManager,
    validator: Validator,
    events: EventDispatcher,
    hooks: Hooks,
    pending: Vec<Change>,
    update_level: usize,
    replaying: bool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl Graph {
    /// Creates an empty graph with the built-in routers and perimeters.
    pub fn new(config: GraphConfig) -> Self {
        Self::with_registry(config, Registry::with_builtins())
    }

    /// Creates an empty graph using a custom registry.
    pub fn with_registry(config: GraphConfig, registry: Registry) -> Self {
        let view = View::new(config.view(), config.style().clone(), Rc::new(registry));
        Self {
            model: Model::default(),
            view,
            undo: UndoManager::new(config.model().undo_depth()),
            validator: Validator::new(config.validation().clone()),
            events: EventDispatcher::new(),
            hooks: Hooks::new(),
            pending: Vec::new(),
            update_level: 0,
            replaying: false,
        }
    }

    // Transactions

    /// Opens a transaction that ends when the guard is dropped.
    pub fn begin(&mut self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Runs `f` inside one transaction. The transaction commits whatever
    /// `f` recorded, even when it returns an error.
    pub fn transact<T, E>(&mut self, f: impl FnOnce(&mut Graph) -> Result<T, E>) -> Result<T, E> {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    /// Increments the nesting level.
    pub fn begin_update(&mut self) {
        self.update_level += 1;
        trace!(level = self.update_level; "Begin update");
    }

    /// Decrements the nesting level and commits at zero.
    pub fn end_update(&mut self) {
        if self.update_level == 0 {
            warn!("end_update called without a matching begin_update");
            return;
        }
        if self.update_level == 1 && !self.replaying {
            self.run_before_commit();
        }
        self.update_level -= 1;
        trace!(level = self.update_level; "End update");
        if self.update_level == 0 {
            self.commit();
        }
    }

    /// Current transaction nesting depth; 0 when idle.
    pub fn update_level(&self) -> usize {
        self.update_level
    }

    fn run_before_commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let Some(mut hook) = self.hooks.take_before_commit() else {
            return;
        };
        let changes = self.pending.clone();
        hook(self, &changes);
        self.hooks.restore_before_commit(hook);
    }

    fn commit(&mut self) {
        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            return;
        }
        let set = ChangeSet::new(changes);
        debug!(changes = set.len(), replaying = self.replaying; "Committed transaction");
        if !self.replaying {
            self.undo.record(set.clone());
        }
        self.events.emit(&GraphEvent::Changed(set));
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Reverts and discards the pending changes from `start` on.
    pub(crate) fn revert_pending(&mut self, start: usize) -> Result<(), StructuralError> {
        let start = start.min(self.pending.len());
        let reverted = self.pending.split_off(start);
        debug!(changes = reverted.len(); "Rolling back");
        for change in reverted.iter().rev() {
            let inverse = change.inverse();
            self.model.apply(&inverse)?;
            self.view.on_change(&self.model, &inverse);
        }
        Ok(())
    }

    fn record(&mut self, change: Change) -> Result<(), StructuralError> {
        self.model.apply(&change)?;
        self.view.on_change(&self.model, &change);
        self.pending.push(change);
        Ok(())
    }

    /// Wraps one mutation in its own transaction level.
    fn update<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, TrellisError>,
    ) -> Result<T, TrellisError> {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    // Mutations

    /// Adds `cell` under `parent` (the root when `None`), at `index` or
    /// appended. Indices past the end append.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate id, an unknown parent, or an edge whose
    /// terminal is unknown or the edge itself.
    pub fn add_cell(
        &mut self,
        cell: Cell,
        parent: Option<Id>,
        index: Option<usize>,
    ) -> Result<Id, TrellisError> {
        let id = cell.id();
        let parent = parent.unwrap_or(self.model.root());
        if self.model.contains(id) {
            return Err(StructuralError::DuplicateId(id).into());
        }
        if !self.model.contains(parent) {
            return Err(StructuralError::UnknownParent(parent).into());
        }
        for end in [TerminalEnd::Source, TerminalEnd::Target] {
            if let Some(terminal) = cell.terminal_cell(end) {
                if terminal == id {
                    return Err(StructuralError::TerminalIsEdge { edge: id, terminal }.into());
                }
                if !self.model.contains(terminal) {
                    return Err(StructuralError::UnknownTerminal(terminal).into());
                }
            }
        }

        let len = self.model.children(parent).len();
        let position = Position::new(parent, index.unwrap_or(len).min(len));
        self.update(|graph| {
            graph.record(Change::CellAdded {
                cell: id,
                position,
                subtree: vec![SubtreeEntry::new(cell.clone(), parent)],
            })?;
            graph.hooks.cell_added(&cell);
            Ok(id)
        })
    }

    /// Adds a node with a generated id.
    pub fn add_node(&mut self, geometry: Geometry, parent: Option<Id>) -> Result<Id, TrellisError> {
        let id = self.model.next_id();
        self.add_cell(Cell::node(id, geometry), parent, None)
    }

    /// Adds an edge with a generated id. The connection is checked by the
    /// validator first.
    pub fn add_edge(
        &mut self,
        source: impl Into<Terminal>,
        target: impl Into<Terminal>,
        parent: Option<Id>,
    ) -> Result<Id, TrellisError> {
        let (source, target) = (source.into(), target.into());
        self.validator
            .check_connection(&self.model, None, source.cell(), target.cell())?;
        let id = self.model.next_id();
        self.add_cell(Cell::edge(id, source, target), parent, None)
    }

    /// Removes a cell, its descendants, and every edge connected to any of
    /// them. Each connected edge is recorded as its own removal before the
    /// cell itself. Returns the removed cell.
    pub fn remove_cell(&mut self, id: Id) -> Result<Cell, TrellisError> {
        if id == self.model.root() {
            return Err(StructuralError::RemoveRoot.into());
        }
        let cell = self
            .model
            .cell(id)
            .cloned()
            .ok_or(StructuralError::UnknownCell(id))?;

        let mut removed: IndexSet<Id> = self.model.subtree(id).into_iter().collect();
        let mut edges = Vec::new();
        let mut next = 0;
        while let Some(current) = removed.get_index(next).copied() {
            next += 1;
            let dependents: Vec<Id> = self
                .model
                .edges_of(current)
                .filter(|edge| !removed.contains(edge))
                .collect();
            for edge in dependents {
                if removed.contains(&edge) {
                    continue;
                }
                edges.push(edge);
                removed.extend(self.model.subtree(edge));
            }
        }

        self.update(|graph| {
            for target in edges.into_iter().chain(std::iter::once(id)) {
                let Some(position) = graph.model.position(target) else {
                    continue;
                };
                let subtree = graph.model.subtree_entries(target);
                graph.record(Change::CellRemoved {
                    cell: target,
                    position,
                    subtree,
                })?;
            }
            Ok(cell)
        })
    }

    fn existing(&self, id: Id) -> Result<&Cell, StructuralError> {
        self.model.cell(id).ok_or(StructuralError::UnknownCell(id))
    }

    /// Replaces a cell's geometry. Returns the previous one.
    pub fn set_geometry(&mut self, id: Id, geometry: Geometry) -> Result<Geometry, TrellisError> {
        let previous = self.existing(id)?.geometry().clone();
        if previous == geometry {
            return Ok(previous);
        }
        self.update(|graph| {
            graph.record(Change::GeometryChanged {
                cell: id,
                previous: previous.clone(),
                current: geometry,
            })?;
            Ok(previous)
        })
    }

    /// Replaces a cell's style. Returns the previous one.
    pub fn set_style(&mut self, id: Id, style: Style) -> Result<Style, TrellisError> {
        let previous = self.existing(id)?.style().clone();
        if previous == style {
            return Ok(previous);
        }
        self.update(|graph| {
            graph.record(Change::StyleChanged {
                cell: id,
                previous: previous.clone(),
                current: style,
            })?;
            Ok(previous)
        })
    }

    pub fn set_visible(&mut self, id: Id, visible: bool) -> Result<bool, TrellisError> {
        let previous = self.existing(id)?.is_visible();
        if previous != visible {
            self.update(|graph| {
                graph.record(Change::VisibilityChanged {
                    cell: id,
                    previous,
                    current: visible,
                })?;
                Ok(())
            })?;
        }
        Ok(previous)
    }

    pub fn set_collapsed(&mut self, id: Id, collapsed: bool) -> Result<bool, TrellisError> {
        let previous = self.existing(id)?.is_collapsed();
        if previous != collapsed {
            self.update(|graph| {
                graph.record(Change::CollapsedChanged {
                    cell: id,
                    previous,
                    current: collapsed,
                })?;
                Ok(())
            })?;
        }
        Ok(previous)
    }

    /// Replaces a cell's user data. Returns the previous value.
    pub fn set_data(
        &mut self,
        id: Id,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, TrellisError> {
        let previous = self.existing(id)?.data().clone();
        if previous == data {
            return Ok(previous);
        }
        self.update(|graph| {
            graph.record(Change::DataChanged {
                cell: id,
                previous: previous.clone(),
                current: data,
            })?;
            Ok(previous)
        })
    }

    /// Sets the connectable flags. Returns the previous `(incoming, outgoing)`.
    pub fn set_connectable(
        &mut self,
        id: Id,
        incoming: bool,
        outgoing: bool,
    ) -> Result<(bool, bool), TrellisError> {
        let previous = self.existing(id)?.connectable();
        let current = (incoming, outgoing);
        if previous != current {
            self.update(|graph| {
                graph.record(Change::ConnectableChanged {
                    cell: id,
                    previous,
                    current,
                })?;
                Ok(())
            })?;
        }
        Ok(previous)
    }

    fn check_terminal(
        &self,
        edge: Id,
        end: TerminalEnd,
        terminal: &Terminal,
    ) -> Result<Terminal, StructuralError> {
        let cell = self.existing(edge)?;
        let previous = *cell
            .terminal(end)
            .ok_or(StructuralError::NotAnEdge(edge))?;
        if let Some(target) = terminal.cell() {
            if !self.model.contains(target) {
                return Err(StructuralError::UnknownTerminal(target));
            }
            if self.model.is_ancestor(edge, target) {
                return Err(StructuralError::TerminalIsEdge {
                    edge,
                    terminal: target,
                });
            }
        }
        Ok(previous)
    }

    /// Replaces one terminal of an edge without consulting the validator.
    /// Returns the previous terminal.
    pub fn set_terminal(
        &mut self,
        edge: Id,
        end: TerminalEnd,
        terminal: impl Into<Terminal>,
    ) -> Result<Terminal, TrellisError> {
        let terminal = terminal.into();
        let previous = self.check_terminal(edge, end, &terminal)?;
        if previous == terminal {
            return Ok(previous);
        }
        self.update(|graph| {
            graph.record(Change::TerminalChanged {
                edge,
                end,
                previous,
                current: terminal,
            })?;
            Ok(previous)
        })
    }

    /// Like [`Graph::set_terminal`], but the validator must accept the
    /// resulting connection first.
    ///
    /// # Errors
    ///
    /// [`TrellisError::Connection`] when the validator refuses; the edge is
    /// left unchanged.
    pub fn connect(
        &mut self,
        edge: Id,
        end: TerminalEnd,
        terminal: impl Into<Terminal>,
    ) -> Result<Terminal, TrellisError> {
        let terminal = terminal.into();
        self.check_terminal(edge, end, &terminal)?;
        let other = self
            .model
            .terminal(edge, end.opposite())
            .and_then(Terminal::cell);
        let (source, target) = match end {
            TerminalEnd::Source => (terminal.cell(), other),
            TerminalEnd::Target => (other, terminal.cell()),
        };
        self.validator
            .check_connection(&self.model, Some(edge), source, target)?;
        self.set_terminal(edge, end, terminal)
    }

    /// Moves a cell under `parent`, at `index` or appended. Returns the
    /// previous position. Geometry is left as is.
    ///
    /// # Errors
    ///
    /// Fails for the root, unknown cells, a cell moved under itself, a cell
    /// moved under one of its descendants, and a cell moved below an edge
    /// connected to it or to one of its descendants.
    pub fn set_parent(
        &mut self,
        id: Id,
        parent: Id,
        index: Option<usize>,
    ) -> Result<Position, TrellisError> {
        let previous = self
            .model
            .position(id)
            .ok_or_else(|| {
                if id == self.model.root() {
                    StructuralError::MoveRoot
                } else {
                    StructuralError::UnknownCell(id)
                }
            })?;
        if !self.model.contains(parent) {
            return Err(StructuralError::UnknownParent(parent).into());
        }
        if id == parent {
            return Err(StructuralError::SelfParent(id).into());
        }
        if self.model.is_ancestor(id, parent) {
            return Err(StructuralError::Cycle { cell: id, parent }.into());
        }
        self.check_moved_terminals(id, parent)?;

        let mut len = self.model.children(parent).len();
        if previous.parent() == parent {
            len -= 1;
        }
        let current = Position::new(parent, index.unwrap_or(len).min(len));
        if current == previous {
            return Ok(previous);
        }
        self.update(|graph| {
            graph.record(Change::ParentChanged {
                cell: id,
                previous,
                current,
            })?;
            Ok(previous)
        })
    }

    /// Like [`Graph::set_parent`], but translates the geometry by the
    /// difference of the two parent origins so the cell keeps its absolute
    /// position. Both changes are committed as one edit.
    pub fn set_parent_keep_position(
        &mut self,
        id: Id,
        parent: Id,
        index: Option<usize>,
    ) -> Result<Position, TrellisError> {
        let old_parent = self.model.parent(id).unwrap_or_else(|| self.model.root());
        let delta = self
            .frame_origin(old_parent)
            .sub_point(self.frame_origin(parent));
        self.transact(|graph| {
            let previous = graph.set_parent(id, parent, index)?;
            if let Some(mut geometry) = graph.geometry(id).cloned() {
                geometry.translate(delta.x(), delta.y());
                graph.set_geometry(id, geometry)?;
            }
            Ok(previous)
        })
    }

    /// Absolute model-space origin children of `id` are placed against.
    fn frame_origin(&mut self, id: Id) -> Point {
        if let Some(origin) = self.view.validate(&self.model, id).map(CellState::origin) {
            return origin;
        }
        // Not viewable: add up the plain offsets along the ancestor chain.
        std::iter::once(id)
            .chain(self.model.ancestors(id))
            .filter_map(|current| self.model.cell(current))
            .filter(|cell| !cell.is_edge() && !cell.geometry().is_relative())
            .fold(Point::default(), |origin, cell| {
                origin.add_point(Point::new(cell.geometry().x(), cell.geometry().y()))
            })
    }

    /// An edge may not end up above one of its own terminals.
    fn check_moved_terminals(&self, id: Id, parent: Id) -> Result<(), StructuralError> {
        let moved: HashSet<Id> = self.model.subtree(id).into_iter().collect();
        for edge in std::iter::once(parent).chain(self.model.ancestors(parent)) {
            let Some(cell) = self.model.cell(edge) else {
                continue;
            };
            for end in [TerminalEnd::Source, TerminalEnd::Target] {
                if let Some(terminal) = cell.terminal_cell(end).filter(|t| moved.contains(t)) {
                    return Err(StructuralError::TerminalIsEdge { edge, terminal });
                }
            }
        }
        Ok(())
    }

    // History

    /// Reverts the latest edit. Returns `false` when there is nothing to
    /// undo.
    ///
    /// # Errors
    ///
    /// [`TrellisError::TransactionOpen`] inside an open transaction.
    pub fn undo(&mut self) -> Result<bool, TrellisError> {
        if self.update_level > 0 {
            return Err(TrellisError::TransactionOpen);
        }
        let Some(edit) = self.undo.pop_undo() else {
            return Ok(false);
        };
        debug!(changes = edit.len(); "Undo");
        self.replay(&edit.inverse())?;
        self.undo.push_redo(edit.clone());
        self.events.emit(&GraphEvent::Undone(edit));
        Ok(true)
    }

    /// Re-applies the latest undone edit. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool, TrellisError> {
        if self.update_level > 0 {
            return Err(TrellisError::TransactionOpen);
        }
        let Some(edit) = self.undo.pop_redo() else {
            return Ok(false);
        };
        debug!(changes = edit.len(); "Redo");
        self.replay(&edit)?;
        self.undo.push_undo(edit.clone());
        self.events.emit(&GraphEvent::Redone(edit));
        Ok(true)
    }

    fn replay(&mut self, changes: &ChangeSet) -> Result<(), TrellisError> {
        self.replaying = true;
        self.begin_update();
        let result = changes
            .iter()
            .try_for_each(|change| self.record(change.clone()));
        self.end_update();
        self.replaying = false;
        Ok(result?)
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Drops the undo and redo history.
    pub fn clear_history(&mut self) {
        self.undo.clear();
    }

    // Queries

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn root(&self) -> Id {
        self.model.root()
    }

    pub fn cell(&self, id: Id) -> Option<&Cell> {
        self.model.cell(id)
    }

    pub fn geometry(&self, id: Id) -> Option<&Geometry> {
        self.model.cell(id).map(Cell::geometry)
    }

    pub fn parent(&self, id: Id) -> Option<Id> {
        self.model.parent(id)
    }

    pub fn children(&self, id: Id) -> &[Id] {
        self.model.children(id)
    }

    /// True when `ancestor` is `cell` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: Id, cell: Id) -> bool {
        self.model.is_ancestor(ancestor, cell)
    }

    /// Whether the validator would accept a new edge from `source` to
    /// `target`.
    pub fn can_connect(&self, source: Id, target: Id) -> Result<(), ConnectionError> {
        self.validator.can_connect(&self.model, source, target)
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut Validator {
        &mut self.validator
    }

    // View

    /// The up-to-date state of a cell, recomputing it (and whatever it
    /// depends on) when dirty. `None` for unknown or non-viewable cells.
    pub fn get_state(&mut self, id: Id) -> Option<&CellState> {
        self.view.validate(&self.model, id)
    }

    /// Revalidates every dirty state. Returns the number of recomputes.
    pub fn validate_all(&mut self) -> u64 {
        self.view.validate_all(&self.model)
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.view.set_scale(scale);
    }

    pub fn set_translate(&mut self, x: f32, y: f32) {
        self.view.set_translate(x, y);
    }

    /// Sets or clears style overrides applied on top of a cell's resolved
    /// style when rendering. Not a model change.
    pub fn set_render_overrides(&mut self, id: Id, style: Option<Style>) {
        self.view.set_render_overrides(&self.model, id, style);
    }

    // Events and hooks

    pub fn subscribe(&mut self, listener: impl FnMut(&GraphEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn set_hooks(&mut self, hooks: Hooks) {
        self.hooks = hooks;
    }

    // Snapshots

    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot::from_model(&self.model)
    }

    /// Replaces the model with the snapshot's. Not undoable: view states and
    /// the undo history are reset and a [`GraphEvent::Reset`] is emitted.
    ///
    /// # Errors
    ///
    /// [`TrellisError::Integrity`] for a malformed snapshot, in which case
    /// the current model is untouched, and
    /// [`TrellisError::TransactionOpen`] inside an open transaction.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), TrellisError> {
        if self.update_level > 0 {
            return Err(TrellisError::TransactionOpen);
        }
        self.model = snapshot.build_model()?;
        self.view.reset();
        self.undo.clear();
        self.pending.clear();
        info!(cells = self.model.len(); "Imported snapshot");
        self.events.emit(&GraphEvent::Reset);
        Ok(())
    }
}
