//! Optional callbacks at fixed points of the transaction lifecycle.
//!
//! Hooks are how code reacts to edits by making further edits. A
//! `before_commit` hook runs at the outermost commit while the transaction is
//! still open, so everything it changes lands in the same change set, the
//! same undo entry and the same `Changed` event.

use std::fmt;

use trellis_core::cell::Cell;

use crate::{Graph, model::Change};

/// Called with the graph and the changes collected so far.
pub type BeforeCommitHook = Box<dyn FnMut(&mut Graph, &[Change])>;

/// Called with each cell right after it is added.
pub type CellAddedHook = Box<dyn FnMut(&Cell)>;

/// The set of installed hooks.
///
/// # Examples
///
/// ```
/// use trellis::{Graph, hooks::Hooks};
///
/// let hooks = Hooks::new().with_before_commit(|_graph, changes| {
///     assert!(!changes.is_empty());
/// });
/// let mut graph = Graph::default();
/// graph.set_hooks(hooks);
/// ```
#[derive(Default)]
pub struct Hooks {
    before_commit: Option<BeforeCommitHook>,
    on_cell_added: Option<CellAddedHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_commit", &self.before_commit.is_some())
            .field("on_cell_added", &self.on_cell_added.is_some())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before_commit(
        mut self,
        hook: impl FnMut(&mut Graph, &[Change]) + 'static,
    ) -> Self {
        self.before_commit = Some(Box::new(hook));
        self
    }

    pub fn with_on_cell_added(mut self, hook: impl FnMut(&Cell) + 'static) -> Self {
        self.on_cell_added = Some(Box::new(hook));
        self
    }

    /// Takes the commit hook out for the duration of a call, so the hook can
    /// borrow the graph mutably.
    pub(crate) fn take_before_commit(&mut self) -> Option<BeforeCommitHook> {
        self.before_commit.take()
    }

    /// Puts the commit hook back unless a new one was installed meanwhile.
    pub(crate) fn restore_before_commit(&mut self, hook: BeforeCommitHook) {
        if self.before_commit.is_none() {
            self.before_commit = Some(hook);
        }
    }

    pub(crate) fn cell_added(&mut self, cell: &Cell) {
        if let Some(hook) = self.on_cell_added.as_mut() {
            hook(cell);
        }
    }
}
