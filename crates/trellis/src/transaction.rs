//! Scoped update transactions.

use std::ops::{Deref, DerefMut};

use crate::{Graph, error::StructuralError};

/// An open transaction on a [`Graph`].
///
/// The guard dereferences to the graph, so mutations are called on it
/// directly. Dropping the guard ends the transaction; the outermost one
/// commits every recorded change as one undo entry and one event.
///
/// # Examples
///
/// ```
/// use trellis::{Graph, cell::Geometry};
///
/// let mut graph = Graph::default();
/// {
///     let mut tx = graph.begin();
///     let a = tx.add_node(Geometry::new(0.0, 0.0, 10.0, 10.0), None)?;
///     tx.set_geometry(a, Geometry::new(50.0, 0.0, 10.0, 10.0))?;
/// }
/// assert_eq!(graph.undo_manager().undo_len(), 1);
/// # Ok::<(), trellis::TrellisError>(())
/// ```
#[derive(Debug)]
pub struct Transaction<'g> {
    graph: &'g mut Graph,
    start: usize,
}

impl<'g> Transaction<'g> {
    pub(crate) fn new(graph: &'g mut Graph) -> Self {
        graph.begin_update();
        let start = graph.pending_len();
        Self { graph, start }
    }

    /// Reverts every change recorded through this guard, newest first, and
    /// ends the transaction. Changes recorded by enclosing transactions are
    /// kept.
    pub fn rollback(self) -> Result<(), StructuralError> {
        self.graph.revert_pending(self.start)
    }
}

impl Deref for Transaction<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.graph.end_update();
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::cell::Geometry;

    use super::*;

    #[test]
    fn test_nested_guards_commit_once() {
        let mut graph = Graph::default();
        {
            let mut outer = graph.begin();
            outer
                .add_node(Geometry::new(0.0, 0.0, 10.0, 10.0), None)
                .expect("valid add");
            {
                let mut inner = outer.begin();
                inner
                    .add_node(Geometry::new(20.0, 0.0, 10.0, 10.0), None)
                    .expect("valid add");
                assert_eq!(inner.update_level(), 2);
            }
            assert_eq!(outer.undo_manager().undo_len(), 0);
        }
        assert_eq!(graph.update_level(), 0);
        assert_eq!(graph.undo_manager().undo_len(), 1);
        assert_eq!(graph.model().len(), 3);
    }

    #[test]
    fn test_inner_rollback_keeps_outer_changes() {
        let mut graph = Graph::default();
        {
            let mut outer = graph.begin();
            let a = outer
                .add_node(Geometry::new(0.0, 0.0, 10.0, 10.0), None)
                .expect("valid add");
            let mut inner = outer.begin();
            inner
                .set_geometry(a, Geometry::new(99.0, 0.0, 10.0, 10.0))
                .expect("valid set");
            inner.add_node(Geometry::default(), None).expect("valid add");
            inner.rollback().expect("rollback");

            assert_eq!(outer.geometry(a), Some(&Geometry::new(0.0, 0.0, 10.0, 10.0)));
            assert_eq!(outer.model().len(), 2);
        }
        assert_eq!(graph.undo_manager().undo_len(), 1);
    }

    #[test]
    fn test_full_rollback_commits_nothing() {
        let mut graph = Graph::default();
        let tx = {
            let mut tx = graph.begin();
            tx.add_node(Geometry::default(), None).expect("valid add");
            tx
        };
        tx.rollback().expect("rollback");

        assert!(!graph.can_undo());
        assert_eq!(graph.model().len(), 1);
    }
}
