//! Integration tests for snapshot files and the import/export round trip.

use proptest::prelude::*;

use trellis::{
    Graph, IntegrityError, Snapshot, TrellisError,
    cell::{Cell, Geometry},
    config::GraphConfig,
    identifier::Id,
};

#[test]
fn test_file_round_trip() {
    let mut graph = Graph::default();
    let a = graph
        .add_node(Geometry::new(0.0, 0.0, 80.0, 30.0), None)
        .expect("Failed to add node");
    let b = graph
        .add_node(Geometry::new(200.0, 0.0, 80.0, 30.0), None)
        .expect("Failed to add node");
    graph.add_edge(a, b, None).expect("Failed to add edge");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("graph.json");
    trellis::write_snapshot(&path, &graph.export_snapshot()).expect("Failed to write");

    let loaded = trellis::load_graph(&path, GraphConfig::default()).expect("Failed to load");
    assert_eq!(loaded.export_snapshot(), graph.export_snapshot());
    assert!(!loaded.can_undo());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = trellis::read_snapshot(dir.path().join("missing.json"));
    assert!(matches!(result, Err(TrellisError::Io(_))));
}

#[test]
fn test_invalid_json_is_json_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").expect("Failed to write");
    assert!(matches!(
        trellis::read_snapshot(&path),
        Err(TrellisError::Json(_))
    ));
}

#[test]
fn test_dangling_parent_leaves_model_unchanged() {
    let mut graph = Graph::default();
    graph
        .add_cell(Cell::node(Id::new("keep"), Geometry::default()), None, None)
        .expect("Failed to add node");
    let before = graph.export_snapshot();

    let bad = Snapshot::from_json(
        r#"{"cells": [
            {"id": "root", "kind": "node"},
            {"id": "orphan", "kind": "node", "parent": "lost"}
        ]}"#,
    )
    .expect("Failed to parse snapshot");

    let err = graph.import_snapshot(&bad).unwrap_err();
    assert!(matches!(
        err,
        TrellisError::Integrity(IntegrityError::UnknownParent { .. })
    ));
    assert_eq!(graph.export_snapshot(), before);
}

mod proptest_tests {
    use super::*;

    // Strategies

    /// One build step: a node under an earlier node, an edge between two
    /// earlier cells, or a move of any earlier cell under any other one
    /// (edges included). Indices are reduced modulo the cells added so far.
    #[derive(Debug, Clone)]
    enum Step {
        Node { parent: usize, index: usize, x: f32 },
        Edge { source: usize, target: usize },
        SetParent { cell: usize, parent: usize },
        Collapse(usize),
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (any::<usize>(), any::<usize>(), -500.0f32..500.0)
                .prop_map(|(parent, index, x)| Step::Node { parent, index, x }),
            2 => (any::<usize>(), any::<usize>())
                .prop_map(|(source, target)| Step::Edge { source, target }),
            2 => (any::<usize>(), any::<usize>())
                .prop_map(|(cell, parent)| Step::SetParent { cell, parent }),
            1 => any::<usize>().prop_map(Step::Collapse),
        ]
    }

    fn build(steps: &[Step]) -> Graph {
        let mut graph = Graph::default();
        let mut nodes = vec![graph.root()];
        let mut cells = vec![graph.root()];
        for (i, step) in steps.iter().enumerate() {
            match *step {
                Step::Node { parent, index, x } => {
                    let parent = nodes[parent % nodes.len()];
                    let len = graph.children(parent).len() + 1;
                    let id = Id::new(&format!("n{i}"));
                    let cell = Cell::node(id, Geometry::new(x, 0.0, 10.0, 10.0));
                    if graph.add_cell(cell, Some(parent), Some(index % len)).is_ok() {
                        nodes.push(id);
                        cells.push(id);
                    }
                }
                Step::Edge { source, target } => {
                    let source = cells[source % cells.len()];
                    let target = cells[target % cells.len()];
                    if let Ok(edge) = graph.add_edge(source, target, None) {
                        cells.push(edge);
                    }
                }
                Step::SetParent { cell, parent } => {
                    let cell = cells[cell % cells.len()];
                    let parent = cells[parent % cells.len()];
                    let _ = graph.set_parent(cell, parent, None);
                }
                Step::Collapse(cell) => {
                    let _ = graph.set_collapsed(nodes[cell % nodes.len()], true);
                }
            }
        }
        graph
    }

    fn check_round_trip(steps: &[Step]) -> Result<(), TestCaseError> {
        let graph = build(steps);
        let snapshot = graph.export_snapshot();
        let json = snapshot.to_json().map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut imported = Graph::default();
        let reparsed =
            Snapshot::from_json(&json).map_err(|e| TestCaseError::fail(e.to_string()))?;
        imported
            .import_snapshot(&reparsed)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(imported.export_snapshot(), snapshot);
        Ok(())
    }

    fn check_undo_all_restores_empty(steps: &[Step]) -> Result<(), TestCaseError> {
        let mut graph = build(steps);
        let empty = Graph::default().export_snapshot();
        while graph.undo().map_err(|e| TestCaseError::fail(e.to_string()))? {}
        prop_assert_eq!(graph.export_snapshot(), empty);
        Ok(())
    }

    proptest! {
        #[test]
        fn snapshot_round_trip(steps in prop::collection::vec(step_strategy(), 0..30)) {
            check_round_trip(&steps)?;
        }

        #[test]
        fn undo_everything(steps in prop::collection::vec(step_strategy(), 0..30)) {
            check_undo_all_restores_empty(&steps)?;
        }
    }
}
