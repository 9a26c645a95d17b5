//! Integration tests for the Graph mutation, transaction and history API.

use std::{cell::RefCell, rc::Rc};

use trellis::{
    ConnectionError, Graph, GraphEvent, Snapshot, StructuralError, TrellisError,
    cell::{Cell, Geometry, TerminalEnd},
    config::{GraphConfig, ModelConfig, ValidationConfig},
    hooks::Hooks,
    identifier::Id,
    style::Style,
    validator::Multiplicity,
};

fn record_events(graph: &mut Graph) -> Rc<RefCell<Vec<GraphEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    graph.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn named_node(graph: &mut Graph, name: &str, x: f32, y: f32) -> Id {
    graph
        .add_cell(
            Cell::node(Id::new(name), Geometry::new(x, y, 80.0, 30.0)),
            None,
            None,
        )
        .expect("Failed to add node")
}

#[test]
fn test_undo_restores_exact_model() {
    let mut graph = Graph::default();
    let a = named_node(&mut graph, "a", 0.0, 0.0);
    let b = named_node(&mut graph, "b", 200.0, 0.0);
    let before = graph.export_snapshot();

    graph
        .transact(|g| -> Result<(), TrellisError> {
            let group = named_node(g, "group", 0.0, 100.0);
            g.set_parent(a, group, None)?;
            g.set_style(b, Style::new().with("fillColor", "red"))?;
            g.add_edge(a, b, None)?;
            g.set_collapsed(group, true)?;
            Ok(())
        })
        .expect("Transaction failed");
    let after = graph.export_snapshot();
    assert_ne!(before, after);

    assert!(graph.undo().expect("undo"));
    assert_eq!(graph.export_snapshot(), before);

    assert!(graph.redo().expect("redo"));
    assert_eq!(graph.export_snapshot(), after);
}

#[test]
fn test_undo_of_removal_restores_descendants_and_edges() {
    let mut graph = Graph::default();
    let group = named_node(&mut graph, "group", 0.0, 0.0);
    let inner = graph
        .add_cell(
            Cell::node(Id::new("inner"), Geometry::new(5.0, 5.0, 10.0, 10.0)),
            Some(group),
            None,
        )
        .expect("Failed to add child");
    let other = named_node(&mut graph, "other", 300.0, 0.0);
    let edge = graph.add_edge(inner, other, None).expect("Failed to add edge");
    let before = graph.export_snapshot();

    graph.remove_cell(group).expect("remove");
    assert!(!graph.model().contains(inner));
    assert!(!graph.model().contains(edge));

    graph.undo().expect("undo");
    assert_eq!(graph.export_snapshot(), before);
    assert_eq!(
        graph.model().edges_of(inner).collect::<Vec<_>>(),
        vec![edge]
    );
}

#[test]
fn test_new_commit_clears_redo() {
    let mut graph = Graph::default();
    let a = named_node(&mut graph, "a", 0.0, 0.0);
    graph
        .set_geometry(a, Geometry::new(10.0, 0.0, 80.0, 30.0))
        .expect("set");

    graph.undo().expect("undo");
    assert!(graph.can_redo());

    graph
        .set_geometry(a, Geometry::new(20.0, 0.0, 80.0, 30.0))
        .expect("set");
    assert!(!graph.can_redo());
    assert!(!graph.redo().expect("redo"));
    assert_eq!(graph.geometry(a), Some(&Geometry::new(20.0, 0.0, 80.0, 30.0)));
}

#[test]
fn test_undo_depth_caps_history() {
    let config = GraphConfig::default().with_model(ModelConfig::new(2));
    let mut graph = Graph::new(config);
    for i in 0..5 {
        graph
            .add_node(Geometry::new(i as f32, 0.0, 1.0, 1.0), None)
            .expect("add");
    }
    assert_eq!(graph.undo_manager().undo_len(), 2);

    let mut disabled = Graph::new(GraphConfig::default().with_model(ModelConfig::new(0)));
    disabled.add_node(Geometry::default(), None).expect("add");
    assert!(!disabled.can_undo());
}

#[test]
fn test_self_parent_fails_without_event() {
    let mut graph = Graph::default();
    let a = named_node(&mut graph, "a", 0.0, 0.0);
    let before = graph.export_snapshot();
    let events = record_events(&mut graph);

    let result = graph.set_parent(a, a, None);

    assert!(matches!(
        result,
        Err(TrellisError::Structural(StructuralError::SelfParent(id))) if id == a
    ));
    assert_eq!(graph.export_snapshot(), before);
    assert!(events.borrow().is_empty());
    assert_eq!(graph.update_level(), 0);
}

#[test]
fn test_events_per_outermost_commit() {
    let mut graph = Graph::default();
    let events = record_events(&mut graph);

    {
        let mut tx = graph.begin();
        let a = tx.add_node(Geometry::default(), None).expect("add");
        tx.set_visible(a, false).expect("hide");
        tx.transact(|g| g.set_visible(a, true)).expect("show");
    }
    graph.undo().expect("undo");
    graph.redo().expect("redo");

    let events = events.borrow();
    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            GraphEvent::Changed(_) => "changed",
            GraphEvent::Undone(_) => "undone",
            GraphEvent::Redone(_) => "redone",
            GraphEvent::Reset => "reset",
        })
        .collect();
    assert_eq!(kinds, vec!["changed", "changed", "undone", "changed", "redone"]);
    assert_eq!(events[0].changes().map(|set| set.len()), Some(3));
}

#[test]
fn test_empty_transaction_is_silent() {
    let mut graph = Graph::default();
    let events = record_events(&mut graph);
    drop(graph.begin());
    graph
        .transact(|_| Ok::<(), TrellisError>(()))
        .expect("empty transaction");

    assert!(events.borrow().is_empty());
    assert!(!graph.can_undo());
}

#[test]
fn test_unsubscribe_stops_events() {
    let mut graph = Graph::default();
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let id = graph.subscribe(move |_| *sink.borrow_mut() += 1);

    graph.add_node(Geometry::default(), None).expect("add");
    assert!(graph.unsubscribe(id));
    graph.add_node(Geometry::default(), None).expect("add");

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_before_commit_hook_coalesces() {
    let mut graph = Graph::default();
    let events = record_events(&mut graph);
    let added = Rc::new(RefCell::new(Vec::new()));
    let added_sink = Rc::clone(&added);

    graph.set_hooks(
        Hooks::new()
            .with_before_commit(|graph, changes| {
                // Label every new node with its id.
                let new_nodes: Vec<Id> = changes
                    .iter()
                    .filter(|change| matches!(change, trellis::Change::CellAdded { .. }))
                    .map(|change| change.cell())
                    .collect();
                for id in new_nodes {
                    graph
                        .set_data(id, serde_json::json!({ "label": id.to_string() }))
                        .expect("set data");
                }
            })
            .with_on_cell_added(move |cell| added_sink.borrow_mut().push(cell.id())),
    );

    let a = graph.add_node(Geometry::default(), None).expect("add");

    assert_eq!(*added.borrow(), vec![a]);
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(
        events.borrow()[0].changes().map(|set| set.len()),
        Some(2)
    );
    assert_eq!(
        graph.cell(a).map(|cell| cell.data().clone()),
        Some(serde_json::json!({ "label": a.to_string() }))
    );

    // The hook's change is undone together with the add.
    graph.undo().expect("undo");
    assert!(!graph.model().contains(a));
    assert_eq!(graph.undo_manager().undo_len(), 0);
}

#[test]
fn test_rollback_discards_changes() {
    let mut graph = Graph::default();
    let a = named_node(&mut graph, "a", 0.0, 0.0);
    let before = graph.export_snapshot();
    let events = record_events(&mut graph);

    let mut tx = graph.begin();
    tx.set_geometry(a, Geometry::new(1.0, 1.0, 1.0, 1.0)).expect("set");
    tx.remove_cell(a).expect("remove");
    tx.rollback().expect("rollback");

    assert_eq!(graph.export_snapshot(), before);
    assert!(events.borrow().is_empty());
    assert_eq!(graph.undo_manager().undo_len(), 1);
}

#[test]
fn test_validator_rules_through_graph() {
    let config = GraphConfig::default()
        .with_validation(ValidationConfig::default().with_allow_duplicates(false));
    let mut graph = Graph::new(config);
    let start = graph
        .add_cell(
            Cell::node(Id::new("start"), Geometry::default())
                .with_style(Style::new().with("type", "start")),
            None,
            None,
        )
        .expect("add");
    let task = graph
        .add_cell(
            Cell::node(Id::new("task"), Geometry::default())
                .with_style(Style::new().with("type", "task")),
            None,
            None,
        )
        .expect("add");
    graph.validator_mut().add_rule(
        Multiplicity::new(TerminalEnd::Source, "type", "start")
            .with_neighbors(["task"], "start must lead to a task"),
    );

    assert_eq!(graph.can_connect(start, start), Err(ConnectionError::Silent));
    assert_eq!(
        graph.can_connect(task, start),
        Ok(()),
        "rule only restricts start as a source"
    );

    let edge = graph.add_edge(start, task, None).expect("edge");
    assert_eq!(
        graph.can_connect(start, task),
        Err(ConnectionError::new("already connected"))
    );

    let result = graph.add_edge(start, task, None);
    assert!(matches!(result, Err(TrellisError::Connection(_))));

    // Reattaching the same edge to the same cell is not a duplicate.
    assert!(graph.connect(edge, TerminalEnd::Target, task).is_ok());
}

#[test]
fn test_import_resets_history_and_rejects_bad_snapshots() {
    let mut graph = Graph::default();
    let a = named_node(&mut graph, "a", 0.0, 0.0);
    let events = record_events(&mut graph);
    let good = graph.export_snapshot();

    let bad = Snapshot::from_json(
        r#"{"cells": [
            {"id": "root", "kind": "node"},
            {"id": "e", "kind": "edge", "parent": "root",
             "terminals": {"source": {"cell": "ghost"}, "target": {"cell": "root"}}}
        ]}"#,
    )
    .expect("Failed to parse snapshot");
    let result = graph.import_snapshot(&bad);
    assert!(matches!(result, Err(TrellisError::Integrity(_))));
    assert_eq!(graph.export_snapshot(), good);
    assert!(graph.can_undo());

    graph.import_snapshot(&good).expect("import");
    assert!(!graph.can_undo());
    assert!(graph.model().contains(a));
    assert_eq!(*events.borrow(), vec![GraphEvent::Reset]);
}

#[test]
fn test_terminal_cannot_move_below_its_edge() {
    let mut graph = Graph::default();
    let a = named_node(&mut graph, "a", 0.0, 0.0);
    let holder = named_node(&mut graph, "holder", 300.0, 0.0);
    let n = graph
        .add_cell(
            Cell::node(Id::new("n"), Geometry::new(5.0, 5.0, 10.0, 10.0)),
            Some(holder),
            None,
        )
        .expect("Failed to add child");
    let edge = graph.add_edge(a, n, None).expect("Failed to add edge");
    let before = graph.export_snapshot();
    let events = record_events(&mut graph);

    let direct = graph.set_parent(n, edge, None);
    assert!(matches!(
        direct,
        Err(TrellisError::Structural(StructuralError::TerminalIsEdge { edge: e, terminal }))
            if e == edge && terminal == n
    ));
    // Moving an ancestor of the terminal is refused too.
    let nested = graph.set_parent(holder, edge, None);
    assert!(matches!(
        nested,
        Err(TrellisError::Structural(StructuralError::TerminalIsEdge { .. }))
    ));

    assert_eq!(graph.export_snapshot(), before);
    assert!(events.borrow().is_empty());
    let mut reloaded = Graph::default();
    reloaded
        .import_snapshot(&graph.export_snapshot())
        .expect("exported snapshot imports");

    // Unrelated nodes may still live under the edge.
    let label = named_node(&mut graph, "label", 0.0, 0.0);
    assert!(graph.set_parent(label, edge, None).is_ok());
}

#[test]
fn test_set_parent_keep_position() {
    let mut graph = Graph::default();
    let group = named_node(&mut graph, "group", 100.0, 50.0);
    let a = named_node(&mut graph, "a", 130.0, 70.0);
    let before = graph.get_state(a).expect("viewable").bounds();

    graph
        .set_parent_keep_position(a, group, None)
        .expect("Failed to reparent");

    assert_eq!(graph.parent(a), Some(group));
    assert_eq!(graph.geometry(a), Some(&Geometry::new(30.0, 20.0, 80.0, 30.0)));
    assert_eq!(graph.get_state(a).expect("viewable").bounds(), before);

    // Reparent and translation are one edit.
    graph.undo().expect("undo");
    assert_eq!(graph.parent(a), Some(graph.root()));
    assert_eq!(graph.geometry(a), Some(&Geometry::new(130.0, 70.0, 80.0, 30.0)));
}
