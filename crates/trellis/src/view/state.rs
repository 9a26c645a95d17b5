//! Computed per-cell view state.

use trellis_core::{
    cell::{Constraint, TerminalEnd},
    geometry::{Bounds, Point},
    identifier::Id,
    style::Style,
};

/// The resolved, absolute geometry and style of one viewable cell.
///
/// States are owned by the [`View`](super::View); callers only ever see
/// shared references or clones.
#[derive(Debug, Clone, PartialEq)]
pub struct CellState {
    cell: Id,
    bounds: Bounds,
    /// Absolute origin in model units, before translate and scale. Children
    /// and waypoints are positioned relative to it.
    origin: Point,
    style: Style,
    edge: Option<EdgeRoute>,
}

/// The routed part of an edge state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EdgeRoute {
    pub(crate) points: Vec<Point>,
    pub(crate) source_constraint: Option<Constraint>,
    pub(crate) target_constraint: Option<Constraint>,
    pub(crate) visible_source: Option<Id>,
    pub(crate) visible_target: Option<Id>,
}

impl CellState {
    pub(crate) fn node(cell: Id, bounds: Bounds, origin: Point, style: Style) -> Self {
        Self {
            cell,
            bounds,
            origin,
            style,
            edge: None,
        }
    }

    pub(crate) fn edge(cell: Id, origin: Point, style: Style, route: EdgeRoute) -> Self {
        let bounds = Bounds::from_points(route.points.iter().copied())
            .unwrap_or_else(|| Bounds::at_point(origin));
        Self {
            cell,
            bounds,
            origin,
            style,
            edge: Some(route),
        }
    }

    pub fn cell(&self) -> Id {
        self.cell
    }

    /// Absolute bounds in view coordinates. For edges, the bounding box of
    /// the routed points.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub(crate) fn origin(&self) -> Point {
        self.origin
    }

    /// Effective style after defaults, base style, cell overrides and
    /// render overrides.
    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn is_edge(&self) -> bool {
        self.edge.is_some()
    }

    /// Full routed point sequence of an edge, source first. Empty for nodes.
    pub fn points(&self) -> &[Point] {
        self.edge
            .as_ref()
            .map(|route| route.points.as_slice())
            .unwrap_or_default()
    }

    /// Resolved connection point at one end of an edge.
    pub fn terminal_point(&self, end: TerminalEnd) -> Option<Point> {
        let points = self.points();
        match end {
            TerminalEnd::Source => points.first().copied(),
            TerminalEnd::Target => points.last().copied(),
        }
    }

    /// The constraint used at one end, from the terminal or the edge style.
    pub fn constraint(&self, end: TerminalEnd) -> Option<Constraint> {
        let route = self.edge.as_ref()?;
        match end {
            TerminalEnd::Source => route.source_constraint,
            TerminalEnd::Target => route.target_constraint,
        }
    }

    /// The cell an edge end is drawn against, after collapsed ancestors are
    /// taken into account. `None` for dangling ends and nodes.
    pub fn visible_terminal(&self, end: TerminalEnd) -> Option<Id> {
        let route = self.edge.as_ref()?;
        match end {
            TerminalEnd::Source => route.visible_source,
            TerminalEnd::Target => route.visible_target,
        }
    }
}
