//! Cells: the nodes and edges of a diagram.
//!
//! A [`Cell`] is the user-authored part of a diagram element: its kind,
//! geometry, style overrides, data payload and flags. Tree links (parent and
//! ordered children) are owned by the model that stores the cell, so a
//! detached `Cell` value is always safe to build and edit.
//!
//! Edges carry two [`Terminal`]s. A terminal is either connected to another
//! cell or dangling at a free point, and may pin its attachment with a
//! [`Constraint`].

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Bounds, Point},
    identifier::Id,
    style::Style,
};

/// Which end of an edge a terminal describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalEnd {
    Source,
    Target,
}

impl TerminalEnd {
    pub fn is_source(self) -> bool {
        self == Self::Source
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

/// A fixed attachment point on a terminal's bounds.
///
/// `x` and `y` are fractions of the bounds (`(0, 0)` top-left, `(1, 1)`
/// bottom-right); `dx`/`dy` are absolute offsets added afterwards. A fixed
/// point is used as-is unless `perimeter` asks for it to be projected onto
/// the terminal's perimeter.
///
/// # Examples
///
/// ```
/// use trellis_core::cell::Constraint;
///
/// let bottom_center = Constraint::new(0.5, 1.0);
/// assert_eq!(bottom_center.x(), 0.5);
/// assert!(!bottom_center.projects_to_perimeter());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    x: f32,
    y: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    dx: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    dy: f32,
    #[serde(default, skip_serializing_if = "is_false")]
    perimeter: bool,
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Constraint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            perimeter: false,
        }
    }

    /// Adds an absolute offset (builder style).
    pub fn with_offset(mut self, dx: f32, dy: f32) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    /// Requests projection of the fixed point onto the perimeter (builder style).
    pub fn with_perimeter(mut self, perimeter: bool) -> Self {
        self.perimeter = perimeter;
        self
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }

    pub fn dx(self) -> f32 {
        self.dx
    }

    pub fn dy(self) -> f32 {
        self.dy
    }

    pub fn projects_to_perimeter(self) -> bool {
        self.perimeter
    }
}

/// What an edge end is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalRef {
    /// Connected to another cell.
    Cell(Id),
    /// Dangling at an absolute point.
    Point(Point),
}

impl TerminalRef {
    /// The connected cell, if any.
    pub fn cell(self) -> Option<Id> {
        match self {
            Self::Cell(id) => Some(id),
            Self::Point(_) => None,
        }
    }

    /// The dangling point, if any.
    pub fn point(self) -> Option<Point> {
        match self {
            Self::Point(point) => Some(point),
            Self::Cell(_) => None,
        }
    }
}

impl From<Id> for TerminalRef {
    fn from(id: Id) -> Self {
        Self::Cell(id)
    }
}

impl From<Point> for TerminalRef {
    fn from(point: Point) -> Self {
        Self::Point(point)
    }
}

/// One end of an edge: the attachment plus an optional constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terminal {
    end: TerminalRef,
    constraint: Option<Constraint>,
}

impl Terminal {
    pub fn new(end: impl Into<TerminalRef>) -> Self {
        Self {
            end: end.into(),
            constraint: None,
        }
    }

    /// Sets the constraint (builder style).
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn end(&self) -> TerminalRef {
        self.end
    }

    pub fn cell(&self) -> Option<Id> {
        self.end.cell()
    }

    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
    }

    pub fn set_constraint(&mut self, constraint: Option<Constraint>) {
        self.constraint = constraint;
    }
}

impl From<Id> for Terminal {
    fn from(id: Id) -> Self {
        Self::new(id)
    }
}

impl From<Point> for Terminal {
    fn from(point: Point) -> Self {
        Self::new(point)
    }
}

/// The two ends of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeEnds {
    source: Terminal,
    target: Terminal,
}

impl EdgeEnds {
    pub fn new(source: Terminal, target: Terminal) -> Self {
        Self { source, target }
    }
}

/// Capability of an edge-like value to expose and replace its terminals.
pub trait Routable {
    fn terminal(&self, end: TerminalEnd) -> &Terminal;

    /// Replaces a terminal, returning the previous one.
    fn replace_terminal(&mut self, end: TerminalEnd, terminal: Terminal) -> Terminal;

    /// Cells the edge is connected to, source first.
    fn connected_cells(&self) -> impl Iterator<Item = Id> {
        [TerminalEnd::Source, TerminalEnd::Target]
            .into_iter()
            .filter_map(move |end| self.terminal(end).cell())
    }
}

impl Routable for EdgeEnds {
    fn terminal(&self, end: TerminalEnd) -> &Terminal {
        match end {
            TerminalEnd::Source => &self.source,
            TerminalEnd::Target => &self.target,
        }
    }

    fn replace_terminal(&mut self, end: TerminalEnd, terminal: Terminal) -> Terminal {
        let slot = match end {
            TerminalEnd::Source => &mut self.source,
            TerminalEnd::Target => &mut self.target,
        };
        std::mem::replace(slot, terminal)
    }
}

/// Capability of a cell to take part in connections.
pub trait Connectable {
    /// Whether this cell may be the given end of an edge: `Source` asks
    /// about outgoing edges, `Target` about incoming ones.
    fn accepts(&self, end: TerminalEnd) -> bool;
}

/// The closed set of cell kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellKind {
    Node,
    Edge(EdgeEnds),
}

impl CellKind {
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge(_) => "edge",
        }
    }
}

/// Cell geometry in parent-relative coordinates.
///
/// Nodes use the bounds. When `relative` is set on a node, `x`/`y` are
/// fractions of the parent's size and `offset` is added in absolute units.
/// Edges use `points` (waypoints, relative to the parent's origin) and treat
/// `offset` as the label offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    points: Vec<Point>,
    #[serde(default, skip_serializing_if = "is_false")]
    relative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<Point>,
}

impl Geometry {
    /// Node geometry with the given bounds.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    /// Edge geometry with the given waypoints.
    pub fn with_points(points: Vec<Point>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// Marks the geometry as relative (builder style).
    pub fn relative(mut self) -> Self {
        self.relative = true;
        self
    }

    /// Sets the offset (builder style).
    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn offset(&self) -> Option<Point> {
        self.offset
    }

    /// Moves the bounds and every waypoint by `(dx, dy)`.
    ///
    /// Relative node positions are fractions, so only their offset moves.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        if self.relative {
            let offset = self.offset.unwrap_or_default();
            self.offset = Some(offset.add_point(Point::new(dx, dy)));
        } else {
            self.x += dx;
            self.y += dy;
        }
        for point in &mut self.points {
            *point = point.add_point(Point::new(dx, dy));
        }
    }
}

/// A node or edge of the diagram.
///
/// # Examples
///
/// ```
/// use trellis_core::{
///     cell::{Cell, Geometry},
///     identifier::Id,
/// };
///
/// let a = Cell::node(Id::new("a"), Geometry::new(0.0, 0.0, 80.0, 30.0));
/// let b = Cell::node(Id::new("b"), Geometry::new(200.0, 0.0, 80.0, 30.0));
/// let edge = Cell::edge(Id::new("a->b"), a.id(), b.id());
///
/// assert!(edge.kind().is_edge());
/// assert_eq!(edge.terminal_cell(trellis_core::cell::TerminalEnd::Source), Some(a.id()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    id: Id,
    kind: CellKind,
    geometry: Geometry,
    style: Style,
    data: serde_json::Value,
    visible: bool,
    collapsed: bool,
    accepts_incoming: bool,
    accepts_outgoing: bool,
}

impl Cell {
    fn with_kind(id: Id, kind: CellKind, geometry: Geometry) -> Self {
        Self {
            id,
            kind,
            geometry,
            style: Style::default(),
            data: serde_json::Value::Null,
            visible: true,
            collapsed: false,
            accepts_incoming: true,
            accepts_outgoing: true,
        }
    }

    /// Creates a node.
    pub fn node(id: Id, geometry: Geometry) -> Self {
        Self::with_kind(id, CellKind::Node, geometry)
    }

    /// Creates an edge without waypoints.
    pub fn edge(id: Id, source: impl Into<Terminal>, target: impl Into<Terminal>) -> Self {
        let ends = EdgeEnds::new(source.into(), target.into());
        Self::with_kind(id, CellKind::Edge(ends), Geometry::default())
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn with_connectable(mut self, incoming: bool, outgoing: bool) -> Self {
        self.accepts_incoming = incoming;
        self.accepts_outgoing = outgoing;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn is_edge(&self) -> bool {
        self.kind.is_edge()
    }

    pub fn ends(&self) -> Option<&EdgeEnds> {
        match &self.kind {
            CellKind::Edge(ends) => Some(ends),
            CellKind::Node => None,
        }
    }

    pub fn ends_mut(&mut self) -> Option<&mut EdgeEnds> {
        match &mut self.kind {
            CellKind::Edge(ends) => Some(ends),
            CellKind::Node => None,
        }
    }

    /// The terminal at `end` for edges, `None` for nodes.
    pub fn terminal(&self, end: TerminalEnd) -> Option<&Terminal> {
        self.ends().map(|ends| ends.terminal(end))
    }

    /// The connected cell at `end`, if this is an edge connected there.
    pub fn terminal_cell(&self, end: TerminalEnd) -> Option<Id> {
        self.terminal(end).and_then(Terminal::cell)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Geometry) -> Geometry {
        std::mem::replace(&mut self.geometry, geometry)
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn set_style(&mut self, style: Style) -> Style {
        std::mem::replace(&mut self.style, style)
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn set_data(&mut self, data: serde_json::Value) -> serde_json::Value {
        std::mem::replace(&mut self.data, data)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        std::mem::replace(&mut self.visible, visible)
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) -> bool {
        std::mem::replace(&mut self.collapsed, collapsed)
    }

    /// Connectable flags as `(incoming, outgoing)`.
    pub fn connectable(&self) -> (bool, bool) {
        (self.accepts_incoming, self.accepts_outgoing)
    }

    /// Sets the connectable flags, returning the previous `(incoming, outgoing)`.
    pub fn set_connectable(&mut self, incoming: bool, outgoing: bool) -> (bool, bool) {
        let previous = self.connectable();
        self.accepts_incoming = incoming;
        self.accepts_outgoing = outgoing;
        previous
    }
}

impl Connectable for Cell {
    fn accepts(&self, end: TerminalEnd) -> bool {
        match end {
            TerminalEnd::Source => self.accepts_outgoing,
            TerminalEnd::Target => self.accepts_incoming,
        }
    }
}
