//! Lazily validated view states.
//!
//! The [`View`] keeps one [`CellState`] per viewable cell. Model changes only
//! mark states dirty; nothing is recomputed until a state is asked for
//! ([`View::validate`]) or the whole dirty set is flushed
//! ([`View::validate_all`]). A recompute always brings the parent up to date
//! first, and an edge's terminals before the edge, so each state is
//! recomputed at most once per pass.
//!
//! States are deleted only when their cell is removed, hidden or folded away
//! inside a collapsed group; invalidation never deletes.

mod state;

pub use state::CellState;

use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use indexmap::IndexSet;
use log::{debug, trace, warn};

use trellis_core::{
    cell::{Cell, Constraint, TerminalEnd},
    geometry::{Bounds, Point, Size},
    identifier::Id,
    routing::{
        PerimeterFn, Registry, RouteEnd, RouteRequest, RouterEntry, RouterKind, ShapeEnd,
        rectangle_perimeter, route,
    },
    style::{Style, Stylesheet, keys},
};

use crate::{
    config::ViewConfig,
    model::{Change, Model},
};
use state::EdgeRoute;

/// Returns the cell an edge end is drawn against: the top-most collapsed
/// ancestor of `terminal`, or `terminal` itself.
pub fn visible_terminal(model: &Model, terminal: Id) -> Id {
    model
        .ancestors(terminal)
        .filter(|ancestor| model.cell(*ancestor).is_some_and(Cell::is_collapsed))
        .last()
        .unwrap_or(terminal)
}

/// True when the cell and all its ancestors are visible and no strict
/// ancestor is collapsed.
pub fn is_viewable(model: &Model, id: Id) -> bool {
    let Some(cell) = model.cell(id) else {
        return false;
    };
    cell.is_visible()
        && model.ancestors(id).all(|ancestor| {
            model
                .cell(ancestor)
                .is_some_and(|c| c.is_visible() && !c.is_collapsed())
        })
}

/// True when following visible edge terminals from `from` leads to `edge`.
fn reaches_edge(model: &Model, from: Id, edge: Id) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == edge {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        let Some(cell) = model.cell(current).filter(|cell| cell.is_edge()) else {
            continue;
        };
        for end in [TerminalEnd::Source, TerminalEnd::Target] {
            if let Some(terminal) = cell.terminal_cell(end) {
                stack.push(visible_terminal(model, terminal));
            }
        }
    }
    false
}

fn mean(points: impl IntoIterator<Item = Point>) -> Option<Point> {
    let (sum, count) = points
        .into_iter()
        .fold((Point::default(), 0usize), |(sum, count), point| {
            (sum.add_point(point), count + 1)
        });
    (count > 0).then(|| sum.scale(1.0 / count as f32))
}

/// Absolute placement of a parent, as seen by its children.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    /// Model-space top-left, before translate and scale.
    origin: Point,
    size: Size,
    /// Accumulated rotation in degrees, clockwise.
    rotation: f32,
}

impl Frame {
    fn center(&self) -> Point {
        self.origin
            .add_point(Point::new(self.size.width() / 2.0, self.size.height() / 2.0))
    }
}

/// Constraint from the edge style's `exit*` (source) or `entry*` (target)
/// keys. Both fractions must be present.
fn style_constraint(style: &Style, end: TerminalEnd) -> Option<Constraint> {
    let (x, y, dx, dy, perimeter) = match end {
        TerminalEnd::Source => (
            keys::EXIT_X,
            keys::EXIT_Y,
            keys::EXIT_DX,
            keys::EXIT_DY,
            keys::EXIT_PERIMETER,
        ),
        TerminalEnd::Target => (
            keys::ENTRY_X,
            keys::ENTRY_Y,
            keys::ENTRY_DX,
            keys::ENTRY_DY,
            keys::ENTRY_PERIMETER,
        ),
    };
    let constraint = Constraint::new(style.number(x)?, style.number(y)?)
        .with_offset(style.number_or(dx, 0.0), style.number_or(dy, 0.0))
        .with_perimeter(style.bool(perimeter).unwrap_or(false));
    Some(constraint)
}

/// Everything needed to build a [`ShapeEnd`] for a connected edge end.
struct ConnectedEnd {
    bounds: Bounds,
    style: Style,
    perimeter: PerimeterFn,
    constraint: Option<Constraint>,
    spacing: f32,
}

/// One resolved edge end before routing.
enum EndInput {
    Dangling(Point),
    Connected(ConnectedEnd),
}

impl EndInput {
    fn route_end(&self, scale: f32) -> RouteEnd<'_> {
        match self {
            Self::Dangling(point) => RouteEnd::Dangling(*point),
            Self::Connected(end) => RouteEnd::Shape(
                ShapeEnd::new(end.bounds, &end.style, end.perimeter)
                    .with_constraint(end.constraint)
                    .with_spacing(end.spacing)
                    .with_scale(scale),
            ),
        }
    }
}

/// Cache of computed [`CellState`]s.
#[derive(Debug, Clone)]
pub struct View {
    states: HashMap<Id, CellState>,
    dirty: IndexSet<Id>,
    scale: f32,
    translate: Point,
    stylesheet: Stylesheet,
    registry: Rc<Registry>,
    default_router: String,
    default_perimeter: String,
    loop_size: f32,
    overrides: HashMap<Id, Style>,
    recomputes: u64,
}

impl View {
    pub fn new(config: &ViewConfig, stylesheet: Stylesheet, registry: Rc<Registry>) -> Self {
        let (tx, ty) = config.translate();
        Self {
            states: HashMap::new(),
            dirty: IndexSet::new(),
            scale: config.scale(),
            translate: Point::new(tx, ty),
            stylesheet,
            registry,
            default_router: config.router().to_string(),
            default_perimeter: config.perimeter().to_string(),
            loop_size: config.loop_size(),
            overrides: HashMap::new(),
            recomputes: 0,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translate(&self) -> Point {
        self.translate
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The cached state, without recomputing anything.
    pub fn state(&self, id: Id) -> Option<&CellState> {
        self.states.get(&id)
    }

    pub fn is_dirty(&self, id: Id) -> bool {
        self.dirty.contains(&id)
    }

    /// Number of cells waiting for revalidation.
    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    /// Total number of state recomputations since the view was created.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    pub fn render_overrides(&self, id: Id) -> Option<&Style> {
        self.overrides.get(&id)
    }

    /// Changes the scale; every existing state becomes dirty.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.invalidate_all();
    }

    /// Changes the translation; every existing state becomes dirty.
    pub fn set_translate(&mut self, x: f32, y: f32) {
        self.translate = Point::new(x, y);
        self.invalidate_all();
    }

    /// Replaces the stylesheet; every existing state becomes dirty.
    pub fn set_stylesheet(&mut self, stylesheet: Stylesheet) {
        self.stylesheet = stylesheet;
        self.invalidate_all();
    }

    fn invalidate_all(&mut self) {
        let mut ids: Vec<Id> = self.states.keys().copied().collect();
        ids.sort_by_key(|id| id.to_string());
        self.dirty.extend(ids);
    }

    /// Drops every state and override, as after a model swap.
    pub(crate) fn reset(&mut self) {
        self.states.clear();
        self.dirty.clear();
        self.overrides.clear();
    }

    /// Sets or clears the per-render style overrides of a cell.
    pub(crate) fn set_render_overrides(&mut self, model: &Model, id: Id, style: Option<Style>) {
        match style {
            Some(style) => self.overrides.insert(id, style),
            None => self.overrides.remove(&id),
        };
        self.invalidate(model, id);
    }

    fn forget(&mut self, id: Id) {
        self.states.remove(&id);
        self.dirty.shift_remove(&id);
    }

    /// Marks `id`, its descendants and every edge depending on any of them
    /// (recursively, including edges connected to edges) dirty.
    pub(crate) fn invalidate(&mut self, model: &Model, id: Id) {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) || !model.contains(current) {
                continue;
            }
            self.dirty.insert(current);
            stack.extend(model.children(current).iter().copied());
            stack.extend(model.edges_of(current));
        }
        trace!(cell:% = id, marked = visited.len(); "Invalidated states");
    }

    /// Updates dirty tracking for one applied change.
    pub(crate) fn on_change(&mut self, model: &Model, change: &Change) {
        match change {
            Change::CellRemoved { subtree, .. } => {
                for entry in subtree {
                    let id = entry.cell().id();
                    self.forget(id);
                    self.overrides.remove(&id);
                }
            }
            Change::VisibilityChanged {
                cell,
                current: false,
                ..
            } => {
                for id in model.subtree(*cell) {
                    self.states.remove(&id);
                }
                self.invalidate(model, *cell);
            }
            Change::CollapsedChanged {
                cell,
                current: true,
                ..
            } => {
                for id in model.descendants(*cell) {
                    self.states.remove(&id);
                }
                self.invalidate(model, *cell);
            }
            Change::DataChanged { .. } | Change::ConnectableChanged { .. } => {}
            _ => self.invalidate(model, change.cell()),
        }
    }

    /// Brings the state of `id` up to date and returns it. `None` when the
    /// cell does not exist or is not viewable.
    pub(crate) fn validate(&mut self, model: &Model, id: Id) -> Option<&CellState> {
        let mut in_progress = Vec::new();
        self.ensure(model, id, &mut in_progress);
        self.states.get(&id)
    }

    /// Revalidates every dirty state. Returns the number of recomputes.
    pub(crate) fn validate_all(&mut self, model: &Model) -> u64 {
        let before = self.recomputes;
        while let Some(id) = self.dirty.first().copied() {
            let mut in_progress = Vec::new();
            self.ensure(model, id, &mut in_progress);
        }
        let recomputed = self.recomputes - before;
        debug!(recomputed = recomputed; "Validated view");
        recomputed
    }

    /// Returns whether `id` has a state after the call.
    fn ensure(&mut self, model: &Model, id: Id, in_progress: &mut Vec<Id>) -> bool {
        let cached = self.states.contains_key(&id);
        if cached && !self.dirty.contains(&id) {
            return true;
        }
        if in_progress.contains(&id) {
            return cached;
        }
        if !is_viewable(model, id) {
            self.forget(id);
            return false;
        }
        let Some(cell) = model.cell(id) else {
            self.forget(id);
            return false;
        };

        in_progress.push(id);
        let computed = if cell.is_edge() {
            self.compute_edge(model, cell, in_progress)
        } else {
            Some(self.compute_node(model, cell, in_progress))
        };
        in_progress.pop();
        self.dirty.shift_remove(&id);

        match computed {
            Some(state) => {
                self.recomputes += 1;
                trace!(cell:% = id, kind = cell.kind().name(); "Recomputed state");
                self.states.insert(id, state);
                true
            }
            None => {
                self.states.remove(&id);
                false
            }
        }
    }

    fn to_view(&self, point: Point) -> Point {
        point.add_point(self.translate).scale(self.scale)
    }

    fn resolve_style(&self, cell: &Cell) -> Style {
        self.stylesheet
            .resolve(cell.kind(), cell.style(), self.overrides.get(&cell.id()))
    }

    /// Absolute frame of the parent of `id`. Edge parents never rotate.
    fn parent_frame(&mut self, model: &Model, id: Id, in_progress: &mut Vec<Id>) -> Frame {
        let Some(parent) = model.parent(id) else {
            return Frame::default();
        };
        self.ensure(model, parent, in_progress);
        let (origin, rotation) = self
            .states
            .get(&parent)
            .map(|state| {
                let rotation = if state.is_edge() {
                    0.0
                } else {
                    state.style().number_or(keys::ROTATION, 0.0)
                };
                (state.origin(), rotation)
            })
            .unwrap_or_default();
        let size = model
            .cell(parent)
            .map(|cell| Size::new(cell.geometry().width(), cell.geometry().height()))
            .unwrap_or_default();
        Frame {
            origin,
            size,
            rotation,
        }
    }

    fn compute_node(&mut self, model: &Model, cell: &Cell, in_progress: &mut Vec<Id>) -> CellState {
        let frame = self.parent_frame(model, cell.id(), in_progress);
        let geometry = cell.geometry();

        let local = if geometry.is_relative() {
            let offset = geometry.offset().unwrap_or_default();
            Point::new(
                geometry.x() * frame.size.width() + offset.x(),
                geometry.y() * frame.size.height() + offset.y(),
            )
        } else {
            Point::new(geometry.x(), geometry.y())
        };
        let mut origin = frame.origin.add_point(local);
        let mut style = self.resolve_style(cell);
        if frame.rotation != 0.0 {
            // Turn the child about the parent center; its own box stays axis
            // aligned and inherits the rotation through its style.
            let half = Point::new(geometry.width() / 2.0, geometry.height() / 2.0);
            let center = origin
                .add_point(half)
                .rotate_about(frame.center(), frame.rotation);
            origin = center.sub_point(half);
            let own = style.number_or(keys::ROTATION, 0.0);
            style.set(keys::ROTATION, frame.rotation + own);
        }
        let size = Size::new(geometry.width(), geometry.height()).scale(self.scale);
        let bounds = Bounds::new_from_top_left(self.to_view(origin), size);

        CellState::node(cell.id(), bounds, origin, style)
    }

    fn perimeter_for(&self, style: &Style) -> PerimeterFn {
        let name = style
            .text(keys::PERIMETER)
            .unwrap_or(self.default_perimeter.as_str());
        match self.registry.perimeter(name) {
            Ok(perimeter) => perimeter,
            Err(err) => {
                warn!(err:%; "Falling back to rectangle perimeter");
                rectangle_perimeter
            }
        }
    }

    fn router_for(&self, style: &Style) -> RouterEntry {
        let name = style
            .text(keys::EDGE_STYLE)
            .unwrap_or(self.default_router.as_str());
        match self.registry.router(name) {
            Ok(router) => router,
            Err(err) => {
                warn!(err:%; "Falling back to straight router");
                RouterKind::Straight.entry()
            }
        }
    }

    /// Resolves one end of an edge. `None` means the end is attached to a
    /// cell that has no state, so the edge cannot be shown either.
    fn resolve_end(
        &mut self,
        model: &Model,
        edge: &Cell,
        edge_style: &Style,
        end: TerminalEnd,
        in_progress: &mut Vec<Id>,
    ) -> Option<(EndInput, Option<Id>, Option<Constraint>)> {
        let terminal = *edge.terminal(end)?;

        let Some(terminal_cell) = terminal.cell() else {
            let point = terminal.end().point().unwrap_or_default();
            return Some((EndInput::Dangling(self.to_view(point)), None, None));
        };

        let visible = visible_terminal(model, terminal_cell);
        let cyclic = model
            .cell(visible)
            .filter(|cell| cell.is_edge() && reaches_edge(model, visible, edge.id()));
        if let Some(terminal_edge) = cyclic {
            if !is_viewable(model, visible) {
                return None;
            }
            trace!(edge:% = edge.id(), terminal:% = visible; "Terminal cycle, using anchor");
            let anchor = self.cycle_anchor(model, terminal_edge, in_progress);
            return Some((EndInput::Dangling(anchor), Some(visible), None));
        }

        if !self.ensure(model, visible, in_progress) {
            if !in_progress.contains(&visible) {
                return None;
            }
            // Reached again through a parent, not a terminal.
            let pending = model.cell(visible)?;
            trace!(edge:% = edge.id(), terminal:% = visible; "Terminal in progress, using anchor");
            let anchor = self.cycle_anchor(model, pending, in_progress);
            return Some((EndInput::Dangling(anchor), Some(visible), None));
        }
        let state = self.states.get(&visible)?;

        let constraint = terminal
            .constraint()
            .or_else(|| style_constraint(edge_style, end));
        let edge_spacing_key = match end {
            TerminalEnd::Source => keys::SOURCE_PERIMETER_SPACING,
            TerminalEnd::Target => keys::TARGET_PERIMETER_SPACING,
        };
        let spacing = (state.style().number_or(keys::PERIMETER_SPACING, 0.0)
            + edge_style.number_or(edge_spacing_key, 0.0))
            * self.scale;

        let input = ConnectedEnd {
            bounds: state.bounds(),
            style: state.style().clone(),
            perimeter: self.perimeter_for(state.style()),
            constraint,
            spacing,
        };
        Some((EndInput::Connected(input), Some(visible), constraint))
    }

    /// Stand-in end point for an edge terminal on a terminal cycle: the
    /// centroid of its waypoints, else the mean of its ends that are not
    /// edges, else its parent origin. Nothing here reads the route of
    /// another edge, so all edges of a cycle come out the same in any
    /// validation order.
    fn cycle_anchor(&mut self, model: &Model, terminal: &Cell, in_progress: &mut Vec<Id>) -> Point {
        let origin = self.parent_frame(model, terminal.id(), in_progress).origin;
        if let Some(centroid) = mean(terminal.geometry().points().iter().copied()) {
            return self.to_view(origin.add_point(centroid));
        }

        let mut ends = Vec::new();
        for end in [TerminalEnd::Source, TerminalEnd::Target] {
            let Some(end_terminal) = terminal.terminal(end) else {
                continue;
            };
            let Some(end_cell) = end_terminal.cell() else {
                let point = end_terminal.end().point().unwrap_or_default();
                ends.push(self.to_view(point));
                continue;
            };
            let visible = visible_terminal(model, end_cell);
            if model.cell(visible).is_some_and(Cell::is_edge) {
                continue;
            }
            self.ensure(model, visible, in_progress);
            if let Some(state) = self.states.get(&visible) {
                ends.push(state.bounds().center());
            }
        }
        mean(ends).unwrap_or_else(|| self.to_view(origin))
    }

    fn compute_edge(
        &mut self,
        model: &Model,
        cell: &Cell,
        in_progress: &mut Vec<Id>,
    ) -> Option<CellState> {
        let parent_origin = self.parent_frame(model, cell.id(), in_progress).origin;
        let style = self.resolve_style(cell);

        let (source, visible_source, source_constraint) = self
            .resolve_end(model, cell, &style, TerminalEnd::Source, in_progress)?;
        let (target, visible_target, target_constraint) = self
            .resolve_end(model, cell, &style, TerminalEnd::Target, in_progress)?;

        let waypoints: Vec<Point> = cell
            .geometry()
            .points()
            .iter()
            .map(|point| self.to_view(parent_origin.add_point(*point)))
            .collect();

        let is_loop = visible_source.is_some() && visible_source == visible_target;
        let request = RouteRequest::new(
            &style,
            &waypoints,
            source.route_end(self.scale),
            target.route_end(self.scale),
        )
        .with_loop(is_loop)
        .with_loop_size(self.loop_size * self.scale);
        let points = route(&request, self.router_for(&style));

        let edge_route = EdgeRoute {
            points,
            source_constraint,
            target_constraint,
            visible_source,
            visible_target,
        };
        Some(CellState::edge(cell.id(), parent_origin, style, edge_route))
    }
}
