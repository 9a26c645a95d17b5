//! Edge routing: perimeter functions, router functions and connection-point
//! resolution.
//!
//! Everything in this module is a pure function of its inputs. Perimeters
//! and routers are plain `fn` pointers looked up by name in a [`Registry`],
//! so they cannot carry hidden state between calls.
//!
//! [`route`] is the entry point the view uses: it runs the router to get the
//! bend points, then resolves each end of the edge (fixed constraint,
//! perimeter projection or dangling point) and returns the full polyline.

mod constraint;
mod perimeter;
mod registry;
mod router;

pub use constraint::{RouteEnd, ShapeEnd, fixed_point, perimeter_point};
pub use perimeter::{
    PerimeterKind, ellipse_perimeter, rectangle_perimeter, rhombus_perimeter, triangle_perimeter,
};
pub use registry::{Registry, RegistryError, RouterEntry};
pub use router::{
    RouterKind, elbow_route, loop_route, orthogonal_route, side_to_side_route, straight_route,
    top_to_bottom_route,
};

use log::trace;

use crate::{geometry::Point, style::Style};

/// `(bounds, style, next, orthogonal) -> boundary point`.
///
/// `next` is the point the edge is heading towards. With `orthogonal` set the
/// result is aligned with `next` horizontally or vertically where possible.
pub type PerimeterFn = fn(crate::geometry::Bounds, &Style, Point, bool) -> Point;

/// `(request) -> bend points` between the two ends, in absolute coordinates.
pub type RouterFn = fn(&RouteRequest<'_>) -> Vec<Point>;

/// Default size of a synthesized self-loop.
pub const DEFAULT_LOOP_SIZE: f32 = 20.0;

/// Everything a router needs to know about one edge.
#[derive(Debug, Clone)]
pub struct RouteRequest<'a> {
    style: &'a Style,
    waypoints: &'a [Point],
    source: RouteEnd<'a>,
    target: RouteEnd<'a>,
    is_loop: bool,
    loop_size: f32,
}

impl<'a> RouteRequest<'a> {
    pub fn new(
        style: &'a Style,
        waypoints: &'a [Point],
        source: RouteEnd<'a>,
        target: RouteEnd<'a>,
    ) -> Self {
        Self {
            style,
            waypoints,
            source,
            target,
            is_loop: false,
            loop_size: DEFAULT_LOOP_SIZE,
        }
    }

    /// Marks both ends as attached to the same cell (builder style).
    pub fn with_loop(mut self, is_loop: bool) -> Self {
        self.is_loop = is_loop;
        self
    }

    /// Sets the size of synthesized loops (builder style).
    pub fn with_loop_size(mut self, loop_size: f32) -> Self {
        self.loop_size = loop_size;
        self
    }

    pub fn style(&self) -> &Style {
        self.style
    }

    pub fn waypoints(&self) -> &[Point] {
        self.waypoints
    }

    pub fn source(&self) -> &RouteEnd<'a> {
        &self.source
    }

    pub fn target(&self) -> &RouteEnd<'a> {
        &self.target
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn loop_size(&self) -> f32 {
        self.style
            .number_or(crate::style::keys::LOOP_SIZE, self.loop_size)
    }

    /// True when the edge would otherwise collapse onto a single point.
    fn is_degenerate(&self) -> bool {
        self.waypoints.is_empty()
            && (self.is_loop || self.source.anchor() == self.target.anchor())
    }
}

/// Computes the full absolute point sequence of an edge.
///
/// The result starts at the resolved source point and ends at the resolved
/// target point, with the router's bend points in between. Degenerate edges
/// (a self-loop without waypoints, or both ends on the same point) are
/// routed with [`loop_route`] so they stay visible.
pub fn route(request: &RouteRequest<'_>, router: RouterEntry) -> Vec<Point> {
    let bends = if request.is_degenerate() {
        trace!("Degenerate edge, synthesizing loop");
        loop_route(request)
    } else {
        (router.route())(request)
    };
    let orthogonal = router.is_orthogonal();

    // Source first, heading to the first bend or the target's raw anchor;
    // the target then heads to the last bend or the resolved source point.
    let source_next = bends
        .first()
        .copied()
        .unwrap_or_else(|| request.target.anchor());
    let source_point = request.source.resolve(source_next, orthogonal);

    let target_next = bends.last().copied().unwrap_or(source_point);
    let target_point = request.target.resolve(target_next, orthogonal);

    let mut points = Vec::with_capacity(bends.len() + 2);
    points.push(source_point);
    points.extend(bends);
    points.push(target_point);
    points
}
