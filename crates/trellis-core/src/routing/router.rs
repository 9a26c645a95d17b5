//! Built-in router functions.
//!
//! A router only produces the bend points between the two ends of an edge.
//! The ends themselves are resolved afterwards by [`super::route`], which
//! projects free ends onto their perimeter towards the first and last bend.

use std::fmt;

use crate::{
    geometry::{Bounds, Point},
    style::keys,
};

use super::{RouteEnd, RouteRequest, RouterEntry};

/// The closed set of built-in routers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterKind {
    Straight,
    Orthogonal,
    Elbow,
    SideToSide,
    TopToBottom,
    Loop,
}

impl RouterKind {
    pub const ALL: [RouterKind; 6] = [
        RouterKind::Straight,
        RouterKind::Orthogonal,
        RouterKind::Elbow,
        RouterKind::SideToSide,
        RouterKind::TopToBottom,
        RouterKind::Loop,
    ];

    /// Registry name, as used by the `edgeStyle` style key.
    pub fn name(self) -> &'static str {
        match self {
            Self::Straight => "straight",
            Self::Orthogonal => "orthogonal",
            Self::Elbow => "elbow",
            Self::SideToSide => "side_to_side",
            Self::TopToBottom => "top_to_bottom",
            Self::Loop => "loop",
        }
    }

    /// Whether free ends should attach with axis-aligned final segments.
    pub fn is_orthogonal(self) -> bool {
        !matches!(self, Self::Straight | Self::Loop)
    }

    pub fn entry(self) -> RouterEntry {
        let route = match self {
            Self::Straight => straight_route,
            Self::Orthogonal => orthogonal_route,
            Self::Elbow => elbow_route,
            Self::SideToSide => side_to_side_route,
            Self::TopToBottom => top_to_bottom_route,
            Self::Loop => loop_route,
        };
        RouterEntry::new(route, self.is_orthogonal())
    }
}

impl fmt::Display for RouterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keeps the waypoints exactly as authored.
pub fn straight_route(request: &RouteRequest<'_>) -> Vec<Point> {
    request.waypoints().to_vec()
}

/// Middle of the horizontal gap between two boxes, if they do not overlap
/// horizontally.
fn horizontal_gap(a: Bounds, b: Bounds) -> Option<f32> {
    if a.max_x() < b.min_x() {
        Some((a.max_x() + b.min_x()) / 2.0)
    } else if b.max_x() < a.min_x() {
        Some((b.max_x() + a.min_x()) / 2.0)
    } else {
        None
    }
}

/// Middle of the vertical gap between two boxes, if they do not overlap
/// vertically.
fn vertical_gap(a: Bounds, b: Bounds) -> Option<f32> {
    if a.max_y() < b.min_y() {
        Some((a.max_y() + b.min_y()) / 2.0)
    } else if b.max_y() < a.min_y() {
        Some((b.max_y() + a.min_y()) / 2.0)
    } else {
        None
    }
}

/// Midline of the overlap of two extents, if both ends are free to move
/// along it.
fn shared_midline(
    source: &RouteEnd<'_>,
    target: &RouteEnd<'_>,
    lo_hi: fn(Bounds) -> (f32, f32),
) -> Option<f32> {
    if source.is_fixed() || target.is_fixed() {
        return None;
    }
    let (s_lo, s_hi) = lo_hi(source.bounds());
    let (t_lo, t_hi) = lo_hi(target.bounds());
    let lo = s_lo.max(t_lo);
    let hi = s_hi.min(t_hi);
    (lo <= hi).then(|| (lo + hi) / 2.0)
}

fn y_extent(bounds: Bounds) -> (f32, f32) {
    (bounds.min_y(), bounds.max_y())
}

fn x_extent(bounds: Bounds) -> (f32, f32) {
    (bounds.min_x(), bounds.max_x())
}

/// Axis-aligned route through the midline between the two ends.
///
/// Waypoints are discarded. Boxes separated horizontally get a vertical
/// segment in the middle of the gap (or a single straight run when their
/// vertical extents overlap); boxes separated vertically are handled the
/// same way on the other axis. Overlapping boxes detour around the right.
pub fn orthogonal_route(request: &RouteRequest<'_>) -> Vec<Point> {
    let source = request.source();
    let target = request.target();
    let s = source.anchor();
    let t = target.anchor();

    if let Some(mid_x) = horizontal_gap(source.bounds(), target.bounds()) {
        if let Some(y) = shared_midline(source, target, y_extent) {
            return vec![Point::new(mid_x, y)];
        }
        if s.y() == t.y() {
            return Vec::new();
        }
        return vec![Point::new(mid_x, s.y()), Point::new(mid_x, t.y())];
    }

    if let Some(mid_y) = vertical_gap(source.bounds(), target.bounds()) {
        if let Some(x) = shared_midline(source, target, x_extent) {
            return vec![Point::new(x, mid_y)];
        }
        if s.x() == t.x() {
            return Vec::new();
        }
        return vec![Point::new(s.x(), mid_y), Point::new(t.x(), mid_y)];
    }

    let detour_x = source.bounds().max_x().max(target.bounds().max_x()) + request.loop_size();
    vec![Point::new(detour_x, s.y()), Point::new(detour_x, t.y())]
}

/// Horizontal-vertical-horizontal route with its vertical run at the first
/// waypoint's x, or in the middle between the ends.
pub fn side_to_side_route(request: &RouteRequest<'_>) -> Vec<Point> {
    let source = request.source();
    let target = request.target();
    let s = source.anchor();
    let t = target.anchor();

    let x = match request.waypoints().first() {
        Some(hint) => hint.x(),
        None => horizontal_gap(source.bounds(), target.bounds())
            .unwrap_or_else(|| s.midpoint(t).x()),
    };

    if s.y() == t.y() && request.waypoints().is_empty() {
        return Vec::new();
    }
    vec![Point::new(x, s.y()), Point::new(x, t.y())]
}

/// Vertical-horizontal-vertical route with its horizontal run at the first
/// waypoint's y, or in the middle between the ends.
pub fn top_to_bottom_route(request: &RouteRequest<'_>) -> Vec<Point> {
    let source = request.source();
    let target = request.target();
    let s = source.anchor();
    let t = target.anchor();

    let y = match request.waypoints().first() {
        Some(hint) => hint.y(),
        None => vertical_gap(source.bounds(), target.bounds())
            .unwrap_or_else(|| s.midpoint(t).y()),
    };

    if s.x() == t.x() && request.waypoints().is_empty() {
        return Vec::new();
    }
    vec![Point::new(s.x(), y), Point::new(t.x(), y)]
}

/// One elbow, oriented by the `elbow` style key (`horizontal` by default).
pub fn elbow_route(request: &RouteRequest<'_>) -> Vec<Point> {
    match request.style().text(keys::ELBOW) {
        Some("vertical") => top_to_bottom_route(request),
        _ => side_to_side_route(request),
    }
}

/// Side of the source bounds a loop is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// A minimal visible loop on the source.
///
/// The loop is drawn on the side facing the first waypoint, or on the right
/// side when there is none. Its size comes from the `loopSize` style key or
/// the request default.
pub fn loop_route(request: &RouteRequest<'_>) -> Vec<Point> {
    let bounds = request.source().bounds();
    let center = bounds.center();
    let size = request.loop_size();
    let half = size / 2.0;

    let side = match request.waypoints().first() {
        Some(hint) => {
            let d = hint.sub_point(center);
            if d.x().abs() >= d.y().abs() {
                if d.x() < 0.0 {
                    LoopSide::Left
                } else {
                    LoopSide::Right
                }
            } else if d.y() < 0.0 {
                LoopSide::Top
            } else {
                LoopSide::Bottom
            }
        }
        None => LoopSide::Right,
    };

    match side {
        LoopSide::Right => vec![
            Point::new(bounds.max_x() + size, center.y() - half),
            Point::new(bounds.max_x() + size, center.y() + half),
        ],
        LoopSide::Left => vec![
            Point::new(bounds.min_x() - size, center.y() - half),
            Point::new(bounds.min_x() - size, center.y() + half),
        ],
        LoopSide::Top => vec![
            Point::new(center.x() - half, bounds.min_y() - size),
            Point::new(center.x() + half, bounds.min_y() - size),
        ],
        LoopSide::Bottom => vec![
            Point::new(center.x() - half, bounds.max_y() + size),
            Point::new(center.x() + half, bounds.max_y() + size),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routing::{ShapeEnd, rectangle_perimeter, route},
        style::Style,
    };

    fn shape(bounds: Bounds, style: &Style) -> RouteEnd<'_> {
        RouteEnd::Shape(ShapeEnd::new(bounds, style, rectangle_perimeter))
    }

    fn is_axis_aligned(points: &[Point]) -> bool {
        points
            .windows(2)
            .all(|pair| pair[0].x() == pair[1].x() || pair[0].y() == pair[1].y())
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = RouterKind::ALL.iter().map(|kind| kind.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RouterKind::ALL.len());
    }

    #[test]
    fn test_orthogonal_offset_boxes() {
        let style = Style::new();
        let request = RouteRequest::new(
            &style,
            &[],
            shape(Bounds::new(0.0, 0.0, 40.0, 40.0), &style),
            shape(Bounds::new(200.0, 200.0, 40.0, 40.0), &style),
        );

        let points = route(&request, RouterKind::Orthogonal.entry());

        assert_eq!(
            points,
            vec![
                Point::new(40.0, 20.0),
                Point::new(120.0, 20.0),
                Point::new(120.0, 220.0),
                Point::new(200.0, 220.0),
            ]
        );
    }

    #[test]
    fn test_orthogonal_overlapping_extents_run_straight() {
        let style = Style::new();
        let request = RouteRequest::new(
            &style,
            &[],
            shape(Bounds::new(0.0, 0.0, 40.0, 40.0), &style),
            shape(Bounds::new(100.0, 20.0, 40.0, 40.0), &style),
        );

        let points = route(&request, RouterKind::Orthogonal.entry());

        // Overlap of [0, 40] and [20, 60] is [20, 40]; midline y = 30.
        assert_eq!(points.first(), Some(&Point::new(40.0, 30.0)));
        assert_eq!(points.last(), Some(&Point::new(100.0, 30.0)));
        assert!(is_axis_aligned(&points));
    }

    #[test]
    fn test_orthogonal_discards_waypoints() {
        let style = Style::new();
        let waypoints = [Point::new(999.0, 999.0)];
        let request = RouteRequest::new(
            &style,
            &waypoints,
            RouteEnd::Dangling(Point::new(0.0, 0.0)),
            RouteEnd::Dangling(Point::new(100.0, 50.0)),
        );

        let points = route(&request, RouterKind::Orthogonal.entry());

        assert!(!points.contains(&Point::new(999.0, 999.0)));
        assert!(is_axis_aligned(&points));
    }

    #[test]
    fn test_elbow_direction_from_style() {
        let horizontal = Style::new();
        let vertical = Style::new().with(keys::ELBOW, "vertical");
        let source = RouteEnd::Dangling(Point::new(0.0, 0.0));
        let target = RouteEnd::Dangling(Point::new(100.0, 50.0));

        let request = RouteRequest::new(&horizontal, &[], source.clone(), target.clone());
        assert_eq!(
            elbow_route(&request),
            vec![Point::new(50.0, 0.0), Point::new(50.0, 50.0)]
        );

        let request = RouteRequest::new(&vertical, &[], source, target);
        assert_eq!(
            elbow_route(&request),
            vec![Point::new(0.0, 25.0), Point::new(100.0, 25.0)]
        );
    }

    #[test]
    fn test_side_to_side_uses_waypoint_hint() {
        let style = Style::new();
        let waypoints = [Point::new(70.0, 500.0)];
        let request = RouteRequest::new(
            &style,
            &waypoints,
            RouteEnd::Dangling(Point::new(0.0, 0.0)),
            RouteEnd::Dangling(Point::new(100.0, 50.0)),
        );

        assert_eq!(
            side_to_side_route(&request),
            vec![Point::new(70.0, 0.0), Point::new(70.0, 50.0)]
        );
    }

    #[test]
    fn test_loop_faces_waypoint() {
        let style = Style::new().with(keys::LOOP_SIZE, 10.0);
        let bounds = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let waypoints = [Point::new(20.0, -100.0)];
        let request = RouteRequest::new(
            &style,
            &waypoints,
            shape(bounds, &style),
            shape(bounds, &style),
        )
        .with_loop(true);

        assert_eq!(
            loop_route(&request),
            vec![Point::new(15.0, -10.0), Point::new(25.0, -10.0)]
        );
    }
}
