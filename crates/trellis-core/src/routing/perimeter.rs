//! Built-in perimeter functions.
//!
//! Each function maps a point the edge is heading towards onto the outline
//! of a shape drawn inside `bounds`. With `orthogonal` set, a `next` point
//! that lies within the horizontal (or vertical) extent of the shape is
//! projected straight up/down (or left/right) so the last segment stays
//! axis-aligned.

use std::fmt;

use crate::{
    geometry::{Bounds, Point},
    style::Style,
};

use super::PerimeterFn;

/// Tolerance for degenerate direction vectors.
const EPSILON: f32 = 1e-6;

/// The closed set of built-in perimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerimeterKind {
    Rectangle,
    Ellipse,
    Rhombus,
    Triangle,
}

impl PerimeterKind {
    pub const ALL: [PerimeterKind; 4] = [
        PerimeterKind::Rectangle,
        PerimeterKind::Ellipse,
        PerimeterKind::Rhombus,
        PerimeterKind::Triangle,
    ];

    /// Registry name, as used by the `perimeter` style key.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Rhombus => "rhombus",
            Self::Triangle => "triangle",
        }
    }

    pub fn function(self) -> PerimeterFn {
        match self {
            Self::Rectangle => rectangle_perimeter,
            Self::Ellipse => ellipse_perimeter,
            Self::Rhombus => rhombus_perimeter,
            Self::Triangle => triangle_perimeter,
        }
    }
}

impl fmt::Display for PerimeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned projection of `next` onto the horizontal or vertical extent
/// of `bounds`, if `next` lies beside the shape on exactly one axis.
///
/// Returns the origin and direction of the ray to cast from inside the
/// shape.
fn orthogonal_ray(bounds: Bounds, next: Point) -> Option<(Point, Point)> {
    let center = bounds.center();
    let in_x = bounds.spans_x(next.x());
    let in_y = bounds.spans_y(next.y());
    match (in_x, in_y) {
        (true, false) => Some((
            Point::new(next.x(), center.y()),
            Point::new(0.0, (next.y() - center.y()).signum()),
        )),
        (false, true) => Some((
            Point::new(center.x(), next.y()),
            Point::new((next.x() - center.x()).signum(), 0.0),
        )),
        _ => None,
    }
}

/// Intersection of the rectangle with the ray from its center toward `next`.
///
/// The axis that is hit is snapped to the exact side coordinate, so a shape
/// at `(0, 0, 80, 30)` heading right yields exactly `(80, 15)`.
///
/// # Examples
///
/// ```
/// use trellis_core::{geometry::{Bounds, Point}, routing::rectangle_perimeter, style::Style};
///
/// let bounds = Bounds::new(0.0, 0.0, 80.0, 30.0);
/// let point = rectangle_perimeter(bounds, &Style::new(), Point::new(240.0, 15.0), false);
/// assert_eq!(point, Point::new(80.0, 15.0));
/// ```
pub fn rectangle_perimeter(bounds: Bounds, _style: &Style, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();

    if orthogonal {
        let in_x = bounds.spans_x(next.x());
        let in_y = bounds.spans_y(next.y());
        match (in_x, in_y) {
            (true, false) => {
                let y = if next.y() < center.y() {
                    bounds.min_y()
                } else {
                    bounds.max_y()
                };
                return Point::new(next.x(), y);
            }
            (false, true) => {
                let x = if next.x() < center.x() {
                    bounds.min_x()
                } else {
                    bounds.max_x()
                };
                return Point::new(x, next.y());
            }
            _ => {}
        }
    }

    let dir = next.sub_point(center);
    if dir.x().abs() < EPSILON && dir.y().abs() < EPSILON {
        return center;
    }

    let half_width = bounds.width() / 2.0;
    let half_height = bounds.height() / 2.0;

    // Ray parameter to the nearest vertical and horizontal side.
    let t_x = if dir.x().abs() < EPSILON {
        f32::INFINITY
    } else {
        half_width / dir.x().abs()
    };
    let t_y = if dir.y().abs() < EPSILON {
        f32::INFINITY
    } else {
        half_height / dir.y().abs()
    };

    if t_x <= t_y {
        let x = if dir.x() > 0.0 {
            bounds.max_x()
        } else {
            bounds.min_x()
        };
        let y = if dir.y().abs() < EPSILON {
            center.y()
        } else {
            dir.y().mul_add(t_x, center.y())
        };
        Point::new(x, y)
    } else {
        let y = if dir.y() > 0.0 {
            bounds.max_y()
        } else {
            bounds.min_y()
        };
        let x = if dir.x().abs() < EPSILON {
            center.x()
        } else {
            dir.x().mul_add(t_y, center.x())
        };
        Point::new(x, y)
    }
}

/// Intersection of the inscribed ellipse with the ray toward `next`.
pub fn ellipse_perimeter(bounds: Bounds, style: &Style, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();
    let a = bounds.width() / 2.0;
    let b = bounds.height() / 2.0;
    if a < EPSILON || b < EPSILON {
        return rectangle_perimeter(bounds, style, next, orthogonal);
    }

    if orthogonal {
        if bounds.spans_x(next.x()) && !bounds.spans_y(next.y()) {
            let fx = (next.x() - center.x()) / a;
            let dy = b * (1.0 - fx * fx).max(0.0).sqrt();
            let y = if next.y() < center.y() {
                center.y() - dy
            } else {
                center.y() + dy
            };
            return Point::new(next.x(), y);
        }
        if bounds.spans_y(next.y()) && !bounds.spans_x(next.x()) {
            let fy = (next.y() - center.y()) / b;
            let dx = a * (1.0 - fy * fy).max(0.0).sqrt();
            let x = if next.x() < center.x() {
                center.x() - dx
            } else {
                center.x() + dx
            };
            return Point::new(x, next.y());
        }
    }

    let dir = next.sub_point(center);
    if dir.x().abs() < EPSILON && dir.y().abs() < EPSILON {
        return center;
    }

    // Solve (t*dx/a)^2 + (t*dy/b)^2 = 1 for t.
    let nx = dir.x() / a;
    let ny = dir.y() / b;
    let t = 1.0 / nx.hypot(ny);
    Point::new(dir.x().mul_add(t, center.x()), dir.y().mul_add(t, center.y()))
}

/// Intersection of the inscribed rhombus (diamond) with the ray toward
/// `next`.
pub fn rhombus_perimeter(bounds: Bounds, style: &Style, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();
    let outline = [
        Point::new(center.x(), bounds.min_y()),
        Point::new(bounds.max_x(), center.y()),
        Point::new(center.x(), bounds.max_y()),
        Point::new(bounds.min_x(), center.y()),
    ];
    polygon_perimeter(bounds, style, &outline, next, orthogonal)
}

/// Intersection of an east-pointing isosceles triangle with the ray toward
/// `next`.
pub fn triangle_perimeter(bounds: Bounds, style: &Style, next: Point, orthogonal: bool) -> Point {
    let center = bounds.center();
    let outline = [
        bounds.min_point(),
        Point::new(bounds.max_x(), center.y()),
        Point::new(bounds.min_x(), bounds.max_y()),
    ];
    polygon_perimeter(bounds, style, &outline, next, orthogonal)
}

fn polygon_perimeter(
    bounds: Bounds,
    style: &Style,
    outline: &[Point],
    next: Point,
    orthogonal: bool,
) -> Point {
    if bounds.width() < EPSILON || bounds.height() < EPSILON {
        return rectangle_perimeter(bounds, style, next, orthogonal);
    }

    if orthogonal {
        if let Some((origin, dir)) = orthogonal_ray(bounds, next) {
            if let Some(hit) = ray_polygon_hit(origin, dir, outline) {
                return hit;
            }
        }
    }

    let center = bounds.center();
    let dir = next.sub_point(center);
    if dir.x().abs() < EPSILON && dir.y().abs() < EPSILON {
        return center;
    }
    ray_polygon_hit(center, dir, outline).unwrap_or(center)
}

fn cross(a: Point, b: Point) -> f32 {
    a.x() * b.y() - a.y() * b.x()
}

/// Nearest intersection of the ray `origin + t * dir` (`t >= 0`) with the
/// closed polygon `outline`.
fn ray_polygon_hit(origin: Point, dir: Point, outline: &[Point]) -> Option<Point> {
    let mut best: Option<f32> = None;

    for (i, &start) in outline.iter().enumerate() {
        let end = outline[(i + 1) % outline.len()];
        let edge = end.sub_point(start);
        let denom = cross(dir, edge);
        if denom.abs() < EPSILON {
            continue;
        }

        let offset = start.sub_point(origin);
        let t = cross(offset, edge) / denom;
        let s = cross(offset, dir) / denom;
        if t >= 0.0 && (-EPSILON..=1.0 + EPSILON).contains(&s) && best.is_none_or(|b| t < b) {
            best = Some(t);
        }
    }

    best.map(|t| Point::new(dir.x().mul_add(t, origin.x()), dir.y().mul_add(t, origin.y())))
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(0.0, 0.0, 100.0, 50.0)
    }

    #[test]
    fn test_rectangle_horizontal_and_vertical_rays() {
        let style = Style::new();
        let b = bounds();

        assert_eq!(
            rectangle_perimeter(b, &style, Point::new(300.0, 25.0), false),
            Point::new(100.0, 25.0)
        );
        assert_eq!(
            rectangle_perimeter(b, &style, Point::new(-300.0, 25.0), false),
            Point::new(0.0, 25.0)
        );
        assert_eq!(
            rectangle_perimeter(b, &style, Point::new(50.0, 300.0), false),
            Point::new(50.0, 50.0)
        );
        assert_eq!(
            rectangle_perimeter(b, &style, Point::new(50.0, -300.0), false),
            Point::new(50.0, 0.0)
        );
    }

    #[test]
    fn test_rectangle_diagonal_ray() {
        let style = Style::new();
        // Heading to (150, 75): direction (100, 50) exits through the corner.
        let point = rectangle_perimeter(bounds(), &style, Point::new(150.0, 75.0), false);
        assert_approx_eq!(f32, point.x(), 100.0);
        assert_approx_eq!(f32, point.y(), 50.0);

        // Steeper than the diagonal: exits through the bottom side.
        let point = rectangle_perimeter(bounds(), &style, Point::new(60.0, 125.0), false);
        assert_approx_eq!(f32, point.y(), 50.0);
        assert_approx_eq!(f32, point.x(), 52.5);
    }

    #[test]
    fn test_rectangle_orthogonal_projects_straight() {
        let style = Style::new();
        assert_eq!(
            rectangle_perimeter(bounds(), &style, Point::new(10.0, 200.0), true),
            Point::new(10.0, 50.0)
        );
        assert_eq!(
            rectangle_perimeter(bounds(), &style, Point::new(-40.0, 5.0), true),
            Point::new(0.0, 5.0)
        );
    }

    #[test]
    fn test_rectangle_next_at_center() {
        let style = Style::new();
        assert_eq!(
            rectangle_perimeter(bounds(), &style, Point::new(50.0, 25.0), false),
            Point::new(50.0, 25.0)
        );
    }

    #[test]
    fn test_ellipse_axes() {
        let style = Style::new();
        let point = ellipse_perimeter(bounds(), &style, Point::new(500.0, 25.0), false);
        assert_approx_eq!(f32, point.x(), 100.0, epsilon = 0.001);
        assert_approx_eq!(f32, point.y(), 25.0, epsilon = 0.001);

        let point = ellipse_perimeter(bounds(), &style, Point::new(50.0, -500.0), false);
        assert_approx_eq!(f32, point.x(), 50.0, epsilon = 0.001);
        assert_approx_eq!(f32, point.y(), 0.0, epsilon = 0.001);
    }

    #[test]
    fn test_ellipse_orthogonal() {
        let style = Style::new();
        // x = 50 is the center column, so the projection reaches the bottom pole.
        let point = ellipse_perimeter(bounds(), &style, Point::new(50.0, 100.0), true);
        assert_approx_eq!(f32, point.x(), 50.0);
        assert_approx_eq!(f32, point.y(), 50.0, epsilon = 0.001);
    }

    #[test]
    fn test_rhombus_diagonal_lands_on_edge_midpoint() {
        let style = Style::new();
        let square = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let point = rhombus_perimeter(square, &style, Point::new(200.0, 200.0), false);
        assert_approx_eq!(f32, point.x(), 75.0, epsilon = 0.001);
        assert_approx_eq!(f32, point.y(), 75.0, epsilon = 0.001);
    }

    #[test]
    fn test_triangle_tip() {
        let style = Style::new();
        let point = triangle_perimeter(bounds(), &style, Point::new(400.0, 25.0), false);
        assert_approx_eq!(f32, point.x(), 100.0, epsilon = 0.001);
        assert_approx_eq!(f32, point.y(), 25.0, epsilon = 0.001);

        let point = triangle_perimeter(bounds(), &style, Point::new(-400.0, 25.0), false);
        assert_approx_eq!(f32, point.x(), 0.0, epsilon = 0.001);
    }

    #[test]
    fn test_zero_sized_bounds_are_finite() {
        let style = Style::new();
        let b = Bounds::at_point(Point::new(5.0, 5.0));
        for kind in PerimeterKind::ALL {
            let point = (kind.function())(b, &style, Point::new(20.0, 30.0), false);
            assert!(point.x().is_finite() && point.y().is_finite(), "{kind}");
        }
    }
}

#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn point_strategy() -> impl Strategy<Value = Point> {
        (-1000.0f32..1000.0, -1000.0f32..1000.0).prop_map(|(x, y)| Point::new(x, y))
    }

    fn bounds_strategy() -> impl Strategy<Value = Bounds> {
        (-500.0f32..500.0, -500.0f32..500.0, 0.0f32..500.0, 0.0f32..500.0)
            .prop_map(|(x, y, w, h)| Bounds::new(x, y, w, h))
    }

    fn kind_strategy() -> impl Strategy<Value = PerimeterKind> {
        prop::sample::select(PerimeterKind::ALL.to_vec())
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Every perimeter point has finite coordinates.
    fn check_perimeter_is_finite(
        bounds: Bounds,
        next: Point,
        kind: PerimeterKind,
        orthogonal: bool,
    ) -> Result<(), TestCaseError> {
        let result = (kind.function())(bounds, &Style::new(), next, orthogonal);
        prop_assert!(result.x().is_finite(), "x coordinate is not finite: {result:?}");
        prop_assert!(result.y().is_finite(), "y coordinate is not finite: {result:?}");
        Ok(())
    }

    /// Every perimeter point lies within the (slightly padded) bounds.
    fn check_perimeter_within_bounds(
        bounds: Bounds,
        next: Point,
        kind: PerimeterKind,
        orthogonal: bool,
    ) -> Result<(), TestCaseError> {
        let result = (kind.function())(bounds, &Style::new(), next, orthogonal);
        let tolerance = 0.01;
        prop_assert!(result.x() >= bounds.min_x() - tolerance);
        prop_assert!(result.x() <= bounds.max_x() + tolerance);
        prop_assert!(result.y() >= bounds.min_y() - tolerance);
        prop_assert!(result.y() <= bounds.max_y() + tolerance);
        Ok(())
    }

    /// The rectangle perimeter result lies on one of the four sides, or is
    /// the center when `next` coincides with it.
    fn check_rectangle_on_boundary(bounds: Bounds, next: Point) -> Result<(), TestCaseError> {
        let result = rectangle_perimeter(bounds, &Style::new(), next, false);

        let on_left = approx_eq!(f32, result.x(), bounds.min_x(), epsilon = 0.01);
        let on_right = approx_eq!(f32, result.x(), bounds.max_x(), epsilon = 0.01);
        let on_top = approx_eq!(f32, result.y(), bounds.min_y(), epsilon = 0.01);
        let on_bottom = approx_eq!(f32, result.y(), bounds.max_y(), epsilon = 0.01);
        let is_center = result == bounds.center();

        prop_assert!(
            on_left || on_right || on_top || on_bottom || is_center,
            "Result {result:?} is not on the boundary of {bounds:?}"
        );
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn perimeter_is_finite(
            bounds in bounds_strategy(),
            next in point_strategy(),
            kind in kind_strategy(),
            orthogonal in any::<bool>(),
        ) {
            check_perimeter_is_finite(bounds, next, kind, orthogonal)?;
        }

        #[test]
        fn perimeter_within_bounds(
            bounds in bounds_strategy(),
            next in point_strategy(),
            kind in kind_strategy(),
            orthogonal in any::<bool>(),
        ) {
            check_perimeter_within_bounds(bounds, next, kind, orthogonal)?;
        }

        #[test]
        fn rectangle_on_boundary(bounds in bounds_strategy(), next in point_strategy()) {
            check_rectangle_on_boundary(bounds, next)?;
        }
    }
}
