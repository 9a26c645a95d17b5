//! Points, sizes and bounds in diagram space.
//!
//! Coordinates follow the screen convention: `(0, 0)` is the top-left
//! corner, x grows to the right and y grows downwards. Every operation is
//! pure, so routing over the same inputs yields bit-identical points.

use serde::{Deserialize, Serialize};

/// A 2D point in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use trellis_core::geometry::Point;
/// let p1 = Point::new(10.0, 20.0);
/// let p2 = Point::new(5.0, 5.0);
///
/// let sum = p1.add_point(p2);
/// assert_eq!(sum.x(), 15.0);
/// assert_eq!(sum.y(), 25.0);
///
/// let mid = p1.midpoint(p2);
/// assert_eq!(mid.x(), 7.5);
/// assert_eq!(mid.y(), 12.5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }

    pub fn add_point(self, other: Point) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub_point(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn midpoint(self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Multiplies both coordinates by `factor`; the view scale applies this
    /// after translation.
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Rotates this point about `center` by `degrees` (clockwise in screen space).
    ///
    /// A rotation of zero returns the point unchanged, bit for bit.
    pub fn rotate_about(self, center: Point, degrees: f32) -> Self {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self {
            x: center.x + dx * cos - dy * sin,
            y: center.y + dx * sin + dy * cos,
        }
    }
}

/// Width and height of a node or of its parent frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn width(self) -> f32 {
        self.width
    }

    pub fn height(self) -> f32 {
        self.height
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// An axis-aligned rectangle stored as minimum and maximum coordinates.
///
/// Node states keep their absolute bounds here; edge states keep the box
/// around their routed points.
///
/// # Examples
///
/// ```
/// # use trellis_core::geometry::Bounds;
/// let bounds = Bounds::new(10.0, 20.0, 80.0, 30.0);
/// assert_eq!(bounds.max_x(), 90.0);
/// assert_eq!(bounds.center().y(), 35.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Bounds with top-left corner `(x, y)`.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self::new(top_left.x, top_left.y, size.width, size.height)
    }

    /// Zero-sized bounds located at `point`
    pub fn at_point(point: Point) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Smallest bounds containing every point, or `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Bounds>, p| {
            Some(match acc {
                Some(bounds) => Self {
                    min_x: bounds.min_x.min(p.x),
                    min_y: bounds.min_y.min(p.y),
                    max_x: bounds.max_x.max(p.x),
                    max_y: bounds.max_y.max(p.y),
                },
                None => Bounds::at_point(p),
            })
        })
    }

    pub fn min_x(self) -> f32 {
        self.min_x
    }

    pub fn min_y(self) -> f32 {
        self.min_y
    }

    pub fn max_x(self) -> f32 {
        self.max_x
    }

    pub fn max_y(self) -> f32 {
        self.max_y
    }

    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn min_point(self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// True when `x` lies within the horizontal extent (inclusive)
    pub fn spans_x(self, x: f32) -> bool {
        x >= self.min_x && x <= self.max_x
    }

    /// True when `y` lies within the vertical extent (inclusive)
    pub fn spans_y(self, y: f32) -> bool {
        y >= self.min_y && y <= self.max_y
    }

    /// Maps fractional coordinates onto the bounds: `(0, 0)` is the top-left
    /// corner and `(1, 1)` the bottom-right corner.
    pub fn point_at_fraction(self, fx: f32, fy: f32) -> Point {
        Point::new(
            self.min_x + self.width() * fx,
            self.min_y + self.height() * fy,
        )
    }

    /// Moves every side outwards by `amount`. Perimeter spacing uses this
    /// before projecting onto the outline.
    pub fn grow(self, amount: f32) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_point_add_sub() {
        let p1 = Point::new(1.0, 2.0);
        let p2 = Point::new(3.0, 4.0);
        assert_eq!(p1.add_point(p2), Point::new(4.0, 6.0));
        assert_eq!(p2.sub_point(p1), Point::new(2.0, 2.0));
    }

    #[test]
    fn test_view_transform_order() {
        let translated = Point::new(10.0, 5.0).add_point(Point::new(2.0, 0.0));
        assert_eq!(translated.scale(2.0), Point::new(24.0, 10.0));
    }

    #[test]
    fn test_rotate_about_quarter_turn() {
        let center = Point::new(10.0, 10.0);
        let rotated = Point::new(20.0, 10.0).rotate_about(center, 90.0);
        assert_approx_eq!(f32, rotated.x(), 10.0, epsilon = 0.0001);
        assert_approx_eq!(f32, rotated.y(), 20.0, epsilon = 0.0001);
    }

    #[test]
    fn test_rotate_about_zero_is_identity() {
        let p = Point::new(3.3, 7.7);
        assert_eq!(p.rotate_about(Point::new(1.0, 1.0), 0.0), p);
    }

    #[test]
    fn test_bounds_new() {
        let bounds = Bounds::new(10.0, 20.0, 80.0, 30.0);
        assert_eq!(bounds.min_point(), Point::new(10.0, 20.0));
        assert_eq!(bounds.max_x(), 90.0);
        assert_eq!(bounds.max_y(), 50.0);
        assert_eq!(bounds.width(), 80.0);
        assert_eq!(bounds.height(), 30.0);
    }

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds::from_points([
            Point::new(5.0, 1.0),
            Point::new(-2.0, 8.0),
            Point::new(3.0, 3.0),
        ])
        .expect("non-empty");
        assert_eq!(bounds, Bounds::new(-2.0, 1.0, 7.0, 7.0));
        assert!(Bounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_point_at_fraction() {
        let bounds = Bounds::new(0.0, 0.0, 80.0, 30.0);
        assert_eq!(bounds.point_at_fraction(0.5, 1.0), Point::new(40.0, 30.0));
        assert_eq!(bounds.point_at_fraction(0.0, 0.0), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_bounds_spans() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(bounds.spans_x(0.0));
        assert!(bounds.spans_x(10.0));
        assert!(!bounds.spans_x(10.5));
        assert!(bounds.spans_y(5.0));
        assert!(!bounds.spans_y(-0.1));
    }

    #[test]
    fn test_grow() {
        let bounds = Bounds::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(bounds.grow(5.0), Bounds::new(5.0, 5.0, 20.0, 20.0));
    }
}
