//! Connection-point resolution for the two ends of an edge.

use crate::{
    cell::Constraint,
    geometry::{Bounds, Point},
    style::{Style, keys},
};

use super::PerimeterFn;

/// Maps a fixed constraint onto `bounds`.
///
/// The fraction is applied to the unrotated bounds, the offset (model units)
/// is multiplied by `scale`, and the result is rotated with the shape. The
/// perimeter function is never consulted, so a fixed point may lie off the
/// shape's contour.
///
/// # Examples
///
/// ```
/// use trellis_core::{cell::Constraint, geometry::{Bounds, Point}, routing::fixed_point};
///
/// let bounds = Bounds::new(0.0, 0.0, 80.0, 30.0);
/// let point = fixed_point(bounds, Constraint::new(0.5, 1.0), 0.0, 1.0);
/// assert_eq!(point, Point::new(40.0, 30.0));
/// ```
pub fn fixed_point(bounds: Bounds, constraint: Constraint, rotation: f32, scale: f32) -> Point {
    let offset = Point::new(constraint.dx(), constraint.dy()).scale(scale);
    bounds
        .point_at_fraction(constraint.x(), constraint.y())
        .add_point(offset)
        .rotate_about(bounds.center(), rotation)
}

/// Projects `next` onto the perimeter of a possibly rotated shape.
///
/// `spacing` grows the bounds on every side before projecting.
pub fn perimeter_point(
    perimeter: PerimeterFn,
    bounds: Bounds,
    style: &Style,
    next: Point,
    orthogonal: bool,
    spacing: f32,
) -> Point {
    let bounds = if spacing != 0.0 {
        bounds.grow(spacing)
    } else {
        bounds
    };
    let rotation = style.number_or(keys::ROTATION, 0.0);
    let center = bounds.center();

    let local_next = next.rotate_about(center, -rotation);
    perimeter(bounds, style, local_next, orthogonal).rotate_about(center, rotation)
}

/// A connected edge end: the terminal's absolute bounds and how to attach.
#[derive(Debug, Clone)]
pub struct ShapeEnd<'a> {
    bounds: Bounds,
    style: &'a Style,
    perimeter: PerimeterFn,
    constraint: Option<Constraint>,
    spacing: f32,
    scale: f32,
}

impl<'a> ShapeEnd<'a> {
    pub fn new(bounds: Bounds, style: &'a Style, perimeter: PerimeterFn) -> Self {
        Self {
            bounds,
            style,
            perimeter,
            constraint: None,
            spacing: 0.0,
            scale: 1.0,
        }
    }

    /// Sets the constraint (builder style).
    pub fn with_constraint(mut self, constraint: Option<Constraint>) -> Self {
        self.constraint = constraint;
        self
    }

    /// Sets the perimeter spacing in absolute units (builder style).
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the view scale applied to constraint offsets (builder style).
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn style(&self) -> &Style {
        self.style
    }

    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
    }

    fn rotation(&self) -> f32 {
        self.style.number_or(keys::ROTATION, 0.0)
    }

    /// The fixed attachment point, if a constraint pins one.
    pub fn fixed(&self) -> Option<Point> {
        let constraint = self.constraint?;
        let point = fixed_point(self.bounds, constraint, self.rotation(), self.scale);
        if constraint.projects_to_perimeter() {
            Some(perimeter_point(
                self.perimeter,
                self.bounds,
                self.style,
                point,
                false,
                self.spacing,
            ))
        } else {
            Some(point)
        }
    }
}

/// One end of an edge as seen by the routing engine.
#[derive(Debug, Clone)]
pub enum RouteEnd<'a> {
    /// Not connected: the end sits at this absolute point.
    Dangling(Point),
    /// Connected to a shape.
    Shape(ShapeEnd<'a>),
}

impl RouteEnd<'_> {
    /// The point routers aim at: the dangling point, the fixed point, or the
    /// shape center for free ends.
    pub fn anchor(&self) -> Point {
        match self {
            Self::Dangling(point) => *point,
            Self::Shape(shape) => shape.fixed().unwrap_or_else(|| shape.bounds.center()),
        }
    }

    /// The area routers keep clear of: the shape bounds, or a zero-sized box
    /// at the dangling point.
    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Dangling(point) => Bounds::at_point(*point),
            Self::Shape(shape) => shape.bounds,
        }
    }

    /// True when the end is pinned: dangling or fixed by a constraint.
    pub fn is_fixed(&self) -> bool {
        match self {
            Self::Dangling(_) => true,
            Self::Shape(shape) => shape.constraint.is_some(),
        }
    }

    /// Resolves the final attachment point when the edge heads to `next`.
    pub fn resolve(&self, next: Point, orthogonal: bool) -> Point {
        match self {
            Self::Dangling(point) => *point,
            Self::Shape(shape) => shape.fixed().unwrap_or_else(|| {
                perimeter_point(
                    shape.perimeter,
                    shape.bounds,
                    shape.style,
                    next,
                    orthogonal,
                    shape.spacing,
                )
            }),
        }
    }
}
