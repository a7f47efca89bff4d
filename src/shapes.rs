// src/shapes.rs
//
// Area formulas and the C-layout records that cross the FFI boundary.

use std::f64::consts::PI;

use bytemuck::{Pod, Zeroable};

pub const SHAPE_CIRCLE: i32 = 0;
pub const SHAPE_SQUARE: i32 = 1;
pub const SHAPE_TRIANGLE: i32 = 2;

/// A circle passed by value from C.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Circle {
    pub radius: f64,
}

/// Tagged shape record, laid out as
/// `struct { int32_t shape_type; double dimension1; double dimension2; }`.
///
/// The tag stays a raw `i32` so whatever a C host writes into it is a valid value on our side.
/// Use [`Shape::kind`] to interpret it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Shape {
    pub shape_type: i32,
    _pad: [u8; 4],
    /// radius for circle, side for square, base for triangle
    pub dimension1: f64,
    /// height for triangle, unused otherwise
    pub dimension2: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
}

impl TryFrom<i32> for ShapeKind {
    type Error = i32;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            SHAPE_CIRCLE => Ok(ShapeKind::Circle),
            SHAPE_SQUARE => Ok(ShapeKind::Square),
            SHAPE_TRIANGLE => Ok(ShapeKind::Triangle),
            other => Err(other),
        }
    }
}

impl From<ShapeKind> for i32 {
    fn from(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Circle => SHAPE_CIRCLE,
            ShapeKind::Square => SHAPE_SQUARE,
            ShapeKind::Triangle => SHAPE_TRIANGLE,
        }
    }
}

impl Shape {
    pub fn new(kind: ShapeKind, dimension1: f64, dimension2: f64) -> Self {
        Self::from_raw(kind.into(), dimension1, dimension2)
    }

    /// Builds a record with an arbitrary tag, the way a C host could.
    pub fn from_raw(shape_type: i32, dimension1: f64, dimension2: f64) -> Self {
        Shape {
            shape_type,
            _pad: [0u8; 4],
            dimension1,
            dimension2,
        }
    }

    pub fn circle(radius: f64) -> Self {
        Self::new(ShapeKind::Circle, radius, 0.0)
    }

    pub fn square(side: f64) -> Self {
        Self::new(ShapeKind::Square, side, 0.0)
    }

    pub fn triangle(base: f64, height: f64) -> Self {
        Self::new(ShapeKind::Triangle, base, height)
    }

    pub fn kind(&self) -> Option<ShapeKind> {
        ShapeKind::try_from(self.shape_type).ok()
    }

    /// Area of the described shape; `0.0` for an unrecognized tag.
    pub fn area(&self) -> f64 {
        match self.kind() {
            Some(ShapeKind::Circle) => circle_area(self.dimension1),
            Some(ShapeKind::Square) => square_area(self.dimension1),
            Some(ShapeKind::Triangle) => triangle_area(self.dimension1, self.dimension2),
            None => {
                tracing::debug!(shape_type = self.shape_type, "unrecognized shape type");
                0.0
            }
        }
    }
}

impl Circle {
    pub fn area(&self) -> f64 {
        circle_area(self.radius)
    }
}

/// π·r². Negative radii are not rejected.
pub fn circle_area(radius: f64) -> f64 {
    PI * radius * radius
}

pub fn square_area(side: f64) -> f64 {
    side * side
}

pub fn triangle_area(base: f64, height: f64) -> f64 {
    0.5 * base * height
}

pub fn format_circle_info(radius: f64) -> String {
    format!(
        "Circle with radius {:.2} has area {:.2}",
        radius,
        circle_area(radius)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn circle_area_matches_formula() {
        for r in [0.0, 0.5, 1.0, 2.0, 10.0, 1234.5] {
            assert!(close(circle_area(r), PI * r * r), "radius {r}");
        }
        assert_eq!(circle_area(0.0), 0.0);
    }

    #[test]
    fn negative_radius_goes_through_formula() {
        assert!(close(circle_area(-3.0), circle_area(3.0)));
    }

    #[test]
    fn shape_dispatch() {
        assert!(close(Shape::circle(5.0).area(), circle_area(5.0)));
        assert_eq!(Shape::square(3.0).area(), 9.0);
        assert_eq!(Shape::triangle(4.0, 3.0).area(), 6.0);
        // dimension2 is ignored for circles and squares
        assert_eq!(
            Shape::new(ShapeKind::Square, 2.0, 99.0).area(),
            Shape::square(2.0).area()
        );
    }

    #[test]
    fn unknown_tag_yields_zero() {
        assert_eq!(Shape::from_raw(7, 4.0, 3.0).area(), 0.0);
        assert_eq!(Shape::from_raw(-1, 4.0, 3.0).area(), 0.0);
        assert_eq!(ShapeKind::try_from(42), Err(42));
    }

    #[test]
    fn layout_matches_c() {
        assert_eq!(std::mem::size_of::<Circle>(), 8);
        assert_eq!(std::mem::size_of::<Shape>(), 24);
        assert_eq!(std::mem::offset_of!(Shape, dimension1), 8);
        let zero: Shape = bytemuck::Zeroable::zeroed();
        assert_eq!(zero.kind(), Some(ShapeKind::Circle));
    }

    #[test]
    fn formats_two_decimals() {
        assert_eq!(format_circle_info(2.0), "Circle with radius 2.00 has area 12.57");
        assert_eq!(format_circle_info(0.0), "Circle with radius 0.00 has area 0.00");
    }
}
