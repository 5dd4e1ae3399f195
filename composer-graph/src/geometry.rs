//! Geometry primitives shared by the layout engine and the router.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint of the segment to `other`.
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Reflection of `other` through `self`. Used for smoothed spline
    /// continuations (mirrored control point).
    pub fn mirror(self, other: Point) -> Point {
        Point::new(2.0 * self.x - other.x, 2.0 * self.y - other.y)
    }
}

/// Angle in degrees from `from` to `to`, measured counter-clockwise from
/// east, in `[0, 360)`. Canvas y grows downward, so "up" is 90°.
pub fn angle_deg(from: Point, to: Point) -> f64 {
    let deg = (-(to.y - from.y)).atan2(to.x - from.x).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Round to the nearest multiple of `quantum`.
pub fn snap(value: f64, quantum: f64) -> f64 {
    if quantum <= 0.0 {
        return value;
    }
    (value / quantum).round() * quantum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_cardinal_directions() {
        let origin = Point::new(0.0, 0.0);
        assert_eq!(angle_deg(origin, Point::new(10.0, 0.0)), 0.0);
        assert_eq!(angle_deg(origin, Point::new(0.0, -10.0)), 90.0);
        assert_eq!(angle_deg(origin, Point::new(-10.0, 0.0)), 180.0);
        assert_eq!(angle_deg(origin, Point::new(0.0, 10.0)), 270.0);
    }

    #[test]
    fn snap_rounds_to_nearest_multiple() {
        assert_eq!(snap(123.0, 15.0), 120.0);
        assert_eq!(snap(81.0, 15.0), 75.0);
        assert_eq!(snap(82.5, 15.0), 90.0);
        assert_eq!(snap(7.0, 0.0), 7.0);
    }

    #[test]
    fn mirror_reflects_through_anchor() {
        let anchor = Point::new(10.0, 10.0);
        let m = anchor.mirror(Point::new(4.0, 7.0));
        assert_eq!(m, Point::new(16.0, 13.0));
    }
}
