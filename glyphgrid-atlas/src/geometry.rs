//! Points, boxes and quadratic bezier curves.

use std::ops::{Add, Mul, Sub};

/// A 2D point or vector. Glyph space is y-up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    pub fn midpoint(self, other: Self) -> Self {
        self.lerp(other, 0.5)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

// ── Bounds ──────────────────────────────────────────────────────────

/// Axis-aligned bounding box. Edges are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Contains nothing; `include` grows it.
    pub const EMPTY: Self = Self {
        min: Point::new(f32::INFINITY, f32::INFINITY),
        max: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn width(&self) -> f32 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn center(&self) -> Point {
        self.min.midpoint(self.max)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn dilate(&self, by: f32) -> Self {
        Self {
            min: Point::new(self.min.x - by, self.min.y - by),
            max: Point::new(self.max.x + by, self.max.y + by),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            Point::new(self.min.x, self.max.y),
            self.max,
        ]
    }
}

// ── Quadratic curve ─────────────────────────────────────────────────

/// A quadratic bezier `p0 → p2` with control point `p1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadCurve {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    /// Straight segment: `p1` is the midpoint of `p0` and `p2`.
    pub line: bool,
    /// The owning contour winds clockwise (y-up).
    pub clockwise: bool,
}

impl QuadCurve {
    pub fn new(p0: Point, p1: Point, p2: Point) -> Self {
        Self {
            p0,
            p1,
            p2,
            line: false,
            clockwise: false,
        }
    }

    /// A zero-curvature curve standing in for the segment `a → b`.
    pub fn line(a: Point, b: Point) -> Self {
        Self {
            line: true,
            ..Self::new(a, a.midpoint(b), b)
        }
    }

    pub fn eval(&self, t: f32) -> Point {
        let a = self.p0.lerp(self.p1, t);
        let b = self.p1.lerp(self.p2, t);
        a.lerp(b, t)
    }

    /// De Casteljau split at `t`.
    pub fn split(&self, t: f32) -> (Self, Self) {
        let a = self.p0.lerp(self.p1, t);
        let b = self.p1.lerp(self.p2, t);
        let m = a.lerp(b, t);
        (
            Self { p1: a, p2: m, ..*self },
            Self { p0: m, p1: b, ..*self },
        )
    }

    /// All three points coincide within `eps`.
    pub fn is_degenerate(&self, eps: f32) -> bool {
        (self.p1 - self.p0).length() <= eps && (self.p2 - self.p0).length() <= eps
    }

    /// Bounding box of the control points (the convex hull's box).
    pub fn hull_bounds(&self) -> Bounds {
        let mut b = Bounds::EMPTY;
        b.include(self.p0);
        b.include(self.p1);
        b.include(self.p2);
        b
    }

    /// Exact bounding box of the curve itself, from its extrema.
    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds::EMPTY;
        b.include(self.p0);
        b.include(self.p2);
        if let Some(t) = extremum(self.p0.x, self.p1.x, self.p2.x) {
            b.include(self.eval(t));
        }
        if let Some(t) = extremum(self.p0.y, self.p1.y, self.p2.y) {
            b.include(self.eval(t));
        }
        b
    }

    /// Apply `f` to every control point.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            p0: f(self.p0),
            p1: f(self.p1),
            p2: f(self.p2),
            ..*self
        }
    }
}

/// Parameter of the interior extremum of a 1D quadratic, if any.
pub(crate) fn extremum(a: f32, b: f32, c: f32) -> Option<f32> {
    let denom = a - 2.0 * b + c;
    if denom == 0.0 {
        return None;
    }
    let t = (a - b) / denom;
    (t > 0.0 && t < 1.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_control_is_midpoint() {
        let c = QuadCurve::line(Point::new(0.0, 0.0), Point::new(2.0, 4.0));
        assert_eq!(c.p1, Point::new(1.0, 2.0));
        assert!(c.line);
        assert_eq!(c.eval(0.5), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_exact_bounds_tighter_than_hull() {
        let c = QuadCurve::new(
            Point::new(0.0, 0.0),
            Point::new(0.5, 1.0),
            Point::new(1.0, 0.0),
        );
        let hull = c.hull_bounds();
        let exact = c.bounds();
        assert_eq!(hull.max.y, 1.0);
        assert!((exact.max.y - 0.5).abs() < 1e-6, "apex at y=0.5, got {}", exact.max.y);
    }

    #[test]
    fn test_split_joins_at_midpoint() {
        let c = QuadCurve::new(
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(2.0, 0.0),
        );
        let (a, b) = c.split(0.5);
        assert_eq!(a.p2, b.p0);
        assert_eq!(a.p2, c.eval(0.5));
        assert_eq!(a.p0, c.p0);
        assert_eq!(b.p2, c.p2);
    }

    #[test]
    fn test_degenerate() {
        let p = Point::new(0.3, 0.3);
        assert!(QuadCurve::new(p, p, p).is_degenerate(1e-6));
        assert!(!QuadCurve::line(p, Point::new(0.4, 0.3)).is_degenerate(1e-6));
    }

    #[test]
    fn test_bounds_overlap_and_empty() {
        let a = Bounds::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let b = Bounds::new(Point::new(1.0, 1.0), Point::new(2.0, 2.0));
        let c = Bounds::new(Point::new(1.5, 0.0), Point::new(2.0, 0.5));
        assert!(a.overlaps(&b), "touching boxes overlap");
        assert!(!a.overlaps(&c));
        assert!(Bounds::EMPTY.is_empty());
    }
}
