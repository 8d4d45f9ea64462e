//! Points, vectors, boxes and tolerances shared by the mesh and the index.

use std::ops::{Add, Sub};

/// Displacement between two [`Point3`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Point at `self + (rhs - self) * t`.
    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        self + Vec3::new((rhs.x - self.x) * t, (rhs.y - self.y) * t, (rhs.z - self.z) * t)
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).length()
    }

    #[must_use]
    pub fn distance_squared_to(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(f(self.x, other.x), f(self.y, other.y), f(self.z, other.z))
    }
}

impl From<[f64; 3]> for Point3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Point3,
    pub max: Point3,
}

impl BBox {
    #[must_use]
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Box of the sphere centered at `center` with `radius`.
    #[must_use]
    pub fn around_sphere(center: Point3, radius: f64) -> Self {
        let r = radius.max(0.0);
        Self::new(center.zip(center, |c, _| c - r), center.zip(center, |c, _| c + r))
    }

    #[must_use]
    pub fn center(self) -> Point3 {
        self.min.lerp(self.max, 0.5)
    }

    /// Inclusive overlap: boxes that only touch intersect.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        let lo = self.min.zip(other.min, f64::max);
        let hi = self.max.zip(other.max, f64::min);
        lo.x <= hi.x && lo.y <= hi.y && lo.z <= hi.z
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self::new(self.min.zip(other.min, f64::min), self.max.zip(other.max, f64::max))
    }

    /// Squared distance from `point` to the box; zero inside.
    #[must_use]
    pub fn distance_squared_to_point(self, point: Point3) -> f64 {
        let below = self.min.zip(point, |lo, p| (lo - p).max(0.0));
        let above = point.zip(self.max, |p, hi| (p - hi).max(0.0));
        (below - Point3::ORIGIN + (above - Point3::ORIGIN)).length_squared()
    }
}

/// Absolute tolerance for geometric comparisons.
///
/// `DEFAULT` (1e-9) decides coincident ball centers and zero-length spans;
/// `ZERO_LENGTH` (1e-12) is the floor for the coincidence grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    pub const DEFAULT: Self = Self { eps: 1e-9 };
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point3_lerp_and_distance() {
        let a = Point3::ORIGIN;
        let b = Point3::new(3.0, 4.0, 0.0);

        assert_eq!(a.lerp(b, 0.5), Point3::new(1.5, 2.0, 0.0));
        assert!((a.distance_to(b) - 5.0).abs() < 1e-12);
        assert!((a.distance_squared_to(b) - 25.0).abs() < 1e-12);
        assert_eq!((b - a).dot(Vec3::new(1.0, 0.0, 0.0)), 3.0);
    }

    #[test]
    fn test_sphere_boxes_touching_count_as_intersecting() {
        let a = BBox::around_sphere(Point3::ORIGIN, 1.0);
        let b = BBox::around_sphere(Point3::new(2.0, 0.0, 0.0), 1.0);
        let c = BBox::around_sphere(Point3::new(2.5, 0.0, 0.0), 1.0);

        assert_eq!(a.min, Point3::new(-1.0, -1.0, -1.0));
        assert!(a.intersects(b));
        assert!(!a.intersects(c));
        assert_eq!(a.center(), Point3::ORIGIN);
        assert_eq!(a.union(c).max, Point3::new(3.5, 1.0, 1.0));
    }

    #[test]
    fn test_bbox_distance_to_point() {
        let bbox = BBox::new(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(bbox.distance_squared_to_point(Point3::new(0.5, 0.5, 0.5)), 0.0);
        assert!((bbox.distance_squared_to_point(Point3::new(3.0, 0.5, 0.5)) - 4.0).abs() < 1e-12);
        assert!((bbox.distance_squared_to_point(Point3::new(-1.0, 2.0, 0.5)) - 2.0).abs() < 1e-12);
    }
}
