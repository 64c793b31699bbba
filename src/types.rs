//! Common types for 3D geometry.
//!
//! Positions in this crate are center-based: a cargo item's `position` is the
//! geometric center of its solid. The container frame puts the floor at
//! `y = 0` and centers the footprint on the origin, so x runs over
//! `[-l/2, l/2]` and z over `[-w/2, w/2]`.

use std::ops::{Add, Mul, Sub};

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON: f64 = 1e-6;

/// Represents a 3D vector or point in space.
///
/// Used for positions, dimensions, and calculations in 3D space.
///
/// # Examples
/// ```
/// use stowsim::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let dimensions = Vec3::new(10.0, 20.0, 30.0);
/// let corner = position + dimensions * 0.5;
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Calculates the volume (product of all components).
    ///
    /// Useful for dimension vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Horizontal (xz-plane) distance to another point.
    #[inline]
    pub fn distance_xz(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Checks if all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.x > 0.0
            && self.y > 0.0
            && self.z > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Vec3> for (f64, f64, f64) {
    #[inline]
    fn from(vec: Vec3) -> Self {
        vec.as_tuple()
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Used as the broad-phase filter in collision detection. For cylinders this
/// is the square prism around the circular cross-section, so an AABB overlap
/// is necessary but not sufficient for a real collision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Creates a bounding box from a center point and full dimensions.
    #[inline]
    pub fn from_center_dims(center: Vec3, dims: Vec3) -> Self {
        let half = dims * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Checks if two bounding boxes intersect.
    ///
    /// Separating Axis Theorem for AABBs. Face contact does not count as an
    /// intersection, so items packed flush with the placement margin never
    /// report a collision.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }
}

/// Calculates the overlap length of two intervals in one dimension.
#[inline]
pub fn overlap_1d(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    (a_max.min(b_max) - a_min.max(b_min)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_vec3_volume() {
        let dims = Vec3::new(10.0, 20.0, 30.0);
        assert!((dims.volume() - 6000.0).abs() < EPSILON);
    }

    #[test]
    fn test_vec3_valid_dimension() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(0.0, 2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, -2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, f64::NAN, 3.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, 2.0, f64::INFINITY).is_valid_dimension());
    }

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::from_center_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let b = Aabb::from_center_dims(Vec3::new(5.0, 5.0, 5.0), Vec3::new(10.0, 10.0, 10.0));
        let c = Aabb::from_center_dims(Vec3::new(20.0, 20.0, 20.0), Vec3::new(10.0, 10.0, 10.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb_face_contact_is_not_intersection() {
        let a = Aabb::from_center_dims(Vec3::zero(), Vec3::new(2.0, 2.0, 2.0));
        let b = Aabb::from_center_dims(Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));

        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));
    }

    #[test]
    fn test_overlap_1d() {
        assert!((overlap_1d(0.0, 5.0, 3.0, 8.0) - 2.0).abs() < EPSILON);
        assert!((overlap_1d(0.0, 5.0, 6.0, 8.0) - 0.0).abs() < EPSILON);
    }
}
