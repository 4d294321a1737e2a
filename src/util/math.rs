//! Math type re-exports and exporter-specific math utilities.
//!
//! This module re-exports types from `glam` and provides the running
//! bounding volume used for mesh culling spheres, plus transform helpers
//! shared by scene gathering and animation sampling.

pub use glam::{DVec3, Mat4, Quat, Vec2, Vec3, Vec4};

use std::fmt;

/// Determinant magnitude below which a matrix is treated as singular.
const SINGULAR_EPSILON: f32 = 1.0e-12;

/// Running axis-aligned box, finalized into a bounding sphere.
///
/// Accumulates in double precision so the sphere radius does not lose
/// precision for large meshes.
#[derive(Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingVolume {
    /// Empty volume (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Volume enclosing all of the given points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut volume = Self::EMPTY;
        for p in points {
            volume.expand_by_point(*p);
        }
        volume
    }

    /// Check if this volume contains nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this volume to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        let p = p.as_dvec3();
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this volume to include another volume.
    #[inline]
    pub fn union(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Center of the bounding sphere (box center). Zero when empty.
    pub fn sphere_center(&self) -> DVec3 {
        if self.is_empty() {
            return DVec3::ZERO;
        }
        (self.min + self.max) / 2.0
    }

    /// Radius of the bounding sphere: half the box diagonal. Zero when empty.
    pub fn sphere_radius(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let size = self.max - self.min;
        0.5 * (size.x * size.x + size.y * size.y + size.z * size.z).sqrt()
    }
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BoundingVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundingVolume({:?} - {:?})", self.min, self.max)
    }
}

/// Inverse of `m`, or identity when `m` is singular.
pub fn inverse_or_identity(m: &Mat4) -> Mat4 {
    if m.determinant().abs() <= SINGULAR_EPSILON {
        Mat4::IDENTITY
    } else {
        m.inverse()
    }
}

/// Transform of `child` relative to `parent`, both in the same space.
pub fn relative_transform(parent: Option<&Mat4>, child: &Mat4) -> Mat4 {
    match parent {
        Some(parent) => inverse_or_identity(parent) * *child,
        None => *child,
    }
}

/// Local transform split into (position, rotation, scale).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Decomposed {
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        Self { position, rotation, scale }
    }

    /// True if the scale differs from one on any axis.
    pub fn has_scale(&self) -> bool {
        self.scale != Vec3::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_volume() {
        let mut b = BoundingVolume::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.sphere_radius(), 0.0);

        b.expand_by_point(Vec3::ZERO);
        b.expand_by_point(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(b.sphere_center(), DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(b.sphere_radius(), 1.0);
    }

    #[test]
    fn test_bounding_union() {
        let mut a = BoundingVolume::from_points(&[Vec3::ZERO, Vec3::ONE]);
        let b = BoundingVolume::from_points(&[Vec3::splat(-1.0)]);
        a.union(&b);
        assert_eq!(a.min, DVec3::splat(-1.0));
        assert_eq!(a.max, DVec3::ONE);

        a.union(&BoundingVolume::EMPTY);
        assert_eq!(a.min, DVec3::splat(-1.0));
    }

    #[test]
    fn test_relative_transform() {
        let parent = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let child = Mat4::from_translation(Vec3::new(3.0, 2.0, 0.0));
        let local = relative_transform(Some(&parent), &child);
        let d = Decomposed::from_matrix(&local);
        assert!((d.position - Vec3::new(2.0, 2.0, 0.0)).length() < 1e-6);
        assert!(!d.has_scale());
    }

    #[test]
    fn test_singular_parent() {
        let local = relative_transform(Some(&Mat4::ZERO), &Mat4::IDENTITY);
        assert_eq!(local, Mat4::IDENTITY);
    }
}
