//! Hittable trait, raw hit records and the full `Intersection` record.

use crate::scene::{GeometryPool, PrimitiveId, Shape, TriangleId};
use prism_math::{Interval, Onb, Ray, Vec2, Vec3};

/// Hits closer than this are treated as self-intersections.
pub const EPSILON: f32 = 1e-4;

/// Relative rounding error allowed on hit-point coordinates.
const ORIGIN_ERROR_SCALE: f32 = 64.0 * f32::EPSILON;

/// Lift a secondary-ray origin off the surface along `normal`.
///
/// The lift grows with the largest coordinate of `point`, so hits far from
/// the origin clear their own rounding error.
#[inline]
pub fn offset_origin(point: Vec3, normal: Vec3) -> Vec3 {
    offset_by(point, normal, EPSILON)
}

/// [`offset_origin`] with an explicit base lift.
#[inline]
pub fn offset_by(point: Vec3, normal: Vec3, base: f32) -> Vec3 {
    let error = point.abs().max_element() * ORIGIN_ERROR_SCALE;
    point + normal * (base + error)
}

/// Raw result of a shape test, before any shading-frame work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Ray parameter of the hit
    pub t: f32,
    /// Triangle that was hit (triangles and meshes only)
    pub triangle: Option<TriangleId>,
    /// Barycentric (u, v) of the hit; w = 1 - u - v
    pub barycentric: Vec2,
}

impl HitRecord {
    pub fn at(t: f32) -> Self {
        Self {
            t,
            triangle: None,
            barycentric: Vec2::ZERO,
        }
    }
}

/// Shading frame in the shape's own space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub point: Vec3,
    /// Outward geometric normal (unit)
    pub geometric_normal: Vec3,
    /// Outward shading normal (unit)
    pub normal: Vec3,
    /// Analytic tangent, or zero when the shape has none
    pub tangent: Vec3,
    pub uv: Vec2,
    /// Triangle corners, for the wireframe overlay
    pub triangle: Option<[Vec3; 3]>,
}

/// Trait for shapes that can be hit by rays.
pub trait Hittable {
    /// Nearest hit with `t` strictly inside `ray_t`.
    fn hit(&self, ray: &Ray, ray_t: Interval, geometry: &GeometryPool) -> Option<HitRecord>;

    /// Reconstruct the shading frame for a hit returned by [`Hittable::hit`].
    fn frame(&self, ray: &Ray, rec: &HitRecord, geometry: &GeometryPool, smooth: bool) -> LocalFrame;
}

/// What the caller needs back from an intersection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Nearest hit with a full shading frame.
    Closest,
    /// Stop at the first hit; only distance, primitive and point are filled.
    AnyHit,
}

/// Per-frame switches that influence shading-frame reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingOptions {
    pub normal_mapping: bool,
    /// Interpolate vertex normals (Gouraud) instead of using the face normal
    pub smooth: bool,
}

impl Default for ShadingOptions {
    fn default() -> Self {
        Self {
            normal_mapping: true,
            smooth: true,
        }
    }
}

/// Record of a ray-scene intersection in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Ray parameter of the hit, `f32::INFINITY` when nothing was hit
    pub distance: f32,
    pub primitive: Option<PrimitiveId>,
    pub shape: Option<Shape>,
    pub point: Vec3,
    /// Geometric normal, facing against the ray
    pub geometric_normal: Vec3,
    /// Shading normal, facing against the ray
    pub normal: Vec3,
    pub tangent: Vec3,
    /// Local frame with `w` along the shading normal
    pub basis: Onb,
    pub uv: Vec2,
    /// Whether the ray arrived on the outward side of the surface
    pub front_face: bool,
    /// World-space triangle corners when a triangle was hit
    pub triangle: Option<[Vec3; 3]>,
}

impl Intersection {
    pub fn miss() -> Self {
        Self {
            distance: f32::INFINITY,
            primitive: None,
            shape: None,
            point: Vec3::ZERO,
            geometric_normal: Vec3::ZERO,
            normal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            basis: Onb::default(),
            uv: Vec2::ZERO,
            front_face: false,
            triangle: None,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.primitive.is_some()
    }

    /// Primitive id in the external convention (-1 = no hit).
    pub fn primitive_index(&self) -> i32 {
        self.primitive.map_or(-1, |id| id.0 as i32)
    }
}

impl Default for Intersection {
    fn default() -> Self {
        Self::miss()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_record() {
        let miss = Intersection::miss();
        assert!(!miss.is_hit());
        assert_eq!(miss.distance, f32::INFINITY);
        assert_eq!(miss.primitive_index(), -1);
    }

    #[test]
    fn test_offset_grows_with_distance() {
        let near = offset_origin(Vec3::ONE, Vec3::Y) - Vec3::ONE;
        assert!((near.y - EPSILON).abs() < 1e-6);
        assert_eq!(near.x, 0.0);

        let far = Vec3::new(2.0e4, 3.0e3, -2.0e4);
        let lifted = offset_origin(far, Vec3::Y);
        assert!(lifted.y - far.y > 0.1);
        assert_eq!(lifted.x, far.x);
    }
}
