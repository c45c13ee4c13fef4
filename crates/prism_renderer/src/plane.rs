//! Infinite plane primitive.

use crate::hittable::{HitRecord, Hittable, LocalFrame};
use crate::scene::GeometryPool;
use prism_math::{Interval, Ray, Vec2, Vec3};

/// Rays with |n·d| below this are treated as parallel to the plane.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Plane of points `p` with `normal · p = offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vec3,
    offset: f32,
}

impl Plane {
    /// Create a plane; the normal is normalized.
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            offset,
        }
    }

    /// Plane through `point` with the given normal.
    pub fn through(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// In-plane UV axes chosen by the dominant axis of the normal.
    fn uv_axes(&self) -> (Vec3, Vec3) {
        let a = self.normal.abs();
        if a.x >= a.y && a.x >= a.z {
            (Vec3::Z, Vec3::Y)
        } else if a.y >= a.z {
            (Vec3::X, Vec3::Z)
        } else {
            (Vec3::X, Vec3::Y)
        }
    }
}

impl Hittable for Plane {
    fn hit(&self, ray: &Ray, ray_t: Interval, _geometry: &GeometryPool) -> Option<HitRecord> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (self.offset - self.normal.dot(ray.origin)) / denom;
        ray_t.surrounds(t).then(|| HitRecord::at(t))
    }

    fn frame(&self, ray: &Ray, rec: &HitRecord, _geometry: &GeometryPool, _smooth: bool) -> LocalFrame {
        let point = ray.at(rec.t);
        let (u_axis, v_axis) = self.uv_axes();
        LocalFrame {
            point,
            geometric_normal: self.normal,
            normal: self.normal,
            tangent: Vec3::ZERO,
            uv: Vec2::new(point.dot(u_axis), point.dot(v_axis)),
            triangle: None,
        }
    }
}
