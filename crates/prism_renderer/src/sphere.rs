//! Sphere primitive for ray tracing.

use crate::hittable::{HitRecord, Hittable, LocalFrame};
use crate::scene::GeometryPool;
use prism_math::{Interval, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }

    /// Direction of increasing u (derivative of the point with respect to phi).
    fn sphere_tangent(n: Vec3) -> Vec3 {
        Vec3::new(n.z, 0.0, -n.x).normalize_or_zero()
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval, _geometry: &GeometryPool) -> Option<HitRecord> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        if a == 0.0 {
            return None;
        }
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Smaller positive root first, larger one from inside the sphere
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }
        Some(HitRecord::at(root))
    }

    fn frame(&self, ray: &Ray, rec: &HitRecord, _geometry: &GeometryPool, _smooth: bool) -> LocalFrame {
        let point = ray.at(rec.t);
        let normal = ((point - self.center) / self.radius).normalize_or_zero();
        LocalFrame {
            point,
            geometric_normal: normal,
            normal,
            tangent: Self::sphere_tangent(normal),
            uv: Self::sphere_uv(normal),
            triangle: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: Interval = Interval::new(1e-4, f32::INFINITY);

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let rec = sphere.hit(&ray, OPEN, &GeometryPool::default()).unwrap();
        assert!((rec.t - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        assert!(sphere.hit(&ray, OPEN, &GeometryPool::default()).is_none());
    }

    #[test]
    fn test_sphere_hit_from_inside_uses_far_root() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0));
        let rec = sphere.hit(&ray, OPEN, &GeometryPool::default()).unwrap();
        assert!((rec.t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_frame() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 2.0);
        let pool = GeometryPool::default();
        let ray = Ray::new(Vec3::new(1.0, 10.0, 3.0), -Vec3::Y);
        let rec = sphere.hit(&ray, OPEN, &pool).unwrap();
        let frame = sphere.frame(&ray, &rec, &pool, true);
        assert!((frame.normal - Vec3::Y).length() < 1e-5);
        // Top pole: theta = pi
        assert!((frame.uv.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_tangent_perpendicular() {
        let n = Vec3::new(0.3, 0.4, -0.866).normalize();
        let t = Sphere::sphere_tangent(n);
        assert!(t.dot(n).abs() < 1e-5);
        assert!((t.length() - 1.0).abs() < 1e-5);
    }
}
