//! Procedural height-field terrain.
//!
//! The surface is `y = base + amplitude * fbm(x * frequency, z * frequency)`.
//! Rays are marched at a fixed step and the crossing step is refined by
//! linear interpolation of the height difference.

use crate::fractal::Noise;
use crate::hittable::{HitRecord, Hittable, LocalFrame};
use crate::scene::GeometryPool;
use prism_math::{Interval, Ray, Vec2, Vec3};

/// Hard cap on march iterations per ray.
pub const MAX_MARCH_STEPS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct Terrain {
    pub base: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub octaves: u32,
    pub gain: f32,
    /// World-space march step
    pub step: f32,
    /// Rays give up after travelling this far
    pub max_distance: f32,
    noise: Noise,
}

impl Terrain {
    pub fn new(base: f32, amplitude: f32, frequency: f32) -> Self {
        Self {
            base,
            amplitude: amplitude.abs(),
            frequency,
            octaves: 6,
            gain: 0.5,
            step: 0.05,
            max_distance: 200.0,
            noise: Noise::default(),
        }
    }

    pub fn with_octaves(mut self, octaves: u32, gain: f32) -> Self {
        self.octaves = octaves;
        self.gain = gain;
        self
    }

    pub fn with_march(mut self, step: f32, max_distance: f32) -> Self {
        self.step = step.max(1e-4);
        self.max_distance = max_distance;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.noise = Noise::new(seed);
        self
    }

    pub fn height(&self, x: f32, z: f32) -> f32 {
        let p = Vec2::new(x, z) * self.frequency;
        self.base + self.amplitude * self.noise.fbm2(p, self.octaves, self.gain)
    }

    /// Finite-difference surface normal at (x, z).
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        let e = (self.step * 0.5).max(1e-3);
        let dx = self.height(x + e, z) - self.height(x - e, z);
        let dz = self.height(x, z + e) - self.height(x, z - e);
        Vec3::new(-dx, 2.0 * e, -dz).normalize_or_zero()
    }

    /// Vertical range that can contain the surface, padded so a flat field
    /// still has a crossing to march over.
    fn slab(&self) -> Interval {
        let pad = 1e-3 + 0.01 * self.amplitude;
        Interval::new(self.base - self.amplitude - pad, self.base + self.amplitude + pad)
    }

    /// Range of `t` where the ray is inside the vertical slab.
    fn slab_span(&self, ray: &Ray) -> Option<Interval> {
        let slab = self.slab();
        if ray.direction.y.abs() < 1e-8 {
            return slab.contains(ray.origin.y).then_some(Interval::UNIVERSE);
        }
        let t0 = (slab.min - ray.origin.y) / ray.direction.y;
        let t1 = (slab.max - ray.origin.y) / ray.direction.y;
        Some(Interval::new(t0.min(t1), t0.max(t1)))
    }
}

impl Hittable for Terrain {
    fn hit(&self, ray: &Ray, ray_t: Interval, _geometry: &GeometryPool) -> Option<HitRecord> {
        let speed = ray.direction.length();
        if speed == 0.0 {
            return None;
        }
        let span = self.slab_span(ray)?;
        let t_end = span.max.min(ray_t.max).min(self.max_distance / speed);
        let mut t = span.min.max(ray_t.min);
        if t >= t_end {
            return None;
        }

        let dt = self.step / speed;
        let above = |t: f32| {
            let p = ray.at(t);
            p.y - self.height(p.x, p.z)
        };

        let mut dy_prev = above(t);
        if dy_prev < 0.0 {
            // Starts below the surface; only downward crossings count
            return None;
        }

        for _ in 0..MAX_MARCH_STEPS {
            let t_next = (t + dt).min(t_end);
            let dy = above(t_next);
            if dy < 0.0 {
                let t_hit = t + (t_next - t) * dy_prev / (dy_prev - dy);
                return ray_t.surrounds(t_hit).then(|| HitRecord::at(t_hit));
            }
            if t_next >= t_end {
                break;
            }
            t = t_next;
            dy_prev = dy;
        }
        None
    }

    fn frame(&self, ray: &Ray, rec: &HitRecord, _geometry: &GeometryPool, _smooth: bool) -> LocalFrame {
        let point = ray.at(rec.t);
        let normal = self.normal(point.x, point.z);
        LocalFrame {
            point,
            geometric_normal: normal,
            normal,
            tangent: Vec3::ZERO,
            uv: Vec2::new(point.x, point.z),
            triangle: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: Interval = Interval::new(1e-4, f32::INFINITY);

    #[test]
    fn test_flat_terrain_hit() {
        // Zero amplitude degenerates to the plane y = base
        let terrain = Terrain::new(-1.0, 0.0, 1.0).with_march(0.1, 100.0);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let rec = terrain.hit(&ray, OPEN, &GeometryPool::default()).unwrap();
        assert!((rec.t - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_terrain_hit_lies_on_surface() {
        let terrain = Terrain::new(0.0, 1.0, 0.3).with_march(0.02, 100.0).with_seed(7);
        let pool = GeometryPool::default();
        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, -0.5, 0.3));
        let rec = terrain.hit(&ray, OPEN, &pool).unwrap();
        let frame = terrain.frame(&ray, &rec, &pool, true);
        let h = terrain.height(frame.point.x, frame.point.z);
        assert!((frame.point.y - h).abs() < 0.02);
        assert!(frame.normal.y > 0.0);
    }

    #[test]
    fn test_terrain_upward_ray_misses() {
        let terrain = Terrain::new(0.0, 1.0, 0.3);
        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
        assert!(terrain.hit(&ray, OPEN, &GeometryPool::default()).is_none());
    }

    #[test]
    fn test_terrain_respects_max_distance() {
        let terrain = Terrain::new(0.0, 0.0, 1.0).with_march(0.1, 5.0);
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, -0.01, 0.0));
        assert!(terrain.hit(&ray, OPEN, &GeometryPool::default()).is_none());
    }
}
