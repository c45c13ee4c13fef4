//! Camera for ray generation.

use crate::config::ConfigError;
use crate::sampling::{gen_f32, tent, uniform_disk};
use prism_math::{Ray, Vec3};
use rand::RngCore;

/// Apertures at or below this radius disable depth of field.
const APERTURE_EPSILON: f32 = 1e-4;

/// Projection used to map pixels to directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lens {
    #[default]
    Perspective,
    /// Equidistant fisheye; pixels outside the unit disk get no ray
    Fisheye,
}

/// Camera for generating rays into the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens settings
    vfov: f32, // Field of view in degrees
    lens: Lens,
    aperture: f32,   // Radius of the lens disk
    focus_dist: f32, // Distance from camera to plane of perfect focus

    // Basis: w forward, u right, v up
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            lens: Lens::Perspective,
            aperture: 0.0,
            focus_dist: 1.0,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::NEG_Z,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.update_basis();
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.aperture = aperture.max(0.0);
        self.focus_dist = focus_dist;
        self
    }

    pub fn with_projection(mut self, lens: Lens) -> Self {
        self.lens = lens;
        self
    }

    /// Reject placements that leave the view direction undefined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let forward = self.look_at - self.look_from;
        if !forward.is_finite() || forward.length_squared() <= f32::EPSILON * f32::EPSILON {
            return Err(ConfigError::DegenerateCamera);
        }
        Ok(())
    }

    // A degenerate placement keeps the previous basis; `validate` reports it.
    fn update_basis(&mut self) {
        if self.validate().is_err() {
            return;
        }
        let w = (self.look_at - self.look_from).normalize_or_zero();
        let mut u = w.cross(self.vup).normalize_or_zero();
        if u == Vec3::ZERO {
            // Looking along vup: pick any perpendicular
            u = prism_math::Onb::from_w(w).u;
        }
        self.w = w;
        self.u = u;
        self.v = u.cross(w);
    }

    pub fn eye(&self) -> Vec3 {
        self.look_from
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    /// Camera basis as (right, up, forward).
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }

    pub fn pixel_count(&self) -> usize {
        self.image_width as usize * self.image_height as usize
    }

    fn aspect(&self) -> f32 {
        self.image_width as f32 / self.image_height.max(1) as f32
    }

    /// Generate a ray through pixel (x, y), row 0 at the top.
    ///
    /// With `jitter` the sample position inside the pixel follows a tent
    /// filter; otherwise the pixel center is used. Returns `None` when the
    /// projection rejects the sample (outside the fisheye disk).
    pub fn generate_ray(&self, x: u32, y: u32, jitter: bool, rng: &mut dyn RngCore) -> Option<Ray> {
        let (dx, dy) = if jitter {
            (tent(gen_f32(rng)), tent(gen_f32(rng)))
        } else {
            (0.0, 0.0)
        };
        let px = x as f32 + 0.5 + dx;
        let py = y as f32 + 0.5 + dy;
        let sx = 2.0 * px / self.image_width.max(1) as f32 - 1.0;
        let sy = 1.0 - 2.0 * py / self.image_height.max(1) as f32;

        let half_fov = 0.5 * self.vfov.to_radians();
        let direction = match self.lens {
            Lens::Perspective => {
                let half_h = half_fov.tan();
                let half_w = half_h * self.aspect();
                self.w + sx * half_w * self.u + sy * half_h * self.v
            }
            Lens::Fisheye => {
                let nx = sx * self.aspect();
                let r = (nx * nx + sy * sy).sqrt();
                if r > 1.0 {
                    return None;
                }
                let theta = r * half_fov;
                let phi = sy.atan2(nx);
                theta.cos() * self.w + theta.sin() * (phi.cos() * self.u + phi.sin() * self.v)
            }
        };
        let direction = direction.normalize_or_zero();

        if self.aperture <= APERTURE_EPSILON {
            return Some(Ray::new(self.look_from, direction));
        }

        // Re-aim through the focal plane from a point on the lens disk
        let along = direction.dot(self.w).max(1e-4);
        let focus = self.look_from + direction * (self.focus_dist / along);
        let disk = uniform_disk(rng) * self.aperture;
        let origin = self.look_from + disk.x * self.u + disk.y * self.v;
        Some(Ray::new(origin, (focus - origin).normalize_or_zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn camera() -> Camera {
        Camera::new()
            .with_resolution(100, 50)
            .with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
            .with_lens(60.0, 0.0, 5.0)
    }

    #[test]
    fn test_basis_is_right_handed() {
        let (u, v, w) = camera().basis();
        assert!((w - Vec3::NEG_Z).length() < 1e-6);
        assert!((u - Vec3::X).length() < 1e-6);
        assert!((v - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_coincident_eye_and_target_rejected() {
        let cam = Camera::new().with_position(Vec3::ONE, Vec3::ONE, Vec3::Y);
        assert_eq!(cam.validate(), Err(ConfigError::DegenerateCamera));
        let (u, v, w) = cam.basis();
        assert!(u.is_finite() && v.is_finite() && w.is_finite());

        let mut rng = StdRng::seed_from_u64(0);
        let ray = cam.generate_ray(3, 3, false, &mut rng).unwrap();
        assert!(ray.direction.is_finite());

        assert!(camera().validate().is_ok());
        let nan = Camera::new().with_position(Vec3::ZERO, Vec3::splat(f32::NAN), Vec3::Y);
        assert_eq!(nan.validate(), Err(ConfigError::DegenerateCamera));
    }

    #[test]
    fn test_center_ray_looks_forward() {
        let cam = Camera::new()
            .with_resolution(101, 51)
            .with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let mut rng = StdRng::seed_from_u64(0);
        let ray = cam.generate_ray(50, 25, false, &mut rng).unwrap();
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_top_left_pixel_points_up_left() {
        let mut rng = StdRng::seed_from_u64(0);
        let ray = camera().generate_ray(0, 0, false, &mut rng).unwrap();
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn test_jitter_stays_within_neighbourhood() {
        let cam = camera();
        let mut rng = StdRng::seed_from_u64(1);
        let center = cam.generate_ray(10, 10, false, &mut rng).unwrap();
        for _ in 0..100 {
            let jittered = cam.generate_ray(10, 10, true, &mut rng).unwrap();
            // Tent filter spans at most one pixel either side
            assert!((jittered.direction - center.direction).length() < 0.05);
        }
    }

    #[test]
    fn test_fisheye_rejects_corners() {
        let cam = camera().with_projection(Lens::Fisheye);
        let mut rng = StdRng::seed_from_u64(2);
        assert!(cam.generate_ray(0, 0, false, &mut rng).is_none());
        assert!(cam.generate_ray(50, 25, false, &mut rng).is_some());
    }

    #[test]
    fn test_depth_of_field_converges_on_focal_plane() {
        let pinhole = camera();
        let cam = camera().with_lens(60.0, 0.5, 5.0);
        let mut rng = StdRng::seed_from_u64(3);
        let reference = pinhole.generate_ray(40, 20, false, &mut rng).unwrap();
        let focus = reference.at(5.0 / reference.direction.dot(Vec3::NEG_Z));
        for _ in 0..20 {
            let ray = cam.generate_ray(40, 20, false, &mut rng).unwrap();
            // Every lens sample passes through the same point on the focal plane
            let t = (focus.z - ray.origin.z) / ray.direction.z;
            assert!((ray.at(t) - focus).length() < 1e-3);
        }
    }
}
