//! Analytic sky and sun.
//!
//! Clear-sky radiance follows the Preetham model: Perez distribution functions
//! for luminance and the two chromaticity channels, scaled by turbidity-driven
//! zenith values, converted Yxy -> XYZ -> linear sRGB. The sun is a disk of
//! fixed angular radius that is sampled with a cone of directions for direct
//! lighting.

use crate::fractal::Noise;
use crate::hittable::offset_origin;
use crate::sampling::uniform_cone;
use prism_math::{Onb, Ray, Vec3};
use rand::RngCore;
use std::f32::consts::{FRAC_PI_2, PI};

/// Angular radius of the sun disk in radians.
pub const SUN_ANGULAR_RADIUS: f32 = 0.00465;

/// Distance at which the sun is placed for local-lighting shadow rays.
pub const SUN_DISTANCE: f32 = 1.0e4;

/// Sun zenith angles are clamped just above the horizon.
const MAX_SUN_THETA: f32 = 1.55;

/// Radiance of the visible disk relative to `sun_color`.
const SUN_DISK_GAIN: f32 = 20.0;

const CLOUD_OCTAVES: u32 = 5;

/// Perez distribution coefficients A..E for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perez(pub [f32; 5]);

impl Perez {
    /// `(1 + A e^(B / cos theta)) (1 + C e^(D gamma) + E cos^2 gamma)`
    fn eval(&self, theta: f32, gamma: f32) -> f32 {
        let [a, b, c, d, e] = self.0;
        let cos_theta = theta.cos().max(1e-4);
        let cos_gamma = gamma.cos();
        (1.0 + a * (b / cos_theta).exp()) * (1.0 + c * (d * gamma).exp() + e * cos_gamma * cos_gamma)
    }
}

/// Sky parameters, replaced wholesale between frames.
#[derive(Debug, Clone)]
pub struct Sky {
    /// Local frame with `w` pointing up
    basis: Onb,
    turbidity: f32,
    /// Unit direction towards the sun (world space)
    sun_direction: Vec3,
    /// Sun direction in the sky basis
    sun_local: Vec3,
    sun_theta: f32,
    luminance: Perez,
    chroma_x: Perez,
    chroma_y: Perez,
    /// Zenith (Y, x, y)
    zenith: Vec3,
    pub exposure: f32,
    pub sun_color: Vec3,
    /// Radiance below the horizon or with the sky switched off
    pub ambient: Vec3,
    pub cloud_scale: f32,
    clouds: Noise,
}

impl Default for Sky {
    fn default() -> Self {
        Sky::new(2.5, Vec3::new(0.4, 0.6, -0.5))
    }
}

impl Sky {
    /// Sky with `up = +Y` for the given turbidity and world sun direction.
    pub fn new(turbidity: f32, sun_direction: Vec3) -> Self {
        let mut sky = Self {
            basis: Onb::from_w(Vec3::Y),
            turbidity,
            sun_direction: Vec3::Y,
            sun_local: Vec3::Z,
            sun_theta: 0.0,
            luminance: Perez([0.0; 5]),
            chroma_x: Perez([0.0; 5]),
            chroma_y: Perez([0.0; 5]),
            zenith: Vec3::ZERO,
            exposure: 0.05,
            sun_color: Vec3::new(3.0, 2.85, 2.6),
            ambient: Vec3::splat(0.03),
            cloud_scale: 0.5,
            clouds: Noise::new(17),
        };
        sky.set_sun(turbidity, sun_direction);
        sky
    }

    /// Re-orient the sky so that `up` is its zenith.
    pub fn with_up(mut self, up: Vec3) -> Self {
        self.basis = Onb::from_w(up.normalize_or_zero());
        self.set_sun(self.turbidity, self.sun_direction);
        self
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_sun_color(mut self, color: Vec3) -> Self {
        self.sun_color = color;
        self
    }

    pub fn with_ambient(mut self, ambient: Vec3) -> Self {
        self.ambient = ambient;
        self
    }

    /// Recompute the Perez coefficients and zenith values.
    pub fn set_sun(&mut self, turbidity: f32, sun_direction: Vec3) {
        let t = turbidity.clamp(2.0, 10.0);
        self.turbidity = t;
        self.sun_direction = sun_direction.normalize_or_zero();
        self.sun_local = self.basis.to_local(self.sun_direction);
        self.sun_theta = self.sun_local.z.clamp(-1.0, 1.0).acos().min(MAX_SUN_THETA);

        self.luminance = Perez([
            0.1787 * t - 1.4630,
            -0.3554 * t + 0.4275,
            -0.0227 * t + 5.3251,
            0.1206 * t - 2.5771,
            -0.0670 * t + 0.3703,
        ]);
        self.chroma_x = Perez([
            -0.0193 * t - 0.2592,
            -0.0665 * t + 0.0008,
            -0.0004 * t + 0.2125,
            -0.0641 * t - 0.8989,
            -0.0033 * t + 0.0452,
        ]);
        self.chroma_y = Perez([
            -0.0167 * t - 0.2608,
            -0.0950 * t + 0.0092,
            -0.0079 * t + 0.2102,
            -0.0441 * t - 1.6537,
            -0.0109 * t + 0.0529,
        ]);

        let ts = self.sun_theta;
        let (ts2, ts3) = (ts * ts, ts * ts * ts);
        let chi = (4.0 / 9.0 - t / 120.0) * (PI - 2.0 * ts);
        let zenith_y = (4.0453 * t - 4.9710) * chi.tan() - 0.2155 * t + 2.4192;
        let zenith_x = t * t * (0.00166 * ts3 - 0.00375 * ts2 + 0.00209 * ts)
            + t * (-0.02903 * ts3 + 0.06377 * ts2 - 0.03202 * ts + 0.00394)
            + (0.11693 * ts3 - 0.21196 * ts2 + 0.06052 * ts + 0.25886);
        let zenith_yy = t * t * (0.00275 * ts3 - 0.00610 * ts2 + 0.00317 * ts)
            + t * (-0.04214 * ts3 + 0.08970 * ts2 - 0.04153 * ts + 0.00516)
            + (0.15346 * ts3 - 0.26756 * ts2 + 0.06670 * ts + 0.26688);
        self.zenith = Vec3::new(zenith_y.max(0.0), zenith_x, zenith_yy);
    }

    pub fn turbidity(&self) -> f32 {
        self.turbidity
    }

    pub fn sun_direction(&self) -> Vec3 {
        self.sun_direction
    }

    /// Point standing in for the sun in local lighting.
    pub fn sun_origin(&self) -> Vec3 {
        self.sun_direction * SUN_DISTANCE
    }

    pub fn sun_above_horizon(&self) -> bool {
        self.sun_local.z > 0.0
    }

    fn cos_theta_max() -> f32 {
        SUN_ANGULAR_RADIUS.cos()
    }

    /// Clear-sky radiance towards `direction`, without the sun disk.
    pub fn radiance(&self, direction: Vec3, clouds: bool) -> Vec3 {
        let local = self.basis.to_local(direction.normalize_or_zero());
        if local.z <= 0.0 {
            return self.ambient;
        }

        let theta = local.z.min(1.0).acos().min(FRAC_PI_2);
        let gamma = local.dot(self.sun_local).clamp(-1.0, 1.0).acos();
        let ratio = |perez: &Perez| perez.eval(theta, gamma) / perez.eval(0.0, self.sun_theta);

        let lum = self.zenith.x * ratio(&self.luminance) * self.exposure;
        let x = self.zenith.y * ratio(&self.chroma_x);
        let y = self.zenith.z * ratio(&self.chroma_y);
        let mut rgb = xyz_to_linear_srgb(yxy_to_xyz(lum, x, y));

        // Shift every channel up by the most negative one instead of clamping
        let floor = rgb.min_element();
        if floor < 0.0 {
            rgb -= Vec3::splat(floor);
        }

        if clouds {
            rgb *= self.cloud_factor(local);
        }
        rgb
    }

    /// Cloud brightening factor in [1, 2] for a direction above the horizon.
    fn cloud_factor(&self, local: Vec3) -> f32 {
        let plane = Vec3::new(local.x, local.y, 0.0) / local.z.max(0.05) * self.cloud_scale;
        let density = self.clouds.fbm3(plane, CLOUD_OCTAVES, 0.5);
        (1.0 + 1.5 * density).clamp(1.0, 2.0)
    }

    /// Radiance of the sun disk when `direction` falls inside it.
    pub fn sun_disk(&self, direction: Vec3) -> Vec3 {
        let d = direction.normalize_or_zero();
        if self.sun_above_horizon() && d.dot(self.sun_direction) >= Self::cos_theta_max() {
            self.sun_color * SUN_DISK_GAIN
        } else {
            Vec3::ZERO
        }
    }

    /// Direct sun light at `point` through one shadow ray.
    ///
    /// The light direction is drawn uniformly from the cone subtended by the
    /// disk; the result is `albedo * sun_color * cos / pi` when unoccluded.
    pub fn sun_contribution(
        &self,
        point: Vec3,
        normal: Vec3,
        albedo: Vec3,
        occluded: &dyn Fn(&Ray) -> bool,
        rng: &mut dyn RngCore,
    ) -> Vec3 {
        if !self.sun_above_horizon() {
            return Vec3::ZERO;
        }
        let l = uniform_cone(self.sun_direction, Self::cos_theta_max(), rng);
        let dot_n = l.dot(normal);
        if self.sun_direction.dot(l) <= 0.0 || dot_n <= 0.0 {
            return Vec3::ZERO;
        }
        if occluded(&Ray::new(offset_origin(point, normal), l)) {
            return Vec3::ZERO;
        }
        albedo * self.sun_color * dot_n / PI
    }
}

fn yxy_to_xyz(lum: f32, x: f32, y: f32) -> Vec3 {
    if y <= 1e-6 {
        return Vec3::ZERO;
    }
    Vec3::new(x / y * lum, lum, (1.0 - x - y) / y * lum)
}

fn xyz_to_linear_srgb(xyz: Vec3) -> Vec3 {
    Vec3::new(
        3.2406 * xyz.x - 1.5372 * xyz.y - 0.4986 * xyz.z,
        -0.9689 * xyz.x + 1.8758 * xyz.y + 0.0415 * xyz.z,
        0.0557 * xyz.x - 0.2040 * xyz.y + 1.0570 * xyz.z,
    )
}
