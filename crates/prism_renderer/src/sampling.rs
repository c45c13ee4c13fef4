//! Random sampling helpers shared by the camera, materials and integrators.

use prism_math::{Onb, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::f32::consts::PI;

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Per-invocation generator for one pixel of one frame.
///
/// The seed is a splitmix64 mix of the renderer seed, frame index and pixel
/// index, so no generator state is ever shared between pixels.
pub fn pixel_rng(seed: u64, frame: u32, pixel: usize) -> StdRng {
    let mut z = seed
        ^ (frame as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (pixel as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    StdRng::seed_from_u64(z ^ (z >> 31))
}

/// Tent (triangle) filter warp: maps a uniform sample in [0, 1) to [-1, 1)
/// with a triangular density peaked at 0.
#[inline]
pub fn tent(u: f32) -> f32 {
    let r = 2.0 * u;
    if r < 1.0 {
        r.sqrt() - 1.0
    } else {
        1.0 - (2.0 - r).sqrt()
    }
}

/// Uniform point on the unit disk (polar mapping).
pub fn uniform_disk(rng: &mut dyn RngCore) -> Vec2 {
    let r = gen_f32(rng).sqrt();
    let phi = 2.0 * PI * gen_f32(rng);
    Vec2::new(r * phi.cos(), r * phi.sin())
}

/// Cosine-weighted direction in the hemisphere around unit vector `n`.
pub fn cosine_hemisphere(n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let r1 = 2.0 * PI * gen_f32(rng);
    let r2 = gen_f32(rng);
    let r2s = r2.sqrt();
    let frame = Onb::from_w(n);
    frame
        .to_world(Vec3::new(r1.cos() * r2s, r1.sin() * r2s, (1.0 - r2).sqrt()))
        .normalize()
}

/// Direction from a power-cosine lobe around unit vector `axis`.
pub fn power_cosine(axis: Vec3, exponent: f32, rng: &mut dyn RngCore) -> Vec3 {
    let phi = 2.0 * PI * gen_f32(rng);
    let cos_theta = gen_f32(rng).powf(1.0 / (exponent.max(0.0) + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let frame = Onb::from_w(axis);
    frame
        .to_world(Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta))
        .normalize()
}

/// Direction inside a cone of half-angle `acos(cos_theta_max)` around `axis`.
pub fn uniform_cone(axis: Vec3, cos_theta_max: f32, rng: &mut dyn RngCore) -> Vec3 {
    let cos_theta = 1.0 - gen_f32(rng) * (1.0 - cos_theta_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * gen_f32(rng);
    let frame = Onb::from_w(axis);
    frame
        .to_world(Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta))
        .normalize()
}

/// Mirror `d` about the normal `n`.
#[inline]
pub fn reflect(d: Vec3, n: Vec3) -> Vec3 {
    d - 2.0 * d.dot(n) * n
}

/// Hermite smoothstep on [0, 1].
#[inline]
pub fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tent_range_and_symmetry() {
        assert!((tent(0.0) + 1.0).abs() < 1e-6);
        assert!(tent(0.5).abs() < 1e-6);
        for i in 0..100 {
            let u = i as f32 / 100.0;
            let t = tent(u);
            assert!((-1.0..1.0).contains(&t));
            assert!((tent(u) + tent(1.0 - u)).abs() < 1e-4 || u == 0.0);
        }
    }

    #[test]
    fn test_cosine_hemisphere_above_normal() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = Vec3::new(0.2, -0.9, 0.1).normalize();
        let mut mean_cos = 0.0;
        for _ in 0..2000 {
            let d = cosine_hemisphere(n, &mut rng);
            assert!(d.dot(n) >= -1e-5);
            assert!((d.length() - 1.0).abs() < 1e-4);
            mean_cos += d.dot(n);
        }
        // E[cos] for a cosine-weighted hemisphere is 2/3
        assert!((mean_cos / 2000.0 - 2.0 / 3.0).abs() < 0.03);
    }

    #[test]
    fn test_cone_stays_inside() {
        let mut rng = StdRng::seed_from_u64(9);
        let cos_max = 0.99;
        for _ in 0..500 {
            let d = uniform_cone(Vec3::Y, cos_max, &mut rng);
            assert!(d.dot(Vec3::Y) >= cos_max - 1e-4);
        }
    }

    #[test]
    fn test_pixel_rng_streams_differ() {
        let a = gen_f32(&mut pixel_rng(1, 0, 10));
        let b = gen_f32(&mut pixel_rng(1, 0, 11));
        let c = gen_f32(&mut pixel_rng(1, 1, 10));
        let a2 = gen_f32(&mut pixel_rng(1, 0, 10));
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_reflect() {
        let d = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(reflect(d, Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(2.0), 1.0);
    }
}
