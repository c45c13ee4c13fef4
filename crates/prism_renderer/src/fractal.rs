//! Fractal noise built on `noise::Perlin`.
//!
//! Shared by the fractal-noise texture, normal perturbation, terrain
//! heightfields, the ray marcher and the cloud layer.

use noise::{NoiseFn, Perlin};
use prism_math::{Vec2, Vec3};

/// Frequency multiplier between successive octaves.
pub const LACUNARITY: f32 = 2.0;

/// Upper bound on octaves; anything above is clamped.
pub const MAX_OCTAVES: u32 = 12;

/// Seeded gradient noise with fractal Brownian motion helpers.
#[derive(Clone, Copy, Debug)]
pub struct Noise {
    perlin: Perlin,
    seed: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Single octave of 3D noise, roughly in [-1, 1].
    #[inline]
    pub fn sample3(&self, p: Vec3) -> f32 {
        self.perlin.get([p.x as f64, p.y as f64, p.z as f64]) as f32
    }

    /// Single octave of 2D noise, roughly in [-1, 1].
    #[inline]
    pub fn sample2(&self, p: Vec2) -> f32 {
        self.perlin.get([p.x as f64, p.y as f64]) as f32
    }

    /// Fractal Brownian motion over 3D noise.
    ///
    /// The octave sum is normalized by the total amplitude so the result stays
    /// in roughly [-1, 1] for any gain. Zero octaves yield 0.
    pub fn fbm3(&self, p: Vec3, octaves: u32, gain: f32) -> f32 {
        self.fbm(octaves, gain, |frequency| self.sample3(p * frequency))
    }

    /// Fractal Brownian motion over 2D noise.
    pub fn fbm2(&self, p: Vec2, octaves: u32, gain: f32) -> f32 {
        self.fbm(octaves, gain, |frequency| self.sample2(p * frequency))
    }

    /// Three decorrelated fbm lookups, used as a perturbation vector.
    pub fn fbm3_vector(&self, p: Vec3, octaves: u32, gain: f32) -> Vec3 {
        Vec3::new(
            self.fbm3(p, octaves, gain),
            self.fbm3(p + Vec3::new(31.7, 11.3, 5.9), octaves, gain),
            self.fbm3(p + Vec3::new(-7.1, 43.9, 19.3), octaves, gain),
        )
    }

    fn fbm(&self, octaves: u32, gain: f32, octave: impl Fn(f32) -> f32) -> f32 {
        let mut sum = 0.0;
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        for _ in 0..octaves.min(MAX_OCTAVES) {
            sum += amplitude * octave(frequency);
            total += amplitude;
            amplitude *= gain;
            frequency *= LACUNARITY;
        }
        if total > 0.0 {
            sum / total
        } else {
            0.0
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(0)
    }
}
