//! Texture expressions evaluated at a hit.
//!
//! Textures form a shallow tree: `Blend` combines two other textures, which
//! may not themselves be blends, so evaluation never recurses more than one
//! level.

use crate::fractal::Noise;
use crate::hittable::Intersection;
use crate::sampling::smoothstep;
use crate::scene::TextureId;
use prism_math::{Vec2, Vec3};

/// Tagged texture variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Texture {
    Constant(Vec3),
    Checkerboard {
        color0: Vec3,
        color1: Vec3,
        scale: Vec2,
        /// Radians, applied to UV before scaling
        rotation: f32,
    },
    /// `a * (1 - factor) + b * factor`
    Blend {
        a: TextureId,
        b: TextureId,
        factor: f32,
    },
    /// `addend + multiplier * fbm(point * frequency)`
    FractalNoise {
        addend: Vec3,
        multiplier: Vec3,
        frequency: f32,
        gain: f32,
        octaves: u32,
    },
    Image(ImageTexture),
    /// Debug: fractional UV in red/green
    Uv,
    /// Debug: shading normal remapped to [0, 1]
    SurfaceNormal,
}

impl Texture {
    pub fn constant(r: f32, g: f32, b: f32) -> Self {
        Texture::Constant(Vec3::new(r, g, b))
    }

    pub fn checkerboard(color0: Vec3, color1: Vec3, scale: f32) -> Self {
        Texture::Checkerboard {
            color0,
            color1,
            scale: Vec2::splat(scale),
            rotation: 0.0,
        }
    }

    pub fn is_blend(&self) -> bool {
        matches!(self, Texture::Blend { .. })
    }
}

/// Image texture with inline 0xAARRGGBB pixels, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTexture {
    pub width: u32,
    pub height: u32,
    pub scale: Vec2,
    pub rotation: f32,
    pub pixels: Vec<u32>,
}

impl ImageTexture {
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Self {
        Self {
            width,
            height,
            scale: Vec2::ONE,
            rotation: 0.0,
            pixels,
        }
    }

    pub fn with_transform(mut self, scale: Vec2, rotation: f32) -> Self {
        self.scale = scale;
        self.rotation = rotation;
        self
    }

    /// Colour of one texel; out-of-range reads are black.
    fn texel(&self, x: i64, y: i64) -> Vec3 {
        let (w, h) = (self.width as i64, self.height as i64);
        let index = y.rem_euclid(h) * w + x.rem_euclid(w);
        match self.pixels.get(index as usize) {
            Some(&argb) => Vec3::new(
                ((argb >> 16) & 0xff) as f32,
                ((argb >> 8) & 0xff) as f32,
                (argb & 0xff) as f32,
            ) / 255.0,
            None => Vec3::ZERO,
        }
    }

    /// Bilinear lookup with smoothstep weights and wraparound addressing.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        if self.width == 0 || self.height == 0 {
            return Vec3::ZERO;
        }
        let st = transform_uv(uv, self.scale, self.rotation);
        // Flip V: row 0 is the top of the image
        let fx = st.x.rem_euclid(1.0) * self.width as f32 - 0.5;
        let fy = (1.0 - st.y.rem_euclid(1.0)) * self.height as f32 - 0.5;

        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = smoothstep(fx - x0);
        let ty = smoothstep(fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), tx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }
}

/// Rotate then scale a UV coordinate.
fn transform_uv(uv: Vec2, scale: Vec2, rotation: f32) -> Vec2 {
    let (sin, cos) = rotation.sin_cos();
    Vec2::new(cos * uv.x - sin * uv.y, sin * uv.x + cos * uv.y) * scale
}

/// Evaluate texture `id` at a hit. Unknown ids evaluate to black and every
/// channel is clamped to be non-negative.
pub fn evaluate(textures: &[Texture], id: TextureId, hit: &Intersection, noise: &Noise) -> Vec3 {
    let color = match textures.get(id.index()) {
        Some(Texture::Blend { a, b, factor }) => {
            let f = factor.clamp(0.0, 1.0);
            let a = evaluate_operand(textures, *a, hit, noise);
            let b = evaluate_operand(textures, *b, hit, noise);
            a * (1.0 - f) + b * f
        }
        Some(texture) => evaluate_leaf(texture, hit, noise),
        None => Vec3::ZERO,
    };
    color.max(Vec3::ZERO)
}

/// Non-recursive evaluation used for blend operands; a nested blend is black.
fn evaluate_operand(textures: &[Texture], id: TextureId, hit: &Intersection, noise: &Noise) -> Vec3 {
    textures
        .get(id.index())
        .map_or(Vec3::ZERO, |texture| evaluate_leaf(texture, hit, noise))
}

fn evaluate_leaf(texture: &Texture, hit: &Intersection, noise: &Noise) -> Vec3 {
    match texture {
        Texture::Constant(color) => *color,
        Texture::Checkerboard {
            color0,
            color1,
            scale,
            rotation,
        } => {
            let st = transform_uv(hit.uv, *scale, *rotation);
            let parity = (st.x.floor() as i64 + st.y.floor() as i64).rem_euclid(2);
            if parity == 0 {
                *color0
            } else {
                *color1
            }
        }
        Texture::FractalNoise {
            addend,
            multiplier,
            frequency,
            gain,
            octaves,
        } => *addend + *multiplier * noise.fbm3(hit.point * *frequency, *octaves, *gain),
        Texture::Image(image) => image.sample(hit.uv),
        Texture::Uv => Vec3::new(hit.uv.x.rem_euclid(1.0), hit.uv.y.rem_euclid(1.0), 0.0),
        Texture::SurfaceNormal => hit.normal * 0.5 + Vec3::splat(0.5),
        Texture::Blend { .. } => Vec3::ZERO,
    }
}
