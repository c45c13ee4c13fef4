//! Display pipeline: tone mapping, gamma, colour effects and byte packing.

use crate::config::ToneMapping;
use crate::material::Color;
use bytemuck::{Pod, Zeroable};
use prism_math::Vec3;

pub const DISPLAY_GAMMA: f32 = 2.2;

/// White point of the extended Reinhard operator.
pub const REINHARD_WHITE: f32 = 4.0;

/// Linear white point of the Hable filmic curve.
pub const HABLE_WHITE: f32 = 11.2;

/// Exposure bias applied before the Hable curve.
const HABLE_EXPOSURE_BIAS: f32 = 2.0;

/// Radiance is clamped here before tone mapping so no curve sees infinity.
const MAX_RADIANCE: f32 = 1.0e6;

const HIGHLIGHT_COLOR: Color = Color::new(1.0, 0.55, 0.0);
const HIGHLIGHT_STRENGTH: f32 = 0.35;

/// Output pixel, laid out as B, G, R, A bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Bgra8 {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Bgra8 {
    pub const BLACK: Bgra8 = Bgra8 { b: 0, g: 0, r: 0, a: 255 };

    /// Pack a display colour in [0, 1]; alpha is always opaque.
    pub fn from_color(c: Color) -> Self {
        let c = saturate(c) * 255.0 + Vec3::splat(0.5);
        Bgra8 {
            b: c.z as u8,
            g: c.y as u8,
            r: c.x as u8,
            a: 255,
        }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Display-only switches; changing them never invalidates samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySettings {
    pub tone_mapping: ToneMapping,
    pub grayscale: bool,
    pub sepia: bool,
}

/// Clamp to [0, 1], mapping NaN to 0.
#[inline]
fn saturate(c: Color) -> Color {
    c.max(Vec3::ZERO).min(Vec3::ONE)
}

#[inline]
fn gamma(c: Color) -> Color {
    let inv = 1.0 / DISPLAY_GAMMA;
    Color::new(c.x.powf(inv), c.y.powf(inv), c.z.powf(inv))
}

fn hable_curve(x: Color) -> Color {
    const A: f32 = 0.15;
    const B: f32 = 0.50;
    const C: f32 = 0.10;
    const D: f32 = 0.20;
    const E: f32 = 0.02;
    const F: f32 = 0.30;
    ((x * (A * x + Vec3::splat(C * B)) + Vec3::splat(D * E)) / (x * (A * x + Vec3::splat(B)) + Vec3::splat(D * F)))
        - Vec3::splat(E / F)
}

/// Map linear radiance to a gamma-encoded display value in [0, 1].
pub fn tone_map(radiance: Color, operator: ToneMapping) -> Color {
    let c = radiance.max(Vec3::ZERO).min(Vec3::splat(MAX_RADIANCE));
    match operator {
        ToneMapping::Linear => gamma(saturate(c)),
        ToneMapping::Reinhard => gamma(saturate(c / (Vec3::ONE + c))),
        ToneMapping::ReinhardExtended => {
            let white2 = REINHARD_WHITE * REINHARD_WHITE;
            gamma(saturate(c * (Vec3::ONE + c / white2) / (Vec3::ONE + c)))
        }
        ToneMapping::HejlDawson => {
            // Gamma is part of the fitted curve
            let x = (c - Vec3::splat(0.004)).max(Vec3::ZERO);
            saturate((x * (6.2 * x + Vec3::splat(0.5))) / (x * (6.2 * x + Vec3::splat(1.7)) + Vec3::splat(0.06)))
        }
        ToneMapping::Hable => {
            let mapped = hable_curve(c * HABLE_EXPOSURE_BIAS) / hable_curve(Vec3::splat(HABLE_WHITE));
            gamma(saturate(mapped))
        }
    }
}

/// Rec. 709 luminance.
#[inline]
pub fn luminance(c: Color) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

pub fn sepia(c: Color) -> Color {
    saturate(Color::new(
        0.393 * c.x + 0.769 * c.y + 0.189 * c.z,
        0.349 * c.x + 0.686 * c.y + 0.168 * c.z,
        0.272 * c.x + 0.534 * c.y + 0.131 * c.z,
    ))
}

/// Blend towards the selection colour.
#[inline]
pub fn highlight(c: Color) -> Color {
    c.lerp(HIGHLIGHT_COLOR, HIGHLIGHT_STRENGTH)
}

/// Full display transform of one accumulated pixel.
pub fn display_pixel(mean: Color, settings: &DisplaySettings, selected: bool) -> Bgra8 {
    let mut c = tone_map(mean, settings.tone_mapping);
    if settings.grayscale {
        c = Vec3::splat(luminance(c)).min(Vec3::ONE);
    }
    if settings.sepia {
        c = sepia(c);
    }
    if selected {
        c = highlight(c);
    }
    Bgra8::from_color(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATORS: [ToneMapping; 5] = [
        ToneMapping::Linear,
        ToneMapping::Reinhard,
        ToneMapping::ReinhardExtended,
        ToneMapping::HejlDawson,
        ToneMapping::Hable,
    ];

    #[test]
    fn test_operators_stay_in_unit_range() {
        let inputs = [0.0, 1e-4, 0.18, 0.5, 1.0, 4.0, 100.0, 1e6, f32::INFINITY, f32::NAN];
        for op in OPERATORS {
            for v in inputs {
                let c = tone_map(Color::new(v, v * 0.5, 0.0), op);
                for ch in c.to_array() {
                    assert!((0.0..=1.0).contains(&ch), "{op:?} {v} -> {c:?}");
                }
            }
        }
    }

    #[test]
    fn test_operators_are_monotonic() {
        for op in OPERATORS {
            let mut prev = -1.0;
            for i in 0..50 {
                let v = tone_map(Color::splat(i as f32 * 0.2), op).x;
                assert!(v >= prev, "{op:?} not monotonic at {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn test_black_maps_to_black() {
        for op in OPERATORS {
            let settings = DisplaySettings {
                tone_mapping: op,
                ..Default::default()
            };
            assert_eq!(display_pixel(Color::ZERO, &settings, false), Bgra8::BLACK);
        }
    }

    #[test]
    fn test_reinhard_value() {
        // 1 / (1 + 1) = 0.5 before gamma
        let c = tone_map(Color::ONE, ToneMapping::Reinhard);
        assert!((c.x - 0.5f32.powf(1.0 / 2.2)).abs() < 1e-6);
    }

    #[test]
    fn test_grayscale_is_neutral() {
        let settings = DisplaySettings {
            grayscale: true,
            ..Default::default()
        };
        let px = display_pixel(Color::new(0.9, 0.2, 0.1), &settings, false);
        assert_eq!(px.r, px.g);
        assert_eq!(px.g, px.b);
    }

    #[test]
    fn test_highlight_shifts_towards_orange() {
        let settings = DisplaySettings::default();
        let plain = display_pixel(Color::splat(0.2), &settings, false);
        let selected = display_pixel(Color::splat(0.2), &settings, true);
        assert!(selected.r > plain.r);
        assert!(selected.b < plain.b);
    }

    #[test]
    fn test_bgra_layout() {
        let px = Bgra8::from_color(Color::new(1.0, 0.0, 0.0));
        let bytes: &[u8] = bytemuck::bytes_of(&px);
        assert_eq!(bytes, &[0, 0, 255, 255]);
    }
}
