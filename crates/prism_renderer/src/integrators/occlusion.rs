//! Ambient occlusion with one cosine-weighted probe per sample.

use crate::hittable::{offset_origin, Intersection};
use crate::material::Color;
use crate::renderer::RenderContext;
use crate::sampling::cosine_hemisphere;
use crate::scene::Scene;
use prism_math::Ray;
use rand::RngCore;

pub(super) fn shade(scene: &Scene, ctx: &RenderContext, hit: &Intersection, rng: &mut dyn RngCore) -> Color {
    if !hit.is_hit() {
        return Color::ONE;
    }
    let probe = Ray::new(offset_origin(hit.point, hit.normal), cosine_hemisphere(hit.normal, rng));
    if scene.occluded(&probe, ctx.config.ao_distance) {
        Color::ZERO
    } else {
        Color::ONE
    }
}
