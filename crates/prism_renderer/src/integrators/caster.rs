//! Ray caster: one intersection and local Phong lighting from the sun.

use super::{background, surface_at};
use crate::hittable::{offset_origin, Intersection};
use crate::material::{Color, Material};
use crate::renderer::RenderContext;
use crate::sampling::reflect;
use crate::scene::Scene;
use prism_math::{Ray, Vec3};

/// Fraction of the albedo returned as ambient light.
pub const AMBIENT_FACTOR: f32 = 0.1;

/// Weight of the specular highlight.
pub const SPECULAR_FACTOR: f32 = 0.3;

pub(super) fn shade(scene: &Scene, ctx: &RenderContext, ray: &Ray, hit: &Intersection) -> Color {
    // Miss: plain sky, including the disk
    let Some(surface) = surface_at(scene, hit) else {
        return background(ctx, ray.direction, true);
    };
    let occluded = |shadow: &Ray, distance: f32| scene.occluded(shadow, distance);
    surface.emission
        + local_shading(
            ctx,
            hit.point,
            hit.normal,
            ray.direction,
            surface.albedo,
            surface.material,
            &occluded,
        )
}

/// Ambient + diffuse + specular lighting from a point light at the sun
/// origin, with one shadow ray.
///
/// `occluded(ray, distance)` reports whether anything blocks the shadow ray
/// before `distance`.
pub fn local_shading(
    ctx: &RenderContext,
    point: Vec3,
    normal: Vec3,
    direction: Vec3,
    albedo: Color,
    material: Material,
    occluded: &dyn Fn(&Ray, f32) -> bool,
) -> Color {
    let ambient = albedo * AMBIENT_FACTOR;
    if !ctx.config.sun || !ctx.sky.sun_above_horizon() {
        return ambient;
    }

    let to_light = ctx.sky.sun_origin() - point;
    let distance = to_light.length();
    let l = to_light / distance;
    let n_dot_l = normal.dot(l);
    if n_dot_l <= 0.0 || occluded(&Ray::new(offset_origin(point, normal), l), distance) {
        return ambient;
    }

    let diffuse = albedo * n_dot_l;
    let view = -direction.normalize_or_zero();
    let r_dot_v = reflect(-l, normal).dot(view).max(0.0);
    let specular = Color::splat(SPECULAR_FACTOR * r_dot_v.powf(material.shininess()));
    ambient + diffuse + specular
}
