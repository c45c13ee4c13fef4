//! Whitted-style ray tracer: mirrors are followed, everything else gets
//! local shading.

use super::{background, caster, surface_at};
use crate::hittable::{offset_origin, Intersection, Query};
use crate::material::Color;
use crate::renderer::RenderContext;
use crate::sampling::reflect;
use crate::scene::Scene;
use prism_math::Ray;

/// Mirror bounces followed before the last hit is shaded locally.
pub const MAX_MIRROR_BOUNCES: u32 = 5;

pub(super) fn trace(scene: &Scene, ctx: &RenderContext, mut ray: Ray, primary: &Intersection) -> Color {
    let options = ctx.shading_options();
    let mut hit = *primary;

    for bounce in 0..=MAX_MIRROR_BOUNCES {
        let Some(surface) = surface_at(scene, &hit) else {
            return background(ctx, ray.direction, true);
        };
        if surface.material.is_mirror() && bounce < MAX_MIRROR_BOUNCES {
            // Perfect mirrors carry no albedo tint in this mode
            let mirrored = reflect(ray.direction.normalize_or_zero(), hit.normal);
            ray = Ray::new(offset_origin(hit.point, hit.normal), mirrored);
            hit = scene.intersect(&ray, Query::Closest, options);
            continue;
        }
        return caster::shade(scene, ctx, &ray, &hit);
    }
    Color::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::config::{RenderConfig, RenderMode};
    use crate::material::Material;
    use crate::plane::Plane;
    use crate::scene::Surface;
    use crate::sky::Sky;
    use crate::texture::Texture;
    use prism_math::Vec3;

    fn context() -> RenderContext {
        let mut config = RenderConfig::default().with_mode(RenderMode::RayTracer);
        config.sun = false;
        RenderContext::new(config, Camera::new(), Sky::new(3.0, Vec3::new(0.2, 0.7, 0.4)))
    }

    #[test]
    fn test_mirror_shows_sky_regardless_of_albedo() {
        let ctx = context();
        for albedo in [0.1, 0.9] {
            let mut builder = Scene::builder();
            let tex = builder.add_texture(Texture::constant(albedo, albedo, albedo));
            let mirror = builder.add_surface(Surface::new(Material::Reflection, tex));
            let floor = builder.add_plane(Plane::new(Vec3::Y, 0.0));
            builder.add_primitive(floor, mirror);
            let scene = builder.build().unwrap();

            let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.3, -1.0, -0.4).normalize());
            let hit = scene.intersect(&ray, Query::Closest, ctx.shading_options());
            let reflected = Vec3::new(0.3, 1.0, -0.4).normalize();
            let expected = ctx.sky.radiance(reflected, false);
            assert!((trace(&scene, &ctx, ray, &hit) - expected).length() < 1e-4);
        }
    }

    #[test]
    fn test_facing_mirrors_stop() {
        let ctx = context();
        let mut builder = Scene::builder();
        let tex = builder.add_texture(Texture::constant(1.0, 1.0, 1.0));
        let mirror = builder.add_surface(Surface::new(Material::Reflection, tex));
        let lower = builder.add_plane(Plane::new(Vec3::Y, 0.0));
        let upper = builder.add_plane(Plane::new(Vec3::Y, 2.0));
        builder.add_primitive(lower, mirror);
        builder.add_primitive(upper, mirror);
        let scene = builder.build().unwrap();

        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.1, -1.0, 0.0));
        let hit = scene.intersect(&ray, Query::Closest, ctx.shading_options());
        let c = trace(&scene, &ctx, ray, &hit);
        // Ends in local shading of the last mirror: ambient only with the sun off
        assert!((c - Color::splat(0.1)).length() < 1e-5);
    }
}
