//! Unidirectional path tracer.
//!
//! Iterative loop over bounces with explicit throughput. Terminal states are
//! an escape to the sky, a Russian-roulette kill and reaching `max_depth`.
//! The last two end with one occlusion-only sky lookup along the sampled
//! direction.
//!
//! The bounce direction is drawn before the roulette decision. An escaping
//! survivor then sees the sky with the same weight as the kill lookup, and
//! only survivors that hit a surface are rescaled by 1/p. Both branches
//! together keep the estimate unbiased.

use super::{background, surface_at};
use crate::hittable::{Intersection, Query};
use crate::material::Color;
use crate::renderer::RenderContext;
use crate::sampling::gen_f32;
use crate::scene::Scene;
use prism_math::Ray;
use rand::RngCore;

pub(super) fn trace(
    scene: &Scene,
    ctx: &RenderContext,
    mut ray: Ray,
    primary: &Intersection,
    rng: &mut dyn RngCore,
) -> Color {
    let config = &ctx.config;
    let options = ctx.shading_options();
    let sun_blocked = |shadow: &Ray| scene.occluded(shadow, f32::INFINITY);

    let mut hit = *primary;
    let mut radiance = Color::ZERO;
    let mut throughput = Color::ONE;
    // Camera rays see the sun disk
    let mut specular = true;
    let mut depth = 0;

    loop {
        if !hit.is_hit() {
            radiance += throughput * background(ctx, ray.direction, specular);
            break;
        }
        let Some(surface) = surface_at(scene, &hit) else {
            break;
        };

        radiance += throughput * surface.emission;
        if config.sun && surface.material.receives_sun() {
            radiance += throughput
                * ctx
                    .sky
                    .sun_contribution(hit.point, hit.normal, surface.albedo, &sun_blocked, rng);
        }
        depth += 1;

        let scatter = surface.material.scatter(ray.direction, &hit, surface.albedo, rng);
        throughput *= scatter.attenuation;
        specular = scatter.specular;
        ray = scatter.ray;

        let roulette = depth >= config.rr_depth && depth < config.max_depth;
        let survive = surface.albedo.max_element().min(1.0);
        if depth >= config.max_depth || (roulette && gen_f32(rng) >= survive) {
            if !scene.occluded(&ray, f32::INFINITY) {
                radiance += throughput * background(ctx, ray.direction, specular);
            }
            break;
        }

        hit = scene.intersect(&ray, Query::Closest, options);
        if roulette && hit.is_hit() {
            throughput /= survive;
        }
    }
    radiance
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
    use crate::sphere::Sphere;
    use crate::texture::Texture;
    use prism_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Camera inside a closed emissive sphere: every path hits on every bounce.
    fn furnace(albedo: f32) -> Scene {
        let mut builder = Scene::builder();
        let tex = builder.add_texture(Texture::constant(albedo, albedo, albedo));
        let glow = builder.add_texture(Texture::constant(1.0, 1.0, 1.0));
        let surface = builder.add_surface(Surface::new(Material::Lambertian, tex).with_emission(glow));
        let shell = builder.add_sphere(Sphere::new(Vec3::ZERO, 5.0));
        builder.add_primitive(shell, surface);
        builder.build().unwrap()
    }

    fn context(max_depth: u32, rr_depth: u32) -> RenderContext {
        let mut config = RenderConfig::default()
            .with_mode(RenderMode::PathTracer)
            .with_depth(max_depth, rr_depth);
        config.sun = false;
        RenderContext::new(config, Camera::new(), Sky::default())
    }

    fn estimate(scene: &Scene, ctx: &RenderContext, samples: u32) -> f32 {
        let mut rng = StdRng::seed_from_u64(2024);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let primary = scene.intersect(&ray, Query::Closest, ctx.shading_options());
        let total: f32 = (0..samples)
            .map(|_| trace(scene, ctx, ray, &primary, &mut rng).x)
            .sum();
        total / samples as f32
    }

    #[test]
    fn test_furnace_without_roulette_is_geometric_series() {
        let scene = furnace(0.5);
        let ctx = context(4, 4);
        // No roulette at the last bounce; the final lookup is occluded
        let expected = 1.0 + 0.5 + 0.25 + 0.125;
        assert!((estimate(&scene, &ctx, 64) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_roulette_is_unbiased() {
        let scene = furnace(0.5);
        let expected = (0..8).map(|k| 0.5f32.powi(k)).sum::<f32>();
        let with_roulette = estimate(&scene, &context(8, 1), 40_000);
        assert!(
            (with_roulette - expected).abs() < 0.03,
            "roulette {with_roulette} vs {expected}"
        );
    }

    #[test]
    fn test_killed_path_still_sees_sky() {
        // Dark floor under an open sky: nearly every path is killed at depth 1
        let mut builder = Scene::builder();
        let tex = builder.add_texture(Texture::constant(0.05, 0.05, 0.05));
        let surface = builder.add_surface(Surface::new(Material::Lambertian, tex));
        let floor = builder.add_plane(Plane::new(Vec3::Y, 0.0));
        builder.add_primitive(floor, surface);
        let scene = builder.build().unwrap();

        let roulette = context(8, 1);
        let fixed = context(8, 8);
        let ray = Ray::new(Vec3::Y, Vec3::new(0.0, -1.0, -1.0));
        let primary = scene.intersect(&ray, Query::Closest, roulette.shading_options());
        assert!(primary.is_hit());

        for seed in 0..200 {
            let killed = trace(&scene, &roulette, ray, &primary, &mut StdRng::seed_from_u64(seed));
            let kept = trace(&scene, &fixed, ray, &primary, &mut StdRng::seed_from_u64(seed));
            assert!(killed.max_element() > 0.0, "seed {seed}: {killed:?}");
            assert_eq!(killed, kept, "seed {seed}");
        }
    }

    #[test]
    fn test_black_surface_stops_immediately() {
        let scene = furnace(0.0);
        assert!((estimate(&scene, &context(8, 1), 100) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_escape_returns_sky() {
        let scene = Scene::builder().build().unwrap();
        let ctx = context(8, 3);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.2, 0.6, -1.0));
        let mut rng = StdRng::seed_from_u64(1);
        let c = trace(&scene, &ctx, ray, &Intersection::miss(), &mut rng);
        assert!((c - ctx.sky.radiance(ray.direction, false)).length() < 1e-6);
    }
}
