//! Per-pixel integrators.
//!
//! [`shade_pixel`] is the body of the frame kernel: it generates the camera
//! ray, runs the integrator selected by the render mode and reports which
//! primitive the primary ray hit. Every value it touches is local to the
//! invocation.

mod caster;
mod marcher;
mod occlusion;
mod path;
mod whitted;

pub use caster::{local_shading, AMBIENT_FACTOR, SPECULAR_FACTOR};
pub use marcher::{march, MarchHit, MAX_MARCH_ITERATIONS};
pub use whitted::MAX_MIRROR_BOUNCES;

use crate::config::RenderMode;
use crate::hittable::{Intersection, Query};
use crate::material::{Color, Material};
use crate::renderer::RenderContext;
use crate::scene::Scene;
use crate::texture;
use prism_math::{Ray, Vec3};
use rand::RngCore;

/// Pixels this close (in radians) to a triangle edge get the wireframe tint.
pub const WIRE_THRESHOLD: f32 = 0.002;

/// Brightness multiplier for wireframe pixels.
const WIRE_DARKEN: f32 = 0.2;

/// Result of one kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    /// Linear radiance estimate
    pub color: Color,
    /// Primitive hit by the primary ray (-1 = none)
    pub primitive: i32,
}

/// Shade pixel (x, y) for the frame described by `ctx`.
///
/// Returns `None` when the camera produces no ray for the pixel.
pub fn shade_pixel(scene: &Scene, ctx: &RenderContext, x: u32, y: u32, rng: &mut dyn RngCore) -> Option<PixelSample> {
    let jitter = ctx.config.mode.is_progressive();
    let ray = ctx.camera.generate_ray(x, y, jitter, rng)?;
    let options = ctx.shading_options();

    let (mut color, primary) = match ctx.config.mode {
        RenderMode::PathTracer => {
            let hit = scene.intersect(&ray, Query::Closest, options);
            (path::trace(scene, ctx, ray, &hit, rng), hit)
        }
        RenderMode::RayCaster => {
            let hit = scene.intersect(&ray, Query::Closest, options);
            (caster::shade(scene, ctx, &ray, &hit), hit)
        }
        RenderMode::RayTracer => {
            let hit = scene.intersect(&ray, Query::Closest, options);
            (whitted::trace(scene, ctx, ray, &hit), hit)
        }
        RenderMode::AmbientOcclusion => {
            let hit = scene.intersect(&ray, Query::Closest, options);
            (occlusion::shade(scene, ctx, &hit, rng), hit)
        }
        RenderMode::RayMarcher => marcher::shade(scene, ctx, &ray),
    };

    if ctx.config.wireframe && on_wire(&ray, &primary) {
        color *= WIRE_DARKEN;
    }

    Some(PixelSample {
        color,
        primitive: primary.primitive_index(),
    })
}

/// Radiance arriving from the environment along `direction`.
///
/// The sun disk is only added when `with_sun` is set, i.e. for camera rays
/// and rays leaving a specular bounce.
pub(crate) fn background(ctx: &RenderContext, direction: Vec3, with_sun: bool) -> Color {
    let mut color = if ctx.config.sky {
        ctx.sky.radiance(direction, ctx.config.clouds)
    } else {
        ctx.sky.ambient
    };
    if with_sun && ctx.config.sun {
        color += ctx.sky.sun_disk(direction);
    }
    color
}

/// Material and texture values at a hit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SurfaceSample {
    pub material: Material,
    pub albedo: Color,
    pub emission: Color,
}

pub(crate) fn surface_at(scene: &Scene, hit: &Intersection) -> Option<SurfaceSample> {
    let surface = scene.surface_of(hit.primitive?)?;
    let eval = |id| texture::evaluate(scene.textures(), id, hit, scene.noise());
    Some(SurfaceSample {
        material: surface.material,
        albedo: eval(surface.albedo),
        emission: surface.emission.map_or(Color::ZERO, eval),
    })
}

/// True when the ray passes within [`WIRE_THRESHOLD`] of an edge of the hit
/// triangle, measured as the angle to the plane through the ray origin and
/// the edge.
fn on_wire(ray: &Ray, hit: &Intersection) -> bool {
    let Some(corners) = hit.triangle else {
        return false;
    };
    let d = ray.direction.normalize_or_zero();
    (0..3).any(|i| {
        let a = corners[i] - ray.origin;
        let b = corners[(i + 1) % 3] - ray.origin;
        let n = a.cross(b).normalize_or_zero();
        n != Vec3::ZERO && n.dot(d).abs() < WIRE_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::config::RenderConfig;
    use crate::material::Material;
    use crate::scene::Surface;
    use crate::sky::Sky;
    use crate::texture::Texture;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn triangle_scene() -> Scene {
        let mut builder = Scene::builder();
        let albedo = builder.add_texture(Texture::constant(0.8, 0.8, 0.8));
        let surface = builder.add_surface(Surface::new(Material::Lambertian, albedo));
        let tri = builder.add_triangle(
            [Vec3::new(-1.0, -1.0, -3.0), Vec3::new(1.0, -1.0, -3.0), Vec3::new(0.0, 1.0, -3.0)],
            None,
            None,
        );
        builder.add_primitive(tri, surface);
        builder.build().unwrap()
    }

    #[test]
    fn test_wire_detects_edges() {
        let scene = triangle_scene();
        let hit_at = |x: f32, y: f32| {
            let ray = Ray::new(Vec3::ZERO, Vec3::new(x, y, -3.0));
            (ray, scene.intersect(&ray, Query::Closest, Default::default()))
        };

        let (ray, hit) = hit_at(0.0, -0.2);
        assert!(hit.is_hit());
        assert!(!on_wire(&ray, &hit));

        // Just above the bottom edge
        let (ray, hit) = hit_at(0.0, -0.999);
        assert!(hit.is_hit());
        assert!(on_wire(&ray, &hit));
    }

    #[test]
    fn test_background_respects_toggles() {
        let sky = Sky::default();
        let sun = sky.sun_direction();
        let mut ctx = RenderContext::new(RenderConfig::default(), Camera::new(), sky);

        assert!(background(&ctx, sun, true).x > background(&ctx, sun, false).x);

        ctx.config.sky = false;
        ctx.config.sun = false;
        assert_eq!(background(&ctx, sun, true), ctx.sky.ambient);
    }

    #[test]
    fn test_every_mode_reports_the_primitive() {
        let scene = triangle_scene();
        let camera = Camera::new()
            .with_resolution(9, 9)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        for mode in RenderMode::ALL {
            if mode == RenderMode::RayMarcher {
                continue;
            }
            let ctx = RenderContext::new(RenderConfig::default().with_mode(mode), camera.clone(), Sky::default());
            let mut rng = StdRng::seed_from_u64(1);
            let center = shade_pixel(&scene, &ctx, 4, 4, &mut rng).unwrap();
            assert_eq!(center.primitive, 0, "{mode:?}");
            let corner = shade_pixel(&scene, &ctx, 0, 0, &mut rng).unwrap();
            assert_eq!(corner.primitive, -1, "{mode:?}");
            assert!(center.color.min_element() >= 0.0);
        }
    }

    #[test]
    fn test_wireframe_darkens() {
        let scene = triangle_scene();
        let camera = Camera::new()
            .with_resolution(128, 128)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let config = RenderConfig::default().with_mode(RenderMode::RayCaster);
        let plain = RenderContext::new(config.clone(), camera.clone(), Sky::default());
        let wired = RenderContext::new(
            RenderConfig {
                wireframe: true,
                ..config
            },
            camera,
            Sky::default(),
        );

        let mut rng = StdRng::seed_from_u64(3);
        let mut darker = 0;
        for y in 0..128 {
            for x in 0..128 {
                let a = shade_pixel(&scene, &plain, x, y, &mut rng).unwrap();
                let b = shade_pixel(&scene, &wired, x, y, &mut rng).unwrap();
                assert!(b.color.x <= a.color.x + 1e-6);
                if b.color.x < a.color.x {
                    darker += 1;
                }
            }
        }
        assert!(darker > 0);
    }
}
