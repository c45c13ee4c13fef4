//! Terrain ray marcher.
//!
//! Sphere-traces the height field with a step of `0.4 * h` (h = height above
//! the surface), never shorter than `0.002 * t`, then shades the hit with the
//! local lighting model and blends it into the sky with distance fog.

use super::{background, caster};
use crate::hittable::Intersection;
use crate::material::{Color, Material};
use crate::renderer::RenderContext;
use crate::sampling::smoothstep;
use crate::scene::Scene;
use crate::terrain::Terrain;
use prism_math::{Onb, Ray, Vec2, Vec3};

/// Iteration cap for one march.
pub const MAX_MARCH_ITERATIONS: u32 = 512;

const START_T: f32 = 0.01;

/// A sample counts as a hit once it is within this fraction of `t` above
/// the surface.
const HIT_TOLERANCE: f32 = 1e-3;

const STEP_SCALE: f32 = 0.4;
const MIN_STEP_SCALE: f32 = 0.002;

/// Shadow rays start this far above the hit.
const SHADOW_BIAS: f32 = 0.01;

const FOG_DENSITY: f32 = 0.01;

const GRASS: Color = Color::new(0.22, 0.36, 0.12);
const ROCK: Color = Color::new(0.42, 0.37, 0.32);
const SNOW: Color = Color::new(0.9, 0.92, 0.95);

/// Where a march met the height field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchHit {
    /// Distance along the normalized ray direction
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// March `ray` against the height field.
pub fn march(terrain: &Terrain, ray: &Ray) -> Option<MarchHit> {
    let d = ray.direction.normalize_or_zero();
    if d == Vec3::ZERO {
        return None;
    }

    let mut t = START_T;
    for _ in 0..MAX_MARCH_ITERATIONS {
        let p = ray.origin + d * t;
        let h = p.y - terrain.height(p.x, p.z);
        if h < HIT_TOLERANCE * t {
            return Some(MarchHit {
                t,
                point: p,
                normal: terrain.normal(p.x, p.z),
            });
        }
        t += (STEP_SCALE * h).max(MIN_STEP_SCALE * t);
        if t > terrain.max_distance {
            break;
        }
    }
    None
}

/// Slope- and altitude-driven albedo: grass on flats, rock on steep faces,
/// snow near the top of the range.
fn terrain_albedo(terrain: &Terrain, point: Vec3, normal: Vec3) -> Color {
    let rock = smoothstep((0.85 - normal.y) / 0.2);
    let color = GRASS.lerp(ROCK, rock);
    let altitude = (point.y - terrain.base) / terrain.amplitude.max(1e-3);
    let snow = smoothstep((altitude - 0.5) / 0.3) * normal.y.max(0.0);
    color.lerp(SNOW, snow)
}

pub(super) fn shade(scene: &Scene, ctx: &RenderContext, ray: &Ray) -> (Color, Intersection) {
    // The sky is the base layer; a terrain hit is fogged into it
    let base = background(ctx, ray.direction, true);
    let terrain = ctx.terrain(scene);
    let Some(m) = march(terrain, ray) else {
        return (base, Intersection::miss());
    };

    let occluded = |shadow: &Ray, distance: f32| {
        let lifted = Ray::new(shadow.origin + m.normal * SHADOW_BIAS, shadow.direction);
        march(terrain, &lifted).is_some_and(|h| h.t < distance)
    };
    let albedo = terrain_albedo(terrain, m.point, m.normal);
    let lit = caster::local_shading(ctx, m.point, m.normal, ray.direction, albedo, Material::Lambertian, &occluded);
    let fog = 1.0 - (-FOG_DENSITY * m.t).exp();
    let color = lit.lerp(background(ctx, ray.direction, false), fog);

    let primitive = scene.terrain_primitive();
    let hit = Intersection {
        distance: m.t / ray.direction.length(),
        primitive,
        shape: primitive.and_then(|id| scene.primitive(id)).map(|p| p.shape),
        point: m.point,
        geometric_normal: m.normal,
        normal: m.normal,
        basis: Onb::from_w(m.normal),
        uv: Vec2::new(m.point.x, m.point.z),
        front_face: true,
        ..Intersection::miss()
    };
    (color, hit)
}
