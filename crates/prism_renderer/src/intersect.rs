//! Ray-scene intersection and shading-frame reconstruction.

use crate::hittable::{HitRecord, Hittable, Intersection, LocalFrame, Query, ShadingOptions, EPSILON};
use crate::scene::{PrimitiveId, Scene, Shape, Surface};
use crate::texture;
use prism_math::{Interval, Onb, Ray, Vec3};

/// Octaves of the fractal normal perturbation.
const PERTURB_OCTAVES: u32 = 4;

impl Scene {
    fn shape_hit(&self, shape: Shape, ray: &Ray, ray_t: Interval, any_hit: bool) -> Option<HitRecord> {
        let geometry = &self.geometry;
        match shape {
            Shape::Plane(id) => self.planes[id.index()].hit(ray, ray_t, geometry),
            Shape::Sphere(id) => self.spheres[id.index()].hit(ray, ray_t, geometry),
            Shape::Triangle(id) => id.hit(ray, ray_t, geometry),
            Shape::Terrain(id) => self.terrains[id.index()].hit(ray, ray_t, geometry),
            Shape::Mesh(id) => {
                let mesh = &self.meshes[id.index()];
                if any_hit {
                    mesh.any_hit(ray, ray_t, geometry)
                } else {
                    mesh.hit(ray, ray_t, geometry)
                }
            }
        }
    }

    fn shape_frame(&self, shape: Shape, ray: &Ray, rec: &HitRecord, smooth: bool) -> LocalFrame {
        let geometry = &self.geometry;
        match shape {
            Shape::Plane(id) => self.planes[id.index()].frame(ray, rec, geometry, smooth),
            Shape::Sphere(id) => self.spheres[id.index()].frame(ray, rec, geometry, smooth),
            Shape::Triangle(id) => id.frame(ray, rec, geometry, smooth),
            Shape::Terrain(id) => self.terrains[id.index()].frame(ray, rec, geometry, smooth),
            Shape::Mesh(id) => self.meshes[id.index()].frame(ray, rec, geometry, smooth),
        }
    }

    /// Nearest primitive hit with `t` in `(EPSILON, t_max)`.
    ///
    /// Each primitive is tested against the ray mapped into its object space;
    /// the mapping keeps `t` unchanged, so distances compare across primitives.
    fn nearest(&self, ray: &Ray, t_max: f32, any_hit: bool) -> Option<(PrimitiveId, Ray, HitRecord)> {
        let mut best = None;
        let mut closest = t_max;
        for (index, primitive) in self.primitives.iter().enumerate() {
            let local = match primitive.transform {
                Some(t) => self.transforms[t.index()].ray_to_object(ray),
                None => *ray,
            };
            if let Some(rec) = self.shape_hit(primitive.shape, &local, Interval::new(EPSILON, closest), any_hit) {
                closest = rec.t;
                best = Some((PrimitiveId(index as u32), local, rec));
                if any_hit {
                    break;
                }
            }
        }
        best
    }

    /// Intersect a ray with every primitive.
    ///
    /// `Query::AnyHit` stops at the first hit and fills only distance,
    /// primitive, shape and point. A miss has infinite distance and no
    /// primitive.
    pub fn intersect(&self, ray: &Ray, query: Query, options: ShadingOptions) -> Intersection {
        let any_hit = query == Query::AnyHit;
        let Some((id, local, rec)) = self.nearest(ray, f32::INFINITY, any_hit) else {
            return Intersection::miss();
        };
        let primitive = self.primitives[id.index()];
        let point = ray.at(rec.t);

        if any_hit {
            return Intersection {
                distance: rec.t,
                primitive: Some(id),
                shape: Some(primitive.shape),
                point,
                ..Intersection::miss()
            };
        }

        let frame = self.shape_frame(primitive.shape, &local, &rec, options.smooth);
        let (mut geometric_normal, mut normal, tangent, triangle) = match primitive.transform {
            Some(t) => {
                let xf = &self.transforms[t.index()];
                (
                    xf.normal_to_world(frame.geometric_normal),
                    xf.normal_to_world(frame.normal),
                    xf.vector_to_world(frame.tangent).normalize_or_zero(),
                    frame.triangle.map(|c| c.map(|p| xf.point_to_world(p))),
                )
            }
            None => (frame.geometric_normal, frame.normal, frame.tangent, frame.triangle),
        };
        if normal == Vec3::ZERO {
            normal = geometric_normal;
        }

        let d = ray.direction.normalize_or_zero();
        let front_face = geometric_normal.dot(d) < 0.0;
        if !front_face {
            geometric_normal = -geometric_normal;
            normal = -normal;
        }

        let mut hit = Intersection {
            distance: rec.t,
            primitive: Some(id),
            shape: Some(primitive.shape),
            point,
            geometric_normal,
            normal,
            tangent,
            basis: Onb::default(),
            uv: frame.uv,
            front_face,
            triangle,
        };

        if options.normal_mapping {
            if let Some(surface) = self.surface(primitive.surface) {
                self.perturb_normal(&mut hit, surface);
            }
        }

        // Interpolated or perturbed normals may still face along the ray
        let facing = hit.normal.dot(d);
        if facing > 0.0 {
            hit.normal = (hit.normal - 2.0 * facing * d).normalize_or_zero();
        }
        hit.basis = Onb::from_w_tangent(hit.normal, hit.tangent);
        hit
    }

    /// True when anything blocks the ray before parameter `max_distance`.
    pub fn occluded(&self, ray: &Ray, max_distance: f32) -> bool {
        self.nearest(ray, max_distance, true).is_some()
    }

    /// Tangent-space normal map followed by fractal-noise perturbation.
    fn perturb_normal(&self, hit: &mut Intersection, surface: &Surface) {
        if let Some(map) = surface.normal_map {
            let frame = Onb::from_w_tangent(hit.normal, hit.tangent);
            let texel = texture::evaluate(&self.textures, map, hit, &self.noise);
            let mapped = frame.to_world(texel * 2.0 - Vec3::ONE).normalize_or_zero();
            if mapped != Vec3::ZERO {
                hit.normal = mapped;
            }
        }

        if surface.noise_amount > 0.0 && surface.noise_scale > 0.0 {
            let offset = self
                .noise
                .fbm3_vector(hit.point * surface.noise_scale, PERTURB_OCTAVES, 0.5);
            let perturbed = (hit.normal + offset * surface.noise_amount).normalize_or_zero();
            if perturbed != Vec3::ZERO {
                hit.normal = perturbed;
            }
        }
    }
}
