//! Surface scattering for the five material kinds.

use crate::hittable::{offset_by, offset_origin, Intersection};
use crate::sampling::{cosine_hemisphere, gen_f32, power_cosine, reflect};
use prism_math::{Ray, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Reflectance at normal incidence of the clear-coat layer (glass over air).
pub const CLEAR_COAT_REFLECTANCE: f32 = 0.04;

/// Base origin lift for rays reflected off glass or a clear coat.
const REFLECT_OFFSET: f32 = 1e-3;

/// Base origin lift for rays transmitted through glass.
const TRANSMIT_OFFSET: f32 = 1e-5;

/// Exponent used when a lobe is sampled without a material-specific one.
pub const DEFAULT_PHONG_EXPONENT: f32 = 32.0;

/// Material tag of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Ideal diffuse
    Lambertian,
    /// Power-cosine lobe around the mirror direction
    Phong { exponent: f32 },
    /// Perfect mirror
    Reflection,
    /// Smooth dielectric with the given refractive index
    Glass { ior: f32 },
    /// Stochastic Fresnel mirror coat over a Lambertian substrate
    ClearCoat,
}

/// Outcome of sampling a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scatter {
    pub ray: Ray,
    /// Multiplier for the path throughput
    pub attenuation: Color,
    /// True when the new direction came from a delta (mirror/refraction) lobe
    pub specular: bool,
}

impl Material {
    /// Schlick's base term `((n - 1) / (n + 1))^2`.
    pub fn reflectance_at_normal(&self) -> f32 {
        match *self {
            Material::Glass { ior } => ((ior - 1.0) / (ior + 1.0)).powi(2),
            Material::ClearCoat => CLEAR_COAT_REFLECTANCE,
            _ => 0.0,
        }
    }

    /// Whether the path tracer adds the sampled sun term at this surface.
    pub fn receives_sun(&self) -> bool {
        matches!(self, Material::Lambertian | Material::Phong { .. } | Material::ClearCoat)
    }

    pub fn is_mirror(&self) -> bool {
        matches!(self, Material::Reflection)
    }

    /// Phong exponent for local shading.
    pub fn shininess(&self) -> f32 {
        match *self {
            Material::Phong { exponent } => exponent,
            _ => DEFAULT_PHONG_EXPONENT,
        }
    }

    /// Next material in the cycling order, keeping parameters where possible.
    pub fn next(&self) -> Material {
        match self {
            Material::Lambertian => Material::Phong {
                exponent: DEFAULT_PHONG_EXPONENT,
            },
            Material::Phong { .. } => Material::Reflection,
            Material::Reflection => Material::Glass { ior: 1.5 },
            Material::Glass { .. } => Material::ClearCoat,
            Material::ClearCoat => Material::Lambertian,
        }
    }

    /// Sample the next path segment.
    ///
    /// `direction` is the incoming ray direction and `hit.normal` the shading
    /// normal already oriented against it.
    pub fn scatter(&self, direction: Vec3, hit: &Intersection, albedo: Color, rng: &mut dyn RngCore) -> Scatter {
        let d = direction.normalize_or_zero();
        let n = hit.normal;
        let origin = offset_origin(hit.point, n);
        match *self {
            Material::Lambertian => Scatter {
                ray: Ray::new(origin, cosine_hemisphere(n, rng)),
                attenuation: albedo,
                specular: false,
            },
            Material::Phong { exponent } => {
                let mut dir = power_cosine(reflect(d, n), exponent, rng);
                // Lobe samples below the surface are mirrored back up
                let below = dir.dot(n);
                if below < 0.0 {
                    dir -= 2.0 * below * n;
                }
                Scatter {
                    ray: Ray::new(origin, dir),
                    attenuation: albedo,
                    specular: false,
                }
            }
            Material::Reflection => Scatter {
                ray: Ray::new(origin, reflect(d, n)),
                attenuation: albedo,
                specular: true,
            },
            Material::Glass { ior } => scatter_glass(d, hit, albedo, ior, self.reflectance_at_normal(), rng),
            Material::ClearCoat => {
                let re = schlick(CLEAR_COAT_REFLECTANCE, -d.dot(n));
                let p = 0.25 + 0.5 * re;
                if gen_f32(rng) < p {
                    Scatter {
                        ray: Ray::new(offset_by(hit.point, n, REFLECT_OFFSET), reflect(d, n)),
                        attenuation: Color::splat(re / p),
                        specular: true,
                    }
                } else {
                    Scatter {
                        ray: Ray::new(origin, cosine_hemisphere(n, rng)),
                        attenuation: albedo * ((1.0 - re) / (1.0 - p)),
                        specular: false,
                    }
                }
            }
        }
    }
}

/// Schlick's approximation for reflectance given the base term and cos(theta).
#[inline]
pub fn schlick(r0: f32, cosine: f32) -> f32 {
    let c = (1.0 - cosine.clamp(0.0, 1.0)).max(0.0);
    r0 + (1.0 - r0) * c.powi(5)
}

fn scatter_glass(d: Vec3, hit: &Intersection, albedo: Color, ior: f32, r0: f32, rng: &mut dyn RngCore) -> Scatter {
    let n = hit.normal;
    let into = hit.front_face;
    let nnt = if into { 1.0 / ior } else { ior };
    let ddn = d.dot(n);
    let reflected = Ray::new(offset_by(hit.point, n, REFLECT_OFFSET), reflect(d, n));

    let cos2t = 1.0 - nnt * nnt * (1.0 - ddn * ddn);
    if cos2t < 0.0 {
        // Total internal reflection
        return Scatter {
            ray: reflected,
            attenuation: albedo,
            specular: true,
        };
    }

    let tdir = (d * nnt - n * (ddn * nnt + cos2t.sqrt())).normalize_or_zero();
    let cosine = if into { -ddn } else { -tdir.dot(n) };
    let re = schlick(r0, cosine);
    let tr = 1.0 - re;
    let p = 0.25 + 0.5 * re;

    if gen_f32(rng) < p {
        Scatter {
            ray: reflected,
            attenuation: albedo * (re / p),
            specular: true,
        }
    } else {
        Scatter {
            ray: Ray::new(offset_by(hit.point, -n, TRANSMIT_OFFSET), tdir),
            attenuation: albedo * (tr / (1.0 - p)),
            specular: true,
        }
    }
}
