//! Prism Renderer - per-pixel ray and path tracing kernel.
//!
//! This crate provides:
//!
//! - **Scene arena**: typed-index tables of primitives, surfaces, textures,
//!   transforms and shared geometry, assembled and validated by `SceneBuilder`
//! - **Intersection engine**: planes, spheres, triangles, BVH meshes and
//!   procedural terrain, with shading-frame reconstruction
//! - **Integrators**: path tracer, ray caster, Whitted ray tracer, terrain
//!   ray marcher and ambient occlusion
//! - **Frame driver**: progressive accumulation, reset policy, tone mapping
//!   and BGRA output over an interchangeable scheduler
//!
//! # Example
//!
//! ```ignore
//! use prism_renderer::{Camera, Material, RenderConfig, Renderer, Scene, Sphere, Surface, Texture, Vec3};
//!
//! let mut builder = Scene::builder();
//! let albedo = builder.add_texture(Texture::constant(0.8, 0.3, 0.2));
//! let surface = builder.add_surface(Surface::new(Material::Lambertian, albedo));
//! let sphere = builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0));
//! builder.add_primitive(sphere, surface);
//! let scene = builder.build()?;
//!
//! let mut renderer = Renderer::new(Camera::new(), RenderConfig::default())?;
//! let bgra = renderer.render_frame(&scene);
//! ```

pub mod accumulator;
pub mod bvh;
pub mod camera;
pub mod config;
pub mod display;
pub mod fractal;
pub mod hittable;
pub mod integrators;
pub mod material;
pub mod plane;
pub mod renderer;
pub mod sampling;
pub mod scene;
pub mod scheduler;
pub mod sky;
pub mod sphere;
pub mod terrain;
pub mod texture;
pub mod triangle;

mod intersect;

// Re-export commonly used types
pub use accumulator::{AccumCell, Accumulator};
pub use bvh::{BvhNode, Mesh};
pub use camera::{Camera, Lens};
pub use config::{ConfigError, RenderConfig, RenderMode, ResetKind, ShadingMode, ToneMapping};
pub use display::{display_pixel, tone_map, Bgra8, DisplaySettings};
pub use fractal::Noise;
pub use hittable::{Hittable, Intersection, Query, ShadingOptions, EPSILON};
pub use integrators::{shade_pixel, PixelSample};
pub use material::{Color, Material, Scatter};
pub use plane::Plane;
pub use renderer::{RenderContext, Renderer};
pub use scene::{
    GeometryPool, MeshData, MeshId, PlaneId, Primitive, PrimitiveId, Scene, SceneBuilder, SceneError, SceneResult,
    Shape, SphereId, Surface, SurfaceId, TerrainId, TextureId, TransformId, TriangleId,
};
pub use scheduler::{Scheduler, SerialScheduler, ThreadPoolScheduler};
pub use sky::Sky;
pub use sphere::Sphere;
pub use terrain::Terrain;
pub use texture::{ImageTexture, Texture};
pub use triangle::Triangle;

/// Re-export math types from prism_math
pub use prism_math::{Aabb, Interval, Mat4, Onb, Ray, TransformPair, Vec2, Vec3};
