//! Scene arena.
//!
//! Every entity lives in a contiguous table and is referenced by a typed
//! `u32` index. A [`SceneBuilder`] assembles the tables and checks every
//! reference once, so the per-pixel code can index without validation.

use crate::bvh::{BvhNode, Mesh};
use crate::fractal::Noise;
use crate::material::Material;
use crate::plane::Plane;
use crate::sphere::Sphere;
use crate::terrain::Terrain;
use crate::texture::Texture;
use crate::triangle::Triangle;
use prism_math::{Mat4, TransformPair, Vec2, Vec3};
use thiserror::Error;

macro_rules! typed_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl $name {
                #[inline]
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

typed_id! {
    /// Index into the primitive table.
    PrimitiveId,
    /// Index into the surface table.
    SurfaceId,
    /// Index into the texture table.
    TextureId,
    /// Index into the transform table.
    TransformId,
    PlaneId,
    SphereId,
    /// Index into the geometry pool's triangle table.
    TriangleId,
    TerrainId,
    MeshId,
}

/// Errors raised while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("surface {surface} references missing texture {texture}")]
    MissingTexture { surface: u32, texture: u32 },

    #[error("blend texture {blend} references missing texture {operand}")]
    MissingBlendOperand { blend: u32, operand: u32 },

    #[error("blend texture {blend} uses blend texture {operand} as an operand")]
    NestedBlend { blend: u32, operand: u32 },

    #[error("image texture {texture} has {actual} pixels, expected {expected}")]
    ImageSizeMismatch { texture: u32, expected: usize, actual: usize },

    #[error("primitive {primitive} references missing surface {surface}")]
    MissingSurface { primitive: u32, surface: u32 },

    #[error("primitive {primitive} references a missing {shape} shape")]
    MissingShape { primitive: u32, shape: &'static str },

    #[error("primitive {primitive} references missing transform {transform}")]
    MissingTransform { primitive: u32, transform: u32 },

    #[error("transform is not invertible")]
    SingularTransform,

    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("mesh index {index} is out of range for {count} {attribute}")]
    IndexOutOfRange { attribute: &'static str, index: u32, count: usize },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Shared point, normal and UV pools plus triangle and BVH tables.
#[derive(Debug, Clone, Default)]
pub struct GeometryPool {
    pub(crate) points: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) uvs: Vec<Vec2>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) bvh_nodes: Vec<BvhNode>,
    pub(crate) bvh_refs: Vec<TriangleId>,
}

impl GeometryPool {
    #[inline]
    pub fn point(&self, index: u32) -> Vec3 {
        self.points[index as usize]
    }

    #[inline]
    pub fn normal(&self, index: u32) -> Vec3 {
        self.normals[index as usize]
    }

    #[inline]
    pub fn uv(&self, index: u32) -> Vec2 {
        self.uvs[index as usize]
    }

    #[inline]
    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.index()]
    }

    /// World (or object) positions of a triangle's corners.
    #[inline]
    pub fn corners(&self, id: TriangleId) -> [Vec3; 3] {
        self.triangle(id).vertices.map(|i| self.point(i))
    }

    pub fn push_point(&mut self, p: Vec3) -> u32 {
        self.points.push(p);
        (self.points.len() - 1) as u32
    }

    pub fn push_normal(&mut self, n: Vec3) -> u32 {
        self.normals.push(n.normalize_or_zero());
        (self.normals.len() - 1) as u32
    }

    pub fn push_uv(&mut self, uv: Vec2) -> u32 {
        self.uvs.push(uv);
        (self.uvs.len() - 1) as u32
    }

    /// Append a standalone triangle with its own vertices.
    pub fn push_triangle(&mut self, corners: [Vec3; 3], normals: Option<[Vec3; 3]>, uvs: Option<[Vec2; 3]>) -> TriangleId {
        let mut tri = Triangle::new(corners.map(|p| self.push_point(p)));
        if let Some(normals) = normals {
            tri = tri.with_normals(normals.map(|n| self.push_normal(n)));
        }
        if let Some(uvs) = uvs {
            tri = tri.with_uvs(uvs.map(|uv| self.push_uv(uv)));
        }
        self.triangles.push(tri);
        TriangleId((self.triangles.len() - 1) as u32)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// Shape tag plus its index in the type-specific table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Plane(PlaneId),
    Sphere(SphereId),
    Triangle(TriangleId),
    Terrain(TerrainId),
    Mesh(MeshId),
}

impl Shape {
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Plane(_) => "plane",
            Shape::Sphere(_) => "sphere",
            Shape::Triangle(_) => "triangle",
            Shape::Terrain(_) => "terrain",
            Shape::Mesh(_) => "mesh",
        }
    }
}

/// A shape placed in the scene with a surface and optional transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub shape: Shape,
    pub surface: SurfaceId,
    /// Object-to-world transform; `None` means the shape is in world space
    pub transform: Option<TransformId>,
}

/// Material tag, texture inputs and procedural normal perturbation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub material: Material,
    pub albedo: TextureId,
    pub emission: Option<TextureId>,
    /// Tangent-space normal map
    pub normal_map: Option<TextureId>,
    /// Strength of the fractal-noise normal perturbation
    pub noise_amount: f32,
    pub noise_scale: f32,
}

impl Surface {
    pub fn new(material: Material, albedo: TextureId) -> Self {
        Self {
            material,
            albedo,
            emission: None,
            normal_map: None,
            noise_amount: 0.0,
            noise_scale: 0.0,
        }
    }

    pub fn with_emission(mut self, emission: TextureId) -> Self {
        self.emission = Some(emission);
        self
    }

    pub fn with_normal_map(mut self, normal_map: TextureId) -> Self {
        self.normal_map = Some(normal_map);
        self
    }

    pub fn with_noise(mut self, amount: f32, scale: f32) -> Self {
        self.noise_amount = amount;
        self.noise_scale = scale;
        self
    }

    fn textures(&self) -> impl Iterator<Item = TextureId> {
        std::iter::once(self.albedo)
            .chain(self.emission)
            .chain(self.normal_map)
    }
}

/// Indexed triangle mesh in the layout external loaders produce.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    /// Three entries per triangle
    pub indices: Vec<u32>,
    /// Per-vertex normals, indexed like positions
    pub normals: Option<Vec<Vec3>>,
    /// Per-vertex UVs, indexed like positions
    pub uvs: Option<Vec<Vec2>>,
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self {
            positions,
            indices,
            normals,
            uvs: None,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn check_indices(&self) -> SceneResult<()> {
        let counts = [
            ("positions", Some(self.positions.len())),
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("uvs", self.uvs.as_ref().map(Vec::len)),
        ];
        for &index in &self.indices {
            for (attribute, count) in counts {
                if let Some(count) = count {
                    if index as usize >= count {
                        return Err(SceneError::IndexOutOfRange { attribute, index, count });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Compiled scene: immutable while a frame renders.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub(crate) primitives: Vec<Primitive>,
    pub(crate) surfaces: Vec<Surface>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) transforms: Vec<TransformPair>,
    pub(crate) planes: Vec<Plane>,
    pub(crate) spheres: Vec<Sphere>,
    pub(crate) terrains: Vec<Terrain>,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) geometry: GeometryPool,
    pub(crate) noise: Noise,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(id.index())
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.index())
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn geometry(&self) -> &GeometryPool {
        &self.geometry
    }

    pub fn noise(&self) -> &Noise {
        &self.noise
    }

    /// Terrain placed by the first terrain primitive, used by the ray marcher.
    pub fn terrain(&self) -> Option<&Terrain> {
        let (_, id) = self.placed_terrain()?;
        self.terrains.get(id.index())
    }

    /// Primitive that places the terrain returned by [`Scene::terrain`].
    pub fn terrain_primitive(&self) -> Option<PrimitiveId> {
        self.placed_terrain().map(|(primitive, _)| primitive)
    }

    fn placed_terrain(&self) -> Option<(PrimitiveId, TerrainId)> {
        self.primitives.iter().enumerate().find_map(|(index, p)| match p.shape {
            Shape::Terrain(id) => Some((PrimitiveId(index as u32), id)),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Advance a surface to the next material kind. Returns the new material.
    pub fn cycle_material(&mut self, id: SurfaceId) -> Option<Material> {
        let surface = self.surfaces.get_mut(id.index())?;
        surface.material = surface.material.next();
        log::info!("surface {} now uses {:?}", id.0, surface.material);
        Some(surface.material)
    }

    /// Surface of the primitive that was hit.
    pub fn surface_of(&self, id: PrimitiveId) -> Option<&Surface> {
        self.primitive(id).and_then(|p| self.surface(p.surface))
    }
}

/// Incrementally assembles a [`Scene`].
#[derive(Debug, Default)]
pub struct SceneBuilder {
    scene: Scene,
    seed: u32,
}

impl SceneBuilder {
    /// Seed for the noise used by textures and normal perturbation.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.scene.textures.push(texture);
        TextureId((self.scene.textures.len() - 1) as u32)
    }

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceId {
        self.scene.surfaces.push(surface);
        SurfaceId((self.scene.surfaces.len() - 1) as u32)
    }

    /// Add an object-to-world transform; its inverse is computed here.
    pub fn add_transform(&mut self, object_to_world: Mat4) -> SceneResult<TransformId> {
        let pair = TransformPair::from_object_to_world(object_to_world).ok_or(SceneError::SingularTransform)?;
        self.scene.transforms.push(pair);
        Ok(TransformId((self.scene.transforms.len() - 1) as u32))
    }

    pub fn add_plane(&mut self, plane: Plane) -> Shape {
        self.scene.planes.push(plane);
        Shape::Plane(PlaneId((self.scene.planes.len() - 1) as u32))
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> Shape {
        self.scene.spheres.push(sphere);
        Shape::Sphere(SphereId((self.scene.spheres.len() - 1) as u32))
    }

    pub fn add_terrain(&mut self, terrain: Terrain) -> Shape {
        self.scene.terrains.push(terrain);
        Shape::Terrain(TerrainId((self.scene.terrains.len() - 1) as u32))
    }

    pub fn add_triangle(&mut self, corners: [Vec3; 3], normals: Option<[Vec3; 3]>, uvs: Option<[Vec2; 3]>) -> Shape {
        Shape::Triangle(self.scene.geometry.push_triangle(corners, normals, uvs))
    }

    /// Copy a mesh into the geometry pool and build its hierarchy.
    pub fn add_mesh(&mut self, data: &MeshData) -> SceneResult<Shape> {
        if data.triangle_count() == 0 {
            return Err(SceneError::EmptyMesh);
        }
        data.check_indices()?;

        let pool = &mut self.scene.geometry;
        let point_base = pool.points.len() as u32;
        pool.points.extend_from_slice(&data.positions);
        let normal_base = pool.normals.len() as u32;
        if let Some(normals) = &data.normals {
            pool.normals.extend(normals.iter().map(|n| n.normalize_or_zero()));
        }
        let uv_base = pool.uvs.len() as u32;
        if let Some(uvs) = &data.uvs {
            pool.uvs.extend_from_slice(uvs);
        }

        let mut ids = Vec::with_capacity(data.triangle_count());
        for face in data.indices.chunks_exact(3) {
            let face = [face[0], face[1], face[2]];
            let mut tri = Triangle::new(face.map(|i| point_base + i));
            if data.normals.is_some() {
                tri = tri.with_normals(face.map(|i| normal_base + i));
            }
            if data.uvs.is_some() {
                tri = tri.with_uvs(face.map(|i| uv_base + i));
            }
            pool.triangles.push(tri);
            ids.push(TriangleId((pool.triangles.len() - 1) as u32));
        }

        let mesh = Mesh::build(pool, &ids).ok_or(SceneError::EmptyMesh)?;
        log::debug!("mesh: {} triangles, {} BVH nodes", ids.len(), mesh.node_count());
        self.scene.meshes.push(mesh);
        Ok(Shape::Mesh(MeshId((self.scene.meshes.len() - 1) as u32)))
    }

    pub fn add_primitive(&mut self, shape: Shape, surface: SurfaceId) -> PrimitiveId {
        self.push_primitive(Primitive {
            shape,
            surface,
            transform: None,
        })
    }

    pub fn add_transformed(&mut self, shape: Shape, surface: SurfaceId, transform: TransformId) -> PrimitiveId {
        self.push_primitive(Primitive {
            shape,
            surface,
            transform: Some(transform),
        })
    }

    fn push_primitive(&mut self, primitive: Primitive) -> PrimitiveId {
        self.scene.primitives.push(primitive);
        PrimitiveId((self.scene.primitives.len() - 1) as u32)
    }

    /// Validate every reference and hand out the finished scene.
    pub fn build(mut self) -> SceneResult<Scene> {
        self.validate()?;
        self.scene.noise = Noise::new(self.seed);
        let scene = self.scene;
        log::info!(
            "scene built: {} primitives, {} surfaces, {} textures, {} triangles",
            scene.primitives.len(),
            scene.surfaces.len(),
            scene.textures.len(),
            scene.geometry.triangle_count()
        );
        Ok(scene)
    }

    fn validate(&self) -> SceneResult<()> {
        let scene = &self.scene;
        let texture_count = scene.textures.len();

        for (index, texture) in scene.textures.iter().enumerate() {
            let blend = index as u32;
            match texture {
                Texture::Blend { a, b, .. } => {
                    for operand in [*a, *b] {
                        match scene.textures.get(operand.index()) {
                            None => return Err(SceneError::MissingBlendOperand { blend, operand: operand.0 }),
                            Some(t) if t.is_blend() => {
                                return Err(SceneError::NestedBlend { blend, operand: operand.0 })
                            }
                            Some(_) => {}
                        }
                    }
                }
                Texture::Image(image) => {
                    let expected = image.width as usize * image.height as usize;
                    if image.pixels.len() != expected {
                        return Err(SceneError::ImageSizeMismatch {
                            texture: blend,
                            expected,
                            actual: image.pixels.len(),
                        });
                    }
                }
                _ => {}
            }
        }

        for (index, surface) in scene.surfaces.iter().enumerate() {
            if let Some(missing) = surface.textures().find(|t| t.index() >= texture_count) {
                return Err(SceneError::MissingTexture {
                    surface: index as u32,
                    texture: missing.0,
                });
            }
        }

        for (index, primitive) in scene.primitives.iter().enumerate() {
            let id = index as u32;
            if primitive.surface.index() >= scene.surfaces.len() {
                return Err(SceneError::MissingSurface {
                    primitive: id,
                    surface: primitive.surface.0,
                });
            }
            let shape_exists = match primitive.shape {
                Shape::Plane(s) => s.index() < scene.planes.len(),
                Shape::Sphere(s) => s.index() < scene.spheres.len(),
                Shape::Triangle(s) => s.index() < scene.geometry.triangles.len(),
                Shape::Terrain(s) => s.index() < scene.terrains.len(),
                Shape::Mesh(s) => s.index() < scene.meshes.len(),
            };
            if !shape_exists {
                return Err(SceneError::MissingShape {
                    primitive: id,
                    shape: primitive.shape.type_name(),
                });
            }
            if let Some(transform) = primitive.transform {
                if transform.index() >= scene.transforms.len() {
                    return Err(SceneError::MissingTransform {
                        primitive: id,
                        transform: transform.0,
                    });
                }
            }
        }
        Ok(())
    }
}
