//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection. Corners,
//! normals and UVs are references into the shared [`GeometryPool`].

use crate::hittable::{HitRecord, Hittable, LocalFrame};
use crate::scene::{GeometryPool, TriangleId};
use prism_math::{Interval, Ray, Vec2, Vec3};

/// Determinants below this mean the ray is parallel or the triangle degenerate.
const DET_EPSILON: f32 = 1e-8;

/// Triangle stored as references into the geometry pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [u32; 3],
    pub normals: Option<[u32; 3]>,
    pub uvs: Option<[u32; 3]>,
}

impl Triangle {
    pub fn new(vertices: [u32; 3]) -> Self {
        Self {
            vertices,
            normals: None,
            uvs: None,
        }
    }

    pub fn with_normals(mut self, normals: [u32; 3]) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uvs(mut self, uvs: [u32; 3]) -> Self {
        self.uvs = Some(uvs);
        self
    }
}

/// Möller-Trumbore test against one triangle of the pool.
///
/// Returns the hit with barycentric (u, v) filled in; both winding orders hit.
pub fn intersect(id: TriangleId, ray: &Ray, ray_t: Interval, geometry: &GeometryPool) -> Option<HitRecord> {
    let [v0, v1, v2] = geometry.corners(id);
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < DET_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray_t.surrounds(t) {
        return None;
    }

    Some(HitRecord {
        t,
        triangle: Some(id),
        barycentric: Vec2::new(u, v),
    })
}

/// Shading frame for a triangle hit produced by [`intersect`].
pub fn frame(id: TriangleId, ray: &Ray, rec: &HitRecord, geometry: &GeometryPool, smooth: bool) -> LocalFrame {
    let tri = geometry.triangle(id);
    let corners = geometry.corners(id);
    let [v0, v1, v2] = corners;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let (u, v) = (rec.barycentric.x, rec.barycentric.y);
    let w = 1.0 - u - v;

    let mut face = edge1.cross(edge2).normalize_or_zero();
    let mut normal = face;
    if let Some([na, nb, nc]) = tri.normals.map(|n| n.map(|i| geometry.normal(i))) {
        // Vertex normals decide which side is outward, not the winding
        if face.dot(na) < 0.0 {
            face = -face;
        }
        normal = face;
        if smooth {
            let interpolated = (w * na + u * nb + v * nc).normalize_or_zero();
            if interpolated != Vec3::ZERO {
                normal = interpolated;
            }
        }
    }

    let (uv, tangent) = match tri.uvs.map(|t| t.map(|i| geometry.uv(i))) {
        Some([ta, tb, tc]) => (w * ta + u * tb + v * tc, uv_tangent(edge1, edge2, tb - ta, tc - ta)),
        None => (Vec2::new(u, v), edge1.normalize_or_zero()),
    };

    LocalFrame {
        point: ray.at(rec.t),
        geometric_normal: face,
        normal,
        tangent,
        uv,
        triangle: Some(corners),
    }
}

/// dP/du from the edge vectors and their UV deltas, falling back to the first edge.
fn uv_tangent(edge1: Vec3, edge2: Vec3, duv1: Vec2, duv2: Vec2) -> Vec3 {
    let det = duv1.x * duv2.y - duv2.x * duv1.y;
    if det.abs() < DET_EPSILON {
        return edge1.normalize_or_zero();
    }
    let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;
    let tangent = tangent.normalize_or_zero();
    if tangent == Vec3::ZERO {
        edge1.normalize_or_zero()
    } else {
        tangent
    }
}

impl Hittable for TriangleId {
    fn hit(&self, ray: &Ray, ray_t: Interval, geometry: &GeometryPool) -> Option<HitRecord> {
        intersect(*self, ray, ray_t, geometry)
    }

    fn frame(&self, ray: &Ray, rec: &HitRecord, geometry: &GeometryPool, smooth: bool) -> LocalFrame {
        frame(*self, ray, rec, geometry, smooth)
    }
}
