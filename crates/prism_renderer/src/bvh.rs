//! Flattened Bounding Volume Hierarchy (BVH) for triangle meshes.
//!
//! Nodes are stored in preorder in the geometry pool. Every node carries a
//! `miss` index pointing past its subtree, so traversal is a single forward
//! loop with no stack: on a box miss (or after a leaf) jump to `miss`, on a
//! box hit of an inner node continue with its first child.

use crate::hittable::{HitRecord, Hittable, LocalFrame};
use crate::scene::{GeometryPool, TriangleId};
use crate::triangle;
use prism_math::{Aabb, Interval, Ray, Vec3};

/// Maximum triangles per leaf node before splitting.
pub const LEAF_MAX_SIZE: usize = 4;

/// Padding applied to node boxes so flat meshes keep a non-zero extent.
const BOX_PADDING: f32 = 1e-4;

/// What a node holds besides its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhKind {
    /// Inner node; `child` is the index of its first child.
    Inner { child: u32 },
    /// Leaf with `count` triangle references starting at `first`.
    Leaf { first: u32, count: u32 },
}

/// One node of the flattened hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvhNode {
    /// Point-pool references of the box min and max corners
    pub bounds: [u32; 2],
    /// Index of the next node to visit when this subtree is skipped
    pub miss: u32,
    pub kind: BvhKind,
}

/// A triangle mesh: the node range `[first_node, end_node)` of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    pub first_node: u32,
    pub end_node: u32,
}

impl Mesh {
    /// Build a hierarchy over `triangles` and append it to the pool.
    ///
    /// Median split on the longest centroid axis, at most [`LEAF_MAX_SIZE`]
    /// triangles per leaf. Returns `None` for an empty triangle list.
    pub fn build(geometry: &mut GeometryPool, triangles: &[TriangleId]) -> Option<Mesh> {
        if triangles.is_empty() {
            return None;
        }
        let first_node = geometry.bvh_nodes.len() as u32;
        let mut items: Vec<(TriangleId, Aabb)> = triangles
            .iter()
            .map(|&id| {
                let [a, b, c] = geometry.corners(id);
                (id, Aabb::from_points(a, b).include(c))
            })
            .collect();
        emit(geometry, &mut items);
        Some(Mesh {
            first_node,
            end_node: geometry.bvh_nodes.len() as u32,
        })
    }

    pub fn node_count(&self) -> usize {
        (self.end_node - self.first_node) as usize
    }

    fn traverse(&self, ray: &Ray, ray_t: Interval, geometry: &GeometryPool, any_hit: bool) -> Option<HitRecord> {
        let inv_dir = ray.direction.recip();
        let mut closest: Option<HitRecord> = None;
        let mut best = ray_t.max;

        let mut index = self.first_node;
        while index < self.end_node {
            let node = geometry.bvh_nodes[index as usize];
            let bbox = Aabb::from_points(geometry.point(node.bounds[0]), geometry.point(node.bounds[1]));
            if !bbox.hit(ray, inv_dir, ray_t.with_max(best)) {
                index = node.miss;
                continue;
            }

            match node.kind {
                BvhKind::Inner { child } => index = child,
                BvhKind::Leaf { first, count } => {
                    let refs = &geometry.bvh_refs[first as usize..(first + count) as usize];
                    for &id in refs {
                        if let Some(rec) = triangle::intersect(id, ray, ray_t.with_max(best), geometry) {
                            if any_hit {
                                return Some(rec);
                            }
                            best = rec.t;
                            closest = Some(rec);
                        }
                    }
                    index = node.miss;
                }
            }
        }
        closest
    }

    /// Stops at the first triangle hit in `ray_t`.
    pub fn any_hit(&self, ray: &Ray, ray_t: Interval, geometry: &GeometryPool) -> Option<HitRecord> {
        self.traverse(ray, ray_t, geometry, true)
    }
}

/// Append the subtree over `items` in preorder; returns its root index.
fn emit(geometry: &mut GeometryPool, items: &mut [(TriangleId, Aabb)]) -> u32 {
    let bounds = items
        .iter()
        .fold(Aabb::EMPTY, |acc, (_, b)| Aabb::surrounding(&acc, b));
    let pad = Vec3::splat(BOX_PADDING);
    let min = geometry.push_point(bounds.min() - pad);
    let max = geometry.push_point(bounds.max() + pad);

    let index = geometry.bvh_nodes.len() as u32;
    geometry.bvh_nodes.push(BvhNode {
        bounds: [min, max],
        miss: index + 1,
        kind: BvhKind::Leaf { first: 0, count: 0 },
    });

    let kind = if items.len() <= LEAF_MAX_SIZE {
        let first = geometry.bvh_refs.len() as u32;
        geometry.bvh_refs.extend(items.iter().map(|(id, _)| *id));
        BvhKind::Leaf {
            first,
            count: items.len() as u32,
        }
    } else {
        let centroid_bounds = items.iter().fold(Aabb::EMPTY, |acc, (_, b)| acc.include(b.centroid()));
        let axis = centroid_bounds.longest_axis();
        items.sort_unstable_by(|(_, a), (_, b)| {
            a.centroid()[axis]
                .partial_cmp(&b.centroid()[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = items.len() / 2;
        let (left, right) = items.split_at_mut(mid);
        let child = emit(geometry, left);
        emit(geometry, right);
        BvhKind::Inner { child }
    };

    let miss = geometry.bvh_nodes.len() as u32;
    let node = &mut geometry.bvh_nodes[index as usize];
    node.kind = kind;
    node.miss = miss;
    index
}

impl Hittable for Mesh {
    fn hit(&self, ray: &Ray, ray_t: Interval, geometry: &GeometryPool) -> Option<HitRecord> {
        self.traverse(ray, ray_t, geometry, false)
    }

    fn frame(&self, ray: &Ray, rec: &HitRecord, geometry: &GeometryPool, smooth: bool) -> LocalFrame {
        match rec.triangle {
            Some(id) => triangle::frame(id, ray, rec, geometry, smooth),
            None => LocalFrame {
                point: ray.at(rec.t),
                geometric_normal: Vec3::Y,
                normal: Vec3::Y,
                tangent: Vec3::ZERO,
                uv: prism_math::Vec2::ZERO,
                triangle: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: Interval = Interval::new(1e-4, f32::INFINITY);

    /// Row of unit quads along X at z = 0, two triangles each.
    fn strip(pool: &mut GeometryPool, quads: usize) -> Vec<TriangleId> {
        let mut ids = Vec::new();
        for i in 0..quads {
            let x = i as f32;
            let (a, b, c, d) = (
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x + 1.0, 0.0, 0.0),
                Vec3::new(x + 1.0, 1.0, 0.0),
                Vec3::new(x, 1.0, 0.0),
            );
            ids.push(pool.push_triangle([a, b, c], None, None));
            ids.push(pool.push_triangle([a, c, d], None, None));
        }
        ids
    }

    #[test]
    fn test_bvh_empty() {
        let mut pool = GeometryPool::default();
        assert!(Mesh::build(&mut pool, &[]).is_none());
    }

    #[test]
    fn test_bvh_single_leaf() {
        let mut pool = GeometryPool::default();
        let ids = strip(&mut pool, 1);
        let mesh = Mesh::build(&mut pool, &ids).unwrap();
        assert_eq!(mesh.node_count(), 1);
        assert!(matches!(pool.bvh_nodes[0].kind, BvhKind::Leaf { count: 2, .. }));
        assert_eq!(pool.bvh_nodes[0].miss, 1);
    }

    #[test]
    fn test_bvh_miss_links_skip_subtrees() {
        let mut pool = GeometryPool::default();
        let ids = strip(&mut pool, 16);
        let mesh = Mesh::build(&mut pool, &ids).unwrap();
        assert!(mesh.node_count() > 1);

        for (i, node) in pool.bvh_nodes.iter().enumerate() {
            assert!(node.miss as usize > i);
            assert!(node.miss <= mesh.end_node);
            if let BvhKind::Inner { child } = node.kind {
                assert_eq!(child as usize, i + 1);
            }
        }
        // Root skips the whole tree
        assert_eq!(pool.bvh_nodes[0].miss, mesh.end_node);

        let leaf_refs: usize = pool
            .bvh_nodes
            .iter()
            .map(|n| match n.kind {
                BvhKind::Leaf { count, .. } => count as usize,
                BvhKind::Inner { .. } => 0,
            })
            .sum();
        assert_eq!(leaf_refs, ids.len());
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mut pool = GeometryPool::default();
        let ids = strip(&mut pool, 16);
        let mesh = Mesh::build(&mut pool, &ids).unwrap();

        for i in 0..64 {
            let x = i as f32 * 0.27 - 1.0;
            let ray = Ray::new(Vec3::new(x, 0.4, 2.0), Vec3::new(0.05, 0.02, -1.0));
            let brute = ids
                .iter()
                .filter_map(|&id| triangle::intersect(id, &ray, OPEN, &pool))
                .map(|r| r.t)
                .fold(f32::INFINITY, f32::min);
            let bvh = mesh.hit(&ray, OPEN, &pool).map_or(f32::INFINITY, |r| r.t);
            assert_eq!(brute, bvh);
            assert_eq!(mesh.any_hit(&ray, OPEN, &pool).is_some(), brute.is_finite());
        }
    }

    #[test]
    fn test_bvh_frame_uses_hit_triangle() {
        let mut pool = GeometryPool::default();
        let ids = strip(&mut pool, 4);
        let mesh = Mesh::build(&mut pool, &ids).unwrap();
        let ray = Ray::new(Vec3::new(2.5, 0.5, 1.0), -Vec3::Z);
        let rec = mesh.hit(&ray, OPEN, &pool).unwrap();
        let frame = mesh.frame(&ray, &rec, &pool, true);
        assert!((frame.point - Vec3::new(2.5, 0.5, 0.0)).length() < 1e-5);
        assert!((frame.geometric_normal.z.abs() - 1.0).abs() < 1e-5);
        assert!(frame.triangle.is_some());
    }
}
