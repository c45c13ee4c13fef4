// Object <-> world transform pairs for transformable primitives.
//
// Both directions are stored so neither side ever inverts a matrix per ray.

use crate::{Mat3, Mat4, Ray, Vec3};

/// Mutually inverse object-to-world / world-to-object affine transforms.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformPair {
    pub object_to_world: Mat4,
    pub world_to_object: Mat4,
}

impl TransformPair {
    pub const IDENTITY: TransformPair = TransformPair {
        object_to_world: Mat4::IDENTITY,
        world_to_object: Mat4::IDENTITY,
    };

    /// Build the pair from an object-to-world matrix.
    ///
    /// Returns `None` when the matrix is not invertible.
    pub fn from_object_to_world(object_to_world: Mat4) -> Option<Self> {
        let det = object_to_world.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        Some(Self {
            object_to_world,
            world_to_object: object_to_world.inverse(),
        })
    }

    /// Transform a world ray into object space.
    ///
    /// The direction is not renormalized, so hit distances are identical in
    /// both spaces.
    #[inline]
    pub fn ray_to_object(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.world_to_object.transform_point3(ray.origin),
            self.world_to_object.transform_vector3(ray.direction),
        )
    }

    #[inline]
    pub fn point_to_world(&self, p: Vec3) -> Vec3 {
        self.object_to_world.transform_point3(p)
    }

    /// Transform a direction (w=0), e.g. a tangent.
    #[inline]
    pub fn vector_to_world(&self, v: Vec3) -> Vec3 {
        self.object_to_world.transform_vector3(v)
    }

    /// Transform a surface normal.
    ///
    /// Normals go through the transpose of the world-to-object linear part,
    /// which is the inverse transpose of object-to-world without a new inversion.
    #[inline]
    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        (Mat3::from_mat4(self.world_to_object).transpose() * n).normalize_or_zero()
    }
}

impl Default for TransformPair {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_roundtrip() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 0.5),
            glam::Quat::from_rotation_y(0.7),
            Vec3::new(10.0, -3.0, 4.0),
        );
        let pair = TransformPair::from_object_to_world(m).unwrap();
        let p = Vec3::new(1.0, 2.0, 3.0);
        let back = pair.world_to_object.transform_point3(pair.point_to_world(p));
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn test_singular_rejected() {
        assert!(TransformPair::from_object_to_world(Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0))).is_none());
    }

    #[test]
    fn test_ray_distance_preserved() {
        let pair = TransformPair::from_object_to_world(Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            glam::Quat::IDENTITY,
            Vec3::new(0.0, 0.0, -10.0),
        ))
        .unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let local = pair.ray_to_object(&ray);
        let t = 7.0;
        let world_point = ray.at(t);
        let local_point = local.at(t);
        assert!((pair.point_to_world(local_point) - world_point).length() < 1e-4);
    }

    #[test]
    fn test_normal_under_nonuniform_scale() {
        // Plane x + y = 0 scaled along x: the normal must stay perpendicular
        let pair = TransformPair::from_object_to_world(Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0))).unwrap();
        let n_obj = Vec3::new(1.0, 1.0, 0.0).normalize();
        let tangent_obj = Vec3::new(1.0, -1.0, 0.0);
        let n = pair.normal_to_world(n_obj);
        let t = pair.vector_to_world(tangent_obj);
        assert!(n.dot(t).abs() < 1e-5);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }
}
