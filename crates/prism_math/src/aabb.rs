use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow the box to include a point.
    pub fn include(&self, p: Vec3) -> Self {
        Aabb::surrounding(self, &Aabb::from_points(p, p))
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Entry and exit distances of the ray through the three slabs.
    ///
    /// `inv_dir` is the componentwise reciprocal of the ray direction; zero
    /// components produce infinities which the min/max arithmetic absorbs.
    #[inline]
    pub fn slab(&self, ray: &Ray, inv_dir: Vec3) -> (f32, f32) {
        let t0 = (self.min() - ray.origin) * inv_dir;
        let t1 = (self.max() - ray.origin) * inv_dir;
        let near = t0.min(t1);
        let far = t0.max(t1);
        (near.max_element(), far.min_element())
    }

    /// Test if a ray can hit anything inside this box closer than `ray_t.max`.
    ///
    /// The box is rejected when it lies behind the ray, when the slabs do not
    /// overlap, or when it starts beyond the current best distance.
    pub fn hit(&self, ray: &Ray, inv_dir: Vec3, ray_t: Interval) -> bool {
        let (entry, exit) = self.slab(ray, inv_dir);
        !(exit < 0.0 || entry > exit || entry > ray_t.max)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
