use crate::Vec3;

/// Orthonormal basis (U, V, W) with W as the "up" axis of the local frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// Build a frame around a unit vector `w`.
    ///
    /// The helper axis is swapped from X to Y when `w` is close to X so the
    /// cross product never degenerates.
    pub fn from_w(w: Vec3) -> Self {
        let helper = if w.x.abs() > 0.1 { Vec3::Y } else { Vec3::X };
        let u = helper.cross(w).normalize();
        let v = w.cross(u);
        Self { u, v, w }
    }

    /// Build a frame around `w` with U as close as possible to `tangent`.
    ///
    /// Falls back to [`Onb::from_w`] when the tangent is (nearly) parallel to `w`.
    pub fn from_w_tangent(w: Vec3, tangent: Vec3) -> Self {
        let u = tangent - w * tangent.dot(w);
        if u.length_squared() < 1e-12 {
            return Self::from_w(w);
        }
        let u = u.normalize();
        Self {
            u,
            v: w.cross(u),
            w,
        }
    }

    /// Map local coordinates (x along U, y along V, z along W) to world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.u * local.x + self.v * local.y + self.w * local.z
    }

    /// Express a world vector in this frame.
    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        Vec3::new(world.dot(self.u), world.dot(self.v), world.dot(self.w))
    }
}

impl Default for Onb {
    fn default() -> Self {
        Self {
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
        }
    }
}
