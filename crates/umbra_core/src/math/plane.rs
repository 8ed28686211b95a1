use glam::{Mat4, Vec3, Vec4};

/// A plane in the form `dot(normal, x) + d = 0` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// Builds the plane through `point` with the given normal.
    ///
    /// Returns `None` for a (near) zero-length normal.
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Option<Self> {
        let normal = normal.try_normalize()?;
        Some(Self {
            normal,
            d: -normal.dot(point),
        })
    }

    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    #[inline]
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }

    /// Orients the plane so that `viewer` lies on its positive side.
    #[must_use]
    pub fn facing(self, viewer: Vec3) -> Self {
        if self.signed_distance(viewer) < 0.0 {
            self.flipped()
        } else {
            self
        }
    }

    /// `p' = p - 2 (n·p + d) n`
    #[inline]
    #[must_use]
    pub fn reflect_point(&self, point: Vec3) -> Vec3 {
        point - self.normal * (2.0 * self.signed_distance(point))
    }

    /// `v' = v - 2 (n·v) n`
    #[inline]
    #[must_use]
    pub fn reflect_vector(&self, v: Vec3) -> Vec3 {
        v - self.normal * (2.0 * self.normal.dot(v))
    }

    /// Affine matrix mirroring world space across this plane.
    #[must_use]
    pub fn reflection_matrix(&self) -> Mat4 {
        let Vec3 { x, y, z } = self.normal;
        let d = self.d;
        Mat4::from_cols(
            Vec4::new(1.0 - 2.0 * x * x, -2.0 * y * x, -2.0 * z * x, 0.0),
            Vec4::new(-2.0 * x * y, 1.0 - 2.0 * y * y, -2.0 * z * y, 0.0),
            Vec4::new(-2.0 * x * z, -2.0 * y * z, 1.0 - 2.0 * z * z, 0.0),
            Vec4::new(-2.0 * d * x, -2.0 * d * y, -2.0 * d * z, 1.0),
        )
    }

    #[inline]
    #[must_use]
    pub fn as_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }
}
