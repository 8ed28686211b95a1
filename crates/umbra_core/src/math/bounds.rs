use glam::{Mat4, Vec3};

/// Object-local bounding sphere of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[inline]
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere around the origin-centred box `[-half_extents, half_extents]`.
    #[must_use]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self {
            center: Vec3::ZERO,
            radius: half_extents.length(),
        }
    }

    /// Moves the sphere into world space.
    ///
    /// The center goes through the full matrix. The radius is scaled by the
    /// longest basis vector so non-uniform scale never shrinks the bound.
    #[must_use]
    pub fn transformed(&self, model: &Mat4) -> Self {
        let max_scale = model
            .x_axis
            .truncate()
            .length()
            .max(model.y_axis.truncate().length())
            .max(model.z_axis.truncate().length());

        Self {
            center: model.transform_point3(self.center),
            radius: self.radius * max_scale,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.radius <= 0.0
    }
}
