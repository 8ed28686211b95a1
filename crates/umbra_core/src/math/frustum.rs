use glam::{Mat4, Vec3, Vec4};

use super::BoundingSphere;

/// View frustum described by six inward-facing planes.
///
/// Planes are stored as `(nx, ny, nz, d)` with unit normals so that
/// `dot(n, p) + d` is the signed distance of `p`, positive inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts the planes from a view-projection matrix (Gribb-Hartmann).
    ///
    /// Assumes clip-space depth in `[0, 1]`, which is what
    /// `Mat4::perspective_rh` and `Mat4::orthographic_rh` produce.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0], // Left
            rows[3] - rows[0], // Right
            rows[3] + rows[1], // Bottom
            rows[3] - rows[1], // Top
            rows[2],           // Near (z >= 0)
            rows[3] - rows[2], // Far (z <= w)
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    /// Returns `false` only when the sphere lies entirely behind one plane.
    ///
    /// Spheres straddling a plane count as visible.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    #[inline]
    #[must_use]
    pub fn intersects_bounds(&self, sphere: &BoundingSphere) -> bool {
        self.intersects_sphere(sphere.center, sphere.radius)
    }

    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.intersects_sphere(point, 0.0)
    }
}
