//! Spot and point light shadows.
//!
//! Spot lights get one perspective depth map each. Point lights render
//! linear distance into an `R32Float` cube with six 90° faces.

use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;
use umbra_rhi::CUBE_FACE_COUNT;
use umbra_scene::{Light, LightType};

use super::{MAX_POINT_SHADOWS, MAX_SPOT_SHADOWS};

/// Near plane of local light projections.
pub const LOCAL_SHADOW_NEAR: f32 = 0.05;
const MIN_LOCAL_RANGE: f32 = LOCAL_SHADOW_NEAR + 0.01;

/// Face directions and up vectors in cube layer order +X, -X, +Y, -Y, +Z, -Z.
const CUBE_FACES: [(Vec3, Vec3); CUBE_FACE_COUNT as usize] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// Right-handed view matrix of one cube face seen from `position`.
///
/// `face` is taken modulo 6.
#[must_use]
pub fn cube_face_view_rh(position: Vec3, face: u32) -> Mat4 {
    let (dir, up) = CUBE_FACES[(face % CUBE_FACE_COUNT) as usize];
    Mat4::look_at_rh(position, position + dir, up)
}

/// View-projections of all six faces with a 90° square projection.
#[must_use]
pub fn cube_face_view_projs(position: Vec3, near: f32, far: f32) -> [Mat4; 6] {
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
    std::array::from_fn(|face| proj * cube_face_view_rh(position, face as u32))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotShadow {
    /// Index into the frame's effective light list.
    pub light_index: usize,
    pub view_proj: Mat4,
}

impl SpotShadow {
    #[must_use]
    pub fn new(light_index: usize, light: &Light) -> Self {
        let dir = light.direction.try_normalize().unwrap_or(Vec3::NEG_Y);
        let up = if dir.dot(Vec3::Y).abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(light.position, light.position + dir, up);
        let fov = (2.0 * light.outer_half_angle_deg).clamp(1.0, 179.0).to_radians();
        let proj = Mat4::perspective_rh(fov, 1.0, LOCAL_SHADOW_NEAR, light.range.max(MIN_LOCAL_RANGE));
        Self {
            light_index,
            view_proj: proj * view,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointShadow {
    pub light_index: usize,
    pub position: Vec3,
    pub range: f32,
    pub face_view_proj: [Mat4; 6],
}

impl PointShadow {
    #[must_use]
    pub fn new(light_index: usize, light: &Light) -> Self {
        let range = light.range.max(MIN_LOCAL_RANGE);
        Self {
            light_index,
            position: light.position,
            range,
            face_view_proj: cube_face_view_projs(light.position, LOCAL_SHADOW_NEAR, range),
        }
    }

    /// xyz: position, w: range.
    #[inline]
    #[must_use]
    pub fn pos_range(&self) -> Vec4 {
        self.position.extend(self.range)
    }
}

/// Shadowed spot and point lights of one frame, in light order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalShadows {
    pub spots: SmallVec<[SpotShadow; MAX_SPOT_SHADOWS]>,
    pub points: SmallVec<[PointShadow; MAX_POINT_SHADOWS]>,
}

impl LocalShadows {
    /// Picks the first shadow-casting spot and point lights, up to the
    /// per-type limits. Lights past the limit render unshadowed.
    #[must_use]
    pub fn collect(lights: &[Light]) -> Self {
        let mut out = Self::default();
        for (index, light) in lights.iter().enumerate().filter(|(_, l)| l.casts_shadow) {
            match light.light_type {
                LightType::Spot if out.spots.len() < MAX_SPOT_SHADOWS => {
                    out.spots.push(SpotShadow::new(index, light));
                }
                LightType::Point if out.points.len() < MAX_POINT_SHADOWS => {
                    out.points.push(PointShadow::new(index, light));
                }
                _ => {}
            }
        }
        out
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty() && self.points.is_empty()
    }
}
