//! Light upload.
//!
//! Scene lights are packed into a fixed-size structured buffer of
//! [`GpuLight`]s once per frame. Scenes without lights get a small default
//! rig so that a bare scene is still readable.

use std::borrow::Cow;

use glam::{Vec3, Vec4};
use umbra_scene::{Light, LightType};

/// Capacity of the lights buffer.
pub const MAX_LIGHTS: usize = 16;

/// Direction of the fallback sun, from the light towards the scene.
pub const DEFAULT_LIGHT_DIR: Vec3 = Vec3::new(-0.4, -1.0, -0.3);

/// One light as the shaders read it.
///
/// | Row | xyz | w |
/// |-----|-----|---|
/// | `p0` | position | type |
/// | `p1` | direction | intensity |
/// | `p2` | color | range |
/// | `p3` | cos inner, cos outer, linear att. | quadratic att. |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub p0: Vec4,
    pub p1: Vec4,
    pub p2: Vec4,
    pub p3: Vec4,
}

impl GpuLight {
    #[must_use]
    pub fn from_light(light: &Light) -> Self {
        Self {
            p0: light.position.extend(light_type_value(light.light_type)),
            p1: light.direction.extend(light.intensity),
            p2: light.color.extend(light.range),
            p3: Vec4::new(
                light.inner_half_angle_deg.to_radians().cos(),
                light.outer_half_angle_deg.to_radians().cos(),
                light.att_linear,
                light.att_quadratic,
            ),
        }
    }
}

fn light_type_value(ty: LightType) -> f32 {
    ty as u32 as f32
}

/// Small rig used when the scene has no lights. The spot light sits at the
/// camera and looks at the origin.
#[must_use]
pub fn default_rig(camera_pos: Vec3) -> [Light; 3] {
    let spot_dir = (Vec3::ZERO - camera_pos).try_normalize().unwrap_or(Vec3::NEG_Z);
    [
        Light::directional(DEFAULT_LIGHT_DIR.normalize(), Vec3::ONE, 1.2),
        Light::point(Vec3::new(2.5, 2.0, 1.5), Vec3::new(1.0, 0.95, 0.8), 2.0, 12.0),
        Light::spot(
            camera_pos,
            spot_dir,
            Vec3::new(0.8, 0.9, 1.0),
            3.0,
            30.0,
            12.0,
            20.0,
        ),
    ]
}

/// The lights actually rendered this frame: the first [`MAX_LIGHTS`] scene
/// lights, or the [`default_rig`].
#[must_use]
pub fn effective_lights(lights: &[Light], camera_pos: Vec3) -> Cow<'_, [Light]> {
    if lights.is_empty() {
        Cow::Owned(default_rig(camera_pos).to_vec())
    } else {
        Cow::Borrowed(&lights[..lights.len().min(MAX_LIGHTS)])
    }
}

/// Packs the [`effective_lights`] for upload.
#[must_use]
pub fn pack_lights(lights: &[Light], camera_pos: Vec3) -> Vec<GpuLight> {
    effective_lights(lights, camera_pos)
        .iter()
        .map(GpuLight::from_light)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scene_gets_default_rig() {
        let packed = pack_lights(&[], Vec3::new(0.0, 2.0, 6.0));
        assert_eq!(packed.len(), 3);
        assert_eq!(packed[0].p0.w, 0.0);
        assert_eq!(packed[1].p0.w, 1.0);
        assert_eq!(packed[2].p0.w, 2.0);
        assert!((packed[2].p3.x - 12f32.to_radians().cos()).abs() < 1e-6);
        assert_eq!(packed[1].p2.w, 12.0);
    }

    #[test]
    fn lights_are_capped() {
        let lights = vec![Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 5.0); MAX_LIGHTS + 4];
        assert_eq!(pack_lights(&lights, Vec3::ZERO).len(), MAX_LIGHTS);
    }
}
