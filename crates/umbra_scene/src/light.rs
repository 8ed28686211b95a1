use glam::Vec3;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

/// A scene light.
///
/// `direction` is the direction light travels (from the light), used by
/// directional and spot lights. Angles are half angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub inner_half_angle_deg: f32,
    pub outer_half_angle_deg: f32,
    pub att_linear: f32,
    pub att_quadratic: f32,
    pub casts_shadow: bool,
}

impl Light {
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::ZERO,
            direction,
            color,
            intensity,
            range: 0.0,
            inner_half_angle_deg: 0.0,
            outer_half_angle_deg: 0.0,
            att_linear: 0.0,
            att_quadratic: 0.0,
            casts_shadow: true,
        }
    }

    #[must_use]
    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::NEG_Y,
            color,
            intensity,
            range,
            inner_half_angle_deg: 0.0,
            outer_half_angle_deg: 0.0,
            att_linear: 0.12,
            att_quadratic: 0.04,
            casts_shadow: true,
        }
    }

    #[must_use]
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        range: f32,
        inner_half_angle_deg: f32,
        outer_half_angle_deg: f32,
    ) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction,
            color,
            intensity,
            range,
            inner_half_angle_deg,
            outer_half_angle_deg,
            att_linear: 0.09,
            att_quadratic: 0.032,
            casts_shadow: true,
        }
    }
}
