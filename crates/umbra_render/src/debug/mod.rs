//! Debug Overlays
//!
//! - Line gizmos for scene lights and the editor pick ray, drawn as one
//!   line list after the main pass.
//! - A 3x2 atlas inset showing one cubemap (point shadow distance or a
//!   reflection probe) in the bottom-right corner.

mod draw_list;

pub use draw_list::{
    DEBUG_VERTEX_STRIDE, DebugDrawList, DebugVertex, MAX_DEBUG_LINE_VERTICES, pack_rgba8,
};

use glam::{Vec2, Vec3};
use umbra_rhi::{Extent2d, Viewport};
use umbra_scene::{LightType, Scene};

use crate::constants::DebugCubeAtlasConstants;
use crate::settings::RendererSettings;

pub const COLOR_DIRECTIONAL: u32 = pack_rgba8(255, 255, 255, 255);
pub const COLOR_POINT: u32 = pack_rgba8(255, 220, 80, 255);
pub const COLOR_SPOT: u32 = pack_rgba8(80, 220, 255, 255);
pub const COLOR_PICK_HIT: u32 = pack_rgba8(80, 255, 80, 255);
pub const COLOR_PICK_MISS: u32 = pack_rgba8(255, 80, 80, 255);

const SPHERE_SEGMENTS: u32 = 16;
const CONE_SEGMENTS: u32 = 24;

/// Builds the frame's line gizmos.
///
/// Only lights present in the scene get gizmos; the fallback rig does not.
#[must_use]
pub fn build_debug_lines(scene: &Scene, settings: &RendererSettings) -> DebugDrawList {
    let mut list = DebugDrawList::new();

    if settings.draw_light_gizmos {
        let scale = settings.debug_light_gizmo_scale;
        let half_size = settings.light_gizmo_half_size * scale;
        let arrow_len = settings.light_gizmo_arrow_length * scale;

        for light in &scene.lights {
            let dir = light.direction.try_normalize().unwrap_or(Vec3::NEG_Y);
            match light.light_type {
                LightType::Directional => {
                    let anchor = scene.camera.target;
                    list.add_arrow(anchor, anchor + dir * arrow_len, COLOR_DIRECTIONAL);
                }
                LightType::Point => {
                    list.add_axes_cross(light.position, half_size, COLOR_POINT);
                    list.add_wire_sphere(light.position, half_size, COLOR_POINT, SPHERE_SEGMENTS);
                }
                LightType::Spot => {
                    let p = light.position;
                    list.add_arrow(p, p + dir * arrow_len, COLOR_SPOT);
                    list.add_wire_cone(
                        p,
                        dir,
                        arrow_len,
                        light.outer_half_angle_deg.to_radians(),
                        COLOR_SPOT,
                        CONE_SEGMENTS,
                    );
                }
            }
        }
    }

    let ray = &scene.debug_pick_ray;
    if ray.enabled {
        let color = if ray.hit { COLOR_PICK_HIT } else { COLOR_PICK_MISS };
        let dir = ray.direction.try_normalize().unwrap_or(Vec3::Z);
        let end = ray.origin + dir * ray.length;
        list.add_line(ray.origin, end, color);
        if ray.hit {
            list.add_axes_cross(end, settings.light_gizmo_half_size * 0.25, color);
        }
    }

    if list.dropped() > 0 {
        log::warn!("Debug line list full, dropped {} segments", list.dropped());
    }
    list
}

// ─── Cube Atlas ──────────────────────────────────────────────────────────────

pub const CUBE_ATLAS_MARGIN: u32 = 16;
const CUBE_ATLAS_MIN_WIDTH: u32 = 128;
const CUBE_ATLAS_MAX_WIDTH: u32 = 512;

/// Pixel rectangle of the atlas inset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.x, self.y, self.width, self.height)
    }
}

/// Places a 3:2 inset in the bottom-right corner of `extent`.
///
/// The width is kept within 128..=512 pixels; on short targets the height
/// wins and the width follows the aspect.
#[must_use]
pub fn cube_atlas_viewport(extent: Extent2d) -> AtlasRect {
    let w = extent.width.max(1);
    let h = extent.height.max(1);
    let m = CUBE_ATLAS_MARGIN;

    let available = if w > 2 * m { w - 2 * m } else { CUBE_ATLAS_MIN_WIDTH };
    let mut width = available.clamp(CUBE_ATLAS_MIN_WIDTH, CUBE_ATLAS_MAX_WIDTH);
    let mut height = width * 2 / 3;
    if height + 2 * m > h {
        height = if h > 2 * m { h - 2 * m } else { CUBE_ATLAS_MIN_WIDTH };
        width = height * 3 / 2;
    }

    AtlasRect {
        x: w.saturating_sub(m + width),
        y: h.saturating_sub(m + height),
        width,
        height,
    }
}

/// Display mode of the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeAtlasMode {
    /// Inverted grayscale of a distance map.
    Depth,
    Color,
}

#[must_use]
pub fn cube_atlas_constants(rect: &AtlasRect, mode: CubeAtlasMode) -> DebugCubeAtlasConstants {
    let (invert, mode) = match mode {
        CubeAtlasMode::Depth => (1, 0),
        CubeAtlasMode::Color => (0, 1),
    };
    DebugCubeAtlasConstants {
        invert,
        mode,
        viewport_origin: Vec2::new(rect.x as f32, rect.y as f32),
        inv_viewport_size: Vec2::new(1.0 / rect.width.max(1) as f32, 1.0 / rect.height.max(1) as f32),
        ..DebugCubeAtlasConstants::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_target_gets_max_width() {
        let r = cube_atlas_viewport(Extent2d::new(1920, 1080));
        assert_eq!((r.width, r.height), (512, 341));
        assert_eq!(r.x, 1920 - 16 - 512);
        assert_eq!(r.y, 1080 - 16 - 341);
    }

    #[test]
    fn short_target_is_height_limited() {
        let r = cube_atlas_viewport(Extent2d::new(1920, 200));
        assert_eq!(r.height, 168);
        assert_eq!(r.width, 252);
        assert_eq!(r.y, 16);
    }
}
