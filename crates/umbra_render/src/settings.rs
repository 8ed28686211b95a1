//! Renderer Settings
//!
//! Plain configuration owned by the caller and handed to
//! [`FrameRenderer`](crate::FrameRenderer). Every field has a default, and a
//! settings file only needs to name the fields it changes:
//!
//! ```rust,ignore
//! let settings: RendererSettings = serde_json::from_str(r#"{
//!     "dir_shadow_cascade_count": 2,
//!     "enable_planar_reflections": true
//! }"#)?;
//! ```
//!
//! The `disable_*` flags seed the per-renderer circuit breakers of the
//! single-pass cubemap techniques. A tier that fails at runtime is disabled
//! on the renderer instance; these fields are never written back.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MAX_DIR_CASCADES: u32 = 3;
pub const MIN_PROBE_RESOLUTION: u32 = 32;
pub const MAX_PROBE_RESOLUTION: u32 = 2048;

/// Which cubemap the debug atlas inset shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CubeAtlasSource {
    /// Distance cube of a point-light shadow.
    #[default]
    PointShadow,
    /// Color cube of a reflection probe.
    ReflectionProbe,
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Per-renderer configuration.
///
/// # Fields
///
/// | Field                                  | Description                                   | Default   |
/// |----------------------------------------|-----------------------------------------------|-----------|
/// | `enable_frustum_culling`               | Cull main-pass batches against the camera     | `true`    |
/// | `enable_depth_prepass`                 | Depth-only pass before the main pass          | `false`   |
/// | `dir_shadow_cascade_count`             | Directional cascades, `1..=3`                 | `3`       |
/// | `dir_shadow_split_lambda`              | Uniform/log split blend, `0..=1`              | `0.6`     |
/// | `dir_shadow_distance`                  | Far end of the shadowed range                 | `60.0`    |
/// | `dir_shadow_tile_size`                 | Texels per cascade tile                       | `2048`    |
/// | `enable_reflection_capture`            | Per-object reflection probes                  | `true`    |
/// | `reflection_capture_update_every_frame`| Ignore probe dirty flags                      | `false`   |
/// | `reflection_capture_resolution`        | Probe face size, `32..=2048`                  | `256`     |
/// | `enable_planar_reflections`            | Stencil-gated planar mirrors                  | `false`   |
/// | `planar_reflection_max_mirrors`        | Mirror draws kept per frame                   | `4`       |
/// | `instance_buffer_capacity_bytes`       | Size of the per-frame instance buffer         | 4 MiB     |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    // === Culling & Passes ===
    pub enable_frustum_culling: bool,
    pub enable_depth_prepass: bool,
    pub clear_color: [f32; 4],

    // === Directional Shadows ===
    pub dir_shadow_cascade_count: u32,
    pub dir_shadow_split_lambda: f32,
    pub dir_shadow_distance: f32,
    pub dir_shadow_tile_size: u32,

    // === Local Shadows ===
    pub spot_shadow_resolution: u32,
    pub point_shadow_resolution: u32,

    // === Shadow Bias (texels) ===
    pub dir_shadow_base_bias_texels: f32,
    pub spot_shadow_base_bias_texels: f32,
    pub point_shadow_base_bias_texels: f32,
    pub shadow_slope_scale_texels: f32,

    // === Reflection Capture ===
    pub enable_reflection_capture: bool,
    pub reflection_capture_update_every_frame: bool,
    pub reflection_capture_resolution: u32,
    pub reflection_capture_near_z: f32,
    pub reflection_capture_far_z: f32,
    /// Half extent of the box used for parallax-corrected probe lookups.
    pub reflection_probe_box_half_extent: f32,

    // === Planar Reflections ===
    pub enable_planar_reflections: bool,
    pub planar_reflection_max_mirrors: u32,

    // === Technique Circuit Breakers ===
    pub disable_point_shadow_layered: bool,
    pub disable_point_shadow_vi: bool,
    pub disable_reflection_capture_layered: bool,
    pub disable_reflection_capture_vi: bool,

    // === Capacity ===
    pub instance_buffer_capacity_bytes: u64,

    // === Debug ===
    pub debug_print_draw_calls: bool,
    pub show_cube_atlas: bool,
    pub cube_atlas_source: CubeAtlasSource,
    pub debug_cube_atlas_index: u32,
    pub draw_light_gizmos: bool,
    pub debug_light_gizmo_scale: f32,
    pub light_gizmo_half_size: f32,
    pub light_gizmo_arrow_length: f32,
    pub debug_draw_depth_test: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            enable_frustum_culling: true,
            enable_depth_prepass: false,
            clear_color: [0.07, 0.07, 0.09, 1.0],

            dir_shadow_cascade_count: 3,
            dir_shadow_split_lambda: 0.6,
            dir_shadow_distance: 60.0,
            dir_shadow_tile_size: 2048,

            spot_shadow_resolution: 1024,
            point_shadow_resolution: 512,

            dir_shadow_base_bias_texels: 1.0,
            spot_shadow_base_bias_texels: 1.5,
            point_shadow_base_bias_texels: 1.5,
            shadow_slope_scale_texels: 2.0,

            enable_reflection_capture: true,
            reflection_capture_update_every_frame: false,
            reflection_capture_resolution: 256,
            reflection_capture_near_z: 0.05,
            reflection_capture_far_z: 200.0,
            reflection_probe_box_half_extent: 10.0,

            enable_planar_reflections: false,
            planar_reflection_max_mirrors: 4,

            disable_point_shadow_layered: false,
            disable_point_shadow_vi: false,
            disable_reflection_capture_layered: false,
            disable_reflection_capture_vi: false,

            instance_buffer_capacity_bytes: 4 * 1024 * 1024,

            debug_print_draw_calls: false,
            show_cube_atlas: false,
            cube_atlas_source: CubeAtlasSource::PointShadow,
            debug_cube_atlas_index: 0,
            draw_light_gizmos: false,
            debug_light_gizmo_scale: 1.0,
            light_gizmo_half_size: 0.25,
            light_gizmo_arrow_length: 1.5,
            debug_draw_depth_test: true,
        }
    }
}

impl RendererSettings {
    /// Returns a copy with every ranged field clamped into range.
    ///
    /// Each clamp is logged once per call.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut s = self.clone();

        clamp_logged(
            "dir_shadow_cascade_count",
            &mut s.dir_shadow_cascade_count,
            1,
            MAX_DIR_CASCADES,
        );
        clamp_logged(
            "reflection_capture_resolution",
            &mut s.reflection_capture_resolution,
            MIN_PROBE_RESOLUTION,
            MAX_PROBE_RESOLUTION,
        );
        clamp_logged("dir_shadow_tile_size", &mut s.dir_shadow_tile_size, 64, 8192);
        clamp_logged("spot_shadow_resolution", &mut s.spot_shadow_resolution, 64, 8192);
        clamp_logged("point_shadow_resolution", &mut s.point_shadow_resolution, 32, 4096);

        if !(0.0..=1.0).contains(&s.dir_shadow_split_lambda) {
            log::warn!(
                "dir_shadow_split_lambda {} out of range, clamped to [0, 1]",
                s.dir_shadow_split_lambda
            );
            s.dir_shadow_split_lambda = s.dir_shadow_split_lambda.clamp(0.0, 1.0);
        }
        if s.dir_shadow_distance <= 0.0 {
            log::warn!("dir_shadow_distance must be positive, using 60");
            s.dir_shadow_distance = 60.0;
        }

        s
    }

    /// The no-cull batch set is needed by probe capture, the cube atlas and
    /// planar reflections.
    #[inline]
    #[must_use]
    pub fn needs_capture_batches(&self) -> bool {
        self.enable_reflection_capture || self.show_cube_atlas || self.enable_planar_reflections
    }
}

fn clamp_logged(name: &str, value: &mut u32, min: u32, max: u32) {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        log::warn!("{name} {} out of range, clamped to {clamped}", *value);
        *value = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let s: RendererSettings =
            serde_json::from_str(r#"{ "dir_shadow_cascade_count": 2 }"#).unwrap();
        assert_eq!(s.dir_shadow_cascade_count, 2);
        assert_eq!(s.reflection_capture_resolution, 256);
        assert!(s.enable_frustum_culling);
    }

    #[test]
    fn sanitized_clamps_ranges() {
        let s = RendererSettings {
            dir_shadow_cascade_count: 9,
            reflection_capture_resolution: 4,
            dir_shadow_split_lambda: 2.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.dir_shadow_cascade_count, MAX_DIR_CASCADES);
        assert_eq!(s.reflection_capture_resolution, MIN_PROBE_RESOLUTION);
        assert!((s.dir_shadow_split_lambda - 1.0).abs() < f32::EPSILON);
    }
}
