//! GPU Constant Blocks
//!
//! `#[repr(C)]` blocks copied into the command stream with
//! [`CommandList::set_constants`](umbra_rhi::CommandList::set_constants) or
//! uploaded as structured buffers. Layouts are 16-byte aligned so they map
//! one-to-one onto HLSL/WGSL constant buffers.
//!
//! Matrices are stored column-major, as glam keeps them.

use bitflags::bitflags;
use glam::{Mat4, UVec4, Vec2, Vec4};

use crate::settings::MAX_DIR_CASCADES;
use crate::shadow::{MAX_POINT_SHADOWS, MAX_SPOT_SHADOWS};

// ============================================================================
// Definition Macro
// ============================================================================

/// Defines a Pod constant block with per-field defaults.
///
/// Fields without `= value` fall back to `Default::default()`.
macro_rules! define_gpu_struct {
    (
        $(#[$meta:meta])* struct $name:ident {
            $( $(#[$fmeta:meta])* $field_name:ident : $field_type:ty $(= $default_val:expr)? ),* $(,)?
        }
    ) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        $(#[$meta])*
        pub struct $name {
            $( $(#[$fmeta])* pub $field_name : $field_type, )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $field_name: define_gpu_struct!(@val_or_default $field_type $(, $default_val)?), )*
                }
            }
        }
    };
    (@val_or_default $type:ty, $val:expr) => { $val };
    (@val_or_default $type:ty) => { <$type as Default>::default() };
}

// ============================================================================
// Shader Flags
// ============================================================================

bitflags! {
    /// Per-batch feature bits read by the main and planar shaders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFlags: u32 {
        const USE_TEX = 1 << 0;
        const USE_SHADOW = 1 << 1;
        const USE_NORMAL = 1 << 2;
        const USE_METAL_TEX = 1 << 3;
        const USE_ROUGH_TEX = 1 << 4;
        const USE_AO_TEX = 1 << 5;
        const USE_EMISSIVE_TEX = 1 << 6;
        const USE_ENV = 1 << 7;
        /// Probe cubes have no mip chain.
        const ENV_FORCE_MIP0 = 1 << 8;
        /// Probe cubes are captured with a right-handed face basis.
        const ENV_FLIP_Z = 1 << 9;
    }
}

/// Ambient term shared by every lit pass.
pub const AMBIENT: f32 = 0.22;

// ============================================================================
// Main Pass
// ============================================================================

define_gpu_struct! {
    /// Constants of one main-pass (or reflected planar) batch draw.
    struct PerBatchConstants {
        view_proj: Mat4 = Mat4::IDENTITY,
        /// First cascade, for shaders that only sample one.
        light_view_proj: Mat4 = Mat4::IDENTITY,
        /// xyz: camera position, w: ambient.
        camera_pos_ambient: Vec4 = Vec4::new(0.0, 0.0, 0.0, AMBIENT),
        camera_forward: Vec4,
        base_color: Vec4 = Vec4::ONE,
        /// metallic, roughness, ao, emissive strength.
        pbr_params: Vec4,
        /// x: material shadow bias (texels).
        material: Vec4,
        /// x: [`ShaderFlags`], y: light count, z: spot shadows, w: point shadows.
        flags_counts: UVec4,
        /// dir, spot, point base bias and slope scale (texels).
        shadow_bias: Vec4,
        /// Pixels with `dot(n, p) + d < 0` are discarded. The default never
        /// clips.
        clip_plane: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0),
        env_box_min: Vec4,
        env_box_max: Vec4,
    }
}

define_gpu_struct! {
    /// Single matrix for depth-only draws: shadow maps, the depth pre-pass
    /// and planar stencil masks.
    struct DepthPassConstants {
        view_proj: Mat4 = Mat4::IDENTITY,
    }
}

define_gpu_struct! {
    /// Skybox drawn as a fullscreen triangle.
    struct SkyboxConstants {
        /// Inverse of the translation-free view-projection.
        inv_view_proj: Mat4 = Mat4::IDENTITY,
    }
}

// ============================================================================
// Shadows
// ============================================================================

define_gpu_struct! {
    /// One face of a six-pass point shadow.
    struct PointShadowFaceConstants {
        view_proj: Mat4 = Mat4::IDENTITY,
        /// xyz: light position, w: range.
        light_pos_range: Vec4,
    }
}

define_gpu_struct! {
    /// All faces of a single-pass (layered or view-instanced) point shadow.
    struct PointShadowCubeConstants {
        face_view_proj: [Mat4; 6],
        light_pos_range: Vec4,
    }
}

define_gpu_struct! {
    /// Shadow lookup data sampled by the main pass (structured buffer).
    struct ShadowData {
        cascade_view_proj: [Mat4; MAX_DIR_CASCADES as usize],
        /// Far boundary of each cascade in view depth.
        cascade_splits: Vec4,
        spot_view_proj: [Mat4; MAX_SPOT_SHADOWS],
        /// xyz: position, w: range.
        point_pos_range: [Vec4; MAX_POINT_SHADOWS],
        /// cascade count, spot count, point count, cascade tile size.
        counts: UVec4,
    }
}

// ============================================================================
// Reflection Capture
// ============================================================================

define_gpu_struct! {
    /// Single-pass capture of all six faces.
    struct ReflectionCaptureConstants {
        face_view_proj: [Mat4; 6],
        capture_pos_ambient: Vec4 = Vec4::new(0.0, 0.0, 0.0, AMBIENT),
        base_color: Vec4 = Vec4::ONE,
        /// x: light count, y: [`ShaderFlags`].
        params: UVec4,
    }
}

define_gpu_struct! {
    /// Six-pass capture of one face.
    struct ReflectionCaptureFaceConstants {
        view_proj: Mat4 = Mat4::IDENTITY,
        capture_pos_ambient: Vec4 = Vec4::new(0.0, 0.0, 0.0, AMBIENT),
        base_color: Vec4 = Vec4::ONE,
        params: UVec4,
    }
}

// ============================================================================
// Debug
// ============================================================================

define_gpu_struct! {
    struct DebugCubeAtlasConstants {
        inv_range: f32 = 1.0,
        gamma: f32 = 1.0,
        invert: u32,
        show_grid: u32 = 1,
        /// 0: depth grayscale, 1: color.
        mode: u32,
        _pad0: u32,
        viewport_origin: Vec2,
        inv_viewport_size: Vec2 = Vec2::ONE,
        _pad1: Vec2,
    }
}

define_gpu_struct! {
    struct DebugLineConstants {
        view_proj: Mat4 = Mat4::IDENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<PerBatchConstants>() % 16, 0);
        assert_eq!(std::mem::size_of::<ShadowData>() % 16, 0);
        assert_eq!(std::mem::size_of::<ReflectionCaptureConstants>() % 16, 0);
        assert_eq!(std::mem::size_of::<DebugCubeAtlasConstants>(), 48);
    }

    #[test]
    fn default_clip_plane_never_clips() {
        let c = PerBatchConstants::default();
        assert!(c.clip_plane.w > 0.0 && c.clip_plane.truncate() == glam::Vec3::ZERO);
    }
}
