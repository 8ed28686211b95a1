//! Pipeline Library
//!
//! Persistent pipelines created once per renderer. Any failure here is
//! fatal: the renderer cannot draw a frame without them. Optional cube
//! variants (layered, view-instanced) live in
//! [`CubePipelineSet`](crate::technique::CubePipelineSet) instead, where a
//! failure only disables that tier.
//!
//! | Pipeline | Shader | Targets |
//! |----------|--------|---------|
//! | main x4 | `mesh` (`USE_TEX`, `USE_SHADOW`) | swapchain color + depth |
//! | shadow | `shadow_depth` | `Depth32Float` |
//! | scene depth | `shadow_depth` | swapchain depth (pre-pass, planar masks) |
//! | skybox | `skybox` | swapchain / probe faces |
//! | cube atlas | `debug_cube_atlas` | swapchain color |
//! | debug lines | `debug_lines` | swapchain color + depth |

use umbra_core::errors::{Result, UmbraError};
use umbra_rhi::{PipelineDesc, PipelineHandle, PrimitiveTopology, RenderDevice};
use umbra_scene::MaterialPerm;

/// Depth format of every shadow map.
pub const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Linear distance stored by point shadows.
pub const POINT_SHADOW_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
pub const PROBE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const PROBE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Creates a pipeline, attaching its label to the error.
pub(crate) fn create_pipeline(
    device: &mut dyn RenderDevice,
    desc: &PipelineDesc,
) -> Result<PipelineHandle> {
    device
        .create_pipeline(desc)
        .map_err(|source| UmbraError::PipelineCreation {
            name: desc.label.clone(),
            source,
        })
}

/// Index of the main pipeline variant for a permutation.
///
/// Only the texture and shadow bits select a variant; the rest of the
/// permutation is handled by render state.
#[inline]
#[must_use]
pub fn main_variant_index(perm: MaterialPerm) -> usize {
    let mut index = 0;
    if perm.contains(MaterialPerm::USE_TEX) {
        index |= 1;
    }
    if perm.contains(MaterialPerm::USE_SHADOW) {
        index |= 2;
    }
    index
}

fn main_desc(index: usize, color: wgpu::TextureFormat, depth: wgpu::TextureFormat) -> PipelineDesc {
    let mut label = String::from("Mesh");
    let mut desc = PipelineDesc::new("", "mesh");
    if index & 1 != 0 {
        label.push_str("_Tex");
        desc = desc.with_define("USE_TEX=1");
    }
    if index & 2 != 0 {
        label.push_str("_Shadow");
        desc = desc.with_define("USE_SHADOW=1");
    }
    desc.label = label;
    desc.with_formats(Some(color), Some(depth))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLibrary {
    main: [PipelineHandle; 4],
    pub shadow: PipelineHandle,
    pub scene_depth: PipelineHandle,
    pub skybox: PipelineHandle,
    pub skybox_capture: PipelineHandle,
    pub cube_atlas: PipelineHandle,
    pub debug_lines: PipelineHandle,
}

impl PipelineLibrary {
    /// Builds every persistent pipeline for the given swapchain formats.
    ///
    /// # Errors
    ///
    /// [`UmbraError::PipelineCreation`] naming the first pipeline that
    /// failed.
    pub fn new(
        device: &mut dyn RenderDevice,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let mut main = [PipelineHandle::default(); 4];
        for (index, slot) in main.iter_mut().enumerate() {
            *slot = create_pipeline(device, &main_desc(index, color_format, depth_format))?;
        }

        let shadow = create_pipeline(
            device,
            &PipelineDesc::new("ShadowDepth", "shadow_depth")
                .depth_only()
                .with_formats(None, Some(SHADOW_DEPTH_FORMAT)),
        )?;
        let scene_depth = create_pipeline(
            device,
            &PipelineDesc::new("SceneDepth", "shadow_depth")
                .depth_only()
                .with_formats(None, Some(depth_format)),
        )?;
        let skybox = create_pipeline(
            device,
            &PipelineDesc::new("Skybox", "skybox").with_formats(Some(color_format), Some(depth_format)),
        )?;
        let skybox_capture = create_pipeline(
            device,
            &PipelineDesc::new("Skybox_Capture", "skybox")
                .with_formats(Some(PROBE_COLOR_FORMAT), Some(PROBE_DEPTH_FORMAT)),
        )?;
        let cube_atlas = create_pipeline(
            device,
            &PipelineDesc::new("DebugCubeAtlas", "debug_cube_atlas")
                .with_formats(Some(color_format), None),
        )?;
        let debug_lines = create_pipeline(
            device,
            &PipelineDesc::new("DebugLines", "debug_lines")
                .with_topology(PrimitiveTopology::LineList)
                .with_formats(Some(color_format), Some(depth_format)),
        )?;

        log::debug!("Created {} persistent pipelines", main.len() + 6);

        Ok(Self {
            main,
            shadow,
            scene_depth,
            skybox,
            skybox_capture,
            cube_atlas,
            debug_lines,
        })
    }

    /// Main-pass pipeline for a permutation.
    #[inline]
    #[must_use]
    pub fn main(&self, perm: MaterialPerm) -> PipelineHandle {
        self.main[main_variant_index(perm)]
    }
}
