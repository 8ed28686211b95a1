//! Lit Batch Recording
//!
//! Shared by the opaque and transparent main passes and by the reflected
//! planar pass: binds a batch's material, picks its environment map and
//! fills [`PerBatchConstants`].
//!
//! # Binding Slots
//!
//! | Slot | Binding |
//! |------|---------|
//! | tex 0 | albedo |
//! | tex 1 | directional cascade atlas |
//! | tex 3..=6 | spot shadow maps |
//! | tex 7..=10 | point shadow cubes |
//! | tex 12..=16 | normal, metalness, roughness, ao, emissive |
//! | tex 17 | environment cube (bindless) |
//! | tex 18 | reflection probe cube as a 2D array |
//! | structured 2 | lights |
//! | structured 3 | [`ShadowData`](crate::constants::ShadowData) |

use glam::{Mat4, UVec4, Vec3, Vec4};
use smallvec::SmallVec;
use umbra_rhi::{BufferHandle, CommandList, DescriptorIndex, TextureHandle};
use umbra_scene::{EnvSource, MaterialParams, MaterialPerm};

use crate::batch::{Batch, DrawGeometry, TransparentDraw};
use crate::constants::{AMBIENT, PerBatchConstants, ShaderFlags};
use crate::pipelines::PipelineLibrary;
use crate::probes::MAX_REFLECTION_PROBES;

pub const TEX_ALBEDO: u32 = 0;
pub const TEX_DIR_SHADOW: u32 = 1;
pub const TEX_SPOT_SHADOW_BASE: u32 = 3;
pub const TEX_POINT_SHADOW_BASE: u32 = 7;
pub const TEX_MATERIAL_BASE: u32 = 12;
pub const TEX_ENV: u32 = 17;
pub const TEX_ENV_ARRAY: u32 = 18;
pub const BUF_LIGHTS: u32 = 2;
pub const BUF_SHADOW_DATA: u32 = 3;

/// Reflection probe as seen by lit shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeEnv {
    pub descriptor: DescriptorIndex,
    pub cube: TextureHandle,
    pub capture_pos: Vec3,
}

/// Per-view overrides for reflected rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    pub view_proj: Mat4,
    pub camera_pos: Vec3,
    pub camera_forward: Vec3,
    /// `(n, d)`: pixels with `dot(n, p) + d < 0` are discarded.
    pub clip_plane: Vec4,
}

/// Frame-wide inputs of lit batch recording, captured by value into pass
/// callbacks.
#[derive(Debug, Clone)]
pub struct ShadingContext {
    pub pipelines: PipelineLibrary,
    pub instance_buffer: BufferHandle,
    pub lights_buffer: BufferHandle,
    pub shadow_buffer: BufferHandle,
    pub view: ViewParams,
    /// First cascade, for shaders sampling a single matrix.
    pub light_view_proj: Mat4,
    pub light_count: u32,
    pub spot_shadow_count: u32,
    pub point_shadow_count: u32,
    /// dir, spot, point base bias and slope scale, in texels.
    pub shadow_bias: Vec4,
    pub skybox: DescriptorIndex,
    pub reflection_capture: bool,
    pub probe_box_half_extent: f32,
    /// Indexed by probe index; `None` for probes without textures.
    pub probes: SmallVec<[Option<ProbeEnv>; MAX_REFLECTION_PROBES]>,
}

/// Everything needed to draw one lit batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LitDraw {
    pub geometry: DrawGeometry,
    pub material: MaterialParams,
    pub perm: MaterialPerm,
    pub env_source: EnvSource,
    pub reflection_probe: Option<u32>,
    pub instance_offset: u32,
    pub instance_count: u32,
}

impl From<&Batch> for LitDraw {
    fn from(b: &Batch) -> Self {
        Self {
            geometry: b.geometry,
            material: b.material,
            perm: b.perm,
            env_source: b.env_source,
            reflection_probe: b.reflection_probe,
            instance_offset: b.instance_offset,
            instance_count: b.instance_count,
        }
    }
}

impl From<&TransparentDraw> for LitDraw {
    fn from(t: &TransparentDraw) -> Self {
        Self {
            geometry: t.geometry,
            material: t.material,
            perm: t.perm,
            env_source: t.env_source,
            reflection_probe: None,
            instance_offset: t.instance_offset,
            instance_count: 1,
        }
    }
}

/// Resolved environment of a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvBinding {
    pub descriptor: DescriptorIndex,
    /// Set when a reflection probe is used.
    pub probe: Option<ProbeEnv>,
}

impl ShadingContext {
    /// Binds the frame-wide structured buffers.
    pub fn bind_frame(&self, cmd: &mut CommandList) {
        cmd.bind_structured_buffer(BUF_LIGHTS, self.lights_buffer);
        cmd.bind_structured_buffer(BUF_SHADOW_DATA, self.shadow_buffer);
    }

    /// Probe cube for capture-sourced materials, the skybox otherwise.
    #[must_use]
    pub fn env_for(&self, env_source: EnvSource, probe: Option<u32>) -> EnvBinding {
        let probe = match env_source {
            EnvSource::ReflectionCapture if self.reflection_capture => probe
                .and_then(|i| self.probes.get(i as usize).copied().flatten())
                .filter(|p| p.descriptor.is_some()),
            _ => None,
        };
        EnvBinding {
            descriptor: probe.map_or(self.skybox, |p| p.descriptor),
            probe,
        }
    }

    #[must_use]
    pub fn shader_flags(draw: &LitDraw, env: &EnvBinding) -> ShaderFlags {
        let m = &draw.material;
        let mut flags = ShaderFlags::empty();
        flags.set(ShaderFlags::USE_TEX, draw.perm.contains(MaterialPerm::USE_TEX));
        flags.set(ShaderFlags::USE_SHADOW, draw.perm.contains(MaterialPerm::USE_SHADOW));
        flags.set(ShaderFlags::USE_NORMAL, m.normal.is_some());
        flags.set(ShaderFlags::USE_METAL_TEX, m.metalness.is_some());
        flags.set(ShaderFlags::USE_ROUGH_TEX, m.roughness_tex.is_some());
        flags.set(ShaderFlags::USE_AO_TEX, m.ao_tex.is_some());
        flags.set(ShaderFlags::USE_EMISSIVE_TEX, m.emissive.is_some());
        flags.set(ShaderFlags::USE_ENV, env.descriptor.is_some());
        if env.probe.is_some() {
            flags |= ShaderFlags::ENV_FORCE_MIP0 | ShaderFlags::ENV_FLIP_Z;
        }
        flags
    }

    #[must_use]
    pub fn constants(&self, view: &ViewParams, draw: &LitDraw, env: &EnvBinding) -> PerBatchConstants {
        let m = &draw.material;
        let (env_box_min, env_box_max) = env.probe.map_or((Vec4::ZERO, Vec4::ZERO), |p| {
            let h = Vec3::splat(self.probe_box_half_extent);
            ((p.capture_pos - h).extend(0.0), (p.capture_pos + h).extend(0.0))
        });

        PerBatchConstants {
            view_proj: view.view_proj,
            light_view_proj: self.light_view_proj,
            camera_pos_ambient: view.camera_pos.extend(AMBIENT),
            camera_forward: view.camera_forward.extend(0.0),
            base_color: m.base_color,
            pbr_params: Vec4::new(m.metallic, m.roughness, m.ao, m.emissive_strength),
            material: Vec4::new(m.shadow_bias, 0.0, 0.0, 0.0),
            flags_counts: UVec4::new(
                Self::shader_flags(draw, env).bits(),
                self.light_count,
                self.spot_shadow_count,
                self.point_shadow_count,
            ),
            shadow_bias: self.shadow_bias,
            clip_plane: view.clip_plane,
            env_box_min,
            env_box_max,
        }
    }

    /// Records one lit draw from the frame's own view.
    pub fn record(&self, cmd: &mut CommandList, draw: &LitDraw) {
        self.record_with_view(cmd, &self.view, draw);
    }

    /// Records one lit draw with explicit view parameters.
    pub fn record_with_view(&self, cmd: &mut CommandList, view: &ViewParams, draw: &LitDraw) {
        if draw.instance_count == 0 || draw.geometry.index_count == 0 {
            return;
        }
        let env = self.env_for(draw.env_source, draw.reflection_probe);
        let m = &draw.material;

        cmd.bind_pipeline(self.pipelines.main(draw.perm));
        cmd.bind_texture_desc(TEX_ALBEDO, m.albedo);
        for (slot, index) in (TEX_MATERIAL_BASE..).zip(m.texture_indices().into_iter().skip(1)) {
            cmd.bind_texture_desc(slot, index);
        }
        cmd.bind_texture_desc(TEX_ENV, env.descriptor);
        if let Some(probe) = env.probe {
            cmd.bind_texture_array(TEX_ENV_ARRAY, probe.cube);
        }

        cmd.set_constants(0, &self.constants(view, draw, &env));
        draw.geometry
            .draw_instanced(cmd, self.instance_buffer, draw.instance_offset, draw.instance_count);
    }
}

impl ViewParams {
    /// Camera view with no clip plane.
    #[must_use]
    pub fn camera(view_proj: Mat4, camera_pos: Vec3, camera_forward: Vec3) -> Self {
        Self {
            view_proj,
            camera_pos,
            camera_forward,
            clip_plane: PerBatchConstants::default().clip_plane,
        }
    }
}
