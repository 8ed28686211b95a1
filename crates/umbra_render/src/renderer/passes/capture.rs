//! Reflection probe capture.
//!
//! Each dirty probe re-renders its cube from the capture position: an
//! optional skybox background per face, then the opaque scene without the
//! probe's own batches, with the technique chosen for this frame.

use glam::{Mat4, UVec4, Vec3};
use umbra_rhi::{
    BufferHandle, CUBE_FACE_COUNT, ClearDesc, CommandList, DescriptorIndex, Extent2d,
    PipelineHandle, RenderState, TextureKind,
};

use crate::batch::Batch;
use crate::constants::{
    AMBIENT, ReflectionCaptureConstants, ReflectionCaptureFaceConstants, ShaderFlags,
    SkyboxConstants,
};
use crate::graph::{PassAttachments, RenderGraph, RgTexture, RgTextureDesc};
use crate::pipelines::{PROBE_COLOR_FORMAT, PROBE_DEPTH_FORMAT};
use crate::probes::ProbeUpdate;
use crate::shading::{BUF_LIGHTS, TEX_ALBEDO};
use crate::shadow::cube_face_view_rh;
use crate::technique::{CubeSelection, CubeTechnique};

const CAPTURE_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const MIN_CAPTURE_NEAR: f32 = 0.001;

/// Near and far planes of a capture, kept strictly ordered.
#[must_use]
pub fn capture_depth_range(near_z: f32, far_z: f32) -> (f32, f32) {
    let near = near_z.max(MIN_CAPTURE_NEAR);
    (near, far_z.max(near + 0.01))
}

/// 90° square projection shared by every capture face.
#[must_use]
pub fn capture_projection(near_z: f32, far_z: f32) -> Mat4 {
    let (near, far) = capture_depth_range(near_z, far_z);
    Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far)
}

pub(crate) struct CapturePassInputs<'i> {
    pub resolution: u32,
    pub near_z: f32,
    pub far_z: f32,
    pub skybox: DescriptorIndex,
    pub skybox_pipeline: PipelineHandle,
    pub instance_buffer: BufferHandle,
    pub lights_buffer: BufferHandle,
    pub light_count: u32,
    pub capture_batches: &'i [Batch],
    pub layered_capture_batches: &'i [Batch],
}

/// Adds every pass that refreshes one probe and returns its imported cube.
///
/// `select` resolves the technique; it is asked again without the layered
/// tier when the probe has no layered batches of its own to draw.
pub(crate) fn add_probe_capture(
    graph: &mut RenderGraph<'_>,
    inputs: &CapturePassInputs<'_>,
    update: &ProbeUpdate,
    mut select: impl FnMut(bool) -> CubeSelection,
) -> RgTexture {
    let p = update.probe_index;
    let extent = Extent2d::square(inputs.resolution);
    let cube = graph.import_texture(
        update.textures.cube,
        RgTextureDesc::attachment(format!("ReflectionProbe_{p}_Cube"), extent, TextureKind::Cube, PROBE_COLOR_FORMAT),
    );
    let proj = capture_projection(inputs.near_z, inputs.far_z);
    let face_view_proj: [Mat4; 6] =
        std::array::from_fn(|f| proj * cube_face_view_rh(update.capture_pos, f as u32));

    let has_skybox = inputs.skybox.is_some();
    let mut face_depth: Option<RgTexture> = None;

    if has_skybox {
        let depth = *face_depth.get_or_insert_with(|| temp_depth(graph, p, extent));
        for face in 0..CUBE_FACE_COUNT {
            let constants = SkyboxConstants {
                inv_view_proj: (proj * cube_face_view_rh(Vec3::ZERO, face)).inverse(),
            };
            let (pipeline, skybox) = (inputs.skybox_pipeline, inputs.skybox);
            graph.add_pass(
                format!("ReflectionProbe_{p}_Skybox_Face_{face}"),
                PassAttachments::new()
                    .color_face(cube, face)
                    .depth(depth)
                    .clear(ClearDesc::color_depth(CAPTURE_CLEAR)),
                move |ctx| {
                    let cmd = &mut *ctx.commands;
                    cmd.set_state(RenderState::skybox());
                    cmd.bind_pipeline(pipeline);
                    cmd.bind_texture_desc(TEX_ALBEDO, skybox);
                    cmd.set_constants(0, &constants);
                    cmd.draw(3, 1);
                },
            );
        }
    }

    // Keep the skybox color when it was drawn.
    let mesh_clear = if has_skybox {
        ClearDesc::depth_only()
    } else {
        ClearDesc::color_depth(CAPTURE_CLEAR)
    };
    let excluding_self = |batches: &[Batch]| -> Vec<Batch> {
        batches
            .iter()
            .filter(|b| b.reflection_probe != Some(p))
            .copied()
            .collect()
    };

    let mut selection = select(true);
    let mut batches = match selection.technique {
        CubeTechnique::Layered => excluding_self(inputs.layered_capture_batches),
        _ => excluding_self(inputs.capture_batches),
    };
    if selection.technique == CubeTechnique::Layered && batches.is_empty() {
        selection = select(false);
        batches = excluding_self(inputs.capture_batches);
    }

    let capture_pos_ambient = update.capture_pos.extend(AMBIENT);
    let (instance_buffer, lights_buffer, light_count) =
        (inputs.instance_buffer, inputs.lights_buffer, inputs.light_count);
    let pipeline = selection.pipeline;

    if selection.technique.is_single_pass() {
        let depth = graph.import_texture(
            update.textures.depth_cube,
            RgTextureDesc::attachment(
                format!("ReflectionProbe_{p}_DepthCube"),
                extent,
                TextureKind::Cube,
                PROBE_DEPTH_FORMAT,
            ),
        );
        graph.add_pass(
            format!("ReflectionProbe_{p}_{}", selection.technique.suffix()),
            PassAttachments::new()
                .color_all_faces(cube)
                .depth_all_faces(depth)
                .clear(mesh_clear),
            move |ctx| {
                let cmd = &mut *ctx.commands;
                cmd.set_state(RenderState::opaque());
                cmd.bind_pipeline(pipeline);
                cmd.bind_structured_buffer(BUF_LIGHTS, lights_buffer);
                for batch in &batches {
                    let constants = ReflectionCaptureConstants {
                        face_view_proj,
                        capture_pos_ambient,
                        base_color: batch.material.base_color,
                        params: capture_params(light_count, batch),
                    };
                    cmd.set_constants(0, &constants);
                    draw_capture_batch(cmd, batch, instance_buffer);
                }
            },
        );
    } else {
        let depth = *face_depth.get_or_insert_with(|| temp_depth(graph, p, extent));
        for face in 0..CUBE_FACE_COUNT {
            let batches = batches.clone();
            let view_proj = face_view_proj[face as usize];
            graph.add_pass(
                format!("ReflectionProbe_{p}_Face_{face}"),
                PassAttachments::new()
                    .color_face(cube, face)
                    .depth(depth)
                    .clear(mesh_clear),
                move |ctx| {
                    let cmd = &mut *ctx.commands;
                    cmd.set_state(RenderState::opaque());
                    cmd.bind_pipeline(pipeline);
                    cmd.bind_structured_buffer(BUF_LIGHTS, lights_buffer);
                    for batch in &batches {
                        let constants = ReflectionCaptureFaceConstants {
                            view_proj,
                            capture_pos_ambient,
                            base_color: batch.material.base_color,
                            params: capture_params(light_count, batch),
                        };
                        cmd.set_constants(0, &constants);
                        draw_capture_batch(cmd, batch, instance_buffer);
                    }
                },
            );
        }
    }

    cube
}

/// 2D depth shared by the per-face passes of one probe.
fn temp_depth(graph: &mut RenderGraph<'_>, probe: u32, extent: Extent2d) -> RgTexture {
    graph.create_texture(RgTextureDesc::attachment(
        format!("ReflectionProbe_{probe}_DepthTmp"),
        extent,
        TextureKind::D2,
        PROBE_DEPTH_FORMAT,
    ))
}

fn capture_params(light_count: u32, batch: &Batch) -> UVec4 {
    let mut flags = ShaderFlags::empty();
    flags.set(ShaderFlags::USE_TEX, batch.material.albedo.is_some());
    UVec4::new(light_count, flags.bits(), 0, 0)
}

fn draw_capture_batch(cmd: &mut CommandList, batch: &Batch, instance_buffer: BufferHandle) {
    if batch.instance_count == 0 {
        return;
    }
    if batch.material.albedo.is_some() {
        cmd.bind_texture_desc(TEX_ALBEDO, batch.material.albedo);
    }
    batch
        .geometry
        .draw_instanced(cmd, instance_buffer, batch.instance_offset, batch.instance_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_range_stays_ordered() {
        assert_eq!(capture_depth_range(0.0, 0.0), (0.001, 0.011));
        let (near, far) = capture_depth_range(0.05, 200.0);
        assert!((near - 0.05).abs() < 1e-6 && (far - 200.0).abs() < 1e-6);
    }
}
