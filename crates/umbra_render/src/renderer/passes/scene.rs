//! Depth pre-pass and the main forward pass.

use glam::Mat4;
use umbra_rhi::{BufferHandle, ClearDesc, CommandList, DescriptorIndex, PipelineHandle, RenderState};

use crate::batch::{Batch, ShadowBatch, TransparentDraw};
use crate::constants::{DepthPassConstants, SkyboxConstants};
use crate::graph::{PassAttachments, RenderGraph, RgTexture};
use crate::planar::{PlanarPlan, record_planar_reflections};
use crate::shading::{
    LitDraw, ShadingContext, TEX_ALBEDO, TEX_DIR_SHADOW, TEX_POINT_SHADOW_BASE,
    TEX_SPOT_SHADOW_BASE,
};

use super::shadow::{ShadowTargets, draw_shadow_batches};

pub(crate) fn add_depth_prepass(
    graph: &mut RenderGraph<'_>,
    view_proj: Mat4,
    pipeline: PipelineHandle,
    batches: Vec<ShadowBatch>,
    instance_buffer: BufferHandle,
) {
    let depth = graph.swapchain_depth();
    let constants = DepthPassConstants { view_proj };
    graph.add_pass(
        "DepthPrepass",
        PassAttachments::new().depth(depth).clear(ClearDesc::depth_only()),
        move |ctx| {
            let cmd = &mut *ctx.commands;
            cmd.set_state(RenderState::depth_prepass());
            cmd.bind_pipeline(pipeline);
            cmd.set_constants(0, &constants);
            draw_shadow_batches(cmd, &batches, instance_buffer);
        },
    );
}

/// Skybox drawn behind opaque geometry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SkyboxDraw {
    pub pipeline: PipelineHandle,
    pub cube: DescriptorIndex,
    pub inv_view_proj: Mat4,
}

pub(crate) struct MainPassInputs {
    pub clear_color: [f32; 4],
    /// Depth was laid down by the pre-pass and must be kept.
    pub after_prepass: bool,
    pub shading: ShadingContext,
    pub opaque: Vec<Batch>,
    pub transparent: Vec<TransparentDraw>,
    pub skybox: Option<SkyboxDraw>,
    pub planar: Option<PlanarPlan>,
    /// Probe cubes sampled by lit draws.
    pub probe_cubes: Vec<RgTexture>,
}

pub(crate) fn add_main_pass(graph: &mut RenderGraph<'_>, shadows: &ShadowTargets, inputs: MainPassInputs) {
    let clear = if inputs.after_prepass {
        ClearDesc {
            color: Some(inputs.clear_color),
            depth: None,
            stencil: Some(0),
        }
    } else {
        ClearDesc::color_depth(inputs.clear_color)
    };
    let attachments = PassAttachments::new()
        .reads(shadows.all())
        .reads(inputs.probe_cubes.iter().copied())
        .clear(clear);
    let shadows = shadows.clone();

    graph.add_swapchain_pass("MainPass", attachments, move |ctx| {
        let main_state = if inputs.after_prepass {
            RenderState::after_depth_prepass()
        } else {
            RenderState::opaque()
        };

        // Shadow textures resolve for every declared read.
        let atlas = shadows.atlas.and_then(|t| ctx.texture(t));
        let spots: Vec<_> = shadows.spots.iter().filter_map(|&t| ctx.texture(t)).collect();
        let points: Vec<_> = shadows.points.iter().filter_map(|&t| ctx.texture(t)).collect();

        let cmd = &mut *ctx.commands;
        let shading = &inputs.shading;
        cmd.set_state(main_state);
        shading.bind_frame(cmd);
        if let Some(atlas) = atlas {
            cmd.bind_texture_array(TEX_DIR_SHADOW, atlas);
        }
        for (slot, texture) in (TEX_SPOT_SHADOW_BASE..).zip(spots) {
            cmd.bind_texture_array(slot, texture);
        }
        for (slot, texture) in (TEX_POINT_SHADOW_BASE..).zip(points) {
            cmd.bind_texture_array(slot, texture);
        }

        for batch in &inputs.opaque {
            shading.record(cmd, &LitDraw::from(batch));
        }

        if let Some(skybox) = inputs.skybox {
            record_skybox(cmd, &skybox);
            cmd.set_state(main_state);
        }

        if let Some(plan) = &inputs.planar {
            record_planar_reflections(cmd, plan, shading);
        }

        if !inputs.transparent.is_empty() {
            cmd.set_state(RenderState::transparent());
            for draw in &inputs.transparent {
                shading.record(cmd, &LitDraw::from(draw));
            }
        }
    });
}

fn record_skybox(cmd: &mut CommandList, skybox: &SkyboxDraw) {
    cmd.set_state(RenderState::skybox());
    cmd.bind_pipeline(skybox.pipeline);
    cmd.bind_texture_desc(TEX_ALBEDO, skybox.cube);
    cmd.set_constants(
        0,
        &SkyboxConstants {
            inv_view_proj: skybox.inv_view_proj,
        },
    );
    cmd.draw(3, 1);
}
