//! Overlay passes drawn on top of the finished frame.

use glam::Mat4;
use umbra_rhi::{BufferHandle, ClearDesc, PipelineHandle, PrimitiveTopology, RenderState, Viewport};

use crate::constants::DebugLineConstants;
use crate::debug::{AtlasRect, CubeAtlasMode, DEBUG_VERTEX_STRIDE, cube_atlas_constants};
use crate::graph::{PassAttachments, RenderGraph, RgTexture};

/// Bytes per vertex of the atlas fullscreen triangle: clip xy, uv.
pub(crate) const ATLAS_VERTEX_STRIDE: u32 = 16;

/// Clip-space triangle covering the viewport, with uv in `[0, 1]` on screen.
pub(crate) const ATLAS_TRIANGLE: [[f32; 4]; 3] = [
    [-1.0, -1.0, 0.0, 1.0],
    [3.0, -1.0, 2.0, 1.0],
    [-1.0, 3.0, 0.0, -1.0],
];

pub(crate) struct CubeAtlasInputs {
    pub cube: RgTexture,
    pub mode: CubeAtlasMode,
    pub rect: AtlasRect,
    pub pipeline: PipelineHandle,
    pub vertex_buffer: BufferHandle,
}

pub(crate) fn add_cube_atlas_pass(graph: &mut RenderGraph<'_>, inputs: CubeAtlasInputs) {
    let constants = cube_atlas_constants(&inputs.rect, inputs.mode);
    let cube = inputs.cube;

    graph.add_swapchain_pass(
        "DebugCubeAtlas",
        PassAttachments::new().read(cube).clear(ClearDesc::LOAD),
        move |ctx| {
            let Some(texture) = ctx.texture(cube) else {
                return;
            };
            let full = Viewport::new(0, 0, ctx.extent.width, ctx.extent.height);
            let cmd = &mut *ctx.commands;
            cmd.set_viewport(inputs.rect.viewport());
            cmd.set_state(RenderState::overlay());
            cmd.bind_pipeline(inputs.pipeline);
            cmd.set_primitive_topology(PrimitiveTopology::TriangleList);
            cmd.bind_vertex_buffer(0, inputs.vertex_buffer, ATLAS_VERTEX_STRIDE, 0);
            cmd.bind_texture_array(0, texture);
            cmd.set_constants(0, &constants);
            cmd.draw(3, 1);
            cmd.set_viewport(full);
        },
    );
}

pub(crate) struct DebugLineInputs {
    pub view_proj: Mat4,
    pub vertex_count: u32,
    pub depth_test: bool,
    pub pipeline: PipelineHandle,
    pub vertex_buffer: BufferHandle,
}

pub(crate) fn add_debug_lines_pass(graph: &mut RenderGraph<'_>, inputs: DebugLineInputs) {
    let constants = DebugLineConstants {
        view_proj: inputs.view_proj,
    };
    graph.add_swapchain_pass(
        "DebugLines",
        PassAttachments::new().clear(ClearDesc::LOAD),
        move |ctx| {
            let cmd = &mut *ctx.commands;
            cmd.set_state(RenderState::debug_lines(inputs.depth_test));
            cmd.bind_pipeline(inputs.pipeline);
            cmd.set_primitive_topology(PrimitiveTopology::LineList);
            cmd.bind_vertex_buffer(0, inputs.vertex_buffer, DEBUG_VERTEX_STRIDE, 0);
            cmd.set_constants(0, &constants);
            cmd.draw(inputs.vertex_count, 1);
            cmd.set_primitive_topology(PrimitiveTopology::TriangleList);
        },
    );
}
