//! Shadow map passes: the cascade atlas, spot depth maps and point
//! distance cubes.

use smallvec::SmallVec;
use umbra_rhi::{
    BufferHandle, CUBE_FACE_COUNT, ClearDesc, CommandList, Extent2d, PipelineHandle, RenderState,
    TextureKind, Viewport,
};

use crate::batch::{FrameInstances, ShadowBatch};
use crate::constants::{DepthPassConstants, PointShadowCubeConstants, PointShadowFaceConstants};
use crate::graph::{PassAttachments, RenderGraph, RgTexture, RgTextureDesc};
use crate::pipelines::{POINT_SHADOW_COLOR_FORMAT, SHADOW_DEPTH_FORMAT};
use crate::shadow::{CascadeSetup, LocalShadows, MAX_POINT_SHADOWS, MAX_SPOT_SHADOWS, PointShadow};
use crate::technique::{CubeSelection, CubeTechnique};

/// Point shadows clear to the far end of the normalized distance range.
const POINT_SHADOW_CLEAR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Shadow textures written this frame, for the passes that sample them.
#[derive(Debug, Clone, Default)]
pub(crate) struct ShadowTargets {
    pub atlas: Option<RgTexture>,
    pub spots: SmallVec<[RgTexture; MAX_SPOT_SHADOWS]>,
    pub points: SmallVec<[RgTexture; MAX_POINT_SHADOWS]>,
}

impl ShadowTargets {
    pub fn all(&self) -> impl Iterator<Item = RgTexture> + '_ {
        self.atlas
            .iter()
            .chain(self.spots.iter())
            .chain(self.points.iter())
            .copied()
    }
}

pub(crate) struct ShadowPassInputs<'i> {
    pub cascades: &'i CascadeSetup,
    pub local: &'i LocalShadows,
    pub instances: &'i FrameInstances,
    pub instance_buffer: BufferHandle,
    pub shadow_pipeline: PipelineHandle,
    pub spot_resolution: u32,
    pub point_resolution: u32,
    /// Technique for point shadows, `None` when there are none.
    pub point_selection: Option<CubeSelection>,
}

pub(crate) fn draw_shadow_batches(
    cmd: &mut CommandList,
    batches: &[ShadowBatch],
    instance_buffer: BufferHandle,
) {
    for batch in batches.iter().filter(|b| b.instance_count > 0) {
        batch
            .geometry
            .draw_instanced(cmd, instance_buffer, batch.instance_offset, batch.instance_count);
    }
}

pub(crate) fn add_shadow_passes(graph: &mut RenderGraph<'_>, inputs: &ShadowPassInputs<'_>) -> ShadowTargets {
    let mut targets = ShadowTargets {
        atlas: add_cascade_pass(graph, inputs),
        ..ShadowTargets::default()
    };

    for (index, spot) in inputs.local.spots.iter().enumerate() {
        let depth = graph.create_texture(RgTextureDesc::attachment(
            format!("SpotShadow_{index}"),
            Extent2d::square(inputs.spot_resolution),
            TextureKind::D2,
            SHADOW_DEPTH_FORMAT,
        ));
        let batches = inputs.instances.shadow_batches.clone();
        let constants = DepthPassConstants {
            view_proj: spot.view_proj,
        };
        let (pipeline, buffer) = (inputs.shadow_pipeline, inputs.instance_buffer);

        graph.add_pass(
            format!("SpotShadow_{index}"),
            PassAttachments::new().depth(depth).clear(ClearDesc::depth_only()),
            move |ctx| {
                let cmd = &mut *ctx.commands;
                cmd.set_state(RenderState::shadow());
                cmd.bind_pipeline(pipeline);
                cmd.set_constants(0, &constants);
                draw_shadow_batches(cmd, &batches, buffer);
            },
        );
        targets.spots.push(depth);
    }

    if let Some(selection) = inputs.point_selection {
        for (index, point) in inputs.local.points.iter().enumerate() {
            targets
                .points
                .push(add_point_shadow(graph, inputs, selection, index, point));
        }
    }

    targets
}

fn add_cascade_pass(graph: &mut RenderGraph<'_>, inputs: &ShadowPassInputs<'_>) -> Option<RgTexture> {
    let cascades = inputs.cascades;
    if cascades.cascades.is_empty() {
        return None;
    }

    let atlas = graph.create_texture(RgTextureDesc::attachment(
        "CascadeShadowAtlas",
        cascades.atlas_extent(),
        TextureKind::D2,
        SHADOW_DEPTH_FORMAT,
    ));
    let tile = cascades.tile_size;
    let view_projs: SmallVec<[_; 3]> = cascades.cascades.iter().map(|c| c.view_proj).collect();
    let batches = inputs.instances.shadow_batches.clone();
    let (pipeline, buffer) = (inputs.shadow_pipeline, inputs.instance_buffer);

    graph.add_pass(
        "CascadeShadowAtlas",
        PassAttachments::new().depth(atlas).clear(ClearDesc::depth_only()),
        move |ctx| {
            let cmd = &mut *ctx.commands;
            cmd.set_state(RenderState::shadow());
            cmd.bind_pipeline(pipeline);
            for (c, view_proj) in view_projs.iter().enumerate() {
                cmd.set_viewport(Viewport::new(c as u32 * tile, 0, tile, tile));
                cmd.set_constants(0, &DepthPassConstants { view_proj: *view_proj });
                draw_shadow_batches(cmd, &batches, buffer);
            }
        },
    );
    Some(atlas)
}

fn add_point_shadow(
    graph: &mut RenderGraph<'_>,
    inputs: &ShadowPassInputs<'_>,
    selection: CubeSelection,
    index: usize,
    point: &PointShadow,
) -> RgTexture {
    let extent = Extent2d::square(inputs.point_resolution);
    let cube = graph.create_texture(RgTextureDesc::attachment(
        format!("PointShadow_{index}"),
        extent,
        TextureKind::Cube,
        POINT_SHADOW_COLOR_FORMAT,
    ));
    let clear = ClearDesc::color_depth(POINT_SHADOW_CLEAR);
    let buffer = inputs.instance_buffer;
    let pipeline = selection.pipeline;
    let pos_range = point.pos_range();

    match selection.technique {
        CubeTechnique::Layered | CubeTechnique::ViewInstancing => {
            let depth = graph.create_texture(RgTextureDesc::attachment(
                format!("PointShadow_{index}_DepthCube"),
                extent,
                TextureKind::Cube,
                SHADOW_DEPTH_FORMAT,
            ));
            // Layered draws repeat every instance once per face.
            let batches = if selection.technique == CubeTechnique::Layered {
                inputs.instances.layered_shadow_batches.clone()
            } else {
                inputs.instances.shadow_batches.clone()
            };
            let constants = PointShadowCubeConstants {
                face_view_proj: point.face_view_proj,
                light_pos_range: pos_range,
            };

            graph.add_pass(
                format!("PointShadow_{index}_{}", selection.technique.suffix()),
                PassAttachments::new()
                    .color_all_faces(cube)
                    .depth_all_faces(depth)
                    .clear(clear),
                move |ctx| {
                    let cmd = &mut *ctx.commands;
                    cmd.set_state(RenderState::shadow());
                    cmd.bind_pipeline(pipeline);
                    cmd.set_constants(0, &constants);
                    draw_shadow_batches(cmd, &batches, buffer);
                },
            );
        }
        CubeTechnique::SixPass => {
            let depth = graph.create_texture(RgTextureDesc::attachment(
                format!("PointShadow_{index}_DepthTmp"),
                extent,
                TextureKind::D2,
                SHADOW_DEPTH_FORMAT,
            ));
            for face in 0..CUBE_FACE_COUNT {
                let batches = inputs.instances.shadow_batches.clone();
                let constants = PointShadowFaceConstants {
                    view_proj: point.face_view_proj[face as usize],
                    light_pos_range: pos_range,
                };
                graph.add_pass(
                    format!("PointShadow_{index}_Face_{face}"),
                    PassAttachments::new()
                        .color_face(cube, face)
                        .depth(depth)
                        .clear(clear),
                    move |ctx| {
                        let cmd = &mut *ctx.commands;
                        cmd.set_state(RenderState::shadow());
                        cmd.bind_pipeline(pipeline);
                        cmd.set_constants(0, &constants);
                        draw_shadow_batches(cmd, &batches, buffer);
                    },
                );
            }
        }
    }
    cube
}
