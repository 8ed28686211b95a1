use glam::Vec3;
use umbra_rhi::{BufferHandle, CommandList, IndexFormat};
use umbra_scene::{EnvSource, MaterialKey, MaterialParams, MaterialPerm, MeshKey, MeshResource};

use super::instance::{INSTANCE_STRIDE, InstanceRange};

/// Vertex slot of the per-instance transform stream.
pub const INSTANCE_VERTEX_SLOT: u32 = 1;

/// Copy of the buffers needed to draw a mesh.
///
/// Draw lists hold this instead of a scene reference so pass callbacks can
/// capture them by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawGeometry {
    pub vertex_buffer: BufferHandle,
    pub vertex_stride: u32,
    pub index_buffer: BufferHandle,
    pub index_format: IndexFormat,
    pub index_count: u32,
}

impl DrawGeometry {
    #[must_use]
    pub fn of(mesh: &MeshResource) -> Self {
        Self {
            vertex_buffer: mesh.vertex_buffer,
            vertex_stride: mesh.vertex_stride,
            index_buffer: mesh.index_buffer,
            index_format: mesh.index_format,
            index_count: mesh.index_count,
        }
    }

    /// Binds geometry plus the instance stream starting at
    /// `first_instance` and issues one instanced draw.
    pub fn draw_instanced(
        &self,
        cmd: &mut CommandList,
        instance_buffer: BufferHandle,
        first_instance: u32,
        instance_count: u32,
    ) {
        cmd.bind_vertex_buffer(0, self.vertex_buffer, self.vertex_stride, 0);
        cmd.bind_vertex_buffer(
            INSTANCE_VERTEX_SLOT,
            instance_buffer,
            INSTANCE_STRIDE,
            u64::from(first_instance) * u64::from(INSTANCE_STRIDE),
        );
        cmd.bind_index_buffer(self.index_buffer, self.index_format, 0);
        cmd.draw_indexed(self.index_count, instance_count);
    }
}

/// Material-independent caster group of one mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowBatch {
    pub mesh: MeshKey,
    pub geometry: DrawGeometry,
    pub instance_offset: u32,
    pub instance_count: u32,
}

/// Instances sharing mesh and every shading parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Batch {
    pub mesh: MeshKey,
    pub geometry: DrawGeometry,
    /// Material of the first item in the batch.
    pub material_key: Option<MaterialKey>,
    pub material: MaterialParams,
    pub perm: MaterialPerm,
    pub env_source: EnvSource,
    pub instance_offset: u32,
    pub instance_count: u32,
    pub reflection_probe: Option<u32>,
}

/// One blended item, drawn on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransparentDraw {
    pub draw_item: usize,
    pub mesh: MeshKey,
    pub geometry: DrawGeometry,
    pub material_key: Option<MaterialKey>,
    pub material: MaterialParams,
    pub perm: MaterialPerm,
    pub env_source: EnvSource,
    pub instance_offset: u32,
    /// Squared distance from the camera, the sort key.
    pub dist2: f32,
}

/// One mirror surface with its world plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarMirrorDraw {
    pub draw_item: usize,
    pub mesh: MeshKey,
    pub geometry: DrawGeometry,
    pub material_key: Option<MaterialKey>,
    pub material: MaterialParams,
    pub instance_offset: u32,
    pub plane_point: Vec3,
    /// Unit length.
    pub plane_normal: Vec3,
}

macro_rules! impl_range {
    ($($ty:ty),*) => {$(
        impl $ty {
            #[inline]
            #[must_use]
            pub fn range(&self) -> InstanceRange {
                InstanceRange {
                    offset: self.instance_offset,
                    count: self.instance_count,
                }
            }
        }
    )*};
}

impl_range!(ShadowBatch, Batch);

/// Per-frame draw list sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub shadow_batches: usize,
    pub main_batches: usize,
    pub capture_batches: usize,
    pub transparent_draws: usize,
    pub mirror_draws: usize,
    pub layered_shadow_batches: usize,
    pub layered_capture_batches: usize,
    pub main_instances: u32,
    pub shadow_instances: u32,
    pub total_instances: u32,
}
