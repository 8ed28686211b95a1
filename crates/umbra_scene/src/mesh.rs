//! Mesh resources referenced by draw items.

use slotmap::new_key_type;
use umbra_core::math::BoundingSphere;
use umbra_rhi::{BufferHandle, IndexFormat};

new_key_type! {
    /// Generational handle identifying a mesh resource.
    ///
    /// Used as the batching identity of a mesh; its `Ord` gives the stable
    /// ordering of shadow groups.
    pub struct MeshKey;
}

/// GPU geometry of one mesh.
#[derive(Debug, Clone)]
pub struct MeshResource {
    pub vertex_buffer: BufferHandle,
    pub vertex_stride: u32,
    pub index_buffer: BufferHandle,
    pub index_format: IndexFormat,
    pub index_count: u32,
    /// Object-local bounds. Meshes without bounds are never culled.
    pub bounds: Option<BoundingSphere>,
}

impl MeshResource {
    #[inline]
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.index_count > 0
    }
}
