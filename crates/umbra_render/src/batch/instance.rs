use glam::{Mat4, Vec4};
use umbra_core::errors::{Result, UmbraError};
use umbra_rhi::{BufferHandle, CUBE_FACE_COUNT, RenderDevice};

use super::draw::{Batch, DrawStats, PlanarMirrorDraw, ShadowBatch, TransparentDraw};

/// Per-instance world transform, stored as four row vectors.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub rows: [Vec4; 4],
}

impl InstanceData {
    #[must_use]
    pub fn from_matrix(model: &Mat4) -> Self {
        Self {
            rows: [model.row(0), model.row(1), model.row(2), model.row(3)],
        }
    }

    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_cols(self.rows[0], self.rows[1], self.rows[2], self.rows[3]).transpose()
    }
}

/// Byte stride of one [`InstanceData`].
pub const INSTANCE_STRIDE: u32 = std::mem::size_of::<InstanceData>() as u32;

/// `[offset, offset + count)` in the combined instance buffer, in instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceRange {
    pub offset: u32,
    pub count: u32,
}

impl InstanceRange {
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset + self.count
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the two ranges share at least one instance.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.offset < other.end() && other.offset < self.end()
    }
}

/// Where each instance group landed in the combined buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupRanges {
    pub shadow: InstanceRange,
    pub main: InstanceRange,
    pub capture: InstanceRange,
    pub transparent: InstanceRange,
    pub mirrors: InstanceRange,
    pub layered_shadow: InstanceRange,
    pub layered_capture: InstanceRange,
}

impl GroupRanges {
    /// All groups in buffer order.
    #[must_use]
    pub fn all(&self) -> [(&'static str, InstanceRange); 7] {
        [
            ("shadow", self.shadow),
            ("main", self.main),
            ("capture", self.capture),
            ("transparent", self.transparent),
            ("mirrors", self.mirrors),
            ("layered_shadow", self.layered_shadow),
            ("layered_capture", self.layered_capture),
        ]
    }
}

/// Rounds up to the next multiple of the cubemap face count.
#[inline]
#[must_use]
pub(crate) const fn align_to_faces(value: u32) -> u32 {
    value.div_ceil(CUBE_FACE_COUNT) * CUBE_FACE_COUNT
}

/// Output of one [`BatchBuilder::build`](super::BatchBuilder::build).
///
/// Every offset stored in the draw lists is absolute in [`instances`](Self::instances).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInstances {
    pub instances: Vec<InstanceData>,
    pub groups: GroupRanges,

    pub shadow_batches: Vec<ShadowBatch>,
    pub main_batches: Vec<Batch>,
    /// No-cull opaque batches for probe capture and planar reflections.
    pub capture_batches: Vec<Batch>,
    /// Farthest first.
    pub transparent_draws: Vec<TransparentDraw>,
    pub mirror_draws: Vec<PlanarMirrorDraw>,
    /// Shadow batches with every instance repeated once per cube face.
    pub layered_shadow_batches: Vec<ShadowBatch>,
    /// Capture batches with every instance repeated once per cube face.
    pub layered_capture_batches: Vec<Batch>,
}

impl FrameInstances {
    #[inline]
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.instances.len() as u64 * u64::from(INSTANCE_STRIDE)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Batches for the main pass, honouring the no-cull fallback used by
    /// planar reflections.
    #[must_use]
    pub fn planar_source_batches(&self) -> &[Batch] {
        if self.capture_batches.is_empty() {
            &self.main_batches
        } else {
            &self.capture_batches
        }
    }

    #[must_use]
    pub fn stats(&self) -> DrawStats {
        DrawStats {
            shadow_batches: self.shadow_batches.len(),
            main_batches: self.main_batches.len(),
            capture_batches: self.capture_batches.len(),
            transparent_draws: self.transparent_draws.len(),
            mirror_draws: self.mirror_draws.len(),
            layered_shadow_batches: self.layered_shadow_batches.len(),
            layered_capture_batches: self.layered_capture_batches.len(),
            main_instances: self.groups.main.count,
            shadow_instances: self.groups.shadow.count,
            total_instances: self.instance_count(),
        }
    }

    /// Writes the combined buffer with a single upload.
    ///
    /// # Errors
    ///
    /// [`UmbraError::InstanceBufferOverflow`] if the data does not fit in
    /// `capacity_bytes`. Nothing is written in that case; data is never
    /// truncated.
    pub fn upload(
        &self,
        device: &mut dyn RenderDevice,
        buffer: BufferHandle,
        capacity_bytes: u64,
    ) -> Result<()> {
        let required = self.byte_size();
        if required > capacity_bytes {
            return Err(UmbraError::InstanceBufferOverflow {
                required,
                capacity: capacity_bytes,
            });
        }
        if required > 0 {
            device.write_buffer(buffer, 0, self.as_bytes())?;
        }
        Ok(())
    }
}
