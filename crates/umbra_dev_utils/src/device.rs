//! A [`RenderDevice`] that keeps everything in memory.
//!
//! Buffers hold their bytes, textures and pipelines keep their descriptors,
//! and every submitted [`CommandList`] is stored for inspection. Pipeline
//! creation can be made to fail by label to exercise fallback paths.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use umbra_core::errors::DeviceError;
use umbra_rhi::{
    BufferDesc, BufferHandle, CommandList, DescriptorIndex, DeviceCaps, PipelineDesc,
    PipelineHandle, RenderDevice, TextureDesc, TextureHandle,
};

#[derive(Debug, Clone)]
struct BufferRecord {
    desc: BufferDesc,
    data: Vec<u8>,
}

/// Counters of device object churn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCounters {
    pub buffers_created: usize,
    pub buffers_destroyed: usize,
    pub textures_created: usize,
    pub textures_destroyed: usize,
    pub pipelines_created: usize,
    pub pipeline_failures: usize,
    pub wait_idle_calls: usize,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    caps: DeviceCaps,
    buffers: SlotMap<BufferHandle, BufferRecord>,
    textures: SlotMap<TextureHandle, TextureDesc>,
    pipelines: SlotMap<PipelineHandle, PipelineDesc>,
    descriptors: FxHashMap<DescriptorIndex, TextureHandle>,
    next_descriptor: u32,
    failing_pipelines: FxHashSet<String>,
    pipeline_attempts: Vec<String>,
    submissions: Vec<CommandList>,
    counters: DeviceCounters,
}

impl RecordingDevice {
    /// A device reporting `caps`.
    #[must_use]
    pub fn new(caps: DeviceCaps) -> Self {
        Self {
            caps,
            next_descriptor: 1,
            ..Self::default()
        }
    }

    /// A device with every optional feature.
    #[must_use]
    pub fn full() -> Self {
        Self::new(DeviceCaps::all())
    }

    /// A device with no optional features: cube rendering falls back to six
    /// passes.
    #[must_use]
    pub fn minimal() -> Self {
        Self::new(DeviceCaps::empty())
    }

    /// Makes every future `create_pipeline` with this label fail.
    pub fn fail_pipeline(&mut self, label: impl Into<String>) {
        self.failing_pipelines.insert(label.into());
    }

    #[must_use]
    pub fn with_failing_pipeline(mut self, label: impl Into<String>) -> Self {
        self.fail_pipeline(label);
        self
    }

    pub fn set_capabilities(&mut self, caps: DeviceCaps) {
        self.caps = caps;
    }

    // ─── Inspection ──────────────────────────────────────────────────────

    #[must_use]
    pub fn counters(&self) -> DeviceCounters {
        self.counters
    }

    /// Creation attempts for pipelines with this label, failed ones included.
    #[must_use]
    pub fn pipeline_attempts(&self, label: &str) -> usize {
        self.pipeline_attempts.iter().filter(|l| *l == label).count()
    }

    #[must_use]
    pub fn pipeline_desc(&self, pipeline: PipelineHandle) -> Option<&PipelineDesc> {
        self.pipelines.get(pipeline)
    }

    #[must_use]
    pub fn pipeline_label(&self, pipeline: PipelineHandle) -> Option<&str> {
        self.pipelines.get(pipeline).map(|d| d.label.as_str())
    }

    #[must_use]
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer).map(|b| b.data.as_slice())
    }

    #[must_use]
    pub fn buffer_desc(&self, buffer: BufferHandle) -> Option<&BufferDesc> {
        self.buffers.get(buffer).map(|b| &b.desc)
    }

    /// First live buffer with this label.
    #[must_use]
    pub fn find_buffer(&self, label: &str) -> Option<BufferHandle> {
        self.buffers
            .iter()
            .find(|(_, b)| b.desc.label == label)
            .map(|(handle, _)| handle)
    }

    #[must_use]
    pub fn texture_desc(&self, texture: TextureHandle) -> Option<&TextureDesc> {
        self.textures.get(texture)
    }

    #[must_use]
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn live_descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn submissions(&self) -> &[CommandList] {
        &self.submissions
    }

    #[must_use]
    pub fn last_submission(&self) -> Option<&CommandList> {
        self.submissions.last()
    }

    pub fn clear_submissions(&mut self) {
        self.submissions.clear();
    }
}

impl RenderDevice for RecordingDevice {
    fn capabilities(&self) -> DeviceCaps {
        self.caps
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle, DeviceError> {
        if desc.size == 0 {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.clone(),
                reason: "zero-sized buffer".to_owned(),
            });
        }
        self.counters.buffers_created += 1;
        Ok(self.buffers.insert(BufferRecord {
            desc: desc.clone(),
            data: vec![0; desc.size as usize],
        }))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(buffer).is_some() {
            self.counters.buffers_destroyed += 1;
        }
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let record = self
            .buffers
            .get_mut(buffer)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("{buffer:?}")))?;
        let len = data.len() as u64;
        let size = record.desc.size;
        if offset + len > size {
            return Err(DeviceError::WriteOutOfBounds { offset, len, size });
        }
        let start = offset as usize;
        record.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, DeviceError> {
        if desc.extent.is_empty() {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.clone(),
                reason: "zero-sized texture".to_owned(),
            });
        }
        self.counters.textures_created += 1;
        Ok(self.textures.insert(desc.clone()))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(texture).is_some() {
            self.counters.textures_destroyed += 1;
            self.descriptors.retain(|_, t| *t != texture);
        }
    }

    fn texture_alive(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(texture)
    }

    fn allocate_descriptor(
        &mut self,
        texture: TextureHandle,
    ) -> Result<DescriptorIndex, DeviceError> {
        if !self.textures.contains_key(texture) {
            return Err(DeviceError::InvalidHandle(format!("{texture:?}")));
        }
        let index = DescriptorIndex(self.next_descriptor);
        self.next_descriptor += 1;
        self.descriptors.insert(index, texture);
        Ok(index)
    }

    fn free_descriptor(&mut self, index: DescriptorIndex) {
        self.descriptors.remove(&index);
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle, DeviceError> {
        self.pipeline_attempts.push(desc.label.clone());
        if self.failing_pipelines.contains(&desc.label) {
            self.counters.pipeline_failures += 1;
            log::debug!("Injected pipeline failure for '{}'", desc.label);
            return Err(DeviceError::PipelineCompilation {
                name: desc.label.clone(),
                reason: "injected failure".to_owned(),
            });
        }
        self.counters.pipelines_created += 1;
        Ok(self.pipelines.insert(desc.clone()))
    }

    fn submit(&mut self, commands: CommandList) -> Result<(), DeviceError> {
        self.submissions.push(commands);
        Ok(())
    }

    fn wait_idle(&mut self) {
        self.counters.wait_idle_calls += 1;
    }
}
