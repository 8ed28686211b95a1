use umbra_core::errors::DeviceError;

use crate::caps::DeviceCaps;
use crate::command::CommandList;
use crate::desc::{BufferDesc, Extent2d, PipelineDesc, TextureDesc};
use crate::handles::{BufferHandle, DescriptorIndex, PipelineHandle, TextureHandle};

/// The graphics device as seen by the renderer.
///
/// Every fallible call returns a [`DeviceError`]; the renderer treats any of
/// them as fatal for the frame. The device is used from a single thread.
pub trait RenderDevice {
    /// Optional features of this device, queried once per renderer.
    fn capabilities(&self) -> DeviceCaps;

    // --- Buffers ---

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle, DeviceError>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Copies `data` into the buffer at `offset`. Writes issued before
    /// [`submit`](Self::submit) are visible to every command in that
    /// submission.
    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    // --- Textures ---

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, DeviceError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Whether the handle still refers to a live texture.
    fn texture_alive(&self, texture: TextureHandle) -> bool;

    /// Allocates a bindless shader-visible descriptor for a texture.
    fn allocate_descriptor(
        &mut self,
        texture: TextureHandle,
    ) -> Result<DescriptorIndex, DeviceError>;

    fn free_descriptor(&mut self, index: DescriptorIndex);

    // --- Pipelines ---

    /// Compiles shaders and builds a pipeline state object.
    ///
    /// Failures for optional variants are recoverable by the caller; see the
    /// technique selector.
    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle, DeviceError>;

    // --- Submission ---

    /// Translates and submits a recorded command list.
    fn submit(&mut self, commands: CommandList) -> Result<(), DeviceError>;

    /// Blocks until the GPU has finished all submitted work.
    fn wait_idle(&mut self);
}

/// Presentation surface.
pub trait Swapchain {
    fn extent(&self) -> Extent2d;

    fn format(&self) -> wgpu::TextureFormat;

    fn depth_format(&self) -> wgpu::TextureFormat;

    /// Texture presented at the end of the current frame.
    fn current_back_buffer(&self) -> TextureHandle;

    /// Depth/stencil surface matching the back buffer.
    fn depth_buffer(&self) -> TextureHandle;

    fn present(&mut self, device: &mut dyn RenderDevice) -> Result<(), DeviceError>;

    /// Recreates the back buffers. The caller has already waited for idle.
    fn resize(&mut self, device: &mut dyn RenderDevice, extent: Extent2d) -> Result<(), DeviceError>;
}
