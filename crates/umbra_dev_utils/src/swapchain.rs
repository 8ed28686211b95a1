use umbra_core::errors::DeviceError;
use umbra_rhi::{Extent2d, RenderDevice, Swapchain, TextureDesc, TextureHandle, TextureKind};

pub const HEADLESS_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;
pub const HEADLESS_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Off-screen swapchain with a single back buffer.
#[derive(Debug)]
pub struct HeadlessSwapchain {
    extent: Extent2d,
    color: Option<TextureHandle>,
    depth: Option<TextureHandle>,
    presented: u64,
}

impl HeadlessSwapchain {
    /// Creates the back buffers. A zero extent creates none, like a
    /// minimized window.
    pub fn new(device: &mut dyn RenderDevice, extent: Extent2d) -> Result<Self, DeviceError> {
        let mut swapchain = Self {
            extent,
            color: None,
            depth: None,
            presented: 0,
        };
        swapchain.create_surfaces(device)?;
        Ok(swapchain)
    }

    /// Frames presented so far.
    #[must_use]
    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn create_surfaces(&mut self, device: &mut dyn RenderDevice) -> Result<(), DeviceError> {
        if self.extent.is_empty() {
            return Ok(());
        }
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        self.color = Some(device.create_texture(&TextureDesc {
            label: "BackBuffer".to_owned(),
            extent: self.extent,
            kind: TextureKind::D2,
            format: HEADLESS_COLOR_FORMAT,
            usage,
        })?);
        self.depth = Some(device.create_texture(&TextureDesc {
            label: "DepthBuffer".to_owned(),
            extent: self.extent,
            kind: TextureKind::D2,
            format: HEADLESS_DEPTH_FORMAT,
            usage,
        })?);
        Ok(())
    }

    fn destroy_surfaces(&mut self, device: &mut dyn RenderDevice) {
        for texture in [self.color.take(), self.depth.take()].into_iter().flatten() {
            device.destroy_texture(texture);
        }
    }
}

impl Swapchain for HeadlessSwapchain {
    fn extent(&self) -> Extent2d {
        self.extent
    }

    fn format(&self) -> wgpu::TextureFormat {
        HEADLESS_COLOR_FORMAT
    }

    fn depth_format(&self) -> wgpu::TextureFormat {
        HEADLESS_DEPTH_FORMAT
    }

    fn current_back_buffer(&self) -> TextureHandle {
        self.color.unwrap_or_default()
    }

    fn depth_buffer(&self) -> TextureHandle {
        self.depth.unwrap_or_default()
    }

    fn present(&mut self, _device: &mut dyn RenderDevice) -> Result<(), DeviceError> {
        if self.color.is_none() {
            return Err(DeviceError::Swapchain("no back buffer to present".to_owned()));
        }
        self.presented += 1;
        Ok(())
    }

    fn resize(&mut self, device: &mut dyn RenderDevice, extent: Extent2d) -> Result<(), DeviceError> {
        self.destroy_surfaces(device);
        self.extent = extent;
        self.create_surfaces(device)
    }
}
