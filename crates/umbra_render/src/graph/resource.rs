use umbra_rhi::{Extent2d, ResourceState, TextureDesc, TextureHandle, TextureKind};

/// Handle to a logical texture in one frame's graph.
///
/// Only meaningful for the graph that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RgTexture(pub(crate) u32);

impl RgTexture {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Builds a raw handle. Intended for tests and tooling.
    #[inline]
    #[must_use]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

/// Logical texture description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RgTextureDesc {
    pub label: String,
    pub extent: Extent2d,
    pub kind: TextureKind,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl RgTextureDesc {
    /// Render target or depth surface that is also sampled later.
    #[must_use]
    pub fn attachment(
        label: impl Into<String>,
        extent: Extent2d,
        kind: TextureKind,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: label.into(),
            extent,
            kind,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }

    #[must_use]
    pub fn to_texture_desc(&self) -> TextureDesc {
        TextureDesc {
            label: self.label.clone(),
            extent: self.extent,
            kind: self.kind,
            format: self.format,
            usage: self.usage,
        }
    }

    #[must_use]
    pub fn is_depth(&self) -> bool {
        umbra_rhi::is_depth_format(self.format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceOrigin {
    Transient,
    Imported(TextureHandle),
    SwapchainColor,
    SwapchainDepth,
}

#[derive(Debug, Clone)]
pub(crate) struct ResourceEntry {
    pub label: String,
    /// `None` for swapchain surfaces, whose shape is only known at execute.
    pub desc: Option<RgTextureDesc>,
    pub origin: ResourceOrigin,
}

impl ResourceEntry {
    #[must_use]
    pub fn kind(&self) -> TextureKind {
        self.desc.as_ref().map_or(TextureKind::D2, |d| d.kind)
    }

    #[must_use]
    pub fn is_depth(&self) -> bool {
        match self.origin {
            ResourceOrigin::SwapchainDepth => true,
            ResourceOrigin::SwapchainColor => false,
            _ => self.desc.as_ref().is_some_and(RgTextureDesc::is_depth),
        }
    }

    #[must_use]
    pub fn read_state(&self) -> ResourceState {
        if self.is_depth() {
            ResourceState::DepthRead
        } else {
            ResourceState::ShaderRead
        }
    }
}
