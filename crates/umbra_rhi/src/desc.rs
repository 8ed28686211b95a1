use bitflags::bitflags;

use crate::state::PrimitiveTopology;

pub use wgpu::IndexFormat;

/// Width/height of a 2D surface in texels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    #[must_use]
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    /// Width over height, `1.0` for a zero height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextureKind {
    #[default]
    D2,
    /// Six-layer array addressed per face or as a whole.
    Cube,
}

impl TextureKind {
    #[inline]
    #[must_use]
    pub const fn layer_count(self) -> u32 {
        match self {
            Self::D2 => 1,
            Self::Cube => crate::CUBE_FACE_COUNT,
        }
    }
}

/// Device texture descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub label: String,
    pub extent: Extent2d,
    pub kind: TextureKind,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureDesc {
    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        self.kind.layer_count()
    }

    #[inline]
    #[must_use]
    pub fn is_depth(&self) -> bool {
        is_depth_format(self.format)
    }
}

#[must_use]
pub fn is_depth_format(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Depth16Unorm
            | wgpu::TextureFormat::Depth24Plus
            | wgpu::TextureFormat::Depth24PlusStencil8
            | wgpu::TextureFormat::Depth32Float
            | wgpu::TextureFormat::Depth32FloatStencil8
    )
}

bitflags! {
    /// How a buffer is bound by the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const CONSTANT = 1 << 2;
        const STRUCTURED = 1 << 3;
        /// CPU-written every frame.
        const DYNAMIC = 1 << 4;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
    /// Element stride for structured buffers, `0` otherwise.
    pub stride: u32,
}

/// Everything a backend needs to build one pipeline state object.
///
/// Shader sources are identified by name; loading and compiling them is the
/// backend's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineDesc {
    pub label: String,
    pub shader: &'static str,
    pub vertex_entry: &'static str,
    pub fragment_entry: Option<&'static str>,
    pub defines: Vec<&'static str>,
    pub topology: PrimitiveTopology,
    /// Number of views rendered by one draw (multi-view), `1` otherwise.
    pub view_count: u32,
    /// Requires shader model 6 features.
    pub requires_sm6: bool,
    pub color_format: Option<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl PipelineDesc {
    #[must_use]
    pub fn new(label: impl Into<String>, shader: &'static str) -> Self {
        Self {
            label: label.into(),
            shader,
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            defines: Vec::new(),
            topology: PrimitiveTopology::TriangleList,
            view_count: 1,
            requires_sm6: false,
            color_format: None,
            depth_format: None,
        }
    }

    #[must_use]
    pub fn with_define(mut self, define: &'static str) -> Self {
        self.defines.push(define);
        self
    }

    #[must_use]
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    #[must_use]
    pub fn with_view_count(mut self, view_count: u32) -> Self {
        self.view_count = view_count;
        self.requires_sm6 = true;
        self
    }

    #[must_use]
    pub fn with_sm6(mut self) -> Self {
        self.requires_sm6 = true;
        self
    }

    #[must_use]
    pub fn with_formats(
        mut self,
        color: Option<wgpu::TextureFormat>,
        depth: Option<wgpu::TextureFormat>,
    ) -> Self {
        self.color_format = color;
        self.depth_format = depth;
        self
    }

    #[must_use]
    pub fn depth_only(mut self) -> Self {
        self.fragment_entry = None;
        self.color_format = None;
        self
    }
}
