//! Value-type command recording.
//!
//! A [`CommandList`] is an append-only vector of [`Command`] records. It
//! owns copies of everything it references (constants are copied as bytes),
//! so a recorded list never borrows frame-local state.

use smallvec::SmallVec;

use crate::desc::IndexFormat;
use crate::handles::{BufferHandle, DescriptorIndex, PipelineHandle, TextureHandle};
use crate::state::{PrimitiveTopology, RenderState, ResourceState};

/// Which part of a texture a render pass binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentView {
    /// The whole texture (2D textures).
    Whole(TextureHandle),
    /// One face (array layer 0..=5) of a cubemap.
    Face(TextureHandle, u32),
    /// All six faces as a layered target.
    AllFaces(TextureHandle),
}

impl AttachmentView {
    #[inline]
    #[must_use]
    pub fn texture(&self) -> TextureHandle {
        match *self {
            Self::Whole(t) | Self::Face(t, _) | Self::AllFaces(t) => t,
        }
    }
}

/// Clear policy applied when a render pass begins. `None` means load.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClearDesc {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
}

impl ClearDesc {
    pub const LOAD: Self = Self {
        color: None,
        depth: None,
        stencil: None,
    };

    #[must_use]
    pub const fn color_depth(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
            stencil: Some(0),
        }
    }

    #[must_use]
    pub const fn depth_only() -> Self {
        Self {
            color: None,
            depth: Some(1.0),
            stencil: Some(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub label: String,
    pub color: Option<AttachmentView>,
    pub depth: Option<AttachmentView>,
    pub clear: ClearDesc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x: x as f32,
            y: y as f32,
            width: width as f32,
            height: height as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexedArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Transition {
        texture: TextureHandle,
        before: ResourceState,
        after: ResourceState,
    },
    BeginRenderPass(RenderPassDesc),
    EndRenderPass,
    SetViewport(Viewport),
    SetState(RenderState),
    SetStencilRef(u32),
    SetPrimitiveTopology(PrimitiveTopology),
    BindPipeline(PipelineHandle),
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        stride: u32,
        offset: u64,
    },
    BindIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
        offset: u64,
    },
    /// Bindless texture slot.
    BindTextureDesc {
        slot: u32,
        index: DescriptorIndex,
    },
    /// Texture bound as a 2D array (cubemaps sampled per layer).
    BindTextureArray {
        slot: u32,
        texture: TextureHandle,
    },
    BindStructuredBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    BindConstantBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    SetConstants {
        slot: u32,
        data: SmallVec<[u8; 256]>,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed(DrawIndexedArgs),
}

/// Append-only command recorder handed to pass callbacks.
#[derive(Debug, Default, Clone)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn transition(&mut self, texture: TextureHandle, before: ResourceState, after: ResourceState) {
        self.push(Command::Transition {
            texture,
            before,
            after,
        });
    }

    pub fn begin_render_pass(&mut self, desc: RenderPassDesc) {
        self.push(Command::BeginRenderPass(desc));
    }

    pub fn end_render_pass(&mut self) {
        self.push(Command::EndRenderPass);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(Command::SetViewport(viewport));
    }

    pub fn set_state(&mut self, state: RenderState) {
        self.push(Command::SetState(state));
    }

    pub fn set_stencil_ref(&mut self, reference: u32) {
        self.push(Command::SetStencilRef(reference));
    }

    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.push(Command::SetPrimitiveTopology(topology));
    }

    pub fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.push(Command::BindPipeline(pipeline));
    }

    pub fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, stride: u32, offset: u64) {
        self.push(Command::BindVertexBuffer {
            slot,
            buffer,
            stride,
            offset,
        });
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat, offset: u64) {
        self.push(Command::BindIndexBuffer {
            buffer,
            format,
            offset,
        });
    }

    pub fn bind_texture_desc(&mut self, slot: u32, index: DescriptorIndex) {
        self.push(Command::BindTextureDesc { slot, index });
    }

    pub fn bind_texture_array(&mut self, slot: u32, texture: TextureHandle) {
        self.push(Command::BindTextureArray { slot, texture });
    }

    pub fn bind_structured_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.push(Command::BindStructuredBuffer { slot, buffer });
    }

    pub fn bind_constant_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.push(Command::BindConstantBuffer { slot, buffer });
    }

    /// Copies `data` into the command stream.
    pub fn set_constants<T: bytemuck::Pod>(&mut self, slot: u32, data: &T) {
        self.push(Command::SetConstants {
            slot,
            data: SmallVec::from_slice(bytemuck::bytes_of(data)),
        });
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex: 0,
            first_instance: 0,
        });
    }

    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.push(Command::DrawIndexed(DrawIndexedArgs {
            index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }));
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
