//! Umbra RHI
//!
//! The device surface the renderer is written against. Backends implement
//! [`RenderDevice`] and [`Swapchain`]; everything else in this crate is
//! plain data.
//!
//! # Design
//!
//! Commands are not encoded against a live backend object. Passes record
//! value-type [`Command`]s into a [`CommandList`], and the backend
//! translates the whole list in [`RenderDevice::submit`]. This keeps pass
//! callbacks free of device borrows and makes the command stream directly
//! inspectable in tests.
//!
//! Texture formats, usages and compare functions reuse the `wgpu` enums so
//! descriptors can be forwarded to a wgpu backend unchanged.

mod caps;
mod command;
mod desc;
mod device;
mod handles;
mod state;

pub use caps::DeviceCaps;
pub use command::{
    AttachmentView, ClearDesc, Command, CommandList, DrawIndexedArgs, RenderPassDesc, Viewport,
};
pub use desc::{
    BufferDesc, BufferUsage, Extent2d, IndexFormat, PipelineDesc, TextureDesc, TextureKind,
    is_depth_format,
};
pub use device::{RenderDevice, Swapchain};
pub use handles::{BufferHandle, DescriptorIndex, PipelineHandle, TextureHandle};
pub use state::{
    BlendMode, CullMode, DepthState, PrimitiveTopology, RenderState, ResourceState, StencilMode,
};

pub use umbra_core::errors::DeviceError;

/// Number of faces of a cubemap.
pub const CUBE_FACE_COUNT: u32 = 6;
