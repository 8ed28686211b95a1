//! Umbra
//!
//! Frame scheduling for a forward renderer: a per-frame render graph with
//! transient texture pooling, an instance batcher that packs every draw
//! list into one instance buffer, and a shadow/reflection scheduler
//! (directional cascades, spot and point shadows, reflection probes,
//! stencil-masked planar mirrors).
//!
//! The crate is backend agnostic. Rendering goes through the
//! [`RenderDevice`] and [`Swapchain`] traits, and passes record value-type
//! commands that the backend translates on submit.
//!
//! # Crates
//!
//! | Module | Crate |
//! |--------|-------|
//! | [`core`] | `umbra_core`: math primitives and errors |
//! | [`rhi`] | `umbra_rhi`: device traits, descriptors, commands |
//! | [`scene`] | `umbra_scene`: the per-frame scene snapshot |
//! | [`render`] | `umbra_render`: graph, batching, scheduling, renderer |

pub use umbra_core as core;
pub use umbra_render as render;
pub use umbra_rhi as rhi;
pub use umbra_scene as scene;

pub use umbra_core::{Result, UmbraError};
pub use umbra_render::{FrameRenderer, FrameStats, RenderGraph, RendererSettings};
pub use umbra_rhi::{RenderDevice, Swapchain};
pub use umbra_scene::Scene;

/// Common imports for applications driving a [`FrameRenderer`].
pub mod prelude {
    pub use umbra_core::math::{BoundingSphere, Plane, Transform};
    pub use umbra_core::{Result, UmbraError};
    pub use umbra_render::{
        CubeAtlasSource, CubeTechnique, FrameRenderer, FrameStats, RendererSettings,
    };
    pub use umbra_rhi::{DeviceCaps, Extent2d, RenderDevice, Swapchain};
    pub use umbra_scene::{
        Camera, DebugPickRay, DrawItem, EnvSource, Light, LightType, Material, MaterialParams,
        MaterialPerm, MeshResource, Scene,
    };
}
