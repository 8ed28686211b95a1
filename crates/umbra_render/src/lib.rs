//! Umbra Render
//!
//! Per-frame GPU scheduling on top of [`umbra_rhi`]:
//!
//! - [`graph`]: the frame render graph and its transient texture pool
//! - [`batch`]: instance batching into one combined instance buffer
//! - [`shadow`]: directional cascades plus spot and point light shadows
//! - [`probes`] and [`technique`]: reflection probes and the three-tier
//!   cubemap technique with its circuit breaker
//! - [`planar`]: stencil-masked planar reflections
//! - [`debug`]: line gizmos and the cubemap atlas inset
//! - [`renderer`]: [`FrameRenderer`], which ties the above into one frame

pub mod batch;
pub mod constants;
pub mod debug;
pub mod graph;
pub mod lights;
pub mod pipelines;
pub mod planar;
pub mod probes;
pub mod renderer;
pub mod settings;
pub mod shading;
pub mod shadow;
pub mod technique;

pub use batch::{BatchBuilder, BuildParams, FrameInstances};
pub use graph::{PassAttachments, PassContext, RenderGraph, RgTexture, RgTextureDesc, TransientTexturePool};
pub use renderer::{FrameRenderer, FrameStats};
pub use settings::{CubeAtlasSource, RendererSettings};
pub use technique::{CubeFamily, CubePipelineSet, CubeTechnique};
