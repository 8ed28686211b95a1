//! Frame Render Graph
//!
//! A per-frame scheduler of GPU passes. Passes declare which logical
//! textures they write (color/depth attachments) and read (sampled inputs);
//! the graph infers lifetimes and state transitions from those declarations
//! and replays each pass's recorded callback in order.
//!
//! # Design
//!
//! ```text
//!  build (per frame)                 execute
//! ┌──────────────────────┐         ┌──────────────────────────────────────┐
//! │ create_texture()     │         │ compile: validate + first/last use   │
//! │ import_texture()     │ ──────► │ for pass in declaration order:       │
//! │ add_pass()           │         │   resolve (pool / import / swapchain)│
//! │ add_swapchain_pass() │         │   transitions ─► begin ─► record ─►  │
//! └──────────────────────┘         │   end ─► release dead transients     │
//!                                  │ final transitions ─► submit          │
//!                                  └──────────────────────────────────────┘
//! ```
//!
//! # Resource Origins
//!
//! | Origin | Created by | Released |
//! |--------|-----------|----------|
//! | Transient | [`TransientTexturePool`] on first use | Back to the pool after last use |
//! | Imported | Caller | Never; left in `ShaderRead` after the frame |
//! | Swapchain | Swapchain | Never; left in `Present` after the frame |
//!
//! Execution order is declaration order. [`GraphPlan`] exposes the
//! producer/consumer edges so callers can check that order against their
//! intent; a pass only ever depends on earlier passes.

mod context;
#[allow(clippy::module_inception)]
mod graph;
mod pass;
mod resource;
mod transient_pool;

pub use context::PassContext;
pub use graph::{GraphPlan, GraphStats, RenderGraph};
pub use pass::{AttachmentTarget, PassAttachments};
pub use resource::{RgTexture, RgTextureDesc};
pub use transient_pool::{AcquiredTexture, PoolStats, TransientTexturePool};
