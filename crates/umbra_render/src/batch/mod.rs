//! Instance Batching
//!
//! Turns the scene's draw items into the frame's draw lists, all backed by a
//! single instance buffer uploaded once per frame.
//!
//! # Groups
//!
//! | Group | Bucketed by | Culled | Used by |
//! |-------|-------------|--------|---------|
//! | shadow | mesh | no | cascades, spot/point shadows, depth pre-pass |
//! | main | [`BatchKey`] | camera | opaque main pass |
//! | capture | [`BatchKey`] | no | probe capture, planar reflections |
//! | transparent | item | camera | blended main pass, far to near |
//! | mirrors | item | camera | planar stencil masks |
//! | layered shadow | mesh, x6 | no | layered point shadows |
//! | layered capture | [`BatchKey`], x6 | no | layered probe capture |
//!
//! Transparent items and planar mirrors never cast shadows.
//!
//! # Determinism
//!
//! Grouping goes through hash maps, but every group is sorted by its key
//! (mesh handle, then [`BatchKey`]) before it is flattened, so a fixed scene
//! yields the same batches, order and offsets every frame.

mod builder;
mod draw;
mod instance;
mod key;

pub use builder::{BatchBuilder, BuildParams};
pub use draw::{
    Batch, DrawGeometry, DrawStats, INSTANCE_VERTEX_SLOT, PlanarMirrorDraw, ShadowBatch,
    TransparentDraw,
};
pub use instance::{FrameInstances, GroupRanges, INSTANCE_STRIDE, InstanceData, InstanceRange};
pub use key::BatchKey;
