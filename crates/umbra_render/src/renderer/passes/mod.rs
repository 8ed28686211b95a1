//! Graph pass builders used by [`FrameRenderer`](super::FrameRenderer).
//!
//! | Pass | Builder |
//! |------|---------|
//! | `CascadeShadowAtlas`, `SpotShadow_{i}`, `PointShadow_{i}_*` | [`shadow`] |
//! | `ReflectionProbe_{p}_*` | [`capture`] |
//! | `DepthPrepass`, `MainPass` | [`scene`] |
//! | `DebugCubeAtlas`, `DebugLines` | [`debug`] |

pub(crate) mod capture;
pub(crate) mod debug;
pub(crate) mod scene;
pub(crate) mod shadow;

pub use capture::{capture_depth_range, capture_projection};
