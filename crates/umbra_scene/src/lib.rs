//! Umbra Scene
//!
//! The per-frame scene snapshot consumed by the renderer. These are plain
//! data types: the renderer reads them once per frame and never keeps
//! references across frames.

pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;

pub use camera::Camera;
pub use light::{Light, LightType};
pub use material::{EnvSource, Material, MaterialKey, MaterialParams, MaterialPerm};
pub use mesh::{MeshKey, MeshResource};
pub use scene::{DebugPickRay, DrawItem, Scene};
