//! Math primitives used by culling, shadow fitting and planar reflection.
//!
//! All matrices follow glam conventions: column-major, right-handed,
//! clip-space depth in `[0, 1]`.

mod bounds;
mod frustum;
mod plane;
mod transform;

pub use bounds::BoundingSphere;
pub use frustum::Frustum;
pub use plane::Plane;
pub use transform::Transform;
