//! Umbra Core
//!
//! Foundational types shared by every Umbra crate:
//!
//! - [`math`]: frustum, bounding sphere, plane and transform primitives
//! - [`errors`]: device and frame error types

pub mod errors;
pub mod math;

pub use errors::{DeviceError, Result, UmbraError};
pub use math::{BoundingSphere, Frustum, Plane, Transform};
