//! Shadow Scheduling
//!
//! Computes the light-space projections of one frame:
//!
//! - [`CascadeSetup`]: directional cascades packed into one depth atlas.
//! - [`LocalShadows`]: spot depth maps and point distance cubes.
//!
//! The renderer turns these into graph passes and packs them into a
//! [`ShadowData`] block for the main pass.

mod cascades;
mod local;

pub use cascades::{
    Cascade, CascadeSetup, CascadeSplits, build_cascade, compute_cascade_splits,
    frustum_slice_corners,
};
pub use local::{
    LOCAL_SHADOW_NEAR, LocalShadows, PointShadow, SpotShadow, cube_face_view_projs,
    cube_face_view_rh,
};

use glam::{UVec4, Vec4};

use crate::constants::ShadowData;

pub const MAX_SPOT_SHADOWS: usize = 4;
pub const MAX_POINT_SHADOWS: usize = 4;

/// Packs the frame's shadow projections for the main pass.
#[must_use]
pub fn pack_shadow_data(cascades: &CascadeSetup, local: &LocalShadows) -> ShadowData {
    let mut data = ShadowData::default();

    for (slot, cascade) in data.cascade_view_proj.iter_mut().zip(&cascades.cascades) {
        *slot = cascade.view_proj;
    }
    let mut splits = [0.0_f32; 4];
    for (slot, far) in splits.iter_mut().zip(cascades.splits.iter().skip(1)) {
        *slot = *far;
    }
    data.cascade_splits = Vec4::from_array(splits);

    for (slot, spot) in data.spot_view_proj.iter_mut().zip(&local.spots) {
        *slot = spot.view_proj;
    }
    for (slot, point) in data.point_pos_range.iter_mut().zip(&local.points) {
        *slot = point.pos_range();
    }

    data.counts = UVec4::new(
        cascades.count(),
        local.spots.len() as u32,
        local.points.len() as u32,
        cascades.tile_size,
    );
    data
}
