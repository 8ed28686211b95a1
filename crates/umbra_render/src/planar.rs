//! Planar Reflections
//!
//! Mirrors are drawn inside the main pass, after opaque geometry:
//!
//! ```text
//!   for each coplanar group (stencil ref = group + 1):
//!     1. mask     mirror surfaces, depth tested, stencil := ref
//!     2. reflect  scene batches through the mirror plane, stencil == ref,
//!                 clipped to the far side of the plane
//!   restore main state, stencil ref 0
//! ```
//!
//! Mirrors lying on the same plane share one group, so the scene is
//! reflected once per plane instead of once per mirror. Each group owns a
//! distinct stencil value, which keeps reflections of different planes
//! from bleeding into each other.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;
use umbra_core::math::Plane;
use umbra_rhi::{CommandList, PipelineHandle, RenderState};
use umbra_scene::MaterialPerm;

use crate::batch::{Batch, PlanarMirrorDraw};
use crate::constants::DepthPassConstants;
use crate::shading::{LitDraw, ShadingContext, ViewParams};

/// Two mirror planes closer than this angle may share a group.
pub const PLANE_ANGLE_EPSILON_DEG: f32 = 0.5;
/// Largest plane offset difference within one group.
pub const PLANE_DISTANCE_EPSILON: f32 = 0.01;
/// The clip plane is pushed this far behind the mirror to hide seams.
pub const CLIP_PLANE_BIAS: f32 = 0.05;

/// Mirrors sharing one plane.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorGroup {
    /// Oriented so the camera is on the positive side.
    pub plane: Plane,
    pub stencil_ref: u32,
    pub mirrors: SmallVec<[PlanarMirrorDraw; 4]>,
}

impl MirrorGroup {
    /// World-space reflection through the group's plane.
    #[inline]
    #[must_use]
    pub fn reflection(&self) -> Mat4 {
        self.plane.reflection_matrix()
    }

    /// Reflected view of the camera, clipped at the plane.
    #[must_use]
    pub fn reflected_view(&self, camera: &ViewParams) -> ViewParams {
        ViewParams {
            view_proj: camera.view_proj * self.reflection(),
            camera_pos: self.plane.reflect_point(camera.camera_pos),
            camera_forward: self.plane.reflect_vector(camera.camera_forward),
            clip_plane: self.plane.normal.extend(self.plane.d - CLIP_PLANE_BIAS),
        }
    }
}

/// Householder reflection across `dot(n, x) + d = 0`.
///
/// `normal` is normalized first; a zero normal yields the identity.
#[must_use]
pub fn reflection_matrix(normal: Vec3, d: f32) -> Mat4 {
    normal
        .try_normalize()
        .map_or(Mat4::IDENTITY, |normal| Plane { normal, d }.reflection_matrix())
}

/// Groups mirrors by plane, in mirror order.
///
/// Mirrors that would open a group past `max_groups` are skipped.
#[must_use]
pub fn group_mirrors(
    mirrors: &[PlanarMirrorDraw],
    camera_pos: Vec3,
    max_groups: usize,
) -> Vec<MirrorGroup> {
    let cos_eps = PLANE_ANGLE_EPSILON_DEG.to_radians().cos();
    let mut groups: Vec<MirrorGroup> = Vec::new();

    for mirror in mirrors {
        let Some(plane) = Plane::from_point_normal(mirror.plane_point, mirror.plane_normal) else {
            continue;
        };
        let plane = plane.facing(camera_pos);

        let existing = groups.iter().position(|g| {
            plane.normal.dot(g.plane.normal) >= cos_eps
                && (plane.d - g.plane.d).abs() <= PLANE_DISTANCE_EPSILON
        });
        match existing {
            Some(index) => groups[index].mirrors.push(*mirror),
            None if groups.len() < max_groups => {
                let stencil_ref = groups.len() as u32 + 1;
                groups.push(MirrorGroup {
                    plane,
                    stencil_ref,
                    mirrors: SmallVec::from_elem(*mirror, 1),
                });
            }
            None => log::debug!("Mirror group limit reached, skipping item {}", mirror.draw_item),
        }
    }
    groups
}

/// Inputs of the planar step of the main pass, captured by value.
#[derive(Debug, Clone)]
pub struct PlanarPlan {
    pub groups: Vec<MirrorGroup>,
    /// Scene batches to reflect. Mirror materials are skipped when drawing.
    pub batches: Vec<Batch>,
    /// Depth-only pipeline for the stencil masks.
    pub mask_pipeline: PipelineHandle,
    /// State of the main pass, restored afterwards.
    pub restore_state: RenderState,
}

/// Records masks and reflected geometry for every mirror group.
pub fn record_planar_reflections(cmd: &mut CommandList, plan: &PlanarPlan, shading: &ShadingContext) {
    if plan.groups.is_empty() {
        return;
    }

    let mask_constants = DepthPassConstants {
        view_proj: shading.view.view_proj,
    };

    for group in &plan.groups {
        cmd.set_state(RenderState::planar_mask());
        cmd.set_stencil_ref(group.stencil_ref);
        cmd.bind_pipeline(plan.mask_pipeline);
        cmd.set_constants(0, &mask_constants);
        for mirror in &group.mirrors {
            mirror
                .geometry
                .draw_instanced(cmd, shading.instance_buffer, mirror.instance_offset, 1);
        }

        let view = group.reflected_view(&shading.view);
        cmd.set_state(RenderState::planar_reflected());
        cmd.set_stencil_ref(group.stencil_ref);
        for batch in &plan.batches {
            if batch.perm.contains(MaterialPerm::PLANAR_MIRROR) {
                continue;
            }
            shading.record_with_view(cmd, &view, &LitDraw::from(batch));
        }
    }

    cmd.set_state(plan.restore_state);
    cmd.set_stencil_ref(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_normal_reflects_nothing() {
        assert_eq!(reflection_matrix(Vec3::ZERO, 3.0), Mat4::IDENTITY);
    }

    #[test]
    fn reflection_translates_by_twice_the_distance() {
        // Plane y = 1.
        let r = reflection_matrix(Vec3::Y, -1.0);
        let p = r.transform_point3(Vec3::new(2.0, 3.0, -1.0));
        assert!(p.abs_diff_eq(Vec3::new(2.0, -1.0, -1.0), 1e-6));
    }
}
