//! Directional cascaded shadow maps.
//!
//! Cascades are packed side by side into one depth atlas of
//! `(tile * count) x tile` texels. Each cascade fits an orthographic
//! projection around one distance slice of the camera frustum, in light
//! space, with its window snapped to whole texels so the shadow does not
//! shimmer when the camera moves.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;
use umbra_rhi::Extent2d;
use umbra_scene::Camera;

use crate::lights::DEFAULT_LIGHT_DIR;
use crate::settings::{MAX_DIR_CASCADES, RendererSettings};

/// Distance between the slice's bounding sphere and the virtual light.
const LIGHT_BACKOFF: f32 = 100.0;
const MIN_SHADOW_NEAR: f32 = 0.05;

pub type CascadeSplits = SmallVec<[f32; MAX_DIR_CASCADES as usize + 1]>;

/// Split distances for `count` cascades between `near` and `far`.
///
/// `count` is clamped to `1..=3`. Returns `count + 1` strictly increasing
/// boundaries with `[0] == near` and `[count] == far`; inner splits blend
/// the uniform and logarithmic schemes by `lambda`
/// (0 = uniform, 1 = logarithmic).
#[must_use]
pub fn compute_cascade_splits(count: u32, near: f32, far: f32, lambda: f32) -> CascadeSplits {
    let count = count.clamp(1, MAX_DIR_CASCADES);
    let near = near.max(f32::EPSILON);
    let far = if far > near { far } else { near + 1.0 };
    let lambda = lambda.clamp(0.0, 1.0);

    let mut splits = CascadeSplits::new();
    splits.push(near);
    for i in 1..count {
        let p = i as f32 / count as f32;
        let log = near * (far / near).powf(p);
        let uniform = near + (far - near) * p;
        splits.push(uniform + (log - uniform) * lambda);
    }
    splits.push(far);
    splits
}

/// World-space corners of the camera frustum between `near` and `far`.
///
/// Near plane first, each plane ordered bottom-left, bottom-right,
/// top-right, top-left.
#[must_use]
pub fn frustum_slice_corners(camera: &Camera, aspect: f32, near: f32, far: f32) -> [Vec3; 8] {
    let (right, up, forward) = camera.basis();
    let tan_half = (camera.fov_y_deg.to_radians() * 0.5).tan();

    let corner = |dist: f32, sx: f32, sy: f32| {
        let half_h = dist * tan_half;
        let half_w = half_h * aspect;
        camera.position + forward * dist + up * (sy * half_h) + right * (sx * half_w)
    };

    [
        corner(near, -1.0, -1.0),
        corner(near, 1.0, -1.0),
        corner(near, 1.0, 1.0),
        corner(near, -1.0, 1.0),
        corner(far, -1.0, -1.0),
        corner(far, 1.0, -1.0),
        corner(far, 1.0, 1.0),
        corner(far, -1.0, 1.0),
    ]
}

/// One fitted cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cascade {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    /// Bounding sphere of the slice.
    pub center: Vec3,
    pub radius: f32,
}

/// Fits an orthographic light projection around a frustum slice.
///
/// `light_dir` points from the light into the scene. Farther cascades get a
/// larger depth margin behind the slice to keep off-screen casters.
#[must_use]
pub fn build_cascade(light_dir: Vec3, corners: &[Vec3; 8], cascade_index: u32, tile_size: u32) -> Cascade {
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    let radius = corners
        .iter()
        .map(|c| c.distance(center))
        .fold(0.0_f32, f32::max);

    let up = if light_dir.dot(Vec3::Y).abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let eye = center - light_dir * (radius + LIGHT_BACKOFF);
    let view = Mat4::look_at_rh(eye, center, up);

    let (mut min, mut max) = (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN));
    for corner in corners {
        let ls = view.transform_point3(*corner);
        min = min.min(ls);
        max = max.max(ls);
    }

    let ext = max - min;
    let pad_xy = 0.05 * ext.x.max(ext.y) + 1.0;
    let pad_z = 0.10 * ext.z + 5.0;
    min -= Vec3::new(pad_xy, pad_xy, pad_z);
    max += Vec3::new(pad_xy, pad_xy, pad_z);
    min.z -= 20.0 + 30.0 * cascade_index as f32;

    let width = max.x - min.x;
    let height = max.y - min.y;
    let tile = tile_size.max(1) as f32;
    let snap = |value: f32, texel: f32| {
        if texel > 0.0 { (value / texel).floor() * texel } else { value }
    };
    let cx = snap(0.5 * (min.x + max.x), width / tile);
    let cy = snap(0.5 * (min.y + max.y), height / tile);

    // View space looks down -Z: depths are the negated light-space z.
    let z_near = (-max.z).max(0.1);
    let z_far = (-min.z).max(z_near + 1.0);

    let proj = Mat4::orthographic_rh(
        cx - width * 0.5,
        cx + width * 0.5,
        cy - height * 0.5,
        cy + height * 0.5,
        z_near,
        z_far,
    );

    Cascade {
        view,
        proj,
        view_proj: proj * view,
        center,
        radius,
    }
}

/// Everything the cascade pass and the main pass need for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeSetup {
    pub light_dir: Vec3,
    pub splits: CascadeSplits,
    pub cascades: SmallVec<[Cascade; MAX_DIR_CASCADES as usize]>,
    pub tile_size: u32,
}

impl CascadeSetup {
    /// `light_dir` is the first directional light's direction, if any.
    #[must_use]
    pub fn compute(
        camera: &Camera,
        aspect: f32,
        light_dir: Option<Vec3>,
        settings: &RendererSettings,
    ) -> Self {
        let light_dir = light_dir
            .and_then(Vec3::try_normalize)
            .unwrap_or_else(|| DEFAULT_LIGHT_DIR.normalize());

        let near = camera.near.max(MIN_SHADOW_NEAR);
        let far = camera.far.min(settings.dir_shadow_distance);
        let splits = compute_cascade_splits(
            settings.dir_shadow_cascade_count,
            near,
            far,
            settings.dir_shadow_split_lambda,
        );

        let tile_size = settings.dir_shadow_tile_size.max(1);
        let cascades = splits
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let corners = frustum_slice_corners(camera, aspect, w[0], w[1]);
                build_cascade(light_dir, &corners, i as u32, tile_size)
            })
            .collect();

        Self {
            light_dir,
            splits,
            cascades,
            tile_size,
        }
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.cascades.len() as u32
    }

    #[must_use]
    pub fn atlas_extent(&self) -> Extent2d {
        Extent2d::new(self.tile_size * self.count(), self.tile_size)
    }

    /// View-projection of the first cascade, `IDENTITY` if there is none.
    #[must_use]
    pub fn primary_view_proj(&self) -> Mat4 {
        self.cascades.first().map_or(Mat4::IDENTITY, |c| c.view_proj)
    }
}
