//! Shadow Scheduling Tests
//!
//! Tests for:
//! - Cascade split computation (uniform/logarithmic blend)
//! - Frustum slice corners in world space
//! - Cascade fitting and texel snapping
//! - Spot and point light projections
//! - Shadowed light selection and shadow data packing

use glam::{Mat4, Vec3};

use umbra::render::renderer::capture_depth_range;
use umbra::render::settings::RendererSettings;
use umbra::render::shadow::{
    CascadeSetup, LOCAL_SHADOW_NEAR, LocalShadows, MAX_POINT_SHADOWS, MAX_SPOT_SHADOWS, PointShadow,
    SpotShadow, build_cascade, compute_cascade_splits, cube_face_view_projs, frustum_slice_corners,
    pack_shadow_data,
};
use umbra::scene::{Camera, Light};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn project(m: &Mat4, p: Vec3) -> Vec3 {
    let clip = *m * p.extend(1.0);
    clip.truncate() / clip.w
}

fn in_ndc(p: Vec3) -> bool {
    p.x.abs() <= 1.0 + EPSILON && p.y.abs() <= 1.0 + EPSILON && (-EPSILON..=1.0 + EPSILON).contains(&p.z)
}

// ============================================================================
// compute_cascade_splits Tests
// ============================================================================

#[test]
fn cascade_splits_span_near_to_far() {
    let splits = compute_cascade_splits(3, 0.1, 100.0, 0.5);
    assert_eq!(splits.len(), 4);
    assert!(approx(splits[0], 0.1), "first boundary is near, got {}", splits[0]);
    assert!(approx(splits[3], 100.0), "last boundary is far, got {}", splits[3]);
}

#[test]
fn cascade_splits_monotonically_increasing() {
    for lambda in [0.0, 0.3, 0.6, 1.0] {
        let splits = compute_cascade_splits(3, 0.1, 100.0, lambda);
        for i in 1..splits.len() {
            assert!(
                splits[i] > splits[i - 1],
                "lambda {lambda}: splits[{i}]={} <= splits[{}]={}",
                splits[i],
                i - 1,
                splits[i - 1]
            );
        }
    }
}

#[test]
fn cascade_splits_lambda_0_uniform() {
    let splits = compute_cascade_splits(3, 1.0, 100.0, 0.0);
    // 1 + 99 * i/3
    let expected = [1.0, 34.0, 67.0, 100.0];
    for (i, e) in expected.iter().enumerate() {
        assert!(approx(splits[i], *e), "splits[{i}]: expected {e}, got {}", splits[i]);
    }
}

#[test]
fn cascade_splits_lambda_1_logarithmic() {
    let splits = compute_cascade_splits(2, 1.0, 100.0, 1.0);
    // 1 * 100^(1/2)
    assert!(approx(splits[1], 10.0), "log split = 10, got {}", splits[1]);
}

#[test]
fn cascade_count_is_clamped() {
    assert_eq!(compute_cascade_splits(0, 0.1, 50.0, 0.5).len(), 2);
    assert_eq!(compute_cascade_splits(9, 0.1, 50.0, 0.5).len(), 4);
}

#[test]
fn cascade_splits_survive_inverted_range() {
    let splits = compute_cascade_splits(3, 10.0, 5.0, 0.5);
    assert!(splits.windows(2).all(|w| w[1] > w[0]));
}

// ============================================================================
// Frustum Slice Tests
// ============================================================================

#[test]
fn slice_corners_sit_on_their_planes() {
    let camera = Camera::default();
    let forward = camera.forward();
    let corners = frustum_slice_corners(&camera, 1.5, 1.0, 10.0);

    for c in &corners[..4] {
        assert!(approx((*c - camera.position).dot(forward), 1.0));
    }
    for c in &corners[4..] {
        assert!(approx((*c - camera.position).dot(forward), 10.0));
    }
}

#[test]
fn slice_corners_match_field_of_view() {
    let camera = Camera {
        fov_y_deg: 90.0,
        ..Camera::default()
    };
    let corners = frustum_slice_corners(&camera, 2.0, 1.0, 4.0);
    // tan(45°) = 1: the far plane is 8 tall and 16 wide.
    let height = corners[4].distance(corners[7]);
    let width = corners[4].distance(corners[5]);
    assert!(approx(height, 8.0), "height {height}");
    assert!(approx(width, 16.0), "width {width}");
}

// ============================================================================
// Cascade Fitting Tests
// ============================================================================

#[test]
fn cascade_contains_its_slice() {
    let camera = Camera::default();
    let light_dir = Vec3::new(-0.4, -1.0, -0.3).normalize();
    let corners = frustum_slice_corners(&camera, 16.0 / 9.0, 0.1, 20.0);
    let cascade = build_cascade(light_dir, &corners, 0, 2048);

    for corner in &corners {
        let p = project(&cascade.view_proj, *corner);
        assert!(in_ndc(p), "corner {corner} projects outside: {p}");
    }
    assert!(cascade.radius > 0.0);
}

#[test]
fn cascade_window_is_texel_aligned() {
    let camera = Camera {
        position: Vec3::new(3.37, 2.11, 7.93),
        ..Camera::default()
    };
    let tile = 1024;
    let corners = frustum_slice_corners(&camera, 1.0, 0.5, 15.0);
    let cascade = build_cascade(Vec3::new(0.2, -1.0, 0.1).normalize(), &corners, 1, tile);

    // Orthographic: x_axis.x = 2 / width, w_axis.x = -2 cx / width.
    let width = 2.0 / cascade.proj.x_axis.x;
    let center_x = -cascade.proj.w_axis.x * width * 0.5;
    let texel = width / tile as f32;
    let texels = center_x / texel;
    assert!((texels - texels.round()).abs() < 1e-2, "center {center_x} is {texels} texels");
}

#[test]
fn vertical_light_uses_alternate_up() {
    let corners = frustum_slice_corners(&Camera::default(), 1.0, 0.1, 10.0);
    let cascade = build_cascade(Vec3::NEG_Y, &corners, 0, 512);
    assert!(!cascade.view_proj.is_nan());
}

#[test]
fn setup_respects_shadow_distance() {
    let settings = RendererSettings {
        dir_shadow_cascade_count: 2,
        dir_shadow_distance: 25.0,
        dir_shadow_tile_size: 512,
        ..RendererSettings::default()
    };
    let camera = Camera::default();
    let setup = CascadeSetup::compute(&camera, 1.0, Some(Vec3::NEG_Y), &settings);

    assert_eq!(setup.count(), 2);
    assert!(approx(*setup.splits.last().unwrap(), 25.0));
    assert_eq!(setup.atlas_extent().width, 1024);
    assert_eq!(setup.atlas_extent().height, 512);
    assert_eq!(setup.primary_view_proj(), setup.cascades[0].view_proj);
}

#[test]
fn setup_falls_back_to_default_light_direction() {
    let settings = RendererSettings::default();
    let setup = CascadeSetup::compute(&Camera::default(), 1.0, None, &settings);
    assert!(approx(setup.light_dir.length(), 1.0));
    assert!(setup.light_dir.y < 0.0, "default light points down");

    let zero = CascadeSetup::compute(&Camera::default(), 1.0, Some(Vec3::ZERO), &settings);
    assert_eq!(zero.light_dir, setup.light_dir);
}

// ============================================================================
// Local Light Tests
// ============================================================================

#[test]
fn spot_projection_sees_along_its_axis() {
    let light = Light::spot(
        Vec3::new(0.0, 5.0, 0.0),
        Vec3::NEG_Y,
        Vec3::ONE,
        1.0,
        20.0,
        20.0,
        30.0,
    );
    let spot = SpotShadow::new(0, &light);

    let ahead = project(&spot.view_proj, Vec3::new(0.0, 0.0, 0.0));
    assert!(in_ndc(ahead));
    assert!(ahead.x.abs() < EPSILON && ahead.y.abs() < EPSILON);

    let behind = spot.view_proj * Vec3::new(0.0, 10.0, 0.0).extend(1.0);
    assert!(behind.w < 0.0, "points behind the light are clipped");
}

#[test]
fn point_faces_cover_each_axis() {
    let pos = Vec3::new(1.0, 2.0, 3.0);
    let faces = cube_face_view_projs(pos, LOCAL_SHADOW_NEAR, 10.0);
    let dirs = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];

    for (face, dir) in dirs.iter().enumerate() {
        let p = project(&faces[face], pos + *dir * 5.0);
        assert!(in_ndc(p), "face {face} misses {dir}: {p}");
        assert!(p.x.abs() < EPSILON && p.y.abs() < EPSILON, "face {face} is off-center: {p}");
    }
}

#[test]
fn point_range_has_a_floor() {
    let light = Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 0.0);
    let point = PointShadow::new(3, &light);
    assert!(point.range > LOCAL_SHADOW_NEAR);
    assert_eq!(point.pos_range().w, point.range);
    assert_eq!(point.light_index, 3);
}

#[test]
fn collect_caps_each_light_type() {
    let mut lights = vec![Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0)];
    for i in 0..6 {
        lights.push(Light::point(Vec3::new(i as f32, 1.0, 0.0), Vec3::ONE, 1.0, 5.0));
        lights.push(Light::spot(
            Vec3::new(i as f32, 4.0, 0.0),
            Vec3::NEG_Y,
            Vec3::ONE,
            1.0,
            8.0,
            15.0,
            25.0,
        ));
    }
    let local = LocalShadows::collect(&lights);

    assert_eq!(local.points.len(), MAX_POINT_SHADOWS);
    assert_eq!(local.spots.len(), MAX_SPOT_SHADOWS);
    assert_eq!(local.points[0].light_index, 1);
    assert_eq!(local.spots[0].light_index, 2);
}

#[test]
fn non_casting_lights_are_skipped() {
    let mut point = Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 5.0);
    point.casts_shadow = false;
    let local = LocalShadows::collect(&[point]);
    assert!(local.is_empty());
}

// ============================================================================
// Packing Tests
// ============================================================================

#[test]
fn shadow_data_carries_counts_and_far_splits() {
    let settings = RendererSettings {
        dir_shadow_cascade_count: 3,
        dir_shadow_tile_size: 1024,
        ..RendererSettings::default()
    };
    let setup = CascadeSetup::compute(&Camera::default(), 1.0, Some(Vec3::NEG_Y), &settings);
    let local = LocalShadows::collect(&[
        Light::point(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 1.0, 6.0),
        Light::spot(Vec3::Y * 4.0, Vec3::NEG_Y, Vec3::ONE, 1.0, 8.0, 15.0, 25.0),
    ]);

    let data = pack_shadow_data(&setup, &local);
    assert_eq!(data.counts.to_array(), [3, 1, 1, 1024]);
    assert!(approx(data.cascade_splits.x, setup.splits[1]));
    assert!(approx(data.cascade_splits.z, setup.splits[3]));
    assert_eq!(data.cascade_splits.w, 0.0);
    assert_eq!(data.point_pos_range[0], local.points[0].pos_range());
    assert_eq!(data.spot_view_proj[0], local.spots[0].view_proj);
}

// ============================================================================
// Capture Range Tests
// ============================================================================

#[test]
fn capture_range_stays_ordered() {
    let (near, far) = capture_depth_range(0.0, 0.0);
    assert!(near > 0.0);
    assert!(far > near);

    let (near, far) = capture_depth_range(0.5, 100.0);
    assert!(approx(near, 0.5));
    assert!(approx(far, 100.0));
}
