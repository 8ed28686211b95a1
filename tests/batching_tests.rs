//! Instance Batching Tests
//!
//! Tests for:
//! - Deterministic batch order and offsets across builds
//! - Group layout: disjoint ranges, face-aligned layered groups
//! - Frustum culling of the main group only, including spheres straddling a plane
//! - Transparent sorting and shadow exclusion
//! - Planar mirror routing and the mirror limit
//! - Single-upload instance buffer and overflow handling

use glam::{Mat4, Quat, Vec3, Vec4};

use umbra::UmbraError;
use umbra::core::math::Transform;
use umbra::render::batch::{BatchBuilder, BuildParams, FrameInstances, INSTANCE_STRIDE, InstanceRange};
use umbra::rhi::{BufferDesc, BufferUsage, RenderDevice};
use umbra::scene::{DrawItem, Scene};
use umbra_dev_utils::RecordingDevice;
use umbra_dev_utils::fixtures::{
    BasicSceneKeys, basic_scene, cube_mesh, mirror_material, quad_mesh, solid_material,
    transparent_material,
};

const ASPECT: f32 = 16.0 / 9.0;

fn setup() -> (RecordingDevice, Scene, BasicSceneKeys) {
    let mut device = RecordingDevice::full();
    let (scene, keys) = basic_scene(&mut device).unwrap();
    (device, scene, keys)
}

fn params(scene: &Scene) -> BuildParams<'static> {
    BuildParams {
        view_proj: scene.camera.view_projection(ASPECT),
        camera_pos: scene.camera.position,
        ..BuildParams::default()
    }
}

fn all_groups(params: BuildParams<'static>) -> BuildParams<'static> {
    BuildParams {
        capture_batches: true,
        planar_reflections: true,
        max_mirrors: 4,
        layered_shadow: true,
        layered_capture: true,
        ..params
    }
}

fn build(scene: &Scene, params: &BuildParams<'_>) -> FrameInstances {
    BatchBuilder::new().build(scene, params)
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn repeated_builds_are_identical() {
    let (_device, scene, _) = setup();
    let p = all_groups(params(&scene));

    let mut builder = BatchBuilder::new();
    let first = builder.build(&scene, &p);
    let second = builder.build(&scene, &p);
    let fresh = build(&scene, &p);

    assert_eq!(first, second, "reused scratch must not change the output");
    assert_eq!(first, fresh);
}

#[test]
fn batches_follow_key_order() {
    let (_device, scene, _) = setup();
    let frame = build(&scene, &params(&scene));

    let keys: Vec<_> = frame.shadow_batches.iter().map(|b| b.mesh).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);

    for pair in frame.main_batches.windows(2) {
        assert!(pair[0].mesh <= pair[1].mesh);
    }
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn groups_never_overlap() {
    let (_device, mut scene, keys) = setup();
    let glass = scene.add_material(transparent_material(0.4));
    scene.add_draw_item(DrawItem::new(
        keys.cube,
        Some(glass),
        Transform::from_translation(Vec3::new(0.0, 1.0, 3.0)),
    ));

    let frame = build(&scene, &all_groups(params(&scene)));
    let groups = frame.groups.all();

    for (i, (name_a, a)) in groups.iter().enumerate() {
        for (name_b, b) in &groups[i + 1..] {
            assert!(!a.overlaps(b), "{name_a} {a:?} overlaps {name_b} {b:?}");
        }
        assert!(a.end() <= frame.instance_count(), "{name_a} ends past the buffer");
    }
}

#[test]
fn batch_ranges_stay_inside_their_group() {
    let (_device, scene, _) = setup();
    let frame = build(&scene, &all_groups(params(&scene)));
    let g = frame.groups;

    let inside = |group: InstanceRange, range: InstanceRange| {
        range.offset >= group.offset && range.end() <= group.end()
    };
    assert!(frame.shadow_batches.iter().all(|b| inside(g.shadow, b.range())));
    assert!(frame.main_batches.iter().all(|b| inside(g.main, b.range())));
    assert!(frame.capture_batches.iter().all(|b| inside(g.capture, b.range())));
    assert!(frame.layered_shadow_batches.iter().all(|b| inside(g.layered_shadow, b.range())));
    assert!(frame.layered_capture_batches.iter().all(|b| inside(g.layered_capture, b.range())));
}

#[test]
fn layered_groups_start_on_face_boundaries() {
    let (_device, mut scene, keys) = setup();
    // One extra caster so the plain groups end on an odd offset.
    scene.add_draw_item(DrawItem::new(
        keys.cube,
        Some(keys.solid),
        Transform::from_translation(Vec3::new(5.0, 0.5, 0.0)),
    ));

    let frame = build(&scene, &all_groups(params(&scene)));
    let g = frame.groups;

    assert_eq!(g.layered_shadow.offset % 6, 0);
    assert_eq!(g.layered_capture.offset % 6, 0);
    assert_eq!(g.layered_shadow.count, g.shadow.count * 6);
    assert_eq!(g.layered_capture.count, g.capture.count * 6);
    for batch in &frame.layered_shadow_batches {
        assert_eq!(batch.instance_offset % 6, 0);
        assert_eq!(batch.instance_count % 6, 0);
    }
}

#[test]
fn layered_instances_repeat_per_face() {
    let (_device, scene, _) = setup();
    let frame = build(&scene, &all_groups(params(&scene)));

    for (plain, layered) in frame.shadow_batches.iter().zip(&frame.layered_shadow_batches) {
        assert_eq!(plain.mesh, layered.mesh);
        for i in 0..plain.instance_count {
            let source = frame.instances[(plain.instance_offset + i) as usize];
            let start = (layered.instance_offset + i * 6) as usize;
            assert!(frame.instances[start..start + 6].iter().all(|inst| *inst == source));
        }
    }
}

#[test]
fn layered_groups_are_empty_unless_requested() {
    let (_device, scene, _) = setup();
    let frame = build(&scene, &params(&scene));
    assert!(frame.groups.layered_shadow.is_empty());
    assert!(frame.layered_shadow_batches.is_empty());
    assert!(frame.capture_batches.is_empty());
}

// ============================================================================
// Culling
// ============================================================================

#[test]
fn culling_only_touches_the_main_group() {
    let (_device, mut scene, _) = setup();
    scene.camera.position = Vec3::new(0.0, 4.0, 30.0);
    scene.camera.target = Vec3::new(0.0, 4.0, 40.0);

    let frame = build(
        &scene,
        &BuildParams {
            capture_batches: true,
            ..params(&scene)
        },
    );

    assert!(frame.main_batches.is_empty(), "everything is behind the camera");
    assert_eq!(frame.groups.shadow.count, 10);
    assert_eq!(frame.groups.capture.count, 10);
}

/// Main-group count for one scaled cube at `center`, seen from the origin
/// looking down `-Z`.
fn main_count_for_cube_at(center: Vec3, scale: f32) -> u32 {
    let mut device = RecordingDevice::full();
    let mut scene = Scene::new();
    let cube = scene.add_mesh(cube_mesh(&mut device).unwrap());
    let solid = scene.add_material(solid_material(Vec4::ONE));
    scene.add_draw_item(DrawItem::new(
        cube,
        Some(solid),
        Transform::Trs {
            translation: center,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(scale),
        },
    ));
    scene.camera.position = Vec3::ZERO;
    scene.camera.target = Vec3::NEG_Z;

    build(&scene, &params(&scene)).groups.main.count
}

#[test]
fn sphere_straddling_the_left_plane_is_kept() {
    // Left plane at depth 10 sits near x = -10.26. The centre is about one
    // unit outside it; the scaled radius is ~1.73, the unscaled one ~0.87.
    let center = Vec3::new(-11.7, 0.0, -10.0);
    assert_eq!(main_count_for_cube_at(center, 2.0), 1);
    assert_eq!(main_count_for_cube_at(center, 1.0), 0, "unscaled radius does not reach the plane");
}

#[test]
fn sphere_past_the_left_plane_is_culled() {
    // ~2.6 units outside, more than the scaled radius.
    assert_eq!(main_count_for_cube_at(Vec3::new(-14.0, 0.0, -10.0), 2.0), 0);
}

#[test]
fn disabled_culling_keeps_everything() {
    let (_device, mut scene, _) = setup();
    scene.camera.position = Vec3::new(0.0, 4.0, 30.0);
    scene.camera.target = Vec3::new(0.0, 4.0, 40.0);

    let frame = build(
        &scene,
        &BuildParams {
            frustum_culling: false,
            ..params(&scene)
        },
    );
    assert_eq!(frame.groups.main.count, 10);
    assert_eq!(frame.main_batches.len(), 2);
}

#[test]
fn meshes_without_bounds_are_always_visible() {
    let mut device = RecordingDevice::full();
    let mut scene = Scene::new();
    let mut mesh = quad_mesh(&mut device).unwrap();
    mesh.bounds = None;
    let mesh = scene.add_mesh(mesh);
    scene.add_draw_item(DrawItem::new(
        mesh,
        None,
        Transform::from_translation(Vec3::new(0.0, 0.0, 500.0)),
    ));

    let frame = build(&scene, &params(&scene));
    assert_eq!(frame.groups.main.count, 1);
}

#[test]
fn undrawable_items_are_skipped() {
    let mut device = RecordingDevice::full();
    let mut scene = Scene::new();
    let mut empty = quad_mesh(&mut device).unwrap();
    empty.index_count = 0;
    let empty = scene.add_mesh(empty);
    scene.add_draw_item(DrawItem::new(empty, None, Transform::IDENTITY));
    scene.add_draw_item(DrawItem {
        mesh: None,
        ..DrawItem::default()
    });

    let frame = build(&scene, &all_groups(params(&scene)));
    assert_eq!(frame.instance_count(), 0);
    assert_eq!(frame.stats().main_batches, 0);
}

// ============================================================================
// Transparency
// ============================================================================

#[test]
fn transparent_items_sort_far_to_near_and_cast_no_shadow() {
    let (_device, mut scene, keys) = setup();
    let glass = scene.add_material(transparent_material(0.5));
    let mut items = Vec::new();
    for z in [2.0, -4.0, 6.0] {
        items.push(scene.add_draw_item(DrawItem::new(
            keys.cube,
            Some(glass),
            Transform::from_translation(Vec3::new(0.0, 1.0, z)),
        )));
    }

    let frame = build(&scene, &params(&scene));

    let order: Vec<usize> = frame.transparent_draws.iter().map(|d| d.draw_item).collect();
    assert_eq!(order, vec![items[1], items[0], items[2]]);
    for pair in frame.transparent_draws.windows(2) {
        assert!(pair[0].dist2 >= pair[1].dist2);
    }
    assert_eq!(frame.groups.shadow.count, 10, "blended items never cast");
}

#[test]
fn low_alpha_counts_as_transparent() {
    let (_device, mut scene, keys) = setup();
    let faded = scene.add_material(solid_material(Vec4::new(1.0, 1.0, 1.0, 0.5)));
    scene.add_draw_item(DrawItem::new(keys.cube, Some(faded), Transform::IDENTITY));

    let frame = build(&scene, &params(&scene));
    assert_eq!(frame.transparent_draws.len(), 1);
}

// ============================================================================
// Mirrors
// ============================================================================

fn add_mirror(scene: &mut Scene, keys: &BasicSceneKeys, center: Vec3) -> usize {
    let mirror = scene.add_material(mirror_material());
    scene.add_draw_item(DrawItem::new(
        keys.quad,
        Some(mirror),
        Transform::Trs {
            translation: center,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        },
    ))
}

#[test]
fn mirrors_get_their_own_group() {
    let (_device, mut scene, keys) = setup();
    let item = add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0));

    let frame = build(
        &scene,
        &BuildParams {
            planar_reflections: true,
            max_mirrors: 4,
            ..params(&scene)
        },
    );

    assert_eq!(frame.mirror_draws.len(), 1);
    let mirror = &frame.mirror_draws[0];
    assert_eq!(mirror.draw_item, item);
    assert!(mirror.plane_normal.abs_diff_eq(Vec3::Z, 1e-5));
    assert!(mirror.plane_point.abs_diff_eq(Vec3::new(0.0, 1.0, -3.0), 1e-5));
    assert_eq!(frame.groups.mirrors.count, 1);
    assert_eq!(frame.groups.shadow.count, 10, "mirrors never cast");
    assert_eq!(frame.groups.main.count, 10);
}

#[test]
fn mirrors_past_the_limit_draw_as_opaque() {
    let (_device, mut scene, keys) = setup();
    for x in 0..3 {
        add_mirror(&mut scene, &keys, Vec3::new(x as f32, 1.0, -3.0));
    }

    let frame = build(
        &scene,
        &BuildParams {
            planar_reflections: true,
            max_mirrors: 2,
            ..params(&scene)
        },
    );
    assert_eq!(frame.mirror_draws.len(), 2);
    assert_eq!(frame.groups.main.count, 11);
}

#[test]
fn mirrors_draw_as_opaque_without_planar_reflections() {
    let (_device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0));

    let frame = build(&scene, &params(&scene));
    assert!(frame.mirror_draws.is_empty());
    assert_eq!(frame.groups.main.count, 11);
    assert_eq!(frame.groups.shadow.count, 10);
}

#[test]
fn degenerate_mirror_transform_is_rejected() {
    let (_device, mut scene, keys) = setup();
    let mirror = scene.add_material(mirror_material());
    scene.add_draw_item(DrawItem::new(
        keys.quad,
        Some(mirror),
        Transform::Matrix(Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0))),
    ));

    let frame = build(
        &scene,
        &BuildParams {
            planar_reflections: true,
            max_mirrors: 4,
            frustum_culling: false,
            ..params(&scene)
        },
    );
    assert!(frame.mirror_draws.is_empty());
}

// ============================================================================
// Probes
// ============================================================================

#[test]
fn probe_index_splits_otherwise_equal_batches() {
    let (_device, scene, _) = setup();
    // Floor, then the nine cubes: give the first two cubes their own probes.
    let mut probes = vec![None; scene.draw_items.len()];
    probes[1] = Some(0);
    probes[2] = Some(1);

    let frame = build(
        &scene,
        &BuildParams {
            probe_indices: &probes,
            capture_batches: true,
            ..params(&scene)
        },
    );

    let cube_batches: Vec<_> = frame
        .main_batches
        .iter()
        .filter(|b| b.instance_count < 9 && b.geometry.index_count == 36)
        .map(|b| (b.reflection_probe, b.instance_count))
        .collect();
    assert!(cube_batches.contains(&(Some(0), 1)));
    assert!(cube_batches.contains(&(Some(1), 1)));
    assert!(cube_batches.contains(&(None, 7)));
    assert_eq!(frame.capture_batches.len(), frame.main_batches.len());
}

// ============================================================================
// Upload
// ============================================================================

fn instance_buffer(device: &mut RecordingDevice, size: u64) -> umbra::rhi::BufferHandle {
    device
        .create_buffer(&BufferDesc {
            label: "Instances".to_owned(),
            size,
            usage: BufferUsage::VERTEX,
            stride: INSTANCE_STRIDE,
        })
        .unwrap()
}

#[test]
fn upload_writes_the_whole_buffer_once() -> anyhow::Result<()> {
    let (mut device, scene, _) = setup();
    let frame = build(&scene, &all_groups(params(&scene)));
    let buffer = instance_buffer(&mut device, 1 << 20);

    frame.upload(&mut device, buffer, 1 << 20)?;

    let data = device.buffer_data(buffer).unwrap();
    assert_eq!(&data[..frame.as_bytes().len()], frame.as_bytes());
    assert_eq!(frame.byte_size(), u64::from(frame.instance_count()) * u64::from(INSTANCE_STRIDE));
    Ok(())
}

#[test]
fn overflow_fails_without_writing() {
    let (mut device, scene, _) = setup();
    let frame = build(&scene, &all_groups(params(&scene)));
    let capacity = u64::from(INSTANCE_STRIDE) * 4;
    let buffer = instance_buffer(&mut device, capacity);

    let err = frame.upload(&mut device, buffer, capacity).unwrap_err();
    match err {
        UmbraError::InstanceBufferOverflow { required, capacity: reported } => {
            assert_eq!(required, frame.byte_size());
            assert_eq!(reported, capacity);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
    assert!(device.buffer_data(buffer).unwrap().iter().all(|&b| b == 0));
}
