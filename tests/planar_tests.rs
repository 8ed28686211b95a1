//! Planar Reflection Tests
//!
//! Tests for:
//! - Reflection matrices
//! - Mirror grouping by plane, stencil references, group limit
//! - Reflected camera and clip plane
//! - Recorded order: mask, reflect, restore

use glam::{Mat4, Quat, Vec3, Vec4};

use umbra::core::math::Transform;
use umbra::render::batch::{BatchBuilder, BuildParams, FrameInstances, PlanarMirrorDraw};
use umbra::render::constants::PerBatchConstants;
use umbra::render::pipelines::PipelineLibrary;
use umbra::render::planar::{
    CLIP_PLANE_BIAS, MirrorGroup, PlanarPlan, group_mirrors, record_planar_reflections, reflection_matrix,
};
use umbra::render::shading::{ShadingContext, ViewParams};
use umbra::rhi::{BufferHandle, Command, CommandList, DescriptorIndex, RenderState};
use umbra::scene::{DrawItem, Scene};
use umbra_dev_utils::fixtures::{BasicSceneKeys, basic_scene, mirror_material};
use umbra_dev_utils::{HEADLESS_COLOR_FORMAT, HEADLESS_DEPTH_FORMAT, RecordingDevice};

const EPSILON: f32 = 1e-4;
const ASPECT: f32 = 16.0 / 9.0;

fn setup() -> (RecordingDevice, Scene, BasicSceneKeys) {
    let mut device = RecordingDevice::full();
    let (scene, keys) = basic_scene(&mut device).unwrap();
    (device, scene, keys)
}

fn add_mirror(scene: &mut Scene, keys: &BasicSceneKeys, center: Vec3, rotation: Quat) {
    let mirror = scene.add_material(mirror_material());
    scene.add_draw_item(DrawItem::new(
        keys.quad,
        Some(mirror),
        Transform::Trs {
            translation: center,
            rotation,
            scale: Vec3::splat(2.0),
        },
    ));
}

fn build(scene: &Scene) -> FrameInstances {
    BatchBuilder::new().build(
        scene,
        &BuildParams {
            view_proj: scene.camera.view_projection(ASPECT),
            camera_pos: scene.camera.position,
            frustum_culling: false,
            planar_reflections: true,
            max_mirrors: 8,
            ..BuildParams::default()
        },
    )
}

fn mirrors(scene: &Scene) -> Vec<PlanarMirrorDraw> {
    build(scene).mirror_draws
}

fn shading(device: &mut RecordingDevice, scene: &Scene) -> ShadingContext {
    ShadingContext {
        pipelines: PipelineLibrary::new(device, HEADLESS_COLOR_FORMAT, HEADLESS_DEPTH_FORMAT).unwrap(),
        instance_buffer: BufferHandle::default(),
        lights_buffer: BufferHandle::default(),
        shadow_buffer: BufferHandle::default(),
        view: ViewParams::camera(
            scene.camera.view_projection(ASPECT),
            scene.camera.position,
            scene.camera.forward(),
        ),
        light_view_proj: Mat4::IDENTITY,
        light_count: 1,
        spot_shadow_count: 0,
        point_shadow_count: 0,
        shadow_bias: Vec4::ZERO,
        skybox: DescriptorIndex(0),
        reflection_capture: false,
        probe_box_half_extent: 5.0,
        probes: Default::default(),
    }
}

fn stencil_refs(cmd: &CommandList) -> Vec<u32> {
    cmd.commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetStencilRef(r) => Some(*r),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Reflection Matrix Tests
// ============================================================================

#[test]
fn reflection_is_an_involution() {
    let r = reflection_matrix(Vec3::new(1.0, 2.0, -0.5), 1.5);
    assert!((r * r).abs_diff_eq(Mat4::IDENTITY, EPSILON));
}

#[test]
fn reflection_keeps_points_on_the_plane() {
    // Plane z = -3.
    let r = reflection_matrix(Vec3::Z, 3.0);
    let on_plane = Vec3::new(4.0, -2.0, -3.0);
    assert!(r.transform_point3(on_plane).abs_diff_eq(on_plane, EPSILON));

    let front = r.transform_point3(Vec3::new(0.0, 0.0, 1.0));
    assert!(front.abs_diff_eq(Vec3::new(0.0, 0.0, -7.0), EPSILON));
}

#[test]
fn unnormalized_normal_is_accepted() {
    let a = reflection_matrix(Vec3::Y * 5.0, -2.0);
    let b = reflection_matrix(Vec3::Y, -2.0);
    let p = Vec3::new(1.0, 7.0, 3.0);
    assert!(a.transform_point3(p).abs_diff_eq(b.transform_point3(p), EPSILON));
}

// ============================================================================
// Grouping Tests
// ============================================================================

#[test]
fn coplanar_mirrors_share_a_group() {
    let (_device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(-3.0, 1.0, -3.0), Quat::IDENTITY);
    add_mirror(&mut scene, &keys, Vec3::new(3.0, 1.0, -3.0), Quat::IDENTITY);

    let groups = group_mirrors(&mirrors(&scene), scene.camera.position, 4);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].mirrors.len(), 2);
    assert_eq!(groups[0].stencil_ref, 1);
}

#[test]
fn nearly_coplanar_mirrors_merge() {
    let (_device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::IDENTITY);
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::from_rotation_y(0.2_f32.to_radians()));

    let groups = group_mirrors(&mirrors(&scene), scene.camera.position, 4);
    assert_eq!(groups.len(), 1);
}

#[test]
fn distinct_planes_get_distinct_stencil_refs() {
    let (_device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::IDENTITY);
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -6.0), Quat::IDENTITY);
    add_mirror(&mut scene, &keys, Vec3::new(-5.0, 1.0, 0.0), Quat::from_rotation_y(90_f32.to_radians()));

    let groups = group_mirrors(&mirrors(&scene), scene.camera.position, 4);
    let refs: Vec<u32> = groups.iter().map(|g| g.stencil_ref).collect();
    assert_eq!(refs, vec![1, 2, 3]);
}

#[test]
fn group_planes_face_the_camera() {
    let (_device, mut scene, keys) = setup();
    // Back side towards the camera.
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::from_rotation_y(180_f32.to_radians()));

    let groups = group_mirrors(&mirrors(&scene), scene.camera.position, 4);
    assert!(groups[0].plane.signed_distance(scene.camera.position) > 0.0);
    assert!(groups[0].plane.normal.abs_diff_eq(Vec3::Z, EPSILON));
}

#[test]
fn groups_past_the_limit_are_skipped() {
    let (_device, mut scene, keys) = setup();
    for z in 0..4 {
        add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0 - z as f32), Quat::IDENTITY);
    }
    let draws = mirrors(&scene);
    assert_eq!(draws.len(), 4);

    let groups = group_mirrors(&draws, scene.camera.position, 2);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].stencil_ref, 2);
}

#[test]
fn reflected_view_mirrors_the_camera() {
    let (_device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::IDENTITY);
    let group: MirrorGroup = group_mirrors(&mirrors(&scene), scene.camera.position, 1).remove(0);

    let camera = ViewParams::camera(Mat4::IDENTITY, Vec3::new(0.0, 4.0, 10.0), Vec3::NEG_Z);
    let view = group.reflected_view(&camera);

    assert!(view.camera_pos.abs_diff_eq(Vec3::new(0.0, 4.0, -16.0), EPSILON));
    assert!(view.camera_forward.abs_diff_eq(Vec3::Z, EPSILON));
    assert!(view.clip_plane.truncate().abs_diff_eq(Vec3::Z, EPSILON));
    assert!((view.clip_plane.w - (3.0 - CLIP_PLANE_BIAS)).abs() < EPSILON);
}

// ============================================================================
// Recording Tests
// ============================================================================

fn record(device: &mut RecordingDevice, scene: &Scene) -> (CommandList, PlanarPlan, ShadingContext) {
    let frame = build(scene);
    let shading = shading(device, scene);
    let plan = PlanarPlan {
        groups: group_mirrors(&frame.mirror_draws, scene.camera.position, 4),
        batches: frame.main_batches.clone(),
        mask_pipeline: shading.pipelines.scene_depth,
        restore_state: RenderState::opaque(),
    };
    let mut cmd = CommandList::new();
    record_planar_reflections(&mut cmd, &plan, &shading);
    (cmd, plan, shading)
}

#[test]
fn no_groups_records_nothing() {
    let (mut device, scene, _) = setup();
    let (cmd, plan, _) = record(&mut device, &scene);
    assert!(plan.groups.is_empty());
    assert!(cmd.is_empty());
}

#[test]
fn each_group_masks_then_reflects() {
    let (mut device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::IDENTITY);
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -6.0), Quat::IDENTITY);
    let (cmd, plan, _) = record(&mut device, &scene);

    assert_eq!(stencil_refs(&cmd), vec![1, 1, 2, 2, 0]);

    let states: Vec<RenderState> = cmd
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetState(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            RenderState::planar_mask(),
            RenderState::planar_reflected(),
            RenderState::planar_mask(),
            RenderState::planar_reflected(),
            plan.restore_state,
        ]
    );
}

#[test]
fn masks_use_the_mask_pipeline_and_reflections_every_batch() {
    let (mut device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::IDENTITY);
    add_mirror(&mut scene, &keys, Vec3::new(4.0, 1.0, -3.0), Quat::IDENTITY);
    let (cmd, plan, _) = record(&mut device, &scene);

    let draws = cmd
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::DrawIndexed(_)))
        .count();
    assert_eq!(draws, 2 + plan.batches.len(), "two masks, one draw per batch");

    let first_bind = cmd.commands().iter().find_map(|c| match c {
        Command::BindPipeline(p) => Some(*p),
        _ => None,
    });
    assert_eq!(first_bind, Some(plan.mask_pipeline));
}

#[test]
fn reflected_batches_carry_the_clip_plane() {
    let (mut device, mut scene, keys) = setup();
    add_mirror(&mut scene, &keys, Vec3::new(0.0, 1.0, -3.0), Quat::IDENTITY);
    let (cmd, _, _) = record(&mut device, &scene);

    let size = std::mem::size_of::<PerBatchConstants>();
    let lit: Vec<PerBatchConstants> = cmd
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetConstants { data, .. } if data.len() == size => {
                Some(bytemuck::pod_read_unaligned::<PerBatchConstants>(data))
            }
            _ => None,
        })
        .collect();

    assert!(!lit.is_empty());
    for constants in lit {
        assert!(constants.clip_plane.truncate().abs_diff_eq(Vec3::Z, EPSILON));
        assert!((constants.clip_plane.w - (3.0 - CLIP_PLANE_BIAS)).abs() < EPSILON);
    }
}
