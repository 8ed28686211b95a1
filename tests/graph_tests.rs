//! Render Graph Tests
//!
//! Tests for:
//! - Lifetimes and producer/consumer edges from `compile`
//! - Transient reuse within a frame and across frames
//! - Attachment validation errors
//! - Imported textures: dedup, destroyed-before-execute, state across frames
//! - State transitions and declaration-order execution

use std::cell::{Cell, RefCell};

use umbra::UmbraError;
use umbra::render::graph::{PassAttachments, RenderGraph, RgTexture, RgTextureDesc, TransientTexturePool};
use umbra::rhi::{
    ClearDesc, Command, Extent2d, RenderDevice, ResourceState, TextureDesc, TextureHandle,
    TextureKind,
};
use umbra_dev_utils::{HeadlessSwapchain, RecordingDevice};

const SIZE: u32 = 64;

fn color_desc(label: &str) -> RgTextureDesc {
    RgTextureDesc::attachment(label, Extent2d::square(SIZE), TextureKind::D2, wgpu::TextureFormat::Rgba8Unorm)
}

fn depth_desc(label: &str) -> RgTextureDesc {
    RgTextureDesc::attachment(label, Extent2d::square(SIZE), TextureKind::D2, wgpu::TextureFormat::Depth32Float)
}

fn cube_desc(label: &str, format: wgpu::TextureFormat) -> RgTextureDesc {
    RgTextureDesc::attachment(label, Extent2d::square(SIZE), TextureKind::Cube, format)
}

struct Harness {
    device: RecordingDevice,
    swapchain: HeadlessSwapchain,
    pool: TransientTexturePool,
}

impl Harness {
    fn new() -> Self {
        let mut device = RecordingDevice::full();
        let swapchain = HeadlessSwapchain::new(&mut device, Extent2d::new(320, 180)).unwrap();
        Self {
            device,
            swapchain,
            pool: TransientTexturePool::new(),
        }
    }

    fn run(&mut self, graph: RenderGraph<'_>) -> umbra::Result<umbra::render::graph::GraphStats> {
        graph.execute(&mut self.device, &self.swapchain, &mut self.pool)
    }

    fn commands(&self) -> &[Command] {
        self.device.last_submission().unwrap().commands()
    }
}

/// A writes t1; B reads t1, writes t2; C reads t2, writes t3.
fn chain(graph: &mut RenderGraph<'_>) -> [RgTexture; 3] {
    let t1 = graph.create_texture(color_desc("T1"));
    let t2 = graph.create_texture(color_desc("T2"));
    let t3 = graph.create_texture(color_desc("T3"));
    graph.add_pass("A", PassAttachments::new().color(t1), |_| {});
    graph.add_pass("B", PassAttachments::new().color(t2).read(t1), |_| {});
    graph.add_pass("C", PassAttachments::new().color(t3).read(t2), |_| {});
    [t1, t2, t3]
}

fn begin_labels(commands: &[Command]) -> Vec<&str> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::BeginRenderPass(desc) => Some(desc.label.as_str()),
            _ => None,
        })
        .collect()
}

fn transitions_of(commands: &[Command], texture: TextureHandle) -> Vec<(ResourceState, ResourceState)> {
    commands
        .iter()
        .filter_map(|c| match *c {
            Command::Transition {
                texture: t,
                before,
                after,
            } if t == texture => Some((before, after)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Compile
// ============================================================================

#[test]
fn lifetimes_span_first_to_last_use() {
    let mut graph = RenderGraph::new();
    let [t1, t2, t3] = chain(&mut graph);
    let plan = graph.compile().unwrap();

    assert_eq!(plan.lifetime(t1), Some((0, 1)));
    assert_eq!(plan.lifetime(t2), Some((1, 2)));
    assert_eq!(plan.lifetime(t3), Some((2, 2)));
}

#[test]
fn dependencies_follow_writers_and_readers() {
    let mut graph = RenderGraph::new();
    let [t1, _, _] = chain(&mut graph);
    // D overwrites t1 after B has read it.
    graph.add_pass("D", PassAttachments::new().color(t1), |_| {});
    let plan = graph.compile().unwrap();

    assert!(plan.dependencies(0).is_empty());
    assert_eq!(plan.dependencies(1), &[0]);
    assert_eq!(plan.dependencies(2), &[1]);
    assert_eq!(plan.dependencies(3), &[0, 1], "write after read waits on the reader");
}

#[test]
fn unused_texture_has_no_lifetime() {
    let mut graph = RenderGraph::new();
    let unused = graph.create_texture(color_desc("Unused"));
    let used = graph.create_texture(color_desc("Used"));
    graph.add_pass("Only", PassAttachments::new().color(used), |_| {});
    let plan = graph.compile().unwrap();
    assert_eq!(plan.lifetime(unused), None);
}

#[test]
fn reading_an_unwritten_transient_fails() {
    let mut graph = RenderGraph::new();
    let never_written = graph.create_texture(color_desc("Ghost"));
    let target = graph.create_texture(color_desc("Target"));
    graph.add_pass("Reader", PassAttachments::new().color(target).read(never_written), |_| {});

    assert!(matches!(
        graph.compile(),
        Err(UmbraError::UnresolvedResource { pass, .. }) if pass == "Reader"
    ));
}

#[test]
fn foreign_handle_is_unresolved() {
    let mut graph = RenderGraph::new();
    graph.add_pass("Bogus", PassAttachments::new().color(RgTexture::from_raw(42)), |_| {});
    assert!(matches!(
        graph.compile(),
        Err(UmbraError::UnresolvedResource { resource: 42, .. })
    ));
}

// ============================================================================
// Validation
// ============================================================================

fn assert_invalid(graph: &RenderGraph<'_>, needle: &str) {
    match graph.compile() {
        Err(UmbraError::InvalidAttachment { reason, .. }) => {
            assert!(reason.contains(needle), "unexpected reason: {reason}");
        }
        other => panic!("expected InvalidAttachment containing '{needle}', got {other:?}"),
    }
}

#[test]
fn pass_without_attachments_is_rejected() {
    let mut graph = RenderGraph::new();
    graph.add_pass("Empty", PassAttachments::new(), |_| {});
    assert_invalid(&graph, "no color or depth");
}

#[test]
fn depth_texture_bound_as_color_is_rejected() {
    let mut graph = RenderGraph::new();
    let depth = graph.create_texture(depth_desc("Depth"));
    graph.add_pass("Wrong", PassAttachments::new().color(depth), |_| {});
    assert_invalid(&graph, "depth texture bound as color");
}

#[test]
fn color_texture_bound_as_depth_is_rejected() {
    let mut graph = RenderGraph::new();
    let color = graph.create_texture(color_desc("Color"));
    graph.add_pass("Wrong", PassAttachments::new().depth(color), |_| {});
    assert_invalid(&graph, "not a depth texture");
}

#[test]
fn cube_faces_must_be_in_range() {
    let mut graph = RenderGraph::new();
    let cube = graph.create_texture(cube_desc("Cube", wgpu::TextureFormat::R32Float));
    graph.add_pass("Face6", PassAttachments::new().color_face(cube, 6), |_| {});
    assert_invalid(&graph, "out of range");
}

#[test]
fn cube_must_be_addressed_per_face_or_layered() {
    let mut graph = RenderGraph::new();
    let cube = graph.create_texture(cube_desc("Cube", wgpu::TextureFormat::R32Float));
    graph.add_pass("Whole", PassAttachments::new().color(cube), |_| {});
    assert_invalid(&graph, "per face or as all faces");
}

#[test]
fn face_addressing_on_2d_is_rejected() {
    let mut graph = RenderGraph::new();
    let flat = graph.create_texture(color_desc("Flat"));
    graph.add_pass("Face", PassAttachments::new().color_face(flat, 0), |_| {});
    assert_invalid(&graph, "face addressing on 2D");
}

#[test]
fn per_face_color_needs_2d_depth() {
    let mut graph = RenderGraph::new();
    let cube = graph.create_texture(cube_desc("Cube", wgpu::TextureFormat::R32Float));
    let depth_cube = graph.create_texture(cube_desc("DepthCube", wgpu::TextureFormat::Depth32Float));
    graph.add_pass(
        "Face",
        PassAttachments::new().color_face(cube, 2).depth_all_faces(depth_cube),
        |_| {},
    );
    assert_invalid(&graph, "separate 2D depth");
}

#[test]
fn layered_color_needs_layered_depth() {
    let mut graph = RenderGraph::new();
    let cube = graph.create_texture(cube_desc("Cube", wgpu::TextureFormat::R32Float));
    let depth = graph.create_texture(depth_desc("Depth2D"));
    graph.add_pass(
        "Layered",
        PassAttachments::new().color_all_faces(cube).depth(depth),
        |_| {},
    );
    assert_invalid(&graph, "layered depth");
}

#[test]
fn extent_mismatch_is_rejected() {
    let mut graph = RenderGraph::new();
    let color = graph.create_texture(color_desc("Color"));
    let depth = graph.create_texture(RgTextureDesc::attachment(
        "SmallDepth",
        Extent2d::square(SIZE / 2),
        TextureKind::D2,
        wgpu::TextureFormat::Depth32Float,
    ));
    graph.add_pass("Mismatch", PassAttachments::new().color(color).depth(depth), |_| {});
    assert_invalid(&graph, "extent mismatch");
}

#[test]
fn read_and_write_of_one_texture_is_rejected() {
    let mut graph = RenderGraph::new();
    let t = graph.create_texture(color_desc("T"));
    graph.add_pass("Write", PassAttachments::new().color(t), |_| {});
    graph.add_pass("Feedback", PassAttachments::new().color(t).read(t), |_| {});
    assert_invalid(&graph, "both read and written");
}

#[test]
fn per_face_color_with_2d_depth_is_valid() {
    let mut graph = RenderGraph::new();
    let cube = graph.create_texture(cube_desc("Cube", wgpu::TextureFormat::R32Float));
    let depth = graph.create_texture(depth_desc("DepthTmp"));
    for face in 0..6 {
        graph.add_pass(
            format!("Face_{face}"),
            PassAttachments::new().color_face(cube, face).depth(depth),
            |_| {},
        );
    }
    assert!(graph.compile().is_ok());
}

// ============================================================================
// Transient Reuse
// ============================================================================

#[test]
fn dead_transient_is_reused_in_the_same_frame() {
    let mut h = Harness::new();
    let first = Cell::new(None);
    let last = Cell::new(None);
    let (first_ref, last_ref) = (&first, &last);

    let mut graph = RenderGraph::new();
    let t1 = graph.create_texture(color_desc("T1"));
    let t2 = graph.create_texture(color_desc("T2"));
    let t3 = graph.create_texture(color_desc("T3"));
    graph.add_pass("A", PassAttachments::new().color(t1), move |ctx| first_ref.set(ctx.texture(t1)));
    graph.add_pass("B", PassAttachments::new().color(t2).read(t1), |_| {});
    graph.add_pass("C", PassAttachments::new().color(t3).read(t2), move |ctx| last_ref.set(ctx.texture(t3)));

    let stats = h.run(graph).unwrap();

    // t1 dies after B, so C's t3 takes its texture.
    assert_eq!(stats.transients_created, 2);
    assert_eq!(stats.transients_reused, 1);
    assert!(first.get().is_some());
    assert_eq!(first.get(), last.get());
}

#[test]
fn next_frame_creates_nothing() {
    let mut h = Harness::new();

    let mut graph = RenderGraph::new();
    chain(&mut graph);
    let cold = h.run(graph).unwrap();
    assert_eq!(cold.transients_created, 2);
    assert_eq!(cold.transients_reused, 1);
    h.pool.end_frame();

    let textures_before = h.device.counters().textures_created;
    let mut graph = RenderGraph::new();
    chain(&mut graph);
    let warm = h.run(graph).unwrap();

    assert_eq!(warm.transients_created, 0);
    assert_eq!(warm.transients_reused, 3);
    assert_eq!(h.device.counters().textures_created, textures_before);
}

#[test]
fn different_descriptions_do_not_share() {
    let mut h = Harness::new();
    let mut graph = RenderGraph::new();
    let a = graph.create_texture(color_desc("A"));
    let b = graph.create_texture(RgTextureDesc::attachment(
        "B",
        Extent2d::square(SIZE),
        TextureKind::D2,
        wgpu::TextureFormat::R32Float,
    ));
    graph.add_pass("WriteA", PassAttachments::new().color(a), |_| {});
    graph.add_pass("WriteB", PassAttachments::new().color(b), |_| {});

    let stats = h.run(graph).unwrap();
    assert_eq!(stats.transients_created, 2);
    assert_eq!(stats.transients_reused, 0);
}

#[test]
fn idle_transients_are_trimmed() {
    let mut h = Harness::new();
    let mut graph = RenderGraph::new();
    chain(&mut graph);
    h.run(graph).unwrap();
    assert_eq!(h.pool.total_texture_count(), 2);

    for _ in 0..4 {
        h.pool.end_frame();
    }
    h.pool.trim(&mut h.device, 8);
    assert_eq!(h.pool.total_texture_count(), 2, "not idle long enough");

    for _ in 0..8 {
        h.pool.end_frame();
    }
    h.pool.trim(&mut h.device, 8);
    assert_eq!(h.pool.total_texture_count(), 0);
    assert_eq!(h.device.counters().textures_destroyed, 2);
}

#[test]
fn frame_of_use_does_not_count_as_idle() {
    let mut h = Harness::new();
    let mut graph = RenderGraph::new();
    chain(&mut graph);
    h.run(graph).unwrap();
    h.pool.end_frame();

    for _ in 0..8 {
        h.pool.end_frame();
    }
    h.pool.trim(&mut h.device, 8);
    assert_eq!(h.pool.total_texture_count(), 2, "idle for exactly 8 frames");

    h.pool.end_frame();
    h.pool.trim(&mut h.device, 8);
    assert_eq!(h.pool.total_texture_count(), 0);
}

// ============================================================================
// Imports
// ============================================================================

fn device_texture(device: &mut RecordingDevice, label: &str) -> TextureHandle {
    device
        .create_texture(&TextureDesc {
            label: label.to_owned(),
            extent: Extent2d::square(SIZE),
            kind: TextureKind::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        })
        .unwrap()
}

#[test]
fn importing_twice_returns_one_handle() {
    let mut device = RecordingDevice::full();
    let texture = device_texture(&mut device, "History");

    let mut graph = RenderGraph::new();
    let a = graph.import_texture(texture, color_desc("History"));
    let b = graph.import_texture(texture, color_desc("History"));
    assert_eq!(a, b);
}

#[test]
fn destroyed_import_aborts_the_frame() {
    let mut h = Harness::new();
    let texture = device_texture(&mut h.device, "Probe");

    let mut graph = RenderGraph::new();
    let imported = graph.import_texture(texture, color_desc("Probe"));
    graph.add_pass("UsesProbe", PassAttachments::new().color(imported), |_| {});
    h.device.destroy_texture(texture);

    match h.run(graph) {
        Err(UmbraError::ImportedResourceDestroyed { pass, label }) => {
            assert_eq!(pass, "UsesProbe");
            assert_eq!(label, "Probe");
        }
        other => panic!("expected ImportedResourceDestroyed, got {other:?}"),
    }
    assert!(h.device.submissions().is_empty(), "nothing is submitted");
}

#[test]
fn imports_end_the_frame_sampleable() {
    let mut h = Harness::new();
    let texture = device_texture(&mut h.device, "Capture");

    let mut graph = RenderGraph::new();
    let imported = graph.import_texture(texture, color_desc("Capture"));
    graph.add_pass("Render", PassAttachments::new().color(imported), |_| {});
    h.run(graph).unwrap();

    assert_eq!(
        transitions_of(h.commands(), texture),
        vec![
            (ResourceState::ShaderRead, ResourceState::RenderTarget),
            (ResourceState::RenderTarget, ResourceState::ShaderRead),
        ]
    );
}

#[test]
fn imported_depth_cube_keeps_its_state_across_frames() {
    let mut h = Harness::new();
    let [color, depth] = [
        ("ProbeCube", wgpu::TextureFormat::Rgba16Float),
        ("ProbeDepthCube", wgpu::TextureFormat::Depth32Float),
    ]
    .map(|(label, format)| {
        h.device
            .create_texture(&TextureDesc {
                label: label.to_owned(),
                extent: Extent2d::square(SIZE),
                kind: TextureKind::Cube,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            })
            .unwrap()
    });

    for _ in 0..2 {
        let mut graph = RenderGraph::new();
        let rg_color = graph.import_texture(color, cube_desc("ProbeCube", wgpu::TextureFormat::Rgba16Float));
        let rg_depth = graph.import_texture(depth, cube_desc("ProbeDepthCube", wgpu::TextureFormat::Depth32Float));
        graph.add_pass(
            "Capture",
            PassAttachments::new().color_all_faces(rg_color).depth_all_faces(rg_depth),
            |_| {},
        );
        h.run(graph).unwrap();

        assert_eq!(
            transitions_of(h.commands(), depth),
            vec![
                (ResourceState::DepthRead, ResourceState::DepthWrite),
                (ResourceState::DepthWrite, ResourceState::DepthRead),
            ]
        );
        assert_eq!(
            transitions_of(h.commands(), color),
            vec![
                (ResourceState::ShaderRead, ResourceState::RenderTarget),
                (ResourceState::RenderTarget, ResourceState::ShaderRead),
            ]
        );
    }
}

#[test]
fn imports_are_never_pooled() {
    let mut h = Harness::new();
    let texture = device_texture(&mut h.device, "Persistent");

    let mut graph = RenderGraph::new();
    let imported = graph.import_texture(texture, color_desc("Persistent"));
    graph.add_pass("Render", PassAttachments::new().color(imported), |_| {});
    let stats = h.run(graph).unwrap();

    assert_eq!(stats.transients_created, 0);
    assert_eq!(h.pool.total_texture_count(), 0);
    assert!(h.device.texture_alive(texture));
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn passes_run_in_declaration_order() {
    let mut h = Harness::new();
    let order = RefCell::new(Vec::new());
    let order_ref = &order;

    let mut graph = RenderGraph::new();
    let [t1, t2, t3] = chain(&mut graph);
    for (name, t) in [("X", t1), ("Y", t2), ("Z", t3)] {
        graph.add_pass(name, PassAttachments::new().color(t), move |_| order_ref.borrow_mut().push(name));
    }
    h.run(graph).unwrap();

    assert_eq!(*order.borrow(), vec!["X", "Y", "Z"]);
    assert_eq!(begin_labels(h.commands()), vec!["A", "B", "C", "X", "Y", "Z"]);
}

#[test]
fn swapchain_pass_leaves_back_buffer_presentable() {
    let mut h = Harness::new();
    let mut graph = RenderGraph::new();
    graph.add_swapchain_pass(
        "Main",
        PassAttachments::new().clear(ClearDesc::color_depth([0.0, 0.0, 0.0, 1.0])),
        |_| {},
    );
    let stats = h.run(graph).unwrap();

    let back_buffer = umbra::rhi::Swapchain::current_back_buffer(&h.swapchain);
    assert_eq!(
        transitions_of(h.commands(), back_buffer),
        vec![
            (ResourceState::Present, ResourceState::RenderTarget),
            (ResourceState::RenderTarget, ResourceState::Present),
        ]
    );
    assert_eq!(stats.passes, 1);
    assert_eq!(stats.commands, h.commands().len());
}

#[test]
fn sampled_depth_moves_to_depth_read() {
    let mut h = Harness::new();
    let mut graph = RenderGraph::new();
    let shadow = graph.create_texture(depth_desc("Shadow"));
    let color = graph.create_texture(color_desc("Lit"));
    graph.add_pass("Shadow", PassAttachments::new().depth(shadow), |_| {});
    graph.add_pass("Lit", PassAttachments::new().color(color).read(shadow), |_| {});
    h.run(graph).unwrap();

    let afters: Vec<ResourceState> = h
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::Transition { after, .. } => Some(*after),
            _ => None,
        })
        .collect();
    assert!(afters.contains(&ResourceState::DepthWrite));
    assert!(afters.contains(&ResourceState::DepthRead));
}

#[test]
fn callback_sees_attachment_extent_and_full_viewport() {
    let mut h = Harness::new();
    let seen = Cell::new(Extent2d::default());
    let seen_ref = &seen;

    let mut graph = RenderGraph::new();
    let t = graph.create_texture(color_desc("Small"));
    graph.add_pass("Small", PassAttachments::new().color(t), move |ctx| seen_ref.set(ctx.extent));
    h.run(graph).unwrap();

    assert_eq!(seen.get(), Extent2d::square(SIZE));
    let viewport = h
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::SetViewport(v) => Some(*v),
            _ => None,
        })
        .unwrap();
    assert_eq!(viewport.width, SIZE as f32);
    assert_eq!(viewport.height, SIZE as f32);
}

#[test]
fn one_submission_per_execute() {
    let mut h = Harness::new();
    for _ in 0..3 {
        let mut graph = RenderGraph::new();
        chain(&mut graph);
        h.run(graph).unwrap();
    }
    assert_eq!(h.device.submissions().len(), 3);
}
