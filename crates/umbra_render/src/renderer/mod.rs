//! Frame Renderer
//!
//! Owns the persistent GPU objects and turns one [`Scene`] snapshot into one
//! presented frame.
//!
//! # Frame Flow
//!
//! ```text
//!  uploads                          graph (declaration order)
//! ┌───────────────────────────┐    ┌──────────────────────────────────────┐
//! │ lights ─► lights buffer   │    │ CascadeShadowAtlas                   │
//! │ cascades + local shadows  │    │ SpotShadow_{i}                       │
//! │   ─► shadow data buffer   │    │ PointShadow_{i}_{Layered|VI|Face_f}  │
//! │ probes: assign / ensure / │ ─► │ ReflectionProbe_{p}_*                │
//! │   refresh                 │    │ DepthPrepass (optional)              │
//! │ batches ─► instance buf.  │    │ MainPass (opaque, planar, blended)   │
//! │ debug lines ─► line buf.  │    │ DebugCubeAtlas, DebugLines           │
//! └───────────────────────────┘    └──────────────────────────────────────┘
//! ```
//!
//! Every buffer write of a frame is issued before the graph executes. Pass
//! callbacks capture their draw lists by value.

pub(crate) mod passes;

pub use passes::{capture_depth_range, capture_projection};

use glam::{Mat3, Mat4, Vec3, Vec4};
use smallvec::SmallVec;
use umbra_core::errors::Result;
use umbra_rhi::{
    BufferDesc, BufferHandle, BufferUsage, Extent2d, RenderDevice, RenderState, Swapchain,
    TextureKind,
};
use umbra_scene::{LightType, Scene};

use crate::batch::{BatchBuilder, BuildParams, DrawStats, FrameInstances, INSTANCE_STRIDE};
use crate::constants::ShadowData;
use crate::debug::{
    CubeAtlasMode, DebugVertex, MAX_DEBUG_LINE_VERTICES, build_debug_lines, cube_atlas_viewport,
};
use crate::graph::{GraphStats, RenderGraph, RgTexture, RgTextureDesc, TransientTexturePool};
use crate::lights::{GpuLight, MAX_LIGHTS, effective_lights};
use crate::pipelines::{PROBE_COLOR_FORMAT, PipelineLibrary};
use crate::planar::{PlanarPlan, group_mirrors};
use crate::probes::ReflectionProbeManager;
use crate::settings::{CubeAtlasSource, RendererSettings};
use crate::shading::{ProbeEnv, ShadingContext, ViewParams};
use crate::shadow::{CascadeSetup, LocalShadows, pack_shadow_data};
use crate::technique::{CubeFamily, CubePipelineSet, CubeSelection, CubeTechnique};

use passes::capture::{CapturePassInputs, add_probe_capture};
use passes::debug::{
    ATLAS_TRIANGLE, ATLAS_VERTEX_STRIDE, CubeAtlasInputs, DebugLineInputs, add_cube_atlas_pass,
    add_debug_lines_pass,
};
use passes::scene::{MainPassInputs, SkyboxDraw, add_depth_prepass, add_main_pass};
use passes::shadow::{ShadowPassInputs, add_shadow_passes};

/// Frames a pooled transient may sit unused before it is destroyed.
const TRANSIENT_MAX_IDLE_FRAMES: u32 = 8;
/// Draw statistics are logged this often when enabled.
const STATS_LOG_INTERVAL: u64 = 60;

/// What one [`FrameRenderer::render_frame`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub graph: GraphStats,
    pub draws: DrawStats,
    pub point_shadow_technique: Option<CubeTechnique>,
    /// Technique of the last probe captured this frame.
    pub capture_technique: Option<CubeTechnique>,
    pub probe_updates: usize,
    pub mirror_groups: usize,
    pub debug_line_vertices: u32,
}

/// Buffers that live as long as the renderer.
#[derive(Debug, Clone, Copy)]
struct PersistentBuffers {
    instances: BufferHandle,
    instance_capacity: u64,
    lights: BufferHandle,
    shadow_data: BufferHandle,
    debug_lines: BufferHandle,
    atlas_triangle: BufferHandle,
}

impl PersistentBuffers {
    fn create(device: &mut dyn RenderDevice, instance_capacity: u64) -> Result<Self> {
        let instances = create_instance_buffer(device, instance_capacity)?;
        let lights = device.create_buffer(&BufferDesc {
            label: "Lights".to_owned(),
            size: (MAX_LIGHTS * size_of::<GpuLight>()) as u64,
            usage: BufferUsage::STRUCTURED | BufferUsage::DYNAMIC,
            stride: size_of::<GpuLight>() as u32,
        })?;
        let shadow_data = device.create_buffer(&BufferDesc {
            label: "ShadowData".to_owned(),
            size: size_of::<ShadowData>() as u64,
            usage: BufferUsage::STRUCTURED | BufferUsage::DYNAMIC,
            stride: size_of::<ShadowData>() as u32,
        })?;
        let debug_lines = device.create_buffer(&BufferDesc {
            label: "DebugLines".to_owned(),
            size: (MAX_DEBUG_LINE_VERTICES * size_of::<DebugVertex>()) as u64,
            usage: BufferUsage::VERTEX | BufferUsage::DYNAMIC,
            stride: 0,
        })?;
        let atlas_triangle = device.create_buffer(&BufferDesc {
            label: "DebugCubeAtlasTriangle".to_owned(),
            size: u64::from(ATLAS_VERTEX_STRIDE) * ATLAS_TRIANGLE.len() as u64,
            usage: BufferUsage::VERTEX,
            stride: 0,
        })?;
        device.write_buffer(atlas_triangle, 0, bytemuck::cast_slice(&ATLAS_TRIANGLE))?;

        Ok(Self {
            instances,
            instance_capacity,
            lights,
            shadow_data,
            debug_lines,
            atlas_triangle,
        })
    }

    fn destroy(&self, device: &mut dyn RenderDevice) {
        for buffer in [
            self.instances,
            self.lights,
            self.shadow_data,
            self.debug_lines,
            self.atlas_triangle,
        ] {
            device.destroy_buffer(buffer);
        }
    }
}

fn create_instance_buffer(device: &mut dyn RenderDevice, capacity: u64) -> Result<BufferHandle> {
    Ok(device.create_buffer(&BufferDesc {
        label: "Instances".to_owned(),
        size: capacity,
        usage: BufferUsage::VERTEX | BufferUsage::DYNAMIC,
        stride: INSTANCE_STRIDE,
    })?)
}

/// The per-frame driver.
///
/// Circuit breakers of the cube techniques live on the renderer: a tier
/// disabled here stays disabled until the renderer is dropped.
pub struct FrameRenderer {
    settings: RendererSettings,
    pipelines: PipelineLibrary,
    point_shadows: CubePipelineSet,
    reflection_capture: CubePipelineSet,
    buffers: PersistentBuffers,
    builder: BatchBuilder,
    probes: ReflectionProbeManager,
    pool: TransientTexturePool,
    frame_index: u64,
}

impl FrameRenderer {
    /// Creates pipelines and persistent buffers for `swapchain`'s formats.
    ///
    /// # Errors
    ///
    /// Any persistent pipeline or buffer that cannot be created. Optional
    /// cube techniques are created lazily and never fail here.
    pub fn new(
        device: &mut dyn RenderDevice,
        swapchain: &dyn Swapchain,
        settings: RendererSettings,
    ) -> Result<Self> {
        let settings = settings.sanitized();
        let pipelines = PipelineLibrary::new(device, swapchain.format(), swapchain.depth_format())?;
        let point_shadows = CubePipelineSet::create(
            device,
            CubeFamily::PointShadow,
            settings.disable_point_shadow_layered,
            settings.disable_point_shadow_vi,
        )?;
        let reflection_capture = CubePipelineSet::create(
            device,
            CubeFamily::ReflectionCapture,
            settings.disable_reflection_capture_layered,
            settings.disable_reflection_capture_vi,
        )?;
        let buffers = PersistentBuffers::create(device, settings.instance_buffer_capacity_bytes)?;

        log::info!(
            "Frame renderer ready: {:?} color, {:?} depth, {} KiB instance buffer",
            swapchain.format(),
            swapchain.depth_format(),
            settings.instance_buffer_capacity_bytes / 1024
        );

        Ok(Self {
            settings,
            pipelines,
            point_shadows,
            reflection_capture,
            buffers,
            builder: BatchBuilder::new(),
            probes: ReflectionProbeManager::new(),
            pool: TransientTexturePool::new(),
            frame_index: 0,
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Applies new settings from the next frame on.
    ///
    /// The instance buffer is recreated when its capacity changes. Newly set
    /// `disable_*` flags trip their breakers; clearing a flag does not
    /// re-enable a tripped tier.
    ///
    /// # Errors
    ///
    /// Device errors from recreating the instance buffer.
    pub fn update_settings(
        &mut self,
        device: &mut dyn RenderDevice,
        settings: RendererSettings,
    ) -> Result<()> {
        let settings = settings.sanitized();

        if settings.instance_buffer_capacity_bytes != self.buffers.instance_capacity {
            device.wait_idle();
            device.destroy_buffer(self.buffers.instances);
            self.buffers.instances = create_instance_buffer(device, settings.instance_buffer_capacity_bytes)?;
            self.buffers.instance_capacity = settings.instance_buffer_capacity_bytes;
        }
        if !settings.enable_reflection_capture && !self.probes.is_empty() {
            self.probes.release_all(device);
        }

        if settings.disable_point_shadow_layered {
            self.point_shadows.disable(CubeTechnique::Layered);
        }
        if settings.disable_point_shadow_vi {
            self.point_shadows.disable(CubeTechnique::ViewInstancing);
        }
        if settings.disable_reflection_capture_layered {
            self.reflection_capture.disable(CubeTechnique::Layered);
        }
        if settings.disable_reflection_capture_vi {
            self.reflection_capture.disable(CubeTechnique::ViewInstancing);
        }

        self.settings = settings;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn point_shadow_techniques(&self) -> &CubePipelineSet {
        &self.point_shadows
    }

    #[inline]
    #[must_use]
    pub fn reflection_capture_techniques(&self) -> &CubePipelineSet {
        &self.reflection_capture
    }

    #[inline]
    #[must_use]
    pub fn probes(&self) -> &ReflectionProbeManager {
        &self.probes
    }

    #[inline]
    #[must_use]
    pub fn transient_pool(&self) -> &TransientTexturePool {
        &self.pool
    }

    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Renders and presents one frame.
    ///
    /// A zero-sized swapchain (minimized window) skips the frame.
    ///
    /// # Errors
    ///
    /// Instance buffer overflow, graph validation and device failures. The
    /// frame is abandoned on error; nothing is presented.
    pub fn render_frame(
        &mut self,
        device: &mut dyn RenderDevice,
        swapchain: &mut dyn Swapchain,
        scene: &Scene,
    ) -> Result<FrameStats> {
        let extent = swapchain.extent();
        if extent.is_empty() {
            log::debug!("Swapchain has zero extent, skipping frame");
            return Ok(FrameStats::default());
        }

        let settings = &self.settings;
        let camera = &scene.camera;
        let aspect = extent.aspect();
        let camera_view_proj = camera.view_projection(aspect);
        let camera_forward = camera.forward();

        // ─── Lights & Shadows ────────────────────────────────────────────

        let lights = effective_lights(&scene.lights, camera.position);
        let gpu_lights: Vec<GpuLight> = lights.iter().map(GpuLight::from_light).collect();
        if !gpu_lights.is_empty() {
            device.write_buffer(self.buffers.lights, 0, bytemuck::cast_slice(&gpu_lights))?;
        }

        let sun_dir = lights
            .iter()
            .find(|l| l.light_type == LightType::Directional)
            .map(|l| l.direction);
        let cascades = CascadeSetup::compute(camera, aspect, sun_dir, settings);
        let local = LocalShadows::collect(&lights);
        let shadow_data = pack_shadow_data(&cascades, &local);
        device.write_buffer(self.buffers.shadow_data, 0, bytemuck::bytes_of(&shadow_data))?;

        // ─── Reflection Probes ───────────────────────────────────────────

        let probe_indices = if settings.enable_reflection_capture {
            let indices = self.probes.assign(scene);
            self.probes
                .ensure_resources(device, settings.reflection_capture_resolution)?;
            self.probes.refresh(scene);
            indices
        } else {
            if !self.probes.is_empty() {
                self.probes.release_all(device);
            }
            Vec::new()
        };
        let probe_updates = if settings.enable_reflection_capture {
            self.probes
                .pending_updates(settings.reflection_capture_update_every_frame)
        } else {
            Vec::new()
        };

        // ─── Batching ────────────────────────────────────────────────────

        // Layered groups are only built when the layered tier is usable.
        let mut point_selection =
            (!local.points.is_empty()).then(|| self.point_shadows.select(device, true));
        let capture_preselect =
            (!probe_updates.is_empty()).then(|| self.reflection_capture.select(device, true));

        let instances = self.builder.build(
            scene,
            &BuildParams {
                view_proj: camera_view_proj,
                camera_pos: camera.position,
                frustum_culling: settings.enable_frustum_culling,
                capture_batches: settings.needs_capture_batches(),
                planar_reflections: settings.enable_planar_reflections,
                max_mirrors: settings.planar_reflection_max_mirrors,
                layered_shadow: is_layered(point_selection),
                layered_capture: is_layered(capture_preselect),
                probe_indices: &probe_indices,
            },
        );
        if is_layered(point_selection) && instances.layered_shadow_batches.is_empty() {
            point_selection = Some(self.point_shadows.select(device, false));
        }

        instances.upload(device, self.buffers.instances, self.buffers.instance_capacity)?;

        let debug_lines = build_debug_lines(scene, settings);
        if !debug_lines.is_empty() {
            device.write_buffer(self.buffers.debug_lines, 0, debug_lines.as_bytes())?;
        }

        // ─── Graph ───────────────────────────────────────────────────────

        let mut graph = RenderGraph::new();

        let shadows = add_shadow_passes(
            &mut graph,
            &ShadowPassInputs {
                cascades: &cascades,
                local: &local,
                instances: &instances,
                instance_buffer: self.buffers.instances,
                shadow_pipeline: self.pipelines.shadow,
                spot_resolution: settings.spot_shadow_resolution,
                point_resolution: settings.point_shadow_resolution,
                point_selection,
            },
        );

        let mut capture_technique = None;
        {
            let inputs = CapturePassInputs {
                resolution: self.probes.resolution(),
                near_z: settings.reflection_capture_near_z,
                far_z: settings.reflection_capture_far_z,
                skybox: scene.skybox,
                skybox_pipeline: self.pipelines.skybox_capture,
                instance_buffer: self.buffers.instances,
                lights_buffer: self.buffers.lights,
                light_count: gpu_lights.len() as u32,
                capture_batches: &instances.capture_batches,
                layered_capture_batches: &instances.layered_capture_batches,
            };
            let capture_set = &mut self.reflection_capture;
            for update in &probe_updates {
                add_probe_capture(&mut graph, &inputs, update, |allow_layered| {
                    let selection = capture_set.select(device, allow_layered);
                    capture_technique = Some(selection.technique);
                    selection
                });
            }
        }

        let probe_cubes = self.import_probe_cubes(&mut graph);

        if settings.enable_depth_prepass {
            add_depth_prepass(
                &mut graph,
                camera_view_proj,
                self.pipelines.scene_depth,
                instances.shadow_batches.clone(),
                self.buffers.instances,
            );
        }

        let main_state = if settings.enable_depth_prepass {
            RenderState::after_depth_prepass()
        } else {
            RenderState::opaque()
        };
        let planar = self.planar_plan(&instances, camera.position, main_state);
        let mirror_groups = planar.as_ref().map_or(0, |p| p.groups.len());

        let shading = ShadingContext {
            pipelines: self.pipelines,
            instance_buffer: self.buffers.instances,
            lights_buffer: self.buffers.lights,
            shadow_buffer: self.buffers.shadow_data,
            view: ViewParams::camera(camera_view_proj, camera.position, camera_forward),
            light_view_proj: cascades.primary_view_proj(),
            light_count: gpu_lights.len() as u32,
            spot_shadow_count: local.spots.len() as u32,
            point_shadow_count: local.points.len() as u32,
            shadow_bias: Vec4::new(
                settings.dir_shadow_base_bias_texels,
                settings.spot_shadow_base_bias_texels,
                settings.point_shadow_base_bias_texels,
                settings.shadow_slope_scale_texels,
            ),
            skybox: scene.skybox,
            reflection_capture: settings.enable_reflection_capture,
            probe_box_half_extent: settings.reflection_probe_box_half_extent,
            probes: self.probe_envs(),
        };

        let skybox = scene.skybox.is_some().then(|| {
            let view = Mat4::from_mat3(Mat3::from_mat4(camera.view_matrix()));
            SkyboxDraw {
                pipeline: self.pipelines.skybox,
                cube: scene.skybox,
                inv_view_proj: (camera.projection_matrix(aspect) * view).inverse(),
            }
        });

        add_main_pass(
            &mut graph,
            &shadows,
            MainPassInputs {
                clear_color: settings.clear_color,
                after_prepass: settings.enable_depth_prepass,
                shading,
                opaque: instances.main_batches.clone(),
                transparent: instances.transparent_draws.clone(),
                skybox,
                planar,
                probe_cubes: probe_cubes.iter().map(|&(_, cube)| cube).collect(),
            },
        );

        if settings.show_cube_atlas {
            self.add_cube_atlas(&mut graph, extent, &shadows.points, &probe_cubes);
        }

        if !debug_lines.is_empty() {
            add_debug_lines_pass(
                &mut graph,
                DebugLineInputs {
                    view_proj: camera_view_proj,
                    vertex_count: debug_lines.vertex_count(),
                    depth_test: settings.debug_draw_depth_test,
                    pipeline: self.pipelines.debug_lines,
                    vertex_buffer: self.buffers.debug_lines,
                },
            );
        }

        // ─── Execute ─────────────────────────────────────────────────────

        let graph_stats = graph.execute(device, swapchain, &mut self.pool)?;
        self.probes.mark_captured(&probe_updates);
        swapchain.present(device)?;
        self.pool.end_frame();
        self.pool.trim(device, TRANSIENT_MAX_IDLE_FRAMES);

        let stats = FrameStats {
            frame_index: self.frame_index,
            graph: graph_stats,
            draws: instances.stats(),
            point_shadow_technique: point_selection.map(|s| s.technique),
            capture_technique,
            probe_updates: probe_updates.len(),
            mirror_groups,
            debug_line_vertices: debug_lines.vertex_count(),
        };
        self.log_stats(&stats);
        self.frame_index += 1;
        Ok(stats)
    }

    /// Resizes the swapchain. Pooled transients sized for the old extent
    /// are destroyed.
    ///
    /// # Errors
    ///
    /// Device errors from the swapchain resize.
    pub fn resize(
        &mut self,
        device: &mut dyn RenderDevice,
        swapchain: &mut dyn Swapchain,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let extent = Extent2d::new(width, height);
        if extent.is_empty() {
            log::debug!("Ignoring resize to {width}x{height}");
            return Ok(());
        }
        device.wait_idle();
        self.pool.clear(device);
        swapchain.resize(device, extent)?;
        log::debug!("Resized to {width}x{height}");
        Ok(())
    }

    /// Releases every GPU object owned by the renderer.
    pub fn destroy(mut self, device: &mut dyn RenderDevice) {
        device.wait_idle();
        self.pool.clear(device);
        self.probes.release_all(device);
        self.buffers.destroy(device);
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    /// Imports every probe cube that has textures, with its probe index.
    fn import_probe_cubes(&self, graph: &mut RenderGraph<'_>) -> SmallVec<[(u32, RgTexture); 8]> {
        let extent = Extent2d::square(self.probes.resolution());
        self.probes
            .probes()
            .iter()
            .enumerate()
            .filter_map(|(index, probe)| {
                let textures = probe.textures?;
                let desc = RgTextureDesc::attachment(
                    format!("ReflectionProbe_{index}_Cube"),
                    extent,
                    TextureKind::Cube,
                    PROBE_COLOR_FORMAT,
                );
                Some((index as u32, graph.import_texture(textures.cube, desc)))
            })
            .collect()
    }

    fn probe_envs(&self) -> SmallVec<[Option<ProbeEnv>; 8]> {
        self.probes
            .probes()
            .iter()
            .map(|probe| {
                probe.textures.map(|t| ProbeEnv {
                    descriptor: t.descriptor,
                    cube: t.cube,
                    capture_pos: probe.capture_pos,
                })
            })
            .collect()
    }

    fn planar_plan(
        &self,
        instances: &FrameInstances,
        camera_pos: Vec3,
        restore_state: RenderState,
    ) -> Option<PlanarPlan> {
        if !self.settings.enable_planar_reflections || instances.mirror_draws.is_empty() {
            return None;
        }
        let max_groups = self.settings.planar_reflection_max_mirrors as usize;
        let groups = group_mirrors(&instances.mirror_draws, camera_pos, max_groups);
        (!groups.is_empty()).then(|| PlanarPlan {
            groups,
            batches: instances.planar_source_batches().to_vec(),
            mask_pipeline: self.pipelines.scene_depth,
            restore_state,
        })
    }

    fn add_cube_atlas(
        &self,
        graph: &mut RenderGraph<'_>,
        extent: Extent2d,
        point_cubes: &[RgTexture],
        probe_cubes: &[(u32, RgTexture)],
    ) {
        let index = self.settings.debug_cube_atlas_index as usize;
        let source = match self.settings.cube_atlas_source {
            CubeAtlasSource::PointShadow => point_cubes
                .get(index.min(point_cubes.len().saturating_sub(1)))
                .map(|&cube| (cube, CubeAtlasMode::Depth)),
            CubeAtlasSource::ReflectionProbe => probe_cubes
                .get(index.min(probe_cubes.len().saturating_sub(1)))
                .map(|&(_, cube)| (cube, CubeAtlasMode::Color)),
        };
        let Some((cube, mode)) = source else {
            return;
        };

        add_cube_atlas_pass(
            graph,
            CubeAtlasInputs {
                cube,
                mode,
                rect: cube_atlas_viewport(extent),
                pipeline: self.pipelines.cube_atlas,
                vertex_buffer: self.buffers.atlas_triangle,
            },
        );
    }

    fn log_stats(&self, stats: &FrameStats) {
        if !self.settings.debug_print_draw_calls || self.frame_index % STATS_LOG_INTERVAL != 0 {
            return;
        }
        let d = &stats.draws;
        log::debug!(
            "Frame {}: {} passes, {} commands | batches main {} shadow {} capture {} transparent {} mirrors {} | instances {} | probes {} | lines {}",
            stats.frame_index,
            stats.graph.passes,
            stats.graph.commands,
            d.main_batches,
            d.shadow_batches,
            d.capture_batches,
            d.transparent_draws,
            d.mirror_draws,
            d.total_instances,
            stats.probe_updates,
            stats.debug_line_vertices,
        );
    }
}

#[inline]
fn is_layered(selection: Option<CubeSelection>) -> bool {
    selection.is_some_and(|s| s.technique == CubeTechnique::Layered)
}
