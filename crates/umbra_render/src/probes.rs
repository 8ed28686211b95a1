//! Reflection Probes
//!
//! Every draw item whose material samples [`EnvSource::ReflectionCapture`]
//! owns one probe: a persistent color cube captured from the item's
//! position, excluding the item itself.
//!
//! # Frame Flow
//!
//! ```text
//! assign(scene) ─▶ ensure_resources(device) ─▶ refresh(scene) ─▶ pending_updates()
//!  owners,          create / recreate /         capture position,   probes to
//!  per-item index   destroy textures            dirty on move       capture now
//!
//!                        graph executed ─▶ mark_captured(updates)
//! ```
//!
//! Probe textures outlive frames; the render graph only imports them.
//!
//! [`EnvSource::ReflectionCapture`]: umbra_scene::EnvSource::ReflectionCapture

use glam::Vec3;
use umbra_core::errors::Result;
use umbra_rhi::{DescriptorIndex, Extent2d, RenderDevice, TextureDesc, TextureHandle, TextureKind};
use umbra_scene::Scene;

use crate::pipelines::{PROBE_COLOR_FORMAT, PROBE_DEPTH_FORMAT};
use crate::settings::{MAX_PROBE_RESOLUTION, MIN_PROBE_RESOLUTION};

/// Probes beyond this count are not created; their owners fall back to
/// the skybox.
pub const MAX_REFLECTION_PROBES: usize = 8;

/// Squared distance a probe owner must move before it is recaptured.
const MOVE_EPSILON_SQ: f32 = 1.0e-6;

/// Persistent GPU resources of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTextures {
    pub cube: TextureHandle,
    pub depth_cube: TextureHandle,
    /// Bindless index of `cube`.
    pub descriptor: DescriptorIndex,
}

/// Runtime state of one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionProbe {
    /// Index of the owning draw item.
    pub owner: usize,
    pub capture_pos: Vec3,
    pub last_pos: Option<Vec3>,
    pub dirty: bool,
    pub textures: Option<ProbeTextures>,
}

impl ReflectionProbe {
    fn new(owner: usize) -> Self {
        Self {
            owner,
            capture_pos: Vec3::ZERO,
            last_pos: None,
            dirty: true,
            textures: None,
        }
    }
}

/// One capture to record this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeUpdate {
    pub probe_index: u32,
    pub capture_pos: Vec3,
    pub textures: ProbeTextures,
}

#[derive(Debug, Default)]
pub struct ReflectionProbeManager {
    probes: Vec<ReflectionProbe>,
    /// Number of probes assigned this frame. Entries past it are stale
    /// until [`ensure_resources`](Self::ensure_resources) drops them.
    active: usize,
    resolution: u32,
}

impl ReflectionProbeManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks probe owners in draw-item order and returns each item's probe
    /// index (`None` for items without a probe).
    pub fn assign(&mut self, scene: &Scene) -> Vec<Option<u32>> {
        let mut indices = vec![None; scene.draw_items.len()];
        let mut count = 0;

        for (item_index, item) in scene.draw_items.iter().enumerate() {
            if item.mesh.is_none() || !scene.material_of(item).wants_reflection_probe() {
                continue;
            }
            if count == MAX_REFLECTION_PROBES {
                log::debug!("Reflection probe limit reached, item {item_index} uses the skybox");
                break;
            }

            match self.probes.get_mut(count) {
                Some(probe) if probe.owner != item_index => {
                    probe.owner = item_index;
                    probe.dirty = true;
                }
                Some(_) => {}
                None => self.probes.push(ReflectionProbe::new(item_index)),
            }
            indices[item_index] = Some(count as u32);
            count += 1;
        }

        self.active = count;
        indices
    }

    /// Brings GPU resources in line with the current assignment.
    ///
    /// Textures are recreated when `resolution` changes and destroyed for
    /// probes that are no longer assigned.
    ///
    /// # Errors
    ///
    /// Device errors from texture or descriptor creation.
    pub fn ensure_resources(&mut self, device: &mut dyn RenderDevice, resolution: u32) -> Result<()> {
        let resolution = resolution.clamp(MIN_PROBE_RESOLUTION, MAX_PROBE_RESOLUTION);

        for probe in self.probes.drain(self.active..) {
            if let Some(textures) = probe.textures {
                destroy_textures(device, textures);
            }
        }

        if resolution != self.resolution {
            if self.resolution != 0 {
                log::debug!(
                    "Reflection probe resolution {} -> {resolution}, recreating",
                    self.resolution
                );
            }
            for probe in &mut self.probes {
                if let Some(textures) = probe.textures.take() {
                    destroy_textures(device, textures);
                }
            }
            self.resolution = resolution;
        }

        for (index, probe) in self.probes.iter_mut().enumerate() {
            if probe.textures.is_none() {
                probe.textures = Some(create_textures(device, index, resolution)?);
                probe.dirty = true;
            }
        }
        Ok(())
    }

    /// Updates capture positions and marks moved probes dirty.
    pub fn refresh(&mut self, scene: &Scene) {
        for probe in &mut self.probes[..self.active] {
            probe.capture_pos = scene
                .draw_items
                .get(probe.owner)
                .map_or(Vec3::ZERO, |item| item.transform.translation());

            let moved = probe
                .last_pos
                .is_none_or(|last| probe.capture_pos.distance_squared(last) > MOVE_EPSILON_SQ);
            if moved {
                probe.dirty = true;
            }
        }
    }

    /// Probes to capture this frame. Nothing is marked clean until
    /// [`mark_captured`](Self::mark_captured), so an abandoned frame retries
    /// the same probes.
    #[must_use]
    pub fn pending_updates(&self, update_every_frame: bool) -> Vec<ProbeUpdate> {
        self.probes[..self.active]
            .iter()
            .enumerate()
            .filter(|(_, probe)| update_every_frame || probe.dirty)
            .filter_map(|(index, probe)| {
                probe.textures.map(|textures| ProbeUpdate {
                    probe_index: index as u32,
                    capture_pos: probe.capture_pos,
                    textures,
                })
            })
            .collect()
    }

    /// Marks captured probes clean at the position they were captured from.
    pub fn mark_captured(&mut self, updates: &[ProbeUpdate]) {
        for update in updates {
            if let Some(probe) = self.probes[..self.active].get_mut(update.probe_index as usize) {
                probe.dirty = false;
                probe.last_pos = Some(update.capture_pos);
            }
        }
    }

    /// Destroys every probe and its textures.
    pub fn release_all(&mut self, device: &mut dyn RenderDevice) {
        for probe in self.probes.drain(..) {
            if let Some(textures) = probe.textures {
                destroy_textures(device, textures);
            }
        }
        self.active = 0;
    }

    #[must_use]
    pub fn probe(&self, index: u32) -> Option<&ReflectionProbe> {
        self.probes[..self.active].get(index as usize)
    }

    #[must_use]
    pub fn probes(&self) -> &[ReflectionProbe] {
        &self.probes[..self.active]
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.active
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Side length of every probe face, `0` before the first
    /// [`ensure_resources`](Self::ensure_resources).
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

#[must_use]
pub fn probe_color_desc(index: usize, resolution: u32) -> TextureDesc {
    TextureDesc {
        label: format!("ReflectionProbe_{index}_Cube"),
        extent: Extent2d::square(resolution),
        kind: TextureKind::Cube,
        format: PROBE_COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
    }
}

#[must_use]
pub fn probe_depth_desc(index: usize, resolution: u32) -> TextureDesc {
    TextureDesc {
        label: format!("ReflectionProbe_{index}_DepthCube"),
        extent: Extent2d::square(resolution),
        kind: TextureKind::Cube,
        format: PROBE_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
    }
}

fn create_textures(
    device: &mut dyn RenderDevice,
    index: usize,
    resolution: u32,
) -> Result<ProbeTextures> {
    let cube = device.create_texture(&probe_color_desc(index, resolution))?;
    let depth_cube = match device.create_texture(&probe_depth_desc(index, resolution)) {
        Ok(t) => t,
        Err(err) => {
            device.destroy_texture(cube);
            return Err(err.into());
        }
    };
    let descriptor = match device.allocate_descriptor(cube) {
        Ok(d) => d,
        Err(err) => {
            device.destroy_texture(cube);
            device.destroy_texture(depth_cube);
            return Err(err.into());
        }
    };
    Ok(ProbeTextures {
        cube,
        depth_cube,
        descriptor,
    })
}

fn destroy_textures(device: &mut dyn RenderDevice, textures: ProbeTextures) {
    device.free_descriptor(textures.descriptor);
    device.destroy_texture(textures.cube);
    device.destroy_texture(textures.depth_cube);
}
