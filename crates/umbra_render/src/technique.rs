//! Cube Rendering Technique Selection
//!
//! Point shadows and reflection probes render all six faces of a cube.
//! Three techniques are tried in order:
//!
//! ```text
//!   Layered ──▶ ViewInstancing ──▶ SixPass
//!   (1 pass,     (1 pass,           (6 passes,
//!    6x instances, view index)       always available)
//!    layer index)
//! ```
//!
//! # Circuit Breaker
//!
//! The optional tiers need shader model 6 plus a device feature, and their
//! pipelines are compiled lazily. Each tier is tried at most once per
//! [`CubePipelineSet`]: a missing capability or a failed compile disables
//! the tier for the lifetime of the set, with a single log line. Disabled
//! tiers are never retried, so a broken shader compiler costs one attempt,
//! not one per frame.

use std::fmt;

use umbra_core::errors::Result;
use umbra_rhi::{DeviceCaps, PipelineDesc, PipelineHandle, RenderDevice};

use crate::pipelines::{
    POINT_SHADOW_COLOR_FORMAT, PROBE_COLOR_FORMAT, PROBE_DEPTH_FORMAT, SHADOW_DEPTH_FORMAT,
    create_pipeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeTechnique {
    /// One pass, instances repeated per face, layer index from the vertex
    /// stage.
    Layered,
    /// One pass, six views.
    ViewInstancing,
    /// One pass per face.
    SixPass,
}

impl CubeTechnique {
    /// Pass-name suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Layered => "Layered",
            Self::ViewInstancing => "VI",
            Self::SixPass => "SixPass",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_single_pass(self) -> bool {
        !matches!(self, Self::SixPass)
    }
}

impl fmt::Display for CubeTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// What is being rendered into the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFamily {
    PointShadow,
    ReflectionCapture,
}

impl CubeFamily {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PointShadow => "PointShadow",
            Self::ReflectionCapture => "ReflectionCapture",
        }
    }

    const fn shader(self, technique: CubeTechnique) -> &'static str {
        match (self, technique) {
            (Self::PointShadow, CubeTechnique::Layered) => "shadow_point_layered",
            (Self::PointShadow, CubeTechnique::ViewInstancing) => "shadow_point_vi",
            (Self::PointShadow, CubeTechnique::SixPass) => "shadow_point",
            (Self::ReflectionCapture, CubeTechnique::Layered) => "reflection_capture_layered",
            (Self::ReflectionCapture, CubeTechnique::ViewInstancing) => "reflection_capture_vi",
            (Self::ReflectionCapture, CubeTechnique::SixPass) => "reflection_capture",
        }
    }

    const fn formats(self) -> (wgpu::TextureFormat, wgpu::TextureFormat) {
        match self {
            Self::PointShadow => (POINT_SHADOW_COLOR_FORMAT, SHADOW_DEPTH_FORMAT),
            Self::ReflectionCapture => (PROBE_COLOR_FORMAT, PROBE_DEPTH_FORMAT),
        }
    }
}

impl fmt::Display for CubeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipeline description of one family/technique pair.
#[must_use]
pub fn cube_pipeline_desc(family: CubeFamily, technique: CubeTechnique) -> PipelineDesc {
    let label = match technique {
        CubeTechnique::SixPass => family.name().to_owned(),
        _ => format!("{}_{}", family.name(), technique.suffix()),
    };
    let (color, depth) = family.formats();
    let desc = PipelineDesc::new(label, family.shader(technique)).with_formats(Some(color), Some(depth));
    match technique {
        CubeTechnique::Layered => desc.with_sm6(),
        CubeTechnique::ViewInstancing => desc.with_view_count(umbra_rhi::CUBE_FACE_COUNT),
        CubeTechnique::SixPass => desc,
    }
}

/// Lazily created optional pipeline with its breaker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tier {
    pipeline: Option<PipelineHandle>,
    disabled: bool,
    attempts: u32,
}

/// Technique and pipeline chosen for one cube render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeSelection {
    pub technique: CubeTechnique,
    pub pipeline: PipelineHandle,
}

/// Pipelines of one cube family plus the per-tier circuit breakers.
#[derive(Debug, Clone)]
pub struct CubePipelineSet {
    family: CubeFamily,
    caps: DeviceCaps,
    six_pass: PipelineHandle,
    layered: Tier,
    view_instancing: Tier,
}

impl CubePipelineSet {
    /// `disable_layered` / `disable_vi` pre-trip the breakers.
    #[must_use]
    pub fn new(
        family: CubeFamily,
        caps: DeviceCaps,
        six_pass: PipelineHandle,
        disable_layered: bool,
        disable_vi: bool,
    ) -> Self {
        Self {
            family,
            caps,
            six_pass,
            layered: Tier {
                disabled: disable_layered,
                ..Tier::default()
            },
            view_instancing: Tier {
                disabled: disable_vi,
                ..Tier::default()
            },
        }
    }

    /// Creates the mandatory six-pass pipeline and reads the device caps.
    ///
    /// # Errors
    ///
    /// Fails if the six-pass pipeline cannot be created.
    pub fn create(
        device: &mut dyn RenderDevice,
        family: CubeFamily,
        disable_layered: bool,
        disable_vi: bool,
    ) -> Result<Self> {
        let six_pass = create_pipeline(device, &cube_pipeline_desc(family, CubeTechnique::SixPass))?;
        Ok(Self::new(
            family,
            device.capabilities(),
            six_pass,
            disable_layered,
            disable_vi,
        ))
    }

    #[inline]
    #[must_use]
    pub fn family(&self) -> CubeFamily {
        self.family
    }

    #[inline]
    #[must_use]
    pub fn six_pass(&self) -> PipelineHandle {
        self.six_pass
    }

    /// Picks the best working technique.
    ///
    /// `allow_layered` is false when this frame has nothing to draw with
    /// the layered technique (no layered batches); the tier is skipped for
    /// the frame without tripping its breaker.
    pub fn select(&mut self, device: &mut dyn RenderDevice, allow_layered: bool) -> CubeSelection {
        if allow_layered {
            if let Some(pipeline) = self.try_tier(device, CubeTechnique::Layered) {
                return CubeSelection {
                    technique: CubeTechnique::Layered,
                    pipeline,
                };
            }
        }
        if let Some(pipeline) = self.try_tier(device, CubeTechnique::ViewInstancing) {
            return CubeSelection {
                technique: CubeTechnique::ViewInstancing,
                pipeline,
            };
        }
        CubeSelection {
            technique: CubeTechnique::SixPass,
            pipeline: self.six_pass,
        }
    }

    /// Whether a tier's breaker has tripped. `SixPass` never trips.
    #[must_use]
    pub fn is_disabled(&self, technique: CubeTechnique) -> bool {
        self.tier(technique).is_some_and(|t| t.disabled)
    }

    /// Pipeline creation attempts made for a tier.
    #[must_use]
    pub fn attempts(&self, technique: CubeTechnique) -> u32 {
        self.tier(technique).map_or(0, |t| t.attempts)
    }

    /// Trips a tier's breaker by hand. A tripped tier stays off.
    pub fn disable(&mut self, technique: CubeTechnique) {
        match technique {
            CubeTechnique::Layered => self.layered.disabled = true,
            CubeTechnique::ViewInstancing => self.view_instancing.disabled = true,
            CubeTechnique::SixPass => {}
        }
    }

    fn tier(&self, technique: CubeTechnique) -> Option<&Tier> {
        match technique {
            CubeTechnique::Layered => Some(&self.layered),
            CubeTechnique::ViewInstancing => Some(&self.view_instancing),
            CubeTechnique::SixPass => None,
        }
    }

    fn try_tier(&mut self, device: &mut dyn RenderDevice, technique: CubeTechnique) -> Option<PipelineHandle> {
        let family = self.family;
        let required = match technique {
            CubeTechnique::Layered => DeviceCaps::LAYERED,
            CubeTechnique::ViewInstancing => DeviceCaps::MULTI_VIEW,
            CubeTechnique::SixPass => return Some(self.six_pass),
        };
        let caps = self.caps;
        let tier = match technique {
            CubeTechnique::Layered => &mut self.layered,
            _ => &mut self.view_instancing,
        };

        if tier.disabled {
            return None;
        }
        if !caps.contains(required) {
            log::info!("{family}: {technique} unsupported by the device, disabled");
            tier.disabled = true;
            return None;
        }
        if let Some(pipeline) = tier.pipeline {
            return Some(pipeline);
        }

        tier.attempts += 1;
        match device.create_pipeline(&cube_pipeline_desc(family, technique)) {
            Ok(pipeline) => {
                log::info!("{family}: using {technique}");
                tier.pipeline = Some(pipeline);
                Some(pipeline)
            }
            Err(err) => {
                log::warn!("{family}: {technique} pipeline failed ({err}), falling back");
                tier.disabled = true;
                None
            }
        }
    }
}
