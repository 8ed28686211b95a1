//! Fixed-function state and resource states.

/// Hardware usage state of a texture, tracked by the render graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResourceState {
    #[default]
    Undefined,
    RenderTarget,
    DepthWrite,
    DepthRead,
    ShaderRead,
    Present,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Opaque,
    AlphaBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: true,
            write: true,
            compare: wgpu::CompareFunction::LessEqual,
        }
    }
}

/// Stencil usage of a draw. The reference value is set separately with
/// [`Command::SetStencilRef`](crate::Command::SetStencilRef).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StencilMode {
    #[default]
    Disabled,
    /// Always pass, replace with the reference value.
    WriteRef,
    /// Pass only where the stored value equals the reference value.
    TestEqual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub depth: DepthState,
    pub stencil: StencilMode,
    pub cull: CullMode,
    pub blend: BlendMode,
    pub color_write: bool,
}

impl RenderState {
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            color_write: true,
            ..Self::default()
        }
    }

    /// Depth-only casters. Culling is off to sidestep winding issues.
    #[must_use]
    pub fn shadow() -> Self {
        Self {
            cull: CullMode::None,
            color_write: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depth_prepass() -> Self {
        Self {
            color_write: false,
            ..Self::default()
        }
    }

    /// Main pass after a depth pre-pass: equal test, no depth write.
    #[must_use]
    pub fn after_depth_prepass() -> Self {
        Self {
            depth: DepthState {
                test: true,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            },
            color_write: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn transparent() -> Self {
        Self {
            depth: DepthState {
                test: true,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            },
            cull: CullMode::None,
            blend: BlendMode::AlphaBlend,
            color_write: true,
            ..Self::default()
        }
    }

    /// Skybox drawn at the far plane.
    #[must_use]
    pub fn skybox() -> Self {
        Self {
            depth: DepthState {
                test: true,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            },
            cull: CullMode::None,
            color_write: true,
            ..Self::default()
        }
    }

    /// Marks visible mirror pixels: depth tested against the scene, no
    /// depth or color write, stencil replaced with the reference.
    #[must_use]
    pub fn planar_mask() -> Self {
        Self {
            depth: DepthState {
                test: true,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            },
            stencil: StencilMode::WriteRef,
            cull: CullMode::None,
            color_write: false,
            ..Self::default()
        }
    }

    /// Reflected geometry gated by the mirror's stencil value, drawn over
    /// the mirror without touching scene depth. Winding flips under
    /// reflection so back faces are culled as front faces.
    #[must_use]
    pub fn planar_reflected() -> Self {
        Self {
            depth: DepthState {
                test: false,
                write: false,
                compare: wgpu::CompareFunction::Always,
            },
            stencil: StencilMode::TestEqual,
            cull: CullMode::Front,
            color_write: true,
            ..Self::default()
        }
    }

    /// Screen-space overlays, no depth.
    #[must_use]
    pub fn overlay() -> Self {
        Self {
            depth: DepthState {
                test: false,
                write: false,
                compare: wgpu::CompareFunction::Always,
            },
            cull: CullMode::None,
            color_write: true,
            ..Self::default()
        }
    }

    /// Debug lines, optionally depth tested.
    #[must_use]
    pub fn debug_lines(depth_test: bool) -> Self {
        Self {
            depth: DepthState {
                test: depth_test,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            },
            cull: CullMode::None,
            color_write: true,
            ..Self::default()
        }
    }
}
