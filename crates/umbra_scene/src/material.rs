//! Material parameters and shading permutations.

use bitflags::bitflags;
use glam::Vec4;
use slotmap::new_key_type;
use umbra_rhi::DescriptorIndex;

new_key_type! {
    pub struct MaterialKey;
}

bitflags! {
    /// Shading permutation flags. Each distinct combination selects a
    /// pipeline variant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct MaterialPerm: u32 {
        /// Albedo texture sampled.
        const USE_TEX = 1 << 0;
        /// Receives shadows.
        const USE_SHADOW = 1 << 1;
        /// Alpha blended, drawn back to front.
        const TRANSPARENT = 1 << 2;
        /// Surface is a planar mirror.
        const PLANAR_MIRROR = 1 << 3;
    }
}

/// Where a material samples its environment reflections from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvSource {
    #[default]
    Skybox,
    /// A per-object reflection probe captured by the renderer.
    ReflectionCapture,
}

/// Values uploaded per batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub base_color: Vec4,
    pub shininess: f32,
    pub spec_strength: f32,
    /// Extra shadow bias in texels.
    pub shadow_bias: f32,
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
    pub emissive_strength: f32,

    pub albedo: DescriptorIndex,
    pub normal: DescriptorIndex,
    pub metalness: DescriptorIndex,
    pub roughness_tex: DescriptorIndex,
    pub ao_tex: DescriptorIndex,
    pub emissive: DescriptorIndex,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            shininess: 32.0,
            spec_strength: 0.2,
            shadow_bias: 0.0,
            metallic: 0.0,
            roughness: 0.75,
            ao: 1.0,
            emissive_strength: 0.0,
            albedo: DescriptorIndex::NONE,
            normal: DescriptorIndex::NONE,
            metalness: DescriptorIndex::NONE,
            roughness_tex: DescriptorIndex::NONE,
            ao_tex: DescriptorIndex::NONE,
            emissive: DescriptorIndex::NONE,
        }
    }
}

impl MaterialParams {
    /// The six texture slots in binding order.
    #[must_use]
    pub fn texture_indices(&self) -> [DescriptorIndex; 6] {
        [
            self.albedo,
            self.normal,
            self.metalness,
            self.roughness_tex,
            self.ao_tex,
            self.emissive,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub params: MaterialParams,
    pub permutation: MaterialPerm,
    pub env_source: EnvSource,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            params: MaterialParams::default(),
            permutation: MaterialPerm::USE_SHADOW,
            env_source: EnvSource::Skybox,
        }
    }
}

impl Material {
    /// Permutation actually used for drawing: texture presence implies
    /// [`MaterialPerm::USE_TEX`].
    #[must_use]
    pub fn effective_perm(&self) -> MaterialPerm {
        let mut perm = self.permutation;
        if self.params.albedo.is_some() {
            perm |= MaterialPerm::USE_TEX;
        }
        perm
    }

    /// Blended materials: flagged transparent or with visible alpha.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.permutation.contains(MaterialPerm::TRANSPARENT) || self.params.base_color.w < 0.999
    }

    #[inline]
    #[must_use]
    pub fn is_planar_mirror(&self) -> bool {
        self.permutation.contains(MaterialPerm::PLANAR_MIRROR)
    }

    #[inline]
    #[must_use]
    pub fn wants_reflection_probe(&self) -> bool {
        self.env_source == EnvSource::ReflectionCapture
    }
}
