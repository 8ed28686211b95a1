use umbra_rhi::DescriptorIndex;
use umbra_scene::{EnvSource, Material, MaterialPerm, MeshKey};

/// Grouping key of a main-pass batch.
///
/// Floats are compared by bit pattern, so two items merge only if every
/// parameter is bit-identical. `-0.0` and `0.0` are different keys, as are
/// two NaNs with different payloads.
///
/// The derived `Ord` (mesh first) is the deterministic order batches are
/// emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub mesh: MeshKey,
    pub perm: MaterialPerm,
    pub env_source: EnvSource,
    pub reflection_probe: Option<u32>,
    pub textures: [DescriptorIndex; 6],
    pub base_color: [u32; 4],
    /// shininess, spec strength, shadow bias, metallic, roughness, ao,
    /// emissive strength.
    pub scalars: [u32; 7],
}

impl BatchKey {
    #[must_use]
    pub fn new(mesh: MeshKey, material: &Material, reflection_probe: Option<u32>) -> Self {
        let p = &material.params;
        Self {
            mesh,
            perm: material.effective_perm(),
            env_source: material.env_source,
            reflection_probe,
            textures: p.texture_indices(),
            base_color: p.base_color.to_array().map(f32::to_bits),
            scalars: [
                p.shininess,
                p.spec_strength,
                p.shadow_bias,
                p.metallic,
                p.roughness,
                p.ao,
                p.emissive_strength,
            ]
            .map(f32::to_bits),
        }
    }
}
