use glam::Vec3;
use slotmap::SlotMap;
use umbra_core::math::Transform;
use umbra_rhi::DescriptorIndex;

use crate::camera::Camera;
use crate::light::Light;
use crate::material::{Material, MaterialKey};
use crate::mesh::{MeshKey, MeshResource};

/// One request to draw a mesh with a material at a transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawItem {
    pub mesh: Option<MeshKey>,
    /// `None` draws with [`Material::default`].
    pub material: Option<MaterialKey>,
    pub transform: Transform,
}

impl DrawItem {
    #[must_use]
    pub fn new(mesh: MeshKey, material: Option<MaterialKey>, transform: Transform) -> Self {
        Self {
            mesh: Some(mesh),
            material,
            transform,
        }
    }
}

/// Ray drawn by the debug overlay, typically from editor picking.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebugPickRay {
    pub enabled: bool,
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
    pub hit: bool,
}

/// Frame snapshot handed to the renderer.
#[derive(Debug, Default)]
pub struct Scene {
    pub meshes: SlotMap<MeshKey, MeshResource>,
    pub materials: SlotMap<MaterialKey, Material>,
    pub draw_items: Vec<DrawItem>,
    pub camera: Camera,
    pub lights: Vec<Light>,
    /// Bindless cubemap used as environment and capture background.
    pub skybox: DescriptorIndex,
    pub debug_pick_ray: DebugPickRay,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: MeshResource) -> MeshKey {
        self.meshes.insert(mesh)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialKey {
        self.materials.insert(material)
    }

    /// Appends a draw item and returns its index.
    pub fn add_draw_item(&mut self, item: DrawItem) -> usize {
        self.draw_items.push(item);
        self.draw_items.len() - 1
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self, key: MeshKey) -> Option<&MeshResource> {
        self.meshes.get(key)
    }

    /// Material of a draw item, falling back to the default material for
    /// items without one (or with a stale key).
    #[must_use]
    pub fn material_of(&self, item: &DrawItem) -> Material {
        item.material
            .and_then(|key| self.materials.get(key))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn first_directional_light(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|l| l.light_type == crate::light::LightType::Directional)
    }
}
