//! Scene fixtures shared by tests and benches.

use glam::{Quat, Vec3, Vec4};
use umbra_core::errors::DeviceError;
use umbra_core::math::{BoundingSphere, Transform};
use umbra_rhi::{BufferDesc, BufferUsage, IndexFormat, RenderDevice};
use umbra_scene::{
    DrawItem, EnvSource, Light, Material, MaterialKey, MaterialPerm, MeshKey, MeshResource, Scene,
};

/// Bytes per vertex of fixture meshes: position, normal, uv.
pub const FIXTURE_VERTEX_STRIDE: u32 = 32;

/// Creates placeholder vertex and index buffers for a mesh.
pub fn create_mesh(
    device: &mut dyn RenderDevice,
    label: &str,
    vertex_count: u32,
    index_count: u32,
    bounds: Option<BoundingSphere>,
) -> Result<MeshResource, DeviceError> {
    let vertex_buffer = device.create_buffer(&BufferDesc {
        label: format!("{label}_VB"),
        size: u64::from(vertex_count.max(1)) * u64::from(FIXTURE_VERTEX_STRIDE),
        usage: BufferUsage::VERTEX,
        stride: 0,
    })?;
    let index_buffer = device.create_buffer(&BufferDesc {
        label: format!("{label}_IB"),
        size: u64::from(index_count.max(1)) * 4,
        usage: BufferUsage::INDEX,
        stride: 0,
    })?;
    Ok(MeshResource {
        vertex_buffer,
        vertex_stride: FIXTURE_VERTEX_STRIDE,
        index_buffer,
        index_format: IndexFormat::Uint32,
        index_count,
        bounds,
    })
}

/// Unit cube centred on the origin.
pub fn cube_mesh(device: &mut dyn RenderDevice) -> Result<MeshResource, DeviceError> {
    create_mesh(
        device,
        "Cube",
        24,
        36,
        Some(BoundingSphere::from_half_extents(Vec3::splat(0.5))),
    )
}

/// Unit quad in the XZ plane, facing +Y.
pub fn quad_mesh(device: &mut dyn RenderDevice) -> Result<MeshResource, DeviceError> {
    create_mesh(
        device,
        "Quad",
        4,
        6,
        Some(BoundingSphere::from_half_extents(Vec3::new(0.5, 0.0, 0.5))),
    )
}

#[must_use]
pub fn solid_material(color: Vec4) -> Material {
    Material {
        params: umbra_scene::MaterialParams {
            base_color: color,
            ..Default::default()
        },
        ..Material::default()
    }
}

#[must_use]
pub fn transparent_material(alpha: f32) -> Material {
    let mut material = solid_material(Vec4::new(0.6, 0.8, 1.0, alpha));
    material.permutation = MaterialPerm::TRANSPARENT;
    material
}

#[must_use]
pub fn mirror_material() -> Material {
    Material {
        permutation: MaterialPerm::PLANAR_MIRROR,
        ..Material::default()
    }
}

#[must_use]
pub fn probe_material() -> Material {
    Material {
        env_source: EnvSource::ReflectionCapture,
        ..solid_material(Vec4::new(0.9, 0.9, 0.9, 1.0))
    }
}

/// Transform of a flat quad scaled to `size` and centred at `center`.
#[must_use]
pub fn floor_transform(center: Vec3, size: f32) -> Transform {
    Transform::Trs {
        translation: center,
        rotation: Quat::IDENTITY,
        scale: Vec3::new(size, 1.0, size),
    }
}

/// Handles to what [`basic_scene`] created.
#[derive(Debug, Clone, Copy)]
pub struct BasicSceneKeys {
    pub cube: MeshKey,
    pub quad: MeshKey,
    pub solid: MaterialKey,
    pub floor: MaterialKey,
}

/// A floor quad and a 3x3 grid of cubes lit by one directional light.
pub fn basic_scene(device: &mut dyn RenderDevice) -> Result<(Scene, BasicSceneKeys), DeviceError> {
    let mut scene = Scene::new();
    let cube = scene.add_mesh(cube_mesh(device)?);
    let quad = scene.add_mesh(quad_mesh(device)?);
    let solid = scene.add_material(solid_material(Vec4::new(0.8, 0.3, 0.2, 1.0)));
    let floor = scene.add_material(solid_material(Vec4::new(0.5, 0.5, 0.5, 1.0)));

    scene.add_draw_item(DrawItem::new(quad, Some(floor), floor_transform(Vec3::ZERO, 20.0)));
    for x in -1..=1 {
        for z in -1..=1 {
            let pos = Vec3::new(x as f32 * 2.0, 0.5, z as f32 * 2.0);
            scene.add_draw_item(DrawItem::new(cube, Some(solid), Transform::from_translation(pos)));
        }
    }

    scene.lights.push(Light::directional(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::ONE,
        1.0,
    ));
    scene.camera.position = Vec3::new(0.0, 4.0, 10.0);
    scene.camera.target = Vec3::ZERO;

    Ok((
        scene,
        BasicSceneKeys {
            cube,
            quad,
            solid,
            floor,
        },
    ))
}

/// `count` cubes spread over a square grid, cycling through `materials`
/// distinct materials. Used for batching benchmarks.
pub fn grid_scene(
    device: &mut dyn RenderDevice,
    count: usize,
    materials: usize,
) -> Result<Scene, DeviceError> {
    let mut scene = Scene::new();
    let cube = scene.add_mesh(cube_mesh(device)?);
    let keys: Vec<MaterialKey> = (0..materials.max(1))
        .map(|i| {
            let t = i as f32 / materials.max(1) as f32;
            scene.add_material(solid_material(Vec4::new(t, 1.0 - t, 0.5, 1.0)))
        })
        .collect();

    let side = (count as f32).sqrt().ceil().max(1.0) as usize;
    for i in 0..count {
        let pos = Vec3::new((i % side) as f32 * 1.5, 0.5, (i / side) as f32 * -1.5);
        scene.add_draw_item(DrawItem::new(
            cube,
            Some(keys[i % keys.len()]),
            Transform::from_translation(pos),
        ));
    }
    scene.lights.push(Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0));
    scene.camera.position = Vec3::new(side as f32 * 0.75, 12.0, 14.0);
    scene.camera.target = Vec3::new(side as f32 * 0.75, 0.0, -(side as f32) * 0.75);
    scene.camera.far = 500.0;
    Ok(scene)
}
