use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use umbra_core::math::{BoundingSphere, Frustum};
use umbra_rhi::CUBE_FACE_COUNT;
use umbra_scene::{MaterialKey, MaterialParams, MeshKey, MeshResource, Scene};

use super::draw::{Batch, DrawGeometry, PlanarMirrorDraw, ShadowBatch, TransparentDraw};
use super::instance::{FrameInstances, GroupRanges, InstanceData, InstanceRange, align_to_faces};
use super::key::BatchKey;

/// Mirror normals shorter than this before normalization are rejected.
const MIN_MIRROR_NORMAL_LENGTH: f32 = 1e-4;

/// Per-frame inputs of [`BatchBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub struct BuildParams<'p> {
    /// Camera view-projection, the culling frustum.
    pub view_proj: Mat4,
    pub camera_pos: Vec3,
    pub frustum_culling: bool,
    /// Build the no-cull opaque set.
    pub capture_batches: bool,
    pub planar_reflections: bool,
    pub max_mirrors: u32,
    /// Build the face-duplicated shadow group.
    pub layered_shadow: bool,
    /// Build the face-duplicated capture group.
    pub layered_capture: bool,
    /// Reflection probe of each draw item, indexed like `Scene::draw_items`.
    pub probe_indices: &'p [Option<u32>],
}

impl Default for BuildParams<'_> {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            camera_pos: Vec3::ZERO,
            frustum_culling: true,
            capture_batches: false,
            planar_reflections: false,
            max_mirrors: 0,
            layered_shadow: false,
            layered_capture: false,
            probe_indices: &[],
        }
    }
}

#[derive(Debug, Default)]
struct BatchBucket {
    material_key: Option<MaterialKey>,
    material: MaterialParams,
    instances: Vec<InstanceData>,
}

#[derive(Debug, Default)]
struct Scratch {
    shadow: FxHashMap<MeshKey, Vec<InstanceData>>,
    main: FxHashMap<BatchKey, BatchBucket>,
    capture: FxHashMap<BatchKey, BatchBucket>,
}

/// Partitions the scene's draw items into draw lists sharing one instance
/// buffer.
///
/// The hash maps are kept between frames to reuse their allocations; no
/// other state carries over, and the output depends only on the scene and
/// the parameters.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    scratch: Scratch,
}

impl BatchBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the draw items once and lays out the combined buffer:
    ///
    /// ```text
    /// | shadow | main | capture | transparent | mirrors | pad | layered shadow | pad | layered capture |
    ///                                                          ^ multiple of 6        ^ multiple of 6
    /// ```
    pub fn build(&mut self, scene: &Scene, params: &BuildParams<'_>) -> FrameInstances {
        let frustum = Frustum::from_matrix(params.view_proj);
        let scratch = &mut self.scratch;
        scratch.shadow.clear();
        scratch.main.clear();
        scratch.capture.clear();

        let mut transparent_instances = Vec::new();
        let mut transparent_draws = Vec::new();
        let mut mirror_instances = Vec::new();
        let mut mirror_draws: Vec<PlanarMirrorDraw> = Vec::new();

        for (index, item) in scene.draw_items.iter().enumerate() {
            let Some(mesh_key) = item.mesh else {
                continue;
            };
            let Some(mesh) = scene.mesh(mesh_key).filter(|m| m.is_drawable()) else {
                continue;
            };

            let model = item.transform.to_matrix();
            let material = scene.material_of(item);
            let transparent = material.is_transparent();
            let mirror = material.is_planar_mirror();
            let instance = InstanceData::from_matrix(&model);

            if !transparent && !mirror {
                scratch.shadow.entry(mesh_key).or_default().push(instance);
            }

            let probe = params.probe_indices.get(index).copied().flatten();
            let key = BatchKey::new(mesh_key, &material, probe);

            if params.capture_batches && !transparent {
                push_bucket(&mut scratch.capture, key, item.material, &material.params, instance);
            }

            if params.frustum_culling && !is_visible(&frustum, mesh, &model) {
                continue;
            }

            if transparent {
                let sort_pos = match mesh.bounds {
                    Some(b) if !b.is_degenerate() => model.transform_point3(b.center),
                    _ => model.w_axis.truncate(),
                };
                transparent_draws.push(TransparentDraw {
                    draw_item: index,
                    mesh: mesh_key,
                    geometry: DrawGeometry::of(mesh),
                    material_key: item.material,
                    material: material.params,
                    perm: material.effective_perm(),
                    env_source: material.env_source,
                    instance_offset: transparent_instances.len() as u32,
                    dist2: sort_pos.distance_squared(params.camera_pos),
                });
                transparent_instances.push(instance);
                continue;
            }

            if params.planar_reflections && mirror && (mirror_draws.len() as u32) < params.max_mirrors {
                let world_x = model.transform_vector3(Vec3::X);
                let world_y = model.transform_vector3(Vec3::Y);
                let normal = world_x.cross(world_y);
                if normal.length() > MIN_MIRROR_NORMAL_LENGTH {
                    mirror_draws.push(PlanarMirrorDraw {
                        draw_item: index,
                        mesh: mesh_key,
                        geometry: DrawGeometry::of(mesh),
                        material_key: item.material,
                        material: material.params,
                        instance_offset: mirror_instances.len() as u32,
                        plane_point: model.transform_point3(Vec3::ZERO),
                        plane_normal: normal.normalize(),
                    });
                    mirror_instances.push(instance);
                }
                continue;
            }

            push_bucket(&mut scratch.main, key, item.material, &material.params, instance);
        }

        // ── Flatten in deterministic order ─────────────────────────────

        let mut shadow_keys: Vec<MeshKey> = scratch.shadow.keys().copied().collect();
        shadow_keys.sort_unstable();

        let mut shadow_instances = Vec::new();
        let mut shadow_batches = Vec::with_capacity(shadow_keys.len());
        for mesh_key in shadow_keys {
            let (Some(instances), Some(mesh)) = (scratch.shadow.get(&mesh_key), scene.mesh(mesh_key))
            else {
                continue;
            };
            shadow_batches.push(ShadowBatch {
                mesh: mesh_key,
                geometry: DrawGeometry::of(mesh),
                instance_offset: shadow_instances.len() as u32,
                instance_count: instances.len() as u32,
            });
            shadow_instances.extend_from_slice(instances);
        }

        let (main_instances, mut main_batches) = flatten_buckets(scene, &scratch.main);
        let (capture_instances, mut capture_batches) = flatten_buckets(scene, &scratch.capture);

        transparent_draws.sort_by(|a, b| b.dist2.total_cmp(&a.dist2));

        let (layered_shadow_instances, mut layered_shadow_batches) = if params.layered_shadow {
            duplicate_per_face(
                &shadow_instances,
                &shadow_batches,
                |b| (b.instance_offset, b.instance_count),
                |b, offset, count| ShadowBatch {
                    instance_offset: offset,
                    instance_count: count,
                    ..*b
                },
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let (layered_capture_instances, mut layered_capture_batches) = if params.layered_capture {
            duplicate_per_face(
                &capture_instances,
                &capture_batches,
                |b| (b.instance_offset, b.instance_count),
                |b, offset, count| Batch {
                    instance_offset: offset,
                    instance_count: count,
                    ..*b
                },
            )
        } else {
            (Vec::new(), Vec::new())
        };

        // ── Combine ────────────────────────────────────────────────────

        let shadow = InstanceRange {
            offset: 0,
            count: count(&shadow_instances),
        };
        let main = InstanceRange {
            offset: shadow.end(),
            count: count(&main_instances),
        };
        let capture = InstanceRange {
            offset: main.end(),
            count: count(&capture_instances),
        };
        let transparent = InstanceRange {
            offset: capture.end(),
            count: count(&transparent_instances),
        };
        let mirrors = InstanceRange {
            offset: transparent.end(),
            count: count(&mirror_instances),
        };
        let layered_shadow = InstanceRange {
            offset: align_to_faces(mirrors.end()),
            count: count(&layered_shadow_instances),
        };
        let layered_capture = InstanceRange {
            offset: align_to_faces(layered_shadow.end()),
            count: count(&layered_capture_instances),
        };

        let mut instances = Vec::with_capacity(layered_capture.end() as usize);
        instances.extend_from_slice(&shadow_instances);
        instances.extend_from_slice(&main_instances);
        instances.extend_from_slice(&capture_instances);
        instances.extend_from_slice(&transparent_instances);
        instances.extend_from_slice(&mirror_instances);
        instances.resize(layered_shadow.offset as usize, InstanceData::default());
        instances.extend_from_slice(&layered_shadow_instances);
        instances.resize(layered_capture.offset as usize, InstanceData::default());
        instances.extend_from_slice(&layered_capture_instances);

        shadow_batches.iter_mut().for_each(|b| b.instance_offset += shadow.offset);
        main_batches.iter_mut().for_each(|b| b.instance_offset += main.offset);
        capture_batches.iter_mut().for_each(|b| b.instance_offset += capture.offset);
        transparent_draws.iter_mut().for_each(|d| d.instance_offset += transparent.offset);
        mirror_draws.iter_mut().for_each(|d| d.instance_offset += mirrors.offset);
        layered_shadow_batches.iter_mut().for_each(|b| b.instance_offset += layered_shadow.offset);
        layered_capture_batches.iter_mut().for_each(|b| b.instance_offset += layered_capture.offset);

        FrameInstances {
            instances,
            groups: GroupRanges {
                shadow,
                main,
                capture,
                transparent,
                mirrors,
                layered_shadow,
                layered_capture,
            },
            shadow_batches,
            main_batches,
            capture_batches,
            transparent_draws,
            mirror_draws,
            layered_shadow_batches,
            layered_capture_batches,
        }
    }
}

/// Frustum test on the world-space bounding sphere. Meshes without usable
/// bounds are always visible.
fn is_visible(frustum: &Frustum, mesh: &MeshResource, model: &Mat4) -> bool {
    match mesh.bounds {
        Some(bounds) if !bounds.is_degenerate() => {
            let world: BoundingSphere = bounds.transformed(model);
            frustum.intersects_bounds(&world)
        }
        _ => true,
    }
}

fn push_bucket(
    map: &mut FxHashMap<BatchKey, BatchBucket>,
    key: BatchKey,
    material_key: Option<MaterialKey>,
    material: &MaterialParams,
    instance: InstanceData,
) {
    let bucket = map.entry(key).or_default();
    if bucket.instances.is_empty() {
        bucket.material_key = material_key;
        bucket.material = *material;
    }
    bucket.instances.push(instance);
}

fn flatten_buckets(
    scene: &Scene,
    buckets: &FxHashMap<BatchKey, BatchBucket>,
) -> (Vec<InstanceData>, Vec<Batch>) {
    let mut keys: Vec<&BatchKey> = buckets.keys().collect();
    keys.sort_unstable();

    let mut instances = Vec::new();
    let mut batches = Vec::with_capacity(keys.len());
    for key in keys {
        let (Some(bucket), Some(mesh)) = (buckets.get(key), scene.mesh(key.mesh)) else {
            continue;
        };
        if bucket.instances.is_empty() {
            continue;
        }
        batches.push(Batch {
            mesh: key.mesh,
            geometry: DrawGeometry::of(mesh),
            material_key: bucket.material_key,
            material: bucket.material,
            perm: key.perm,
            env_source: key.env_source,
            instance_offset: instances.len() as u32,
            instance_count: bucket.instances.len() as u32,
            reflection_probe: key.reflection_probe,
        });
        instances.extend_from_slice(&bucket.instances);
    }
    (instances, batches)
}

/// Repeats each instance of each batch once per cube face, faces `0..6` in
/// order, so a layered shader can derive the face from the instance index.
fn duplicate_per_face<B>(
    source: &[InstanceData],
    batches: &[B],
    range_of: impl Fn(&B) -> (u32, u32),
    rebuild: impl Fn(&B, u32, u32) -> B,
) -> (Vec<InstanceData>, Vec<B>) {
    let mut instances = Vec::with_capacity(source.len() * CUBE_FACE_COUNT as usize);
    let mut out = Vec::with_capacity(batches.len());
    for batch in batches {
        let (offset, count) = range_of(batch);
        if count == 0 {
            continue;
        }
        let new_offset = instances.len() as u32;
        for inst in &source[offset as usize..(offset + count) as usize] {
            for _ in 0..CUBE_FACE_COUNT {
                instances.push(*inst);
            }
        }
        out.push(rebuild(batch, new_offset, count * CUBE_FACE_COUNT));
    }
    (instances, out)
}

#[inline]
fn count(instances: &[InstanceData]) -> u32 {
    instances.len() as u32
}
