//! Transient Texture Pool
//!
//! Device textures backing the graph's transient resources. The graph
//! acquires a texture the first time a transient is used and releases it
//! right after the transient's last pass, so a later transient with the same
//! description in the same frame reuses it.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              TransientTexturePool                   │
//! │                                                     │
//! │  in_use: HashMap<TextureHandle, PooledTexture>      │
//! │  free:   HashMap<PoolKey, Vec<PooledTexture>>       │
//! │                                                     │
//! │  acquire()   (first use in a frame)                 │
//! │  release()   (after last use in a frame)            │
//! │  end_frame() (ages textures unused this frame)      │
//! │  trim()      (destroys long-idle textures)          │
//! │  clear()     (destroys everything, e.g. on resize)  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Textures are **never** destroyed during normal rendering; they stay in
//!   the free list for reuse.
//! - The pool grows on demand: if no compatible free texture exists, a new
//!   one is created.
//! - Each pooled texture remembers its last hardware state so the graph can
//!   emit a correct transition when it is handed out again.

use rustc_hash::FxHashMap;
use umbra_core::errors::DeviceError;
use umbra_rhi::{Extent2d, RenderDevice, ResourceState, TextureHandle, TextureKind};

use super::resource::RgTextureDesc;

// ─── Internal Types ───────────────────────────────────────────────────────────

/// Recycling key. Usages must match exactly; reusing a texture created with
/// a different usage would be a validation error on most backends.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PoolKey {
    extent: Extent2d,
    kind: TextureKind,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
}

impl PoolKey {
    fn from_desc(desc: &RgTextureDesc) -> Self {
        Self {
            extent: desc.extent,
            kind: desc.kind,
            format: desc.format,
            usage: desc.usage,
        }
    }
}

#[derive(Debug)]
struct PooledTexture {
    texture: TextureHandle,
    key: PoolKey,
    state: ResourceState,
    /// Whole frames in which the texture was never acquired.
    idle_frames: u32,
    used_this_frame: bool,
}

// ─── Public Types ─────────────────────────────────────────────────────────────

/// Result of [`TransientTexturePool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredTexture {
    pub texture: TextureHandle,
    /// Hardware state the texture was left in.
    pub state: ResourceState,
    pub reused: bool,
}

/// Lifetime counters, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: u64,
    pub destroyed: u64,
    pub reused: u64,
}

// ─── Pool Implementation ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TransientTexturePool {
    in_use: FxHashMap<TextureHandle, PooledTexture>,
    free: FxHashMap<PoolKey, Vec<PooledTexture>>,
    stats: PoolStats,
}

impl TransientTexturePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a texture matching `desc`, creating one if none is free.
    pub fn acquire(
        &mut self,
        device: &mut dyn RenderDevice,
        desc: &RgTextureDesc,
    ) -> Result<AcquiredTexture, DeviceError> {
        let key = PoolKey::from_desc(desc);

        let (mut pooled, reused) = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(pooled) => {
                self.stats.reused += 1;
                (pooled, true)
            }
            None => {
                let texture = device.create_texture(&desc.to_texture_desc())?;
                self.stats.created += 1;
                (
                    PooledTexture {
                        texture,
                        key,
                        state: ResourceState::Undefined,
                        idle_frames: 0,
                        used_this_frame: false,
                    },
                    false,
                )
            }
        };
        pooled.idle_frames = 0;
        pooled.used_this_frame = true;

        let acquired = AcquiredTexture {
            texture: pooled.texture,
            state: pooled.state,
            reused,
        };
        self.in_use.insert(pooled.texture, pooled);
        Ok(acquired)
    }

    /// Returns a texture to the free list, recording its current state.
    ///
    /// Unknown handles are ignored.
    pub fn release(&mut self, texture: TextureHandle, state: ResourceState) {
        if let Some(mut pooled) = self.in_use.remove(&texture) {
            pooled.state = state;
            self.free.entry(pooled.key).or_default().push(pooled);
        }
    }

    /// Frame boundary: returns anything still checked out and ages the
    /// textures nobody acquired this frame.
    pub fn end_frame(&mut self) {
        for (_, pooled) in self.in_use.drain() {
            self.free.entry(pooled.key).or_default().push(pooled);
        }
        for bucket in self.free.values_mut() {
            for t in bucket.iter_mut() {
                if std::mem::take(&mut t.used_this_frame) {
                    continue;
                }
                t.idle_frames += 1;
            }
        }
    }

    /// Destroys free textures idle for more than `max_idle_frames` frames.
    pub fn trim(&mut self, device: &mut dyn RenderDevice, max_idle_frames: u32) {
        let mut destroyed = 0;
        for bucket in self.free.values_mut() {
            bucket.retain(|t| {
                let keep = t.idle_frames <= max_idle_frames;
                if !keep {
                    device.destroy_texture(t.texture);
                    destroyed += 1;
                }
                keep
            });
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
        self.stats.destroyed += destroyed;
    }

    /// Destroys every texture the pool owns.
    pub fn clear(&mut self, device: &mut dyn RenderDevice) {
        let in_use = self.in_use.drain().map(|(_, t)| t);
        let free = self.free.drain().flat_map(|(_, bucket)| bucket);
        for t in in_use.chain(free) {
            device.destroy_texture(t.texture);
            self.stats.destroyed += 1;
        }
    }

    /// Number of textures owned by the pool (checked out and free).
    #[must_use]
    pub fn total_texture_count(&self) -> usize {
        self.in_use.len() + self.free.values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
