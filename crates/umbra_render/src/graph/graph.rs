use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use umbra_core::errors::{Result, UmbraError};
use umbra_rhi::{
    AttachmentView, CommandList, Extent2d, RenderDevice, RenderPassDesc, ResourceState, Swapchain,
    TextureHandle, TextureKind, Viewport, CUBE_FACE_COUNT,
};

use super::context::PassContext;
use super::pass::{Attachment, AttachmentTarget, PassAttachments, PassNode};
use super::resource::{ResourceEntry, ResourceOrigin, RgTexture, RgTextureDesc};
use super::transient_pool::TransientTexturePool;

// ─── Public Types ─────────────────────────────────────────────────────────────

/// Counters from one [`RenderGraph::execute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub passes: usize,
    pub transitions: usize,
    pub transients_created: usize,
    pub transients_reused: usize,
    pub commands: usize,
}

/// Result of validating a graph: lifetimes and dependency edges.
#[derive(Debug, Clone, Default)]
pub struct GraphPlan {
    first_use: Vec<Option<usize>>,
    last_use: Vec<Option<usize>>,
    dependencies: Vec<SmallVec<[usize; 4]>>,
}

impl GraphPlan {
    /// Earlier passes that `pass` must follow: the last writer of everything
    /// it touches, plus, for what it writes, every reader since that writer.
    #[must_use]
    pub fn dependencies(&self, pass: usize) -> &[usize] {
        self.dependencies.get(pass).map_or(&[], |d| d.as_slice())
    }

    /// Indices of the first and last pass touching `texture`.
    #[must_use]
    pub fn lifetime(&self, texture: RgTexture) -> Option<(usize, usize)> {
        let i = texture.index();
        Some((*self.first_use.get(i)?.as_ref()?, *self.last_use.get(i)?.as_ref()?))
    }
}

// ─── Graph ────────────────────────────────────────────────────────────────────

/// One frame's passes and logical textures.
///
/// Built fresh every frame and consumed by [`execute`](Self::execute).
/// Callbacks may borrow from the frame (`'a`), but the renderer's own
/// passes capture their batch lists and constants by value.
#[derive(Default)]
pub struct RenderGraph<'a> {
    resources: Vec<ResourceEntry>,
    imports: FxHashMap<TextureHandle, RgTexture>,
    swapchain_color: Option<RgTexture>,
    swapchain_depth: Option<RgTexture>,
    passes: Vec<PassNode<'a>>,
}

impl<'a> RenderGraph<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            imports: FxHashMap::default(),
            swapchain_color: None,
            swapchain_depth: None,
            passes: Vec::new(),
        }
    }

    fn push_resource(&mut self, entry: ResourceEntry) -> RgTexture {
        let handle = RgTexture(self.resources.len() as u32);
        self.resources.push(entry);
        handle
    }

    /// Declares a texture that lives only within this frame.
    pub fn create_texture(&mut self, desc: RgTextureDesc) -> RgTexture {
        self.push_resource(ResourceEntry {
            label: desc.label.clone(),
            desc: Some(desc),
            origin: ResourceOrigin::Transient,
        })
    }

    /// References an externally owned texture.
    ///
    /// Importing the same device texture twice returns the same handle so
    /// its state is tracked once. Imports enter and leave every frame in
    /// their sampleable state: `DepthRead` for depth formats, `ShaderRead`
    /// otherwise.
    pub fn import_texture(&mut self, texture: TextureHandle, desc: RgTextureDesc) -> RgTexture {
        if let Some(&existing) = self.imports.get(&texture) {
            return existing;
        }
        let handle = self.push_resource(ResourceEntry {
            label: desc.label.clone(),
            desc: Some(desc),
            origin: ResourceOrigin::Imported(texture),
        });
        self.imports.insert(texture, handle);
        handle
    }

    /// The current back buffer.
    pub fn swapchain_color(&mut self) -> RgTexture {
        if let Some(handle) = self.swapchain_color {
            return handle;
        }
        let handle = self.push_resource(ResourceEntry {
            label: "SwapchainColor".to_owned(),
            desc: None,
            origin: ResourceOrigin::SwapchainColor,
        });
        self.swapchain_color = Some(handle);
        handle
    }

    /// The depth/stencil surface paired with the back buffer.
    pub fn swapchain_depth(&mut self) -> RgTexture {
        if let Some(handle) = self.swapchain_depth {
            return handle;
        }
        let handle = self.push_resource(ResourceEntry {
            label: "SwapchainDepth".to_owned(),
            desc: None,
            origin: ResourceOrigin::SwapchainDepth,
        });
        self.swapchain_depth = Some(handle);
        handle
    }

    pub fn add_pass(
        &mut self,
        name: impl Into<String>,
        attachments: PassAttachments,
        record: impl FnOnce(&mut PassContext<'_>) + 'a,
    ) {
        self.passes.push(PassNode {
            name: name.into(),
            attachments,
            record: Box::new(record),
        });
    }

    /// Adds a pass rendering into the back buffer and swapchain depth.
    ///
    /// Color and depth in `attachments` are replaced; its reads and clear
    /// policy are kept.
    pub fn add_swapchain_pass(
        &mut self,
        name: impl Into<String>,
        attachments: PassAttachments,
        record: impl FnOnce(&mut PassContext<'_>) + 'a,
    ) {
        let color = self.swapchain_color();
        let depth = self.swapchain_depth();
        let attachments = attachments.color(color).depth(depth);
        self.add_pass(name, attachments, record);
    }

    #[inline]
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|p| p.name.as_str())
    }

    // ── Compile ────────────────────────────────────────────────────────────

    /// Validates every pass and computes lifetimes and dependencies.
    pub fn compile(&self) -> Result<GraphPlan> {
        let n = self.resources.len();
        let mut plan = GraphPlan {
            first_use: vec![None; n],
            last_use: vec![None; n],
            dependencies: Vec::with_capacity(self.passes.len()),
        };
        let mut last_writer: Vec<Option<usize>> = vec![None; n];
        let mut readers_since_write: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];

        for (index, pass) in self.passes.iter().enumerate() {
            self.validate_pass(pass)?;

            let mut deps: SmallVec<[usize; 4]> = SmallVec::new();

            for &read in &pass.attachments.reads {
                let r = read.index();
                match last_writer[r] {
                    Some(writer) => deps.push(writer),
                    None if self.resources[r].origin == ResourceOrigin::Transient => {
                        // A transient nobody has written yet has no content to read.
                        return Err(UmbraError::UnresolvedResource {
                            pass: pass.name.clone(),
                            resource: read.0,
                        });
                    }
                    None => {}
                }
                readers_since_write[r].push(index);
                touch(&mut plan, r, index);
            }

            for write in pass.attachments.writes() {
                let r = write.index();
                if let Some(writer) = last_writer[r] {
                    deps.push(writer);
                }
                deps.extend(readers_since_write[r].drain(..));
                last_writer[r] = Some(index);
                touch(&mut plan, r, index);
            }

            deps.sort_unstable();
            deps.dedup();
            deps.retain(|&mut d| d != index);
            plan.dependencies.push(deps);
        }

        Ok(plan)
    }

    fn entry(&self, pass: &str, texture: RgTexture) -> Result<&ResourceEntry> {
        self.resources
            .get(texture.index())
            .ok_or_else(|| UmbraError::UnresolvedResource {
                pass: pass.to_owned(),
                resource: texture.0,
            })
    }

    fn validate_pass(&self, pass: &PassNode<'a>) -> Result<()> {
        let name = pass.name.as_str();
        let invalid = |reason: String| UmbraError::InvalidAttachment {
            pass: name.to_owned(),
            reason,
        };
        let attachments = &pass.attachments;

        if attachments.color.is_none() && attachments.depth.is_none() {
            return Err(invalid("pass has no color or depth attachment".to_owned()));
        }

        if let Some(color) = attachments.color {
            let entry = self.entry(name, color.texture)?;
            if entry.is_depth() {
                return Err(invalid(format!("'{}' is a depth texture bound as color", entry.label)));
            }
            check_target(entry, color, &invalid)?;
        }

        if let Some(depth) = attachments.depth {
            let entry = self.entry(name, depth.texture)?;
            if !entry.is_depth() {
                return Err(invalid(format!("'{}' is not a depth texture", entry.label)));
            }
            check_target(entry, depth, &invalid)?;

            match attachments.color.map(|c| c.target) {
                Some(AttachmentTarget::Face(_)) if depth.target != AttachmentTarget::Whole => {
                    return Err(invalid(
                        "per-face color targets need a separate 2D depth surface".to_owned(),
                    ));
                }
                Some(AttachmentTarget::AllFaces) if depth.target != AttachmentTarget::AllFaces => {
                    return Err(invalid(
                        "layered color targets need a layered depth target".to_owned(),
                    ));
                }
                _ => {}
            }

            if let (Some(color), Some(color_desc), Some(depth_desc)) = (
                attachments.color,
                attachments
                    .color
                    .and_then(|c| self.resources.get(c.texture.index()))
                    .and_then(|e| e.desc.as_ref()),
                entry.desc.as_ref(),
            ) && color_desc.extent != depth_desc.extent
            {
                return Err(invalid(format!(
                    "extent mismatch between '{}' and '{}'",
                    self.resources[color.texture.index()].label,
                    entry.label
                )));
            }
        }

        for &read in &attachments.reads {
            let entry = self.entry(name, read)?;
            if attachments.writes().any(|w| w == read) {
                return Err(invalid(format!("'{}' is both read and written", entry.label)));
            }
        }

        Ok(())
    }

    // ── Execute ────────────────────────────────────────────────────────────

    /// Records every pass in declaration order and submits one command list.
    ///
    /// Presentation is left to the caller. Any error aborts the frame.
    pub fn execute(
        self,
        device: &mut dyn RenderDevice,
        swapchain: &dyn Swapchain,
        pool: &mut TransientTexturePool,
    ) -> Result<GraphStats> {
        let plan = self.compile()?;
        let Self {
            resources, passes, ..
        } = self;

        let mut frame = FrameResources {
            resources: &resources,
            resolved: vec![None; resources.len()],
            states: vec![ResourceState::Undefined; resources.len()],
            swapchain_extent: swapchain.extent(),
        };
        let mut commands = CommandList::new();
        let mut stats = GraphStats::default();

        for (index, pass) in passes.into_iter().enumerate() {
            let PassNode {
                name,
                attachments,
                record,
            } = pass;

            let touched: SmallVec<[RgTexture; 8]> = attachments
                .writes()
                .chain(attachments.reads.iter().copied())
                .collect();
            for &texture in &touched {
                frame.resolve(texture, &name, device, swapchain, pool, &mut stats)?;
            }

            if let Some(color) = attachments.color {
                frame.require(color.texture, ResourceState::RenderTarget, &mut commands, &mut stats);
            }
            if let Some(depth) = attachments.depth {
                frame.require(depth.texture, ResourceState::DepthWrite, &mut commands, &mut stats);
            }
            for &read in &attachments.reads {
                let state = frame.resources[read.index()].read_state();
                frame.require(read, state, &mut commands, &mut stats);
            }

            let extent = frame.extent_of(&attachments);
            commands.begin_render_pass(RenderPassDesc {
                label: name.clone(),
                color: attachments.color.and_then(|a| frame.view(a)),
                depth: attachments.depth.and_then(|a| frame.view(a)),
                clear: attachments.clear,
            });
            commands.set_viewport(Viewport::new(0, 0, extent.width, extent.height));

            let mut ctx = PassContext {
                commands: &mut commands,
                extent,
                resolved: &frame.resolved,
            };
            record(&mut ctx);

            commands.end_render_pass();
            stats.passes += 1;

            for &texture in &touched {
                let r = texture.index();
                if plan.last_use[r] == Some(index)
                    && frame.resources[r].origin == ResourceOrigin::Transient
                    && let Some(handle) = frame.resolved[r]
                {
                    pool.release(handle, frame.states[r]);
                }
            }
        }

        frame.finish(&mut commands, &mut stats);
        stats.commands = commands.len();
        device.submit(commands)?;
        Ok(stats)
    }
}

fn touch(plan: &mut GraphPlan, resource: usize, pass: usize) {
    if plan.first_use[resource].is_none() {
        plan.first_use[resource] = Some(pass);
    }
    plan.last_use[resource] = Some(pass);
}

fn check_target(
    entry: &ResourceEntry,
    attachment: Attachment,
    invalid: &impl Fn(String) -> UmbraError,
) -> Result<()> {
    match (entry.kind(), attachment.target) {
        (TextureKind::D2, AttachmentTarget::Whole) | (TextureKind::Cube, AttachmentTarget::AllFaces) => {
            Ok(())
        }
        (TextureKind::Cube, AttachmentTarget::Face(face)) if face < CUBE_FACE_COUNT => Ok(()),
        (TextureKind::Cube, AttachmentTarget::Face(face)) => Err(invalid(format!(
            "cube face {face} of '{}' is out of range",
            entry.label
        ))),
        (TextureKind::Cube, AttachmentTarget::Whole) => Err(invalid(format!(
            "cube '{}' must be bound per face or as all faces",
            entry.label
        ))),
        (TextureKind::D2, _) => Err(invalid(format!(
            "face addressing on 2D texture '{}'",
            entry.label
        ))),
    }
}

// ─── Execution State ──────────────────────────────────────────────────────────

struct FrameResources<'r> {
    resources: &'r [ResourceEntry],
    resolved: Vec<Option<TextureHandle>>,
    states: Vec<ResourceState>,
    swapchain_extent: Extent2d,
}

impl FrameResources<'_> {
    /// Materializes a logical texture on first sight.
    fn resolve(
        &mut self,
        texture: RgTexture,
        pass: &str,
        device: &mut dyn RenderDevice,
        swapchain: &dyn Swapchain,
        pool: &mut TransientTexturePool,
        stats: &mut GraphStats,
    ) -> Result<TextureHandle> {
        let r = texture.index();
        if let Some(handle) = self.resolved[r] {
            return Ok(handle);
        }
        let entry = &self.resources[r];

        let (handle, state) = match entry.origin {
            ResourceOrigin::Transient => {
                let desc = entry
                    .desc
                    .as_ref()
                    .ok_or_else(|| UmbraError::UnresolvedResource {
                        pass: pass.to_owned(),
                        resource: texture.0,
                    })?;
                let acquired = pool.acquire(device, desc)?;
                if acquired.reused {
                    stats.transients_reused += 1;
                } else {
                    stats.transients_created += 1;
                }
                (acquired.texture, acquired.state)
            }
            ResourceOrigin::Imported(handle) => {
                if !device.texture_alive(handle) {
                    return Err(UmbraError::ImportedResourceDestroyed {
                        pass: pass.to_owned(),
                        label: entry.label.clone(),
                    });
                }
                (handle, entry.read_state())
            }
            ResourceOrigin::SwapchainColor => {
                (swapchain.current_back_buffer(), ResourceState::Present)
            }
            ResourceOrigin::SwapchainDepth => (swapchain.depth_buffer(), ResourceState::DepthWrite),
        };

        self.resolved[r] = Some(handle);
        self.states[r] = state;
        Ok(handle)
    }

    fn require(
        &mut self,
        texture: RgTexture,
        state: ResourceState,
        commands: &mut CommandList,
        stats: &mut GraphStats,
    ) {
        let r = texture.index();
        let Some(handle) = self.resolved[r] else {
            return;
        };
        if self.states[r] != state {
            commands.transition(handle, self.states[r], state);
            self.states[r] = state;
            stats.transitions += 1;
        }
    }

    fn view(&self, attachment: Attachment) -> Option<AttachmentView> {
        let handle = self.resolved[attachment.texture.index()]?;
        Some(match attachment.target {
            AttachmentTarget::Whole => AttachmentView::Whole(handle),
            AttachmentTarget::Face(face) => AttachmentView::Face(handle, face),
            AttachmentTarget::AllFaces => AttachmentView::AllFaces(handle),
        })
    }

    fn extent_of(&self, attachments: &PassAttachments) -> Extent2d {
        attachments
            .color
            .iter()
            .chain(attachments.depth.iter())
            .find_map(|a| self.resources[a.texture.index()].desc.as_ref())
            .map_or(self.swapchain_extent, |desc| desc.extent)
    }

    /// Leaves the back buffer presentable and imports sampleable.
    fn finish(&mut self, commands: &mut CommandList, stats: &mut GraphStats) {
        for r in 0..self.resources.len() {
            let target = match self.resources[r].origin {
                ResourceOrigin::SwapchainColor => ResourceState::Present,
                ResourceOrigin::Imported(_) => self.resources[r].read_state(),
                _ => continue,
            };
            self.require(RgTexture(r as u32), target, commands, stats);
        }
    }
}
