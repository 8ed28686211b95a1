use umbra_rhi::{CommandList, Extent2d, TextureHandle};

use super::resource::RgTexture;

/// What a pass callback sees while recording.
///
/// The render pass is already begun with its attachments bound, its clear
/// applied and a full-extent viewport set.
pub struct PassContext<'c> {
    pub commands: &'c mut CommandList,
    /// Extent of the bound attachments.
    pub extent: Extent2d,
    pub(crate) resolved: &'c [Option<TextureHandle>],
}

impl PassContext<'_> {
    /// Device texture behind a logical handle.
    ///
    /// Always `Some` for the pass's declared attachments and reads.
    #[must_use]
    pub fn texture(&self, texture: RgTexture) -> Option<TextureHandle> {
        self.resolved.get(texture.index()).copied().flatten()
    }
}
