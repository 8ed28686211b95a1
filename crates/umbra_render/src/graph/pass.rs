use smallvec::SmallVec;
use umbra_rhi::ClearDesc;

use super::context::PassContext;
use super::resource::RgTexture;

/// Which part of a texture an attachment binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentTarget {
    /// The whole 2D texture.
    #[default]
    Whole,
    /// A single cubemap face, `0..=5`.
    Face(u32),
    /// All six cubemap faces as one layered target.
    AllFaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attachment {
    pub texture: RgTexture,
    pub target: AttachmentTarget,
}

/// Declared attachments, sampled inputs and clear policy of a pass.
#[derive(Debug, Clone, Default)]
pub struct PassAttachments {
    pub(crate) color: Option<Attachment>,
    pub(crate) depth: Option<Attachment>,
    pub(crate) reads: SmallVec<[RgTexture; 4]>,
    pub(crate) clear: ClearDesc,
}

impl PassAttachments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn color(mut self, texture: RgTexture) -> Self {
        self.color = Some(Attachment {
            texture,
            target: AttachmentTarget::Whole,
        });
        self
    }

    #[must_use]
    pub fn color_face(mut self, texture: RgTexture, face: u32) -> Self {
        self.color = Some(Attachment {
            texture,
            target: AttachmentTarget::Face(face),
        });
        self
    }

    #[must_use]
    pub fn color_all_faces(mut self, texture: RgTexture) -> Self {
        self.color = Some(Attachment {
            texture,
            target: AttachmentTarget::AllFaces,
        });
        self
    }

    #[must_use]
    pub fn depth(mut self, texture: RgTexture) -> Self {
        self.depth = Some(Attachment {
            texture,
            target: AttachmentTarget::Whole,
        });
        self
    }

    #[must_use]
    pub fn depth_all_faces(mut self, texture: RgTexture) -> Self {
        self.depth = Some(Attachment {
            texture,
            target: AttachmentTarget::AllFaces,
        });
        self
    }

    /// Declares a sampled input.
    #[must_use]
    pub fn read(mut self, texture: RgTexture) -> Self {
        if !self.reads.contains(&texture) {
            self.reads.push(texture);
        }
        self
    }

    #[must_use]
    pub fn reads(mut self, textures: impl IntoIterator<Item = RgTexture>) -> Self {
        for texture in textures {
            self = self.read(texture);
        }
        self
    }

    #[must_use]
    pub fn clear(mut self, clear: ClearDesc) -> Self {
        self.clear = clear;
        self
    }

    /// Every texture the pass writes.
    pub(crate) fn writes(&self) -> impl Iterator<Item = RgTexture> + '_ {
        self.color
            .iter()
            .chain(self.depth.iter())
            .map(|a| a.texture)
    }
}

pub(crate) type RecordFn<'a> = Box<dyn FnOnce(&mut PassContext<'_>) + 'a>;

pub(crate) struct PassNode<'a> {
    pub name: String,
    pub attachments: PassAttachments,
    pub record: RecordFn<'a>,
}
