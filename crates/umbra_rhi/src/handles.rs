use slotmap::new_key_type;

new_key_type! {
    /// Handle to a device buffer.
    pub struct BufferHandle;
    /// Handle to a device texture.
    pub struct TextureHandle;
    /// Handle to a compiled pipeline state object.
    pub struct PipelineHandle;
}

/// Slot in the bindless texture descriptor heap.
///
/// Index `0` is reserved and means "nothing bound", matching what shaders
/// test against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorIndex(pub u32);

impl DescriptorIndex {
    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }
}
