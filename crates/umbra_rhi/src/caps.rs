use bitflags::bitflags;

bitflags! {
    /// Optional hardware and compiler features reported by a device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceCaps: u32 {
        /// Shader model 6.1 (or equivalent) compilation is available.
        const SHADER_MODEL_6 = 1 << 0;
        /// Multi-view rendering with a view index in the vertex stage.
        const VIEW_INSTANCING = 1 << 1;
        /// Render-target array index may be written from any pre-raster stage.
        const RT_ARRAY_INDEX_ANY_SHADER = 1 << 2;
    }
}

impl DeviceCaps {
    /// Prerequisites for single-pass layered cubemap rendering.
    pub const LAYERED: Self = Self::SHADER_MODEL_6.union(Self::RT_ARRAY_INDEX_ANY_SHADER);
    /// Prerequisites for single-pass view-instanced cubemap rendering.
    pub const MULTI_VIEW: Self = Self::SHADER_MODEL_6.union(Self::VIEW_INSTANCING);
}
