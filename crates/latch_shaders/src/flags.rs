use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Feature set of a flat shader variant.
    ///
    /// Some flags are supersets of others: enabling `INSTANCED_OBJECT_ID`
    /// also enables `OBJECT_ID`, `INSTANCED_TEXTURE_OFFSET` enables
    /// `TEXTURE_TRANSFORMATION` and `MULTI_DRAW` enables `UNIFORM_BUFFERS`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FlatFlags: u32 {
        /// Multiply the color with a texture.
        const TEXTURED = 1 << 0;
        /// Discard fragments whose alpha is below the alpha mask threshold.
        const ALPHA_MASK = 1 << 1;
        /// Multiply the color with a per-vertex color attribute.
        const VERTEX_COLOR = 1 << 2;
        /// Transform texture coordinates with a texture matrix.
        const TEXTURE_TRANSFORMATION = 1 << 3;
        /// Write an object ID to an integer attachment.
        const OBJECT_ID = 1 << 4;
        /// Add a per-instance object ID to the uniform one.
        const INSTANCED_OBJECT_ID = (1 << 5) | Self::OBJECT_ID.bits();
        /// Per-instance transformation matrix.
        const INSTANCED_TRANSFORMATION = 1 << 6;
        /// Per-instance texture offset.
        const INSTANCED_TEXTURE_OFFSET = (1 << 7) | Self::TEXTURE_TRANSFORMATION.bits();
        /// Take uniforms from bound uniform buffers instead of setters.
        const UNIFORM_BUFFERS = 1 << 8;
        /// Resolve each draw's uniform slot from the hardware draw index.
        const MULTI_DRAW = (1 << 9) | Self::UNIFORM_BUFFERS.bits();
    }
}

impl FlatFlags {
    /// Flags that read per-instance vertex attributes.
    pub const INSTANCED: FlatFlags = FlatFlags::from_bits_truncate(
        (1 << 5) | FlatFlags::INSTANCED_TRANSFORMATION.bits() | (1 << 7),
    );

    #[inline]
    pub fn uses_uniform_buffers(self) -> bool {
        self.contains(FlatFlags::UNIFORM_BUFFERS)
    }

    #[inline]
    pub fn is_instanced(self) -> bool {
        self.intersects(FlatFlags::INSTANCED)
    }
}
