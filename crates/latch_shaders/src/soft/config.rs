use crate::error::GpuError;
use latch_render::Capability;
use serde::{Deserialize, Serialize};

/// Largest accepted framebuffer side in pixels.
pub const MAX_FRAMEBUFFER_SIZE: u32 = 16384;

/// Framebuffer and limits of the software device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareConfig {
    pub width: u32,
    pub height: u32,
    /// Linear RGBA.
    pub clear_color: [f32; 4],
    pub clear_object_id: u32,
    pub min_uniform_offset_alignment: u32,
    pub max_uniform_block_size: u32,
    /// Capabilities reported as missing.
    pub disabled: Vec<Capability>,
}

impl Default for SoftwareConfig {
    fn default() -> Self {
        let grey = 0x11 as f32 / 255.0;
        Self {
            width: 80,
            height: 80,
            clear_color: [grey, grey, grey, 1.0],
            clear_object_id: 27,
            min_uniform_offset_alignment: 256,
            max_uniform_block_size: 16384,
            disabled: Vec::new(),
        }
    }
}

impl SoftwareConfig {
    /// Rejects empty framebuffers and sides above [`MAX_FRAMEBUFFER_SIZE`].
    pub fn validate(&self) -> Result<(), GpuError> {
        let sides = 1..=MAX_FRAMEBUFFER_SIZE;
        if sides.contains(&self.width) && sides.contains(&self.height) {
            Ok(())
        } else {
            Err(GpuError::InvalidFramebuffer {
                width: self.width,
                height: self.height,
            })
        }
    }
}
