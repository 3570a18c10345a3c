//! Flag validation.
//!
//! A pure check of a requested variant against the probed capabilities. It
//! runs before any GPU resource is allocated.

use crate::dimension::Dimension;
use crate::error::{ConfigError, ShaderError};
use crate::flags::FlatFlags;
use latch_render::{Capability, DeviceCapabilities};
use thiserror::Error;

/// A rule violated by a requested flag combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("texture transformation enabled but the shader is not textured")]
    TextureTransformationNotTextured,

    #[error("draw count can't be zero")]
    ZeroDrawCount,
}

/// A capability the variant needs but the backend lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skip {
    pub capability: Capability,
    /// Backend feature providing the capability, e.g. an extension name.
    pub feature: &'static str,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub skipped: Vec<Skip>,
    pub violations: Vec<Violation>,
}

impl Validation {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.skipped.is_empty() && self.violations.is_empty()
    }

    /// Capability skips take precedence over configuration errors; all
    /// violations are reported together.
    pub fn into_result(self) -> Result<(), ShaderError> {
        if let Some(skip) = self.skipped.first() {
            return Err(ShaderError::Unsupported {
                capability: skip.capability,
                feature: skip.feature,
            });
        }
        if !self.violations.is_empty() {
            return Err(ConfigError::new(self.violations).into());
        }
        Ok(())
    }
}

/// Checks `flags` for a `D` variant sized for `draw_count` draws.
pub fn validate<D: Dimension>(
    flags: FlatFlags,
    draw_count: u32,
    capabilities: &DeviceCapabilities,
) -> Validation {
    let mut validation = Validation::default();

    let mut require = |capability: Capability| {
        if !capabilities.supports(capability) {
            validation.skipped.push(Skip {
                capability,
                feature: capabilities.feature_name(capability),
            });
        }
    };

    if flags.uses_uniform_buffers() {
        require(Capability::UniformBuffers);
    }
    if flags.contains(FlatFlags::OBJECT_ID) {
        require(Capability::IntegerFramebuffer);
    }
    if flags.contains(FlatFlags::MULTI_DRAW) {
        require(Capability::MultiDraw);
    }
    if flags.is_instanced() {
        require(Capability::Instancing);
    }

    if flags.contains(FlatFlags::TEXTURE_TRANSFORMATION) && !flags.contains(FlatFlags::TEXTURED) {
        validation
            .violations
            .push(Violation::TextureTransformationNotTextured);
    }
    if flags.uses_uniform_buffers() && draw_count == 0 {
        validation.violations.push(Violation::ZeroDrawCount);
    }
    validation
}
