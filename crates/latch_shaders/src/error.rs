use crate::validate::Violation;
use latch_render::Capability;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by shader construction, configuration and drawing.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The backend lacks a capability the requested variant needs. Callers
    /// should skip the code path instead of treating this as a failure.
    #[error("{feature} is not supported")]
    Unsupported {
        capability: Capability,
        feature: &'static str,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Misuse(#[from] MisuseError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl ShaderError {
    #[inline]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ShaderError::Unsupported { .. })
    }
}

/// Illegal flag combination or draw count. Lists every violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    violations: Vec<Violation>,
}

impl ConfigError {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// A call inconsistent with how the shader was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("FlatShader::{operation}(): {kind}")]
pub struct MisuseError {
    pub operation: &'static str,
    pub kind: MisuseKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MisuseKind {
    #[error("the shader was created with uniform buffers enabled")]
    UniformBuffersEnabled,

    #[error("the shader was not created with uniform buffers enabled")]
    UniformBuffersNotEnabled,

    #[error("the shader was not created with {0} enabled")]
    FeatureNotEnabled(&'static str),

    #[error("draw offset {offset} is out of bounds for {draw_count} draws")]
    DrawOffsetOutOfBounds { offset: u32, draw_count: u32 },

    #[error("{views} draws at offset {offset} don't fit into {draw_count} draws")]
    TooManyDraws {
        views: usize,
        offset: u32,
        draw_count: u32,
    },

    #[error("no {0} buffer bound")]
    BufferNotBound(&'static str),

    #[error("the shader has no program")]
    NoProgram,
}

/// Failure reported by the GPU device itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("uniform storage of {required} bytes exceeds the device limit of {limit} bytes")]
    ResourceExhausted { required: u64, limit: u64 },

    #[error("uniform buffer offset {offset} is not a multiple of {alignment}")]
    MisalignedOffset { offset: u64, alignment: u64 },

    #[error("range of {size} bytes at offset {offset} is out of bounds for a buffer of {buffer_size} bytes")]
    RangeOutOfBounds {
        offset: u64,
        size: u64,
        buffer_size: u64,
    },

    #[error("framebuffer of {width}x{height} pixels is empty or too large")]
    InvalidFramebuffer { width: u32, height: u32 },

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("{0} is not supported by the device")]
    Unsupported(Capability),
}
