//! Latch Shaders
//!
//! Flat (unlit) shading for 2D and 3D:
//! - Feature flags and their validation against backend capabilities
//! - Shader variants owning a GPU program
//! - Immediate uniform setters and uniform buffer bindings
//! - Single and batched multi-draw dispatch
//! - A CPU reference device for headless rendering

pub mod device;
pub mod dimension;
pub mod dispatch;
pub mod error;
pub mod flags;
pub mod mesh;
pub mod shader;
pub mod soft;
pub mod uniforms;
pub mod validate;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use device::{
    BufferId, BufferRange, DrawCommand, GpuDevice, MultiDrawCommand, ProgramDesc, ProgramId,
    Texture, TextureId, UniformBuffer, UniformChannel, UniformUpload,
};
pub use dimension::{Dim2, Dim3, Dimension};
pub use dispatch::{plan, Submission};
pub use error::{ConfigError, GpuError, MisuseError, MisuseKind, ShaderError};
pub use flags::FlatFlags;
pub use mesh::{InstanceData, Mesh, MeshData, MeshId, MeshView};
pub use shader::{BindingState, FlatShader, FlatShader2D, FlatShader3D};
pub use soft::{RecordedCommand, SoftwareConfig, SoftwareDevice, MAX_FRAMEBUFFER_SIZE};
pub use uniforms::{
    FlatDrawUniform, TextureTransformationUniform, TransformationProjectionUniform2D,
    TransformationProjectionUniform3D,
};
pub use validate::{validate, Skip, Validation, Violation};

pub use glam;
pub use latch_render::{BackendTier, BackendType, Capability, CapabilityProbe, DeviceCapabilities};
