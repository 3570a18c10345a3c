//! Latch Render System
//!
//! Backend capability probing. Every rendering path in the engine asks this
//! crate what the active backend can do before it allocates GPU resources,
//! and branches on the answer at runtime instead of at compile time.

pub mod backend;
pub mod capability;
pub mod tier;

pub use backend::{capabilities_from_wgpu, probe_adapter, probe_capabilities};
pub use capability::{align_to, Capability, CapabilityProbe, DeviceCapabilities};
pub use tier::BackendTier;

pub use wgpu;

use serde::{Deserialize, Serialize};

/// Rendering backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// Vulkan (cross-platform)
    Vulkan,
    /// Metal (macOS, iOS)
    Metal,
    /// DirectX 12 (Windows)
    DirectX12,
    /// Desktop OpenGL
    OpenGL,
    /// OpenGL ES (mobile, ANGLE)
    OpenGLES,
    /// WebGL (web)
    WebGL,
    /// WebGPU in the browser
    WebGpu,
    /// Software rasterizer (ultimate fallback)
    Software,
}

