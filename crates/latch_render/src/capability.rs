//! Capability queries shared by every shader variant.

use crate::BackendType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A backend feature a shader variant may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Uniform buffer objects (per-draw parameters in GPU memory).
    UniformBuffers,
    /// Batched multi-draw submission with a per-draw index visible to shaders.
    MultiDraw,
    /// Instanced vertex attributes.
    Instancing,
    /// Integer color attachments and integer shader outputs (object IDs).
    IntegerFramebuffer,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::UniformBuffers,
        Capability::MultiDraw,
        Capability::Instancing,
        Capability::IntegerFramebuffer,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::UniformBuffers => "uniform buffers",
            Capability::MultiDraw => "multi-draw",
            Capability::Instancing => "instancing",
            Capability::IntegerFramebuffer => "integer framebuffers",
        };
        f.write_str(name)
    }
}

/// Capability probe result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub backend: BackendType,
    pub uniform_buffers: bool,
    pub multi_draw: bool,
    pub instancing: bool,
    pub integer_framebuffer: bool,
    /// Byte alignment required for uniform buffer range offsets.
    pub min_uniform_offset_alignment: u32,
    /// Largest uniform block a single program may declare, in bytes.
    pub max_uniform_block_size: u32,
    pub max_texture_size: u32,
}

impl DeviceCapabilities {
    #[inline]
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::UniformBuffers => self.uniform_buffers,
            Capability::MultiDraw => self.multi_draw,
            Capability::Instancing => self.instancing,
            Capability::IntegerFramebuffer => self.integer_framebuffer,
        }
    }

    /// Returns a copy with `capability` switched off.
    pub fn without(mut self, capability: Capability) -> Self {
        match capability {
            Capability::UniformBuffers => {
                self.uniform_buffers = false;
                // Multi-draw resolves its slots through uniform buffers.
                self.multi_draw = false;
            }
            Capability::MultiDraw => self.multi_draw = false,
            Capability::Instancing => self.instancing = false,
            Capability::IntegerFramebuffer => self.integer_framebuffer = false,
        }
        self
    }

    /// Name of the backend feature that provides `capability`, as reported in
    /// skip messages.
    pub fn feature_name(&self, capability: Capability) -> &'static str {
        use BackendType::*;
        use Capability::*;

        match (self.backend, capability) {
            (OpenGL, UniformBuffers) => "GL_ARB_uniform_buffer_object",
            (OpenGL, MultiDraw) => "GL_ARB_shader_draw_parameters",
            (OpenGL, Instancing) => "GL_ARB_instanced_arrays",
            (OpenGL, IntegerFramebuffer) => "GL_EXT_gpu_shader4",
            (OpenGLES, UniformBuffers) => "OpenGL ES 3.0",
            (OpenGLES, MultiDraw) => "GL_ANGLE_multi_draw",
            (OpenGLES, Instancing) => "GL_ANGLE_instanced_arrays",
            (OpenGLES, IntegerFramebuffer) => "OpenGL ES 3.0",
            (WebGL, UniformBuffers) => "WebGL 2.0",
            (WebGL, MultiDraw) => "WEBGL_multi_draw",
            (WebGL, Instancing) => "ANGLE_instanced_arrays",
            (WebGL, IntegerFramebuffer) => "WebGL 2.0",
            (_, MultiDraw) => "MULTI_DRAW_INDIRECT",
            (_, UniformBuffers) => "uniform buffers",
            (_, Instancing) => "instancing",
            (_, IntegerFramebuffer) => "integer framebuffers",
        }
    }

    /// Capabilities reported by a device that supports everything.
    pub fn full(backend: BackendType) -> Self {
        Self {
            backend,
            uniform_buffers: true,
            multi_draw: true,
            instancing: true,
            integer_framebuffer: true,
            min_uniform_offset_alignment: 256,
            max_uniform_block_size: 16 * 1024,
            max_texture_size: 8192,
        }
    }
}

/// Anything that can answer capability queries for the active backend.
///
/// Implementors must report the *current* state; callers query at
/// construction and again at draw time.
pub trait CapabilityProbe {
    fn capabilities(&self) -> DeviceCapabilities;

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().supports(capability)
    }
}

impl CapabilityProbe for DeviceCapabilities {
    fn capabilities(&self) -> DeviceCapabilities {
        self.clone()
    }
}

/// Rounds `value` up to the next multiple of `alignment`.
///
/// An alignment of zero is treated as one.
#[inline]
pub fn align_to(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_multiple() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(48, 16), 48);
        assert_eq!(align_to(48, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(7, 0), 7);
    }

    #[test]
    fn disabling_uniform_buffers_disables_multi_draw() {
        let caps = DeviceCapabilities::full(BackendType::Software).without(Capability::UniformBuffers);
        assert!(!caps.supports(Capability::UniformBuffers));
        assert!(!caps.supports(Capability::MultiDraw));
        assert!(caps.supports(Capability::Instancing));
    }

    #[test]
    fn feature_names_follow_backend() {
        let mut caps = DeviceCapabilities::full(BackendType::OpenGL);
        assert_eq!(
            caps.feature_name(Capability::MultiDraw),
            "GL_ARB_shader_draw_parameters"
        );
        caps.backend = BackendType::WebGL;
        assert_eq!(caps.feature_name(Capability::MultiDraw), "WEBGL_multi_draw");
        caps.backend = BackendType::Vulkan;
        assert_eq!(caps.feature_name(Capability::MultiDraw), "MULTI_DRAW_INDIRECT");
    }

    #[test]
    fn capability_names_deserialize_kebab_case() {
        let caps: Vec<Capability> =
            serde_json::from_str(r#"["multi-draw", "integer-framebuffer"]"#).unwrap();
        assert_eq!(caps, vec![Capability::MultiDraw, Capability::IntegerFramebuffer]);
    }
}
