//! Backend tier presets.
//!
//! Each tier describes a feature level the flat shader ships on. The numbers
//! are what the corresponding drivers commonly report; real devices should be
//! probed through [`crate::probe_adapter`] instead.

use crate::{BackendType, DeviceCapabilities};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendTier {
    /// Desktop GL 4.6 with ARB_shader_draw_parameters
    DesktopGl,
    /// Desktop GL 2.1, no UBOs and no integer attachments
    DesktopGlLegacy,
    /// OpenGL ES 2.0
    Gles2,
    /// OpenGL ES 3.0 without multi-draw
    Gles3,
    /// OpenGL ES 3.0 with ANGLE_multi_draw
    Gles3MultiDraw,
    /// WebGL 1.0 with ANGLE_instanced_arrays
    Webgl1,
    /// WebGL 2.0 with WEBGL_multi_draw
    Webgl2,
    /// CPU reference rasterizer
    #[default]
    Software,
}

impl BackendTier {
    pub const ALL: [BackendTier; 8] = [
        BackendTier::DesktopGl,
        BackendTier::DesktopGlLegacy,
        BackendTier::Gles2,
        BackendTier::Gles3,
        BackendTier::Gles3MultiDraw,
        BackendTier::Webgl1,
        BackendTier::Webgl2,
        BackendTier::Software,
    ];

    pub fn capabilities(self) -> DeviceCapabilities {
        let (backend, ubo, multi_draw, instancing, integer_fb, alignment, block, texture) =
            match self {
                BackendTier::DesktopGl => (BackendType::OpenGL, true, true, true, true, 256, 65536, 16384),
                BackendTier::DesktopGlLegacy => (BackendType::OpenGL, false, false, true, false, 0, 0, 4096),
                BackendTier::Gles2 => (BackendType::OpenGLES, false, false, false, false, 0, 0, 2048),
                BackendTier::Gles3 => (BackendType::OpenGLES, true, false, true, true, 256, 16384, 4096),
                BackendTier::Gles3MultiDraw => (BackendType::OpenGLES, true, true, true, true, 256, 16384, 4096),
                BackendTier::Webgl1 => (BackendType::WebGL, false, false, true, false, 0, 0, 4096),
                BackendTier::Webgl2 => (BackendType::WebGL, true, true, true, true, 256, 16384, 4096),
                BackendTier::Software => (BackendType::Software, true, true, true, true, 256, 16384, 8192),
            };

        DeviceCapabilities {
            backend,
            uniform_buffers: ubo,
            multi_draw,
            instancing,
            integer_framebuffer: integer_fb,
            min_uniform_offset_alignment: alignment,
            max_uniform_block_size: block,
            max_texture_size: texture,
        }
    }
}
