//! Immediate uniform setters.

use super::{misuse, FlatShader, ImmediateUniforms, UniformState};
use crate::device::{GpuDevice, Texture, UniformUpload};
use crate::dimension::Dimension;
use crate::error::{MisuseKind, ShaderError};
use crate::flags::FlatFlags;
use glam::{Mat3, Vec4};

impl<D: Dimension> ImmediateUniforms<D> {
    pub(super) fn upload(&self) -> UniformUpload<'_> {
        UniformUpload {
            transformation_projection: bytemuck::bytes_of(&self.transformation_projection),
            draw: self.draw,
            texture_transformation: self.texture_transformation,
        }
    }
}

impl<D: Dimension, G: GpuDevice> FlatShader<D, G> {
    /// Staged uniforms, or a misuse if the variant uses uniform buffers.
    fn immediate(
        &mut self,
        operation: &'static str,
        feature: Option<(FlatFlags, &'static str)>,
    ) -> Result<&mut ImmediateUniforms<D>, ShaderError> {
        let flags = self.flags;
        let uniforms = match &mut self.uniforms {
            UniformState::Immediate(uniforms) => uniforms,
            UniformState::Buffers(_) => {
                return Err(misuse(operation, MisuseKind::UniformBuffersEnabled))
            }
        };
        if let Some((flag, name)) = feature {
            if !flags.contains(flag) {
                return Err(misuse(operation, MisuseKind::FeatureNotEnabled(name)));
            }
        }
        uniforms.touched = true;
        uniforms.dirty = true;
        Ok(uniforms)
    }

    pub fn set_transformation_projection_matrix(
        &mut self,
        matrix: D::Matrix,
    ) -> Result<&mut Self, ShaderError> {
        self.immediate("set_transformation_projection_matrix", None)?
            .transformation_projection = D::transformation_projection(matrix);
        Ok(self)
    }

    /// Requires [`FlatFlags::TEXTURE_TRANSFORMATION`].
    pub fn set_texture_matrix(&mut self, matrix: Mat3) -> Result<&mut Self, ShaderError> {
        let uniforms = self.immediate(
            "set_texture_matrix",
            Some((FlatFlags::TEXTURE_TRANSFORMATION, "texture transformation")),
        )?;
        uniforms.texture_transformation = uniforms.texture_transformation.with_texture_matrix(matrix);
        Ok(self)
    }

    pub fn set_color(&mut self, color: Vec4) -> Result<&mut Self, ShaderError> {
        let uniforms = self.immediate("set_color", None)?;
        uniforms.draw = uniforms.draw.with_color(color);
        Ok(self)
    }

    /// Fragments with alpha below `threshold` are discarded. Requires
    /// [`FlatFlags::ALPHA_MASK`].
    pub fn set_alpha_mask(&mut self, threshold: f32) -> Result<&mut Self, ShaderError> {
        let uniforms = self.immediate("set_alpha_mask", Some((FlatFlags::ALPHA_MASK, "alpha mask")))?;
        uniforms.draw = uniforms.draw.with_alpha_mask(threshold);
        Ok(self)
    }

    /// Requires [`FlatFlags::OBJECT_ID`].
    pub fn set_object_id(&mut self, id: u32) -> Result<&mut Self, ShaderError> {
        let uniforms = self.immediate("set_object_id", Some((FlatFlags::OBJECT_ID, "object ID")))?;
        uniforms.draw = uniforms.draw.with_object_id(id);
        Ok(self)
    }

    /// Binds the color texture. Valid in both uniform modes; requires
    /// [`FlatFlags::TEXTURED`].
    pub fn bind_texture(&mut self, texture: &Texture) -> Result<&mut Self, ShaderError> {
        if !self.flags.contains(FlatFlags::TEXTURED) {
            return Err(misuse("bind_texture", MisuseKind::FeatureNotEnabled("texturing")));
        }
        self.device.bind_texture(0, texture.id())?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{FlatFlags, FlatShader2D, FlatShader3D, MisuseKind, ShaderError, SoftwareDevice};
    use crate::shader::BindingState;
    use glam::{Mat3, Mat4, Vec4};

    fn misuse_kind(err: ShaderError) -> MisuseKind {
        match err {
            ShaderError::Misuse(misuse) => misuse.kind,
            other => panic!("expected a misuse, got {other:?}"),
        }
    }

    #[test]
    fn setters_chain_and_mark_ready() {
        let device = SoftwareDevice::default();
        let mut shader = FlatShader2D::new(device, FlatFlags::ALPHA_MASK | FlatFlags::OBJECT_ID).unwrap();
        assert_eq!(shader.state(), BindingState::Unbound);

        shader
            .set_transformation_projection_matrix(Mat3::IDENTITY)
            .unwrap()
            .set_color(Vec4::new(1.0, 0.0, 0.0, 1.0))
            .unwrap()
            .set_alpha_mask(0.25)
            .unwrap()
            .set_object_id(7)
            .unwrap();
        assert_eq!(shader.state(), BindingState::ImmediateReady);
    }

    #[test]
    fn feature_setters_require_their_flag() {
        let device = SoftwareDevice::default();
        let mut shader = FlatShader3D::new(device, FlatFlags::empty()).unwrap();

        let err = shader.set_texture_matrix(Mat3::IDENTITY).unwrap_err();
        assert_eq!(misuse_kind(err), MisuseKind::FeatureNotEnabled("texture transformation"));
        let err = shader.set_alpha_mask(0.1).unwrap_err();
        assert_eq!(misuse_kind(err), MisuseKind::FeatureNotEnabled("alpha mask"));
        let err = shader.set_object_id(3).unwrap_err();
        assert_eq!(misuse_kind(err), MisuseKind::FeatureNotEnabled("object ID"));

        // Unaffected by the failures above.
        shader.set_transformation_projection_matrix(Mat4::IDENTITY).unwrap();
    }

    #[test]
    fn uniform_buffer_check_comes_first() {
        let device = SoftwareDevice::default();
        let mut shader = FlatShader2D::new(device, FlatFlags::UNIFORM_BUFFERS).unwrap();

        let err = shader.set_texture_matrix(Mat3::IDENTITY).unwrap_err();
        assert_eq!(misuse_kind(err), MisuseKind::UniformBuffersEnabled);
        assert_eq!(shader.state(), BindingState::Unbound);
    }

    #[test]
    fn binding_a_texture_needs_texturing() {
        let device = SoftwareDevice::default();
        let texture = device.create_texture(1, 1, &[255, 255, 255, 255]).unwrap();
        let mut shader = FlatShader2D::new(device, FlatFlags::empty()).unwrap();

        let err = shader.bind_texture(&texture).unwrap_err();
        assert_eq!(
            err.to_string(),
            "FlatShader::bind_texture(): the shader was not created with texturing enabled"
        );
    }
}
