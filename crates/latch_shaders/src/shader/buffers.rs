//! Uniform buffer bindings and the draw offset.

use super::{misuse, FlatShader, UniformState};
use crate::device::{BufferRange, GpuDevice, UniformBuffer, UniformChannel};
use crate::dimension::Dimension;
use crate::error::{MisuseKind, ShaderError};
use crate::flags::FlatFlags;

impl<D: Dimension, G: GpuDevice> FlatShader<D, G> {
    fn bind_channel(
        &mut self,
        operation: &'static str,
        channel: UniformChannel,
        range: BufferRange,
    ) -> Result<&mut Self, ShaderError> {
        if !self.flags.uses_uniform_buffers() {
            return Err(misuse(operation, MisuseKind::UniformBuffersNotEnabled));
        }
        if channel == UniformChannel::TextureTransformation
            && !self.flags.contains(FlatFlags::TEXTURE_TRANSFORMATION)
        {
            return Err(misuse(
                operation,
                MisuseKind::FeatureNotEnabled("texture transformation"),
            ));
        }

        self.device.bind_uniform_buffer(channel, range)?;
        if let UniformState::Buffers(bindings) = &mut self.uniforms {
            bindings.bound[channel.index()] = Some(range);
        }
        tracing::trace!(
            binding = channel.binding(),
            buffer = range.buffer.raw(),
            offset = range.offset,
            size = range.size,
            "bound {} buffer",
            channel.name()
        );
        Ok(self)
    }

    pub fn bind_transformation_projection_buffer(
        &mut self,
        buffer: &UniformBuffer,
    ) -> Result<&mut Self, ShaderError> {
        self.bind_channel(
            "bind_transformation_projection_buffer",
            UniformChannel::TransformationProjection,
            buffer.whole(),
        )
    }

    pub fn bind_transformation_projection_buffer_range(
        &mut self,
        buffer: &UniformBuffer,
        offset: u64,
        size: u64,
    ) -> Result<&mut Self, ShaderError> {
        self.bind_channel(
            "bind_transformation_projection_buffer",
            UniformChannel::TransformationProjection,
            buffer.range(offset, size),
        )
    }

    pub fn bind_draw_buffer(&mut self, buffer: &UniformBuffer) -> Result<&mut Self, ShaderError> {
        self.bind_channel("bind_draw_buffer", UniformChannel::Draw, buffer.whole())
    }

    pub fn bind_draw_buffer_range(
        &mut self,
        buffer: &UniformBuffer,
        offset: u64,
        size: u64,
    ) -> Result<&mut Self, ShaderError> {
        self.bind_channel(
            "bind_draw_buffer",
            UniformChannel::Draw,
            buffer.range(offset, size),
        )
    }

    /// Requires [`FlatFlags::TEXTURE_TRANSFORMATION`].
    pub fn bind_texture_transformation_buffer(
        &mut self,
        buffer: &UniformBuffer,
    ) -> Result<&mut Self, ShaderError> {
        self.bind_channel(
            "bind_texture_transformation_buffer",
            UniformChannel::TextureTransformation,
            buffer.whole(),
        )
    }

    pub fn bind_texture_transformation_buffer_range(
        &mut self,
        buffer: &UniformBuffer,
        offset: u64,
        size: u64,
    ) -> Result<&mut Self, ShaderError> {
        self.bind_channel(
            "bind_texture_transformation_buffer",
            UniformChannel::TextureTransformation,
            buffer.range(offset, size),
        )
    }

    /// Selects the uniform slot read by subsequent draws. Must be below the
    /// draw count.
    pub fn set_draw_offset(&mut self, offset: u32) -> Result<&mut Self, ShaderError> {
        let draw_count = self.draw_count;
        let UniformState::Buffers(bindings) = &mut self.uniforms else {
            return Err(misuse("set_draw_offset", MisuseKind::UniformBuffersNotEnabled));
        };
        if offset >= draw_count {
            return Err(misuse(
                "set_draw_offset",
                MisuseKind::DrawOffsetOutOfBounds { offset, draw_count },
            ));
        }
        bindings.draw_offset = offset;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::shader::BindingState;
    use crate::{FlatFlags, FlatShader2D, GpuError, MisuseKind, ShaderError, SoftwareDevice};

    #[test]
    fn draw_offset_is_bounded_by_draw_count() {
        let device = SoftwareDevice::default();
        let mut shader = FlatShader2D::with_draw_count(device, FlatFlags::UNIFORM_BUFFERS, 5).unwrap();

        shader.set_draw_offset(4).unwrap();
        assert_eq!(shader.draw_offset(), Some(4));

        let err = shader.set_draw_offset(5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "FlatShader::set_draw_offset(): draw offset 5 is out of bounds for 5 draws"
        );
        assert_eq!(shader.draw_offset(), Some(4));
    }

    #[test]
    fn binding_marks_state() {
        let device = SoftwareDevice::default();
        let buffer = device.create_uniform_buffer(&[0u8; 64]);
        let mut shader = FlatShader2D::new(device, FlatFlags::UNIFORM_BUFFERS).unwrap();
        assert_eq!(shader.state(), BindingState::Unbound);

        shader.bind_draw_buffer(&buffer).unwrap();
        assert_eq!(shader.state(), BindingState::BufferBound);
    }

    #[test]
    fn misaligned_range_is_a_device_error() {
        let device = SoftwareDevice::default();
        let buffer = device.create_uniform_buffer(&[0u8; 512]);
        let mut shader = FlatShader2D::new(device, FlatFlags::UNIFORM_BUFFERS).unwrap();

        let err = shader.bind_draw_buffer_range(&buffer, 32, 32).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Gpu(GpuError::MisalignedOffset {
                offset: 32,
                alignment: 256
            })
        ));
        shader.bind_draw_buffer_range(&buffer, 256, 32).unwrap();
    }

    #[test]
    fn range_ending_past_u64_max_is_out_of_bounds() {
        let device = SoftwareDevice::default();
        let buffer = device.create_uniform_buffer(&[0u8; 512]);
        let mut shader = FlatShader2D::new(device, FlatFlags::UNIFORM_BUFFERS).unwrap();

        // Aligned to 256, so only the bounds check can reject it.
        let offset = u64::MAX - 255;
        let err = shader.bind_draw_buffer_range(&buffer, offset, 512).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Gpu(GpuError::RangeOutOfBounds {
                offset: o,
                size: 512,
                buffer_size: 512
            }) if o == offset
        ));
        assert_eq!(shader.state(), BindingState::Unbound);
    }

    #[test]
    fn texture_transformation_buffer_needs_the_flag() {
        let device = SoftwareDevice::default();
        let buffer = device.create_uniform_buffer(&[0u8; 32]);
        let mut shader = FlatShader2D::new(device, FlatFlags::UNIFORM_BUFFERS).unwrap();

        match shader.bind_texture_transformation_buffer(&buffer).unwrap_err() {
            ShaderError::Misuse(misuse) => assert_eq!(
                misuse.kind,
                MisuseKind::FeatureNotEnabled("texture transformation")
            ),
            other => panic!("unexpected {other:?}"),
        }
    }
}
