//! Per-draw uniform blocks.
//!
//! Layouts follow std140 so the same bytes can be uploaded through
//! immediate setters or placed in uniform buffers. Arrays of blocks consumed
//! through a draw offset are tightly packed; arrays whose elements are bound
//! one by one with an offset must be strided by the backend's uniform offset
//! alignment instead, see [`uniform_stride`].

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec4};
use latch_render::align_to;
use std::mem;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformationProjectionUniform2D {
    /// Matrix columns, each padded to four floats.
    pub transformation_projection_matrix: [[f32; 4]; 3],
}

impl TransformationProjectionUniform2D {
    pub fn with_transformation_projection_matrix(mut self, matrix: Mat3) -> Self {
        self.transformation_projection_matrix = [
            matrix.x_axis.extend(0.0).to_array(),
            matrix.y_axis.extend(0.0).to_array(),
            matrix.z_axis.extend(0.0).to_array(),
        ];
        self
    }

    pub fn matrix(&self) -> Mat3 {
        let [x, y, z] = self.transformation_projection_matrix;
        Mat3::from_cols(
            Vec4::from_array(x).truncate(),
            Vec4::from_array(y).truncate(),
            Vec4::from_array(z).truncate(),
        )
    }
}

impl Default for TransformationProjectionUniform2D {
    fn default() -> Self {
        Self::zeroed().with_transformation_projection_matrix(Mat3::IDENTITY)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformationProjectionUniform3D {
    pub transformation_projection_matrix: [[f32; 4]; 4],
}

impl TransformationProjectionUniform3D {
    pub fn with_transformation_projection_matrix(mut self, matrix: Mat4) -> Self {
        self.transformation_projection_matrix = matrix.to_cols_array_2d();
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transformation_projection_matrix)
    }
}

impl Default for TransformationProjectionUniform3D {
    fn default() -> Self {
        Self {
            transformation_projection_matrix: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// Color, object ID and alpha mask threshold of one draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatDrawUniform {
    pub color: [f32; 4],
    pub object_id: u32,
    pub alpha_mask: f32,
    _reserved: [u32; 2],
}

impl FlatDrawUniform {
    pub const DEFAULT_ALPHA_MASK: f32 = 0.5;

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color.to_array();
        self
    }

    pub fn with_object_id(mut self, id: u32) -> Self {
        self.object_id = id;
        self
    }

    pub fn with_alpha_mask(mut self, threshold: f32) -> Self {
        self.alpha_mask = threshold;
        self
    }
}

impl Default for FlatDrawUniform {
    fn default() -> Self {
        Self {
            color: [1.0; 4],
            object_id: 0,
            alpha_mask: Self::DEFAULT_ALPHA_MASK,
            _reserved: [0; 2],
        }
    }
}

/// Texture coordinate transformation: a 2×2 rotation/scaling part and an
/// offset, i.e. the affine part of a 3×3 matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextureTransformationUniform {
    pub rotation_scaling: [f32; 4],
    pub offset: [f32; 2],
    _reserved: [u32; 2],
}

impl TextureTransformationUniform {
    pub fn with_texture_matrix(mut self, matrix: Mat3) -> Self {
        self.rotation_scaling = [matrix.x_axis.x, matrix.x_axis.y, matrix.y_axis.x, matrix.y_axis.y];
        self.offset = [matrix.z_axis.x, matrix.z_axis.y];
        self
    }

    pub fn texture_matrix(&self) -> Mat3 {
        let [a, b, c, d] = self.rotation_scaling;
        let [x, y] = self.offset;
        Mat3::from_cols_array(&[a, b, 0.0, c, d, 0.0, x, y, 1.0])
    }
}

impl Default for TextureTransformationUniform {
    fn default() -> Self {
        Self::zeroed().with_texture_matrix(Mat3::IDENTITY)
    }
}

/// Byte stride between consecutive blocks of type `T` that are bound
/// individually with a range offset.
#[inline]
pub fn uniform_stride<T>(alignment: u32) -> usize {
    align_to(mem::size_of::<T>() as u64, alignment as u64) as usize
}

/// Lays `blocks` out with the given byte stride, zero-filling the gaps.
///
/// A stride smaller than the block size is raised to the block size.
pub fn write_strided<T: Pod>(blocks: &[T], stride: usize) -> Vec<u8> {
    let size = mem::size_of::<T>();
    let stride = stride.max(size);
    let mut bytes = vec![0u8; blocks.len() * stride];
    for (i, block) in blocks.iter().enumerate() {
        let start = i * stride;
        bytes[start..start + size].copy_from_slice(bytemuck::bytes_of(block));
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn block_sizes_match_std140() {
        assert_eq!(mem::size_of::<TransformationProjectionUniform2D>(), 48);
        assert_eq!(mem::size_of::<TransformationProjectionUniform3D>(), 64);
        assert_eq!(mem::size_of::<FlatDrawUniform>(), 32);
        assert_eq!(mem::size_of::<TextureTransformationUniform>(), 32);
    }

    #[test]
    fn defaults_are_identity_and_white() {
        assert_eq!(TransformationProjectionUniform2D::default().matrix(), Mat3::IDENTITY);
        assert_eq!(TransformationProjectionUniform3D::default().matrix(), Mat4::IDENTITY);
        assert_eq!(TextureTransformationUniform::default().texture_matrix(), Mat3::IDENTITY);

        let draw = FlatDrawUniform::default();
        assert_eq!(draw.color, [1.0; 4]);
        assert_eq!(draw.object_id, 0);
        assert_eq!(draw.alpha_mask, 0.5);
    }

    #[test]
    fn texture_matrix_keeps_affine_part() {
        let matrix = Mat3::from_scale(Vec2::splat(0.5)) * Mat3::from_translation(Vec2::new(1.0, 0.0));
        let block = TextureTransformationUniform::default().with_texture_matrix(matrix);
        assert_eq!(block.offset, [0.5, 0.0]);
        assert_eq!(block.texture_matrix(), matrix);
    }

    #[test]
    fn stride_respects_offset_alignment() {
        assert_eq!(uniform_stride::<FlatDrawUniform>(256), 256);
        assert_eq!(uniform_stride::<TransformationProjectionUniform2D>(16), 48);
        assert_eq!(uniform_stride::<TransformationProjectionUniform3D>(0), 64);
    }

    #[test]
    fn strided_blocks_start_on_stride_boundaries() {
        let blocks = [
            FlatDrawUniform::default().with_object_id(1211),
            FlatDrawUniform::default().with_object_id(5627),
        ];
        let bytes = write_strided(&blocks, 256);
        assert_eq!(bytes.len(), 512);
        let second: FlatDrawUniform = bytemuck::pod_read_unaligned(&bytes[256..288]);
        assert_eq!(second.object_id, 5627);
        assert!(bytes[32..256].iter().all(|&b| b == 0));
    }
}
