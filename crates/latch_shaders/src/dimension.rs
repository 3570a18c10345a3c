//! Dimension selection for shader variants.
//!
//! The 2D and 3D variants share validation, uniform handling and dispatch.
//! They differ only in the transformation matrix and the uniform block that
//! carries it.

use crate::uniforms::{TransformationProjectionUniform2D, TransformationProjectionUniform3D};
use bytemuck::Pod;
use glam::{Mat3, Mat4};
use std::fmt::Debug;

pub trait Dimension: Copy + Debug + Default + 'static {
    /// 2 or 3.
    const DIMENSIONS: u32;

    /// Transformation-projection matrix type (3×3 in 2D, 4×4 in 3D).
    type Matrix: Copy + Debug + PartialEq;

    /// Uniform block holding one transformation-projection matrix.
    type TransformationProjection: Pod + Default + Debug + PartialEq;

    fn transformation_projection(matrix: Self::Matrix) -> Self::TransformationProjection;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dim2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dim3;

impl Dimension for Dim2 {
    const DIMENSIONS: u32 = 2;
    type Matrix = Mat3;
    type TransformationProjection = TransformationProjectionUniform2D;

    #[inline]
    fn transformation_projection(matrix: Mat3) -> TransformationProjectionUniform2D {
        TransformationProjectionUniform2D::default().with_transformation_projection_matrix(matrix)
    }
}

impl Dimension for Dim3 {
    const DIMENSIONS: u32 = 3;
    type Matrix = Mat4;
    type TransformationProjection = TransformationProjectionUniform3D;

    #[inline]
    fn transformation_projection(matrix: Mat4) -> TransformationProjectionUniform3D {
        TransformationProjectionUniform3D::default().with_transformation_projection_matrix(matrix)
    }
}
