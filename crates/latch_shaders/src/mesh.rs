//! Mesh handles and views.
//!
//! Meshes are compiled by the device; the shader only needs a handle plus
//! the index range and instance count of what it draws.

use glam::{Mat3, Mat4, Vec2, Vec4};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u32);

impl MeshId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A compiled mesh living on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    id: MeshId,
    index_count: u32,
    instance_count: u32,
}

impl Mesh {
    pub fn new(id: MeshId, index_count: u32, instance_count: u32) -> Self {
        Self {
            id,
            index_count,
            instance_count: instance_count.max(1),
        }
    }

    #[inline]
    pub fn id(&self) -> MeshId {
        self.id
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// View over the whole mesh.
    pub fn view(&self) -> MeshView {
        MeshView {
            mesh: self.id,
            count: self.index_count,
            index_offset: 0,
            instance_count: self.instance_count,
        }
    }

    /// View over `count` indices starting at `index_offset`.
    pub fn sub_view(&self, index_offset: u32, count: u32) -> MeshView {
        MeshView {
            index_offset,
            count,
            ..self.view()
        }
    }
}

impl From<&Mesh> for MeshView {
    fn from(mesh: &Mesh) -> Self {
        mesh.view()
    }
}

/// Index sub-range of a compiled mesh. Several views may share one mesh so
/// that heterogeneous geometry can be submitted in a single multi-draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshView {
    pub mesh: MeshId,
    pub count: u32,
    pub index_offset: u32,
    pub instance_count: u32,
}

/// Per-instance vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData {
    pub transformation: Mat4,
    pub color: Vec4,
    pub texture_offset: Vec2,
    pub object_id: u32,
}

impl InstanceData {
    /// Instance with a 2D transformation embedded into the XY plane.
    pub fn from_transformation_2d(matrix: Mat3) -> Self {
        let transformation = Mat4::from_cols(
            matrix.x_axis.truncate().extend(0.0).extend(0.0),
            matrix.y_axis.truncate().extend(0.0).extend(0.0),
            Vec4::Z,
            matrix.z_axis.truncate().extend(0.0).extend(1.0),
        );
        Self {
            transformation,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture_offset(mut self, offset: Vec2) -> Self {
        self.texture_offset = offset;
        self
    }

    pub fn with_object_id(mut self, id: u32) -> Self {
        self.object_id = id;
        self
    }
}

impl Default for InstanceData {
    fn default() -> Self {
        Self {
            transformation: Mat4::IDENTITY,
            color: Vec4::ONE,
            texture_offset: Vec2::ZERO,
            object_id: 0,
        }
    }
}

/// CPU-side indexed triangle geometry handed to a device for compilation.
///
/// Optional attributes are empty when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub texture_coordinates: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    pub instances: Vec<InstanceData>,
}

impl MeshData {
    /// Filled unit circle in the XY plane, as an indexed triangle fan.
    pub fn circle_2d(segments: u32) -> Self {
        let segments = segments.max(3);
        let mut positions = vec![[0.0, 0.0, 0.0]];
        for i in 0..segments {
            let angle = TAU * i as f32 / segments as f32;
            positions.push([angle.cos(), angle.sin(), 0.0]);
        }

        let mut indices = Vec::with_capacity(segments as usize * 3);
        for i in 1..=segments {
            let next = if i == segments { 1 } else { i + 1 };
            indices.extend_from_slice(&[0, i, next]);
        }

        Self::with_planar_texture_coordinates(positions, indices)
    }

    /// Axis-aligned square spanning [-1, 1] in the XY plane.
    pub fn square() -> Self {
        let positions = vec![
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ];
        Self::with_planar_texture_coordinates(positions, vec![0, 1, 2, 0, 2, 3])
    }

    fn with_planar_texture_coordinates(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let texture_coordinates = positions
            .iter()
            .map(|p| [p[0] * 0.5 + 0.5, p[1] * 0.5 + 0.5])
            .collect();
        Self {
            positions,
            texture_coordinates,
            indices,
            ..Self::default()
        }
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_instances(mut self, instances: Vec<InstanceData>) -> Self {
        self.instances = instances;
        self
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Joins several meshes into one vertex/index buffer. Attributes missing
    /// from any part are dropped; instance data is not carried over.
    pub fn concatenate(parts: &[MeshData]) -> Self {
        let keep_uvs = parts.iter().all(|p| p.texture_coordinates.len() == p.positions.len());
        let keep_colors = parts.iter().all(|p| p.colors.len() == p.positions.len());

        let mut out = MeshData::default();
        for part in parts {
            let base = out.positions.len() as u32;
            out.positions.extend_from_slice(&part.positions);
            if keep_uvs {
                out.texture_coordinates
                    .extend_from_slice(&part.texture_coordinates);
            }
            if keep_colors {
                out.colors.extend_from_slice(&part.colors);
            }
            out.indices.extend(part.indices.iter().map(|i| i + base));
        }
        out
    }
}
