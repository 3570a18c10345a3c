//! Three-object scene: a circle, a square and a triangle, each with its own
//! transformation, color and object ID.

use anyhow::Result;
use latch_shaders::glam::{Mat3, Vec2, Vec4};
use latch_shaders::{
    FlatDrawUniform, FlatFlags, FlatShader2D, MeshData, MeshView, ShaderError, SoftwareDevice,
    TransformationProjectionUniform2D,
};
use std::fmt;

pub const OBJECT_IDS: [u32; 3] = [1211, 5627, 36363];

/// (row, col) probes into the object ID attachment.
pub const PROBES: [(u32, u32); 4] = [(5, 5), (24, 24), (24, 56), (56, 40)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Immediate setters before every draw.
    Immediate,
    /// One uniform buffer slot per object, selected with a draw offset.
    DrawOffset,
    /// All three objects in one multi-draw.
    MultiDraw,
}

impl DrawMode {
    pub const ALL: [DrawMode; 3] = [DrawMode::Immediate, DrawMode::DrawOffset, DrawMode::MultiDraw];

    fn flags(self) -> FlatFlags {
        match self {
            DrawMode::Immediate => FlatFlags::OBJECT_ID,
            DrawMode::DrawOffset => FlatFlags::UNIFORM_BUFFERS | FlatFlags::OBJECT_ID,
            DrawMode::MultiDraw => FlatFlags::MULTI_DRAW | FlatFlags::OBJECT_ID,
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawMode::Immediate => "immediate",
            DrawMode::DrawOffset => "draw offset",
            DrawMode::MultiDraw => "multi-draw",
        };
        f.write_str(name)
    }
}

fn transformations() -> [Mat3; 3] {
    let projection = Mat3::from_scale(Vec2::splat(2.0 / 2.1));
    [
        Vec2::new(-1.25, -1.25),
        Vec2::new(1.25, -1.25),
        Vec2::new(0.0, 1.25),
    ]
    .map(|offset| projection * Mat3::from_scale(Vec2::splat(0.4)) * Mat3::from_translation(offset))
}

fn draw_blocks() -> [FlatDrawUniform; 3] {
    let colors = [Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 1.0, 1.0), Vec4::new(1.0, 0.0, 0.0, 1.0)];
    [0, 1, 2].map(|i| {
        FlatDrawUniform::default()
            .with_color(colors[i])
            .with_object_id(OBJECT_IDS[i])
    })
}

fn views(device: &SoftwareDevice) -> Result<[MeshView; 3]> {
    let parts = [
        MeshData::circle_2d(32),
        MeshData::square(),
        MeshData::circle_2d(3),
    ];
    let counts: Vec<u32> = parts.iter().map(MeshData::index_count).collect();
    let mesh = device.create_mesh(MeshData::concatenate(&parts))?;
    Ok([
        mesh.sub_view(0, counts[0]),
        mesh.sub_view(counts[0], counts[1]),
        mesh.sub_view(counts[0] + counts[1], counts[2]),
    ])
}

/// Renders the scene in `mode`. Returns `Ok(None)` when the device lacks a
/// capability the mode needs.
pub fn render(device: &SoftwareDevice, mode: DrawMode) -> Result<Option<Vec<u32>>> {
    device.clear();
    let views = views(device)?;
    let draw_count = if mode == DrawMode::Immediate { 1 } else { 3 };

    let mut shader = match FlatShader2D::with_draw_count(device.clone(), mode.flags(), draw_count) {
        Ok(shader) => shader,
        Err(err @ ShaderError::Unsupported { .. }) => {
            tracing::warn!(%mode, "skipped: {err}");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    match mode {
        DrawMode::Immediate => {
            for ((view, matrix), block) in views.iter().zip(transformations()).zip(draw_blocks()) {
                shader
                    .set_transformation_projection_matrix(matrix)?
                    .set_color(Vec4::from(block.color))?
                    .set_object_id(block.object_id)?
                    .draw(*view)?;
            }
        }
        DrawMode::DrawOffset | DrawMode::MultiDraw => {
            let tp_blocks = transformations().map(|matrix| {
                TransformationProjectionUniform2D::default().with_transformation_projection_matrix(matrix)
            });
            let tp_buffer = device.create_uniform_buffer_from(&tp_blocks);
            let draw_buffer = device.create_uniform_buffer_from(&draw_blocks());
            shader
                .bind_transformation_projection_buffer(&tp_buffer)?
                .bind_draw_buffer(&draw_buffer)?;

            if mode == DrawMode::MultiDraw {
                shader.draw_many(&views)?;
            } else {
                for (i, view) in views.iter().enumerate() {
                    shader.set_draw_offset(i as u32)?.draw(*view)?;
                }
            }
        }
    }

    Ok(Some(
        PROBES
            .iter()
            .map(|&(row, col)| device.object_id_at(row, col).unwrap_or_default())
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use latch_shaders::{BackendTier, SoftwareConfig};

    #[test]
    fn every_mode_reads_back_the_same_ids() {
        let device = SoftwareDevice::default();
        for mode in DrawMode::ALL {
            let ids = render(&device, mode).unwrap().unwrap();
            assert_eq!(ids, [27, 1211, 5627, 36363], "{mode}");
        }
    }

    #[test]
    fn unsupported_modes_are_skipped() {
        let device = SoftwareDevice::emulating(BackendTier::Gles3, SoftwareConfig::default()).unwrap();
        assert!(render(&device, DrawMode::MultiDraw).unwrap().is_none());
        assert!(render(&device, DrawMode::DrawOffset).unwrap().is_some());
    }
}
