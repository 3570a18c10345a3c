//! Multi-draw dispatch.
//!
//! A list of mesh views is submitted either as one batched command, where
//! the hardware draw index selects the uniform slot, or as one draw per
//! view with the draw offset advanced in between. Both produce the same
//! image.

use crate::device::{GpuDevice, MultiDrawCommand};
use crate::dimension::Dimension;
use crate::error::{MisuseKind, ShaderError};
use crate::flags::FlatFlags;
use crate::mesh::MeshView;
use crate::shader::{misuse, FlatShader};
use latch_render::Capability;
use std::ops::Range;

/// How a view list reaches the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Nothing to draw.
    Empty,
    /// A single multi-draw; view `i` reads slot `draw_offset + i`.
    Batched { draw_offset: u32, draws: u32 },
    /// One draw per view, reading the slots in `draw_offsets` in order.
    Sequential { draw_offsets: Range<u32> },
}

/// Decides how `views` draws starting at `draw_offset` are submitted.
pub fn plan(
    views: usize,
    draw_offset: u32,
    draw_count: u32,
    hardware_multi_draw: bool,
) -> Result<Submission, MisuseKind> {
    if draw_offset as u64 + views as u64 > draw_count as u64 {
        return Err(MisuseKind::TooManyDraws {
            views,
            offset: draw_offset,
            draw_count,
        });
    }
    let draws = views as u32;
    Ok(match (draws, hardware_multi_draw) {
        (0, _) => Submission::Empty,
        (_, true) => Submission::Batched { draw_offset, draws },
        (_, false) => Submission::Sequential {
            draw_offsets: draw_offset..draw_offset + draws,
        },
    })
}

impl<D: Dimension, G: GpuDevice> FlatShader<D, G> {
    /// Draws every view in `views`, view `i` using uniform slot
    /// `draw_offset + i`. Requires [`FlatFlags::MULTI_DRAW`].
    ///
    /// Falls back to sequential draws when the device cannot batch; the
    /// draw offset is restored afterwards.
    pub fn draw_many(&mut self, views: &[MeshView]) -> Result<&mut Self, ShaderError> {
        const OPERATION: &str = "draw_many";

        if !self.flags().contains(FlatFlags::MULTI_DRAW) {
            return Err(misuse(OPERATION, MisuseKind::FeatureNotEnabled("multidraw")));
        }
        let program = self
            .id()
            .ok_or_else(|| misuse(OPERATION, MisuseKind::NoProgram))?;
        let base = self
            .draw_offset()
            .ok_or_else(|| misuse(OPERATION, MisuseKind::UniformBuffersNotEnabled))?;

        let hardware = self.device().supports(Capability::MultiDraw);
        let submission = plan(views.len(), base, self.draw_count(), hardware)
            .map_err(|kind| misuse(OPERATION, kind))?;

        match submission {
            Submission::Empty => {}
            Submission::Batched { draw_offset, draws } => {
                self.require_bindings(OPERATION)?;
                self.device().multi_draw(
                    program,
                    &MultiDrawCommand {
                        views,
                        draw_offset,
                    },
                )?;
                tracing::trace!(program = program.raw(), draws, draw_offset, "flat multi-draw");
            }
            Submission::Sequential { draw_offsets } => {
                tracing::debug!(
                    draws = views.len(),
                    "multi-draw unavailable, drawing sequentially"
                );
                let result = views
                    .iter()
                    .zip(draw_offsets)
                    .try_for_each(|(view, offset)| {
                        self.set_draw_offset(offset)?.draw(*view).map(|_| ())
                    });
                self.set_draw_offset(base)?;
                result?;
            }
        }
        Ok(self)
    }
}
