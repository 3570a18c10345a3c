//! Flat shader variants.
//!
//! A [`FlatShader`] owns exactly one compiled program on its device. The
//! uniform interface is chosen once at construction: immediate setters
//! (see `immediate`) or uniform buffer bindings with a draw offset (see
//! `buffers`). Calling into the other interface is rejected and logged.

mod buffers;
mod immediate;

use crate::device::{BufferRange, DrawCommand, GpuDevice, ProgramDesc, ProgramId, UniformChannel};
use crate::dimension::{Dim2, Dim3, Dimension};
use crate::error::{MisuseError, MisuseKind, ShaderError};
use crate::flags::FlatFlags;
use crate::mesh::MeshView;
use crate::uniforms::{FlatDrawUniform, TextureTransformationUniform};
use crate::validate::validate;

pub type FlatShader2D<G> = FlatShader<Dim2, G>;
pub type FlatShader3D<G> = FlatShader<Dim3, G>;

/// Where the uniforms of the next draw come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Nothing set or bound yet. Immediate-mode draws use the defaults.
    Unbound,
    /// At least one immediate setter has been called.
    ImmediateReady,
    /// Uniform buffers are attached.
    BufferBound,
}

pub(crate) struct ImmediateUniforms<D: Dimension> {
    transformation_projection: D::TransformationProjection,
    draw: FlatDrawUniform,
    texture_transformation: TextureTransformationUniform,
    touched: bool,
    dirty: bool,
}

impl<D: Dimension> Default for ImmediateUniforms<D> {
    fn default() -> Self {
        Self {
            transformation_projection: D::TransformationProjection::default(),
            draw: FlatDrawUniform::default(),
            texture_transformation: TextureTransformationUniform::default(),
            touched: false,
            dirty: true,
        }
    }
}

#[derive(Default)]
pub(crate) struct BufferBindings {
    draw_offset: u32,
    bound: [Option<BufferRange>; 3],
}

impl BufferBindings {
    fn is_empty(&self) -> bool {
        self.bound.iter().all(Option::is_none)
    }

    /// Every channel the variant reads must have a buffer attached.
    fn require_bound(&self, flags: FlatFlags) -> Result<(), MisuseKind> {
        for channel in UniformChannel::ALL {
            if channel == UniformChannel::TextureTransformation
                && !flags.contains(FlatFlags::TEXTURE_TRANSFORMATION)
            {
                continue;
            }
            if self.bound[channel.index()].is_none() {
                return Err(MisuseKind::BufferNotBound(channel.name()));
            }
        }
        Ok(())
    }
}

pub(crate) enum UniformState<D: Dimension> {
    Immediate(ImmediateUniforms<D>),
    Buffers(BufferBindings),
}

impl<D: Dimension> UniformState<D> {
    fn for_flags(flags: FlatFlags) -> Self {
        if flags.uses_uniform_buffers() {
            UniformState::Buffers(BufferBindings::default())
        } else {
            UniformState::Immediate(ImmediateUniforms::default())
        }
    }
}

/// Logs a misuse and turns it into an error.
pub(crate) fn misuse(operation: &'static str, kind: MisuseKind) -> ShaderError {
    let err = MisuseError { operation, kind };
    tracing::error!("{err}");
    err.into()
}

/// Flat (unlit) shader of dimension `D` on device `G`.
///
/// Not clonable. Moving out with [`FlatShader::take`] leaves an empty
/// shader behind; dropping a shader that owns a program destroys it.
pub struct FlatShader<D: Dimension, G: GpuDevice> {
    device: G,
    program: Option<ProgramId>,
    flags: FlatFlags,
    draw_count: u32,
    uniforms: UniformState<D>,
}

impl<D: Dimension, G: GpuDevice> FlatShader<D, G> {
    /// Creates a variant sized for a single draw.
    pub fn new(device: G, flags: FlatFlags) -> Result<Self, ShaderError> {
        Self::with_draw_count(device, flags, 1)
    }

    /// Creates a variant whose uniform buffers hold `draw_count` slots.
    ///
    /// Returns [`ShaderError::Unsupported`] when the device lacks a needed
    /// capability and [`ShaderError::Config`] for illegal flag combinations.
    /// `draw_count` is only meaningful with uniform buffers and is 1 otherwise.
    pub fn with_draw_count(device: G, flags: FlatFlags, draw_count: u32) -> Result<Self, ShaderError> {
        let capabilities = device.capabilities();
        if let Err(err) = validate::<D>(flags, draw_count, &capabilities).into_result() {
            if err.is_unsupported() {
                tracing::warn!(?flags, "skipping flat shader variant: {err}");
            } else {
                tracing::error!(?flags, draw_count, "invalid flat shader configuration: {err}");
            }
            return Err(err);
        }

        // Immediate variants always hold a single draw.
        let draw_count = if flags.uses_uniform_buffers() { draw_count } else { 1 };
        let desc = ProgramDesc {
            dimensions: D::DIMENSIONS,
            flags,
            draw_count,
        };
        let program = device.create_program(&desc)?;
        tracing::debug!(
            program = program.raw(),
            dimensions = D::DIMENSIONS,
            ?flags,
            draw_count,
            "created flat shader"
        );

        Ok(Self {
            device,
            program: Some(program),
            flags,
            draw_count,
            uniforms: UniformState::for_flags(flags),
        })
    }

    /// Creates an empty shader that owns no program. Drawing with it fails.
    pub fn no_create(device: G) -> Self {
        Self {
            device,
            program: None,
            flags: FlatFlags::empty(),
            draw_count: 1,
            uniforms: UniformState::Immediate(ImmediateUniforms::default()),
        }
    }

    #[inline]
    pub fn flags(&self) -> FlatFlags {
        self.flags
    }

    #[inline]
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    /// Program handle, `None` for an empty shader.
    #[inline]
    pub fn id(&self) -> Option<ProgramId> {
        self.program
    }

    #[inline]
    pub fn device(&self) -> &G {
        &self.device
    }

    pub fn state(&self) -> BindingState {
        match &self.uniforms {
            UniformState::Immediate(u) if u.touched => BindingState::ImmediateReady,
            UniformState::Buffers(b) if !b.is_empty() => BindingState::BufferBound,
            _ => BindingState::Unbound,
        }
    }

    /// Current draw offset, `None` for immediate-mode variants.
    pub fn draw_offset(&self) -> Option<u32> {
        match &self.uniforms {
            UniformState::Buffers(b) => Some(b.draw_offset),
            UniformState::Immediate(_) => None,
        }
    }

    fn program(&self, operation: &'static str) -> Result<ProgramId, ShaderError> {
        self.program.ok_or_else(|| misuse(operation, MisuseKind::NoProgram))
    }

    /// Checks that every channel the variant reads has a buffer attached.
    pub(crate) fn require_bindings(&self, operation: &'static str) -> Result<(), ShaderError> {
        match &self.uniforms {
            UniformState::Buffers(bindings) => bindings
                .require_bound(self.flags)
                .map_err(|kind| misuse(operation, kind)),
            UniformState::Immediate(_) => Ok(()),
        }
    }

    /// Draws `view` with the current uniforms.
    ///
    /// Immediate uniforms are uploaded first if they changed. In buffer mode
    /// the draw reads the slot selected by the draw offset.
    pub fn draw(&mut self, view: impl Into<MeshView>) -> Result<&mut Self, ShaderError> {
        let view = view.into();
        let program = self.program("draw")?;
        self.require_bindings("draw")?;

        let draw_offset = match &mut self.uniforms {
            UniformState::Immediate(uniforms) => {
                if uniforms.dirty {
                    self.device.upload_uniforms(program, &uniforms.upload())?;
                    uniforms.dirty = false;
                }
                0
            }
            UniformState::Buffers(bindings) => bindings.draw_offset,
        };

        self.device.draw(program, &DrawCommand { view, draw_offset })?;
        tracing::trace!(
            program = program.raw(),
            mesh = view.mesh.raw(),
            count = view.count,
            draw_offset,
            "flat draw"
        );
        Ok(self)
    }
}

impl<D: Dimension, G: GpuDevice + Clone> FlatShader<D, G> {
    /// Moves the program out, leaving an empty shader in its place.
    pub fn take(&mut self) -> Self {
        let empty = Self::no_create(self.device.clone());
        std::mem::replace(self, empty)
    }
}

impl<D: Dimension, G: GpuDevice> Drop for FlatShader<D, G> {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.device.destroy_program(program);
            tracing::debug!(program = program.raw(), "destroyed flat shader");
        }
    }
}

impl<D: Dimension, G: GpuDevice> std::fmt::Debug for FlatShader<D, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatShader")
            .field("dimensions", &D::DIMENSIONS)
            .field("program", &self.program)
            .field("flags", &self.flags)
            .field("draw_count", &self.draw_count)
            .field("state", &self.state())
            .finish()
    }
}
