//! GPU device seam.
//!
//! Program compilation, buffer and texture storage, mesh compilation and
//! command submission live behind [`GpuDevice`]. Methods take `&self`: a
//! device is a handle to a single-threaded context whose binding state is
//! shared by every shader using it.

use crate::error::GpuError;
use crate::flags::FlatFlags;
use crate::mesh::MeshView;
use crate::uniforms::{
    FlatDrawUniform, TextureTransformationUniform, TransformationProjectionUniform2D,
    TransformationProjectionUniform3D,
};
use latch_render::CapabilityProbe;
use std::mem;
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(NonZeroU32);

impl ProgramId {
    #[inline]
    pub fn new(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

impl BufferId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

impl TextureId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Externally owned buffer usable as uniform storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBuffer {
    id: BufferId,
    size: u64,
}

impl UniformBuffer {
    pub fn new(id: BufferId, size: u64) -> Self {
        Self { id, size }
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Range covering the whole buffer.
    #[inline]
    pub fn whole(&self) -> BufferRange {
        self.range(0, self.size)
    }

    #[inline]
    pub fn range(&self, offset: u64, size: u64) -> BufferRange {
        BufferRange {
            buffer: self.id,
            offset,
            size,
        }
    }
}

/// Byte sub-range of a buffer bound to a uniform channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRange {
    pub buffer: BufferId,
    pub offset: u64,
    pub size: u64,
}

/// Externally owned 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(id: TextureId, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Logical uniform buffer channels of the flat shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformChannel {
    TransformationProjection,
    Draw,
    TextureTransformation,
}

impl UniformChannel {
    pub const ALL: [UniformChannel; 3] = [
        UniformChannel::TransformationProjection,
        UniformChannel::Draw,
        UniformChannel::TextureTransformation,
    ];

    /// Uniform block binding point.
    #[inline]
    pub const fn binding(self) -> u32 {
        match self {
            UniformChannel::TransformationProjection => 0,
            UniformChannel::Draw => 2,
            UniformChannel::TextureTransformation => 3,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            UniformChannel::TransformationProjection => 0,
            UniformChannel::Draw => 1,
            UniformChannel::TextureTransformation => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            UniformChannel::TransformationProjection => "transformation projection",
            UniformChannel::Draw => "draw",
            UniformChannel::TextureTransformation => "texture transformation",
        }
    }
}

/// Everything a device needs to build one program variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramDesc {
    pub dimensions: u32,
    pub flags: FlatFlags,
    pub draw_count: u32,
}

impl ProgramDesc {
    /// Size of one block on `channel`, in bytes.
    pub fn block_size(&self, channel: UniformChannel) -> u64 {
        let size = match channel {
            UniformChannel::TransformationProjection if self.dimensions == 2 => {
                mem::size_of::<TransformationProjectionUniform2D>()
            }
            UniformChannel::TransformationProjection => {
                mem::size_of::<TransformationProjectionUniform3D>()
            }
            UniformChannel::Draw => mem::size_of::<FlatDrawUniform>(),
            UniformChannel::TextureTransformation => mem::size_of::<TextureTransformationUniform>(),
        };
        size as u64
    }

    /// Channels the program reads.
    pub fn channels(&self) -> impl Iterator<Item = UniformChannel> + '_ {
        UniformChannel::ALL.into_iter().filter(|channel| {
            *channel != UniformChannel::TextureTransformation
                || self.flags.contains(FlatFlags::TEXTURE_TRANSFORMATION)
        })
    }

    /// Largest uniform block array the program declares, in bytes.
    pub fn uniform_block_bytes(&self) -> u64 {
        if !self.flags.uses_uniform_buffers() {
            return 0;
        }
        self.channels()
            .map(|channel| self.block_size(channel) * self.draw_count as u64)
            .max()
            .unwrap_or(0)
    }
}

/// Uniform values staged through immediate setters.
#[derive(Debug, Clone, Copy)]
pub struct UniformUpload<'a> {
    /// Raw transformation-projection block of the program's dimension.
    pub transformation_projection: &'a [u8],
    pub draw: FlatDrawUniform,
    pub texture_transformation: TextureTransformationUniform,
}

/// A single draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub view: MeshView,
    /// Uniform slot read in buffer mode, ignored in immediate mode.
    pub draw_offset: u32,
}

/// A batched draw: view `i` reads uniform slot `draw_offset + i`.
#[derive(Debug, Clone, Copy)]
pub struct MultiDrawCommand<'a> {
    pub views: &'a [MeshView],
    pub draw_offset: u32,
}

pub trait GpuDevice: CapabilityProbe {
    fn create_program(&self, desc: &ProgramDesc) -> Result<ProgramId, GpuError>;

    fn destroy_program(&self, program: ProgramId);

    fn upload_uniforms(&self, program: ProgramId, uniforms: &UniformUpload<'_>)
        -> Result<(), GpuError>;

    fn bind_uniform_buffer(&self, channel: UniformChannel, range: BufferRange)
        -> Result<(), GpuError>;

    fn bind_texture(&self, unit: u32, texture: TextureId) -> Result<(), GpuError>;

    fn draw(&self, program: ProgramId, command: &DrawCommand) -> Result<(), GpuError>;

    fn multi_draw(&self, program: ProgramId, command: &MultiDrawCommand<'_>)
        -> Result<(), GpuError>;
}
