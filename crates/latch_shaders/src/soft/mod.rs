//! Software reference device.
//!
//! Implements [`GpuDevice`] on the CPU so shader variants can be rendered
//! and read back without a GPU. Handles are cheap clones sharing one
//! context, like a GL context shared by every shader created on it.

mod config;
mod raster;

pub use config::{SoftwareConfig, MAX_FRAMEBUFFER_SIZE};

use crate::device::{
    BufferId, BufferRange, DrawCommand, GpuDevice, MultiDrawCommand, ProgramDesc, ProgramId,
    Texture, TextureId, UniformBuffer, UniformChannel, UniformUpload,
};
use crate::error::GpuError;
use crate::flags::FlatFlags;
use crate::mesh::{Mesh, MeshData, MeshId, MeshView};
use crate::uniforms::{
    FlatDrawUniform, TextureTransformationUniform, TransformationProjectionUniform2D,
    TransformationProjectionUniform3D,
};
use bytemuck::Pod;
use glam::{Mat3, Vec4};
use latch_render::{probe_capabilities, BackendTier, Capability, CapabilityProbe, DeviceCapabilities};
use raster::{Framebuffer, Image, Projection, ResolvedDraw};
use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::num::NonZeroU32;
use std::rc::Rc;

/// A command the device executed, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedCommand {
    Draw {
        program: ProgramId,
        mesh: MeshId,
        draw_offset: u32,
    },
    MultiDraw {
        program: ProgramId,
        draws: u32,
        draw_offset: u32,
    },
}

struct Program {
    desc: ProgramDesc,
    immediate: Option<ImmediateBlocks>,
}

#[derive(Clone, Copy)]
struct ImmediateBlocks {
    projection: Projection,
    draw: FlatDrawUniform,
    texture_transformation: TextureTransformationUniform,
}

struct State {
    config: SoftwareConfig,
    capabilities: DeviceCapabilities,
    disabled: Vec<Capability>,
    next_handle: NonZeroU32,
    programs: HashMap<ProgramId, Program>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, Image>,
    meshes: HashMap<MeshId, MeshData>,
    bindings: [Option<BufferRange>; 3],
    texture: Option<TextureId>,
    framebuffer: Framebuffer,
    commands: Vec<RecordedCommand>,
}

impl State {
    fn allocate(&mut self) -> NonZeroU32 {
        let handle = self.next_handle;
        self.next_handle = handle.saturating_add(1);
        handle
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.disabled
            .iter()
            .fold(self.capabilities.clone(), |caps, capability| caps.without(*capability))
    }

    fn program(&self, id: ProgramId) -> Result<&Program, GpuError> {
        self.programs.get(&id).ok_or(GpuError::UnknownHandle {
            kind: "program",
            id: id.raw(),
        })
    }

    /// Bytes of uniform slot `index` on `channel`.
    fn slot(&self, desc: &ProgramDesc, channel: UniformChannel, index: u32) -> Result<&[u8], GpuError> {
        let range = self.bindings[channel.index()].ok_or(GpuError::UnknownHandle {
            kind: "uniform binding",
            id: channel.binding(),
        })?;
        let size = desc.block_size(channel);
        let start = index as u64 * size;
        if start + size > range.size {
            return Err(GpuError::RangeOutOfBounds {
                offset: start,
                size,
                buffer_size: range.size,
            });
        }
        let buffer = self.buffers.get(&range.buffer).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: range.buffer.raw(),
        })?;
        let begin = range.offset.checked_add(start);
        let end = begin.and_then(|begin| begin.checked_add(size));
        begin
            .zip(end)
            .and_then(|(begin, end)| buffer.get(begin as usize..end as usize))
            .ok_or(GpuError::RangeOutOfBounds {
                offset: range.offset.saturating_add(start),
                size,
                buffer_size: buffer.len() as u64,
            })
    }

    fn resolve(&self, program: ProgramId, draw_index: u32) -> Result<ResolvedDraw, GpuError> {
        let desc = self.program(program)?.desc;
        let flags = desc.flags;

        let blocks = if flags.uses_uniform_buffers() {
            let texture_transformation = if flags.contains(FlatFlags::TEXTURE_TRANSFORMATION) {
                decode(self.slot(&desc, UniformChannel::TextureTransformation, draw_index)?)?
            } else {
                TextureTransformationUniform::default()
            };
            ImmediateBlocks {
                projection: decode_projection(
                    desc.dimensions,
                    self.slot(&desc, UniformChannel::TransformationProjection, draw_index)?,
                )?,
                draw: decode(self.slot(&desc, UniformChannel::Draw, draw_index)?)?,
                texture_transformation,
            }
        } else {
            match self.program(program)?.immediate {
                Some(blocks) => blocks,
                None => default_blocks(desc.dimensions),
            }
        };

        Ok(ResolvedDraw {
            flags,
            projection: blocks.projection,
            uniforms: blocks.draw,
            texture_matrix: if flags.contains(FlatFlags::TEXTURE_TRANSFORMATION) {
                blocks.texture_transformation.texture_matrix()
            } else {
                Mat3::IDENTITY
            },
        })
    }

    fn render(&mut self, program: ProgramId, view: &MeshView, draw_index: u32) -> Result<(), GpuError> {
        let draw = self.resolve(program, draw_index)?;
        let State {
            meshes,
            textures,
            texture,
            framebuffer,
            ..
        } = self;
        let mesh = meshes.get(&view.mesh).ok_or(GpuError::UnknownHandle {
            kind: "mesh",
            id: view.mesh.raw(),
        })?;
        let end = view.index_offset as u64 + view.count as u64;
        if end > mesh.indices.len() as u64 {
            return Err(GpuError::RangeOutOfBounds {
                offset: view.index_offset as u64,
                size: view.count as u64,
                buffer_size: mesh.indices.len() as u64,
            });
        }
        let image = texture.and_then(|id| textures.get(&id));
        framebuffer.draw(mesh, view, &draw, image);
        Ok(())
    }
}

fn decode<T: Pod>(bytes: &[u8]) -> Result<T, GpuError> {
    if bytes.len() != mem::size_of::<T>() {
        return Err(GpuError::RangeOutOfBounds {
            offset: 0,
            size: mem::size_of::<T>() as u64,
            buffer_size: bytes.len() as u64,
        });
    }
    Ok(bytemuck::pod_read_unaligned(bytes))
}

fn decode_projection(dimensions: u32, bytes: &[u8]) -> Result<Projection, GpuError> {
    Ok(if dimensions == 2 {
        Projection::Planar(decode::<TransformationProjectionUniform2D>(bytes)?.matrix())
    } else {
        Projection::Spatial(decode::<TransformationProjectionUniform3D>(bytes)?.matrix())
    })
}

fn default_blocks(dimensions: u32) -> ImmediateBlocks {
    let projection = if dimensions == 2 {
        Projection::Planar(Mat3::IDENTITY)
    } else {
        Projection::Spatial(glam::Mat4::IDENTITY)
    };
    ImmediateBlocks {
        projection,
        draw: FlatDrawUniform::default(),
        texture_transformation: TextureTransformationUniform::default(),
    }
}

fn software_capabilities(config: &SoftwareConfig) -> DeviceCapabilities {
    let mut capabilities = BackendTier::Software.capabilities();
    capabilities.min_uniform_offset_alignment = config.min_uniform_offset_alignment;
    capabilities.max_uniform_block_size = config.max_uniform_block_size;
    capabilities
}

/// CPU implementation of [`GpuDevice`] with an RGBA color attachment and an
/// object ID attachment.
#[derive(Clone)]
pub struct SoftwareDevice {
    state: Rc<RefCell<State>>,
}

impl SoftwareDevice {
    /// Device reporting every capability, limited by `config`.
    pub fn new(config: SoftwareConfig) -> Result<Self, GpuError> {
        let capabilities = software_capabilities(&config);
        Self::with_capabilities(config, capabilities)
    }

    /// Device reporting the capabilities and limits of `tier`.
    pub fn emulating(tier: BackendTier, config: SoftwareConfig) -> Result<Self, GpuError> {
        Self::with_capabilities(config, probe_capabilities(tier))
    }

    /// Fails with [`GpuError::InvalidFramebuffer`] when the configured
    /// framebuffer is empty or too large.
    pub fn with_capabilities(
        config: SoftwareConfig,
        capabilities: DeviceCapabilities,
    ) -> Result<Self, GpuError> {
        if let Err(err) = config.validate() {
            tracing::error!("cannot create software device: {err}");
            return Err(err);
        }
        Ok(Self::assemble(config, capabilities))
    }

    fn assemble(config: SoftwareConfig, capabilities: DeviceCapabilities) -> Self {
        let mut framebuffer = Framebuffer::new(config.width, config.height);
        framebuffer.clear(Vec4::from(config.clear_color), config.clear_object_id);
        tracing::debug!(
            width = config.width,
            height = config.height,
            backend = ?capabilities.backend,
            "created software device"
        );
        let state = State {
            disabled: config.disabled.clone(),
            config,
            capabilities,
            next_handle: NonZeroU32::MIN,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            meshes: HashMap::new(),
            bindings: [None; 3],
            texture: None,
            framebuffer,
            commands: Vec::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Stops reporting `capability` from now on.
    pub fn disable(&self, capability: Capability) {
        let mut state = self.state.borrow_mut();
        if !state.disabled.contains(&capability) {
            tracing::info!(%capability, "software device capability disabled");
            state.disabled.push(capability);
        }
    }

    pub fn config(&self) -> SoftwareConfig {
        self.state.borrow().config.clone()
    }

    pub fn create_uniform_buffer(&self, bytes: &[u8]) -> UniformBuffer {
        let mut state = self.state.borrow_mut();
        let id = BufferId::new(state.allocate().get());
        state.buffers.insert(id, bytes.to_vec());
        UniformBuffer::new(id, bytes.len() as u64)
    }

    /// Buffer holding `blocks` tightly packed.
    pub fn create_uniform_buffer_from<T: Pod>(&self, blocks: &[T]) -> UniformBuffer {
        self.create_uniform_buffer(bytemuck::cast_slice(blocks))
    }

    /// Uploads an RGBA8 image, rows bottom-up.
    pub fn create_texture(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Texture, GpuError> {
        let expected = width as u64 * height as u64 * 4;
        if width == 0 || height == 0 || rgba.len() as u64 != expected {
            return Err(GpuError::RangeOutOfBounds {
                offset: 0,
                size: expected,
                buffer_size: rgba.len() as u64,
            });
        }
        let texels = rgba
            .chunks_exact(4)
            .map(|t| [t[0], t[1], t[2], t[3]])
            .collect();
        let mut state = self.state.borrow_mut();
        let id = TextureId::new(state.allocate().get());
        state.textures.insert(id, Image::new(width, height, texels));
        Ok(Texture::new(id, width, height))
    }

    /// Compiles `data`. Every index must reference an existing vertex and
    /// per-vertex attributes must be absent or complete.
    pub fn create_mesh(&self, data: MeshData) -> Result<Mesh, GpuError> {
        let vertices = data.positions.len() as u64;
        if let Some(&bad) = data.indices.iter().find(|&&i| i as u64 >= vertices) {
            return Err(GpuError::RangeOutOfBounds {
                offset: bad as u64,
                size: 1,
                buffer_size: vertices,
            });
        }
        for len in [data.texture_coordinates.len(), data.colors.len()] {
            if len != 0 && len as u64 != vertices {
                return Err(GpuError::RangeOutOfBounds {
                    offset: 0,
                    size: len as u64,
                    buffer_size: vertices,
                });
            }
        }

        let mut state = self.state.borrow_mut();
        let id = MeshId::new(state.allocate().get());
        let mesh = Mesh::new(id, data.index_count(), data.instances.len() as u32);
        state.meshes.insert(id, data);
        Ok(mesh)
    }

    /// Resets both attachments to the configured clear values.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        let color = Vec4::from(state.config.clear_color);
        let object_id = state.config.clear_object_id;
        state.framebuffer.clear(color, object_id);
    }

    /// Row 0 is the bottom row.
    pub fn color_at(&self, row: u32, col: u32) -> Option<[u8; 4]> {
        self.state.borrow().framebuffer.color_at(row, col)
    }

    pub fn object_id_at(&self, row: u32, col: u32) -> Option<u32> {
        self.state.borrow().framebuffer.object_id_at(row, col)
    }

    /// Color attachment as RGBA8, bottom row first.
    pub fn read_color(&self) -> Vec<[u8; 4]> {
        self.state.borrow().framebuffer.colors()
    }

    /// Object ID attachment, bottom row first.
    pub fn read_object_ids(&self) -> Vec<u32> {
        self.state.borrow().framebuffer.object_ids().to_vec()
    }

    /// Drains the command log.
    pub fn take_commands(&self) -> Vec<RecordedCommand> {
        mem::take(&mut self.state.borrow_mut().commands)
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }
}

impl Default for SoftwareDevice {
    /// 80x80 device with every capability.
    fn default() -> Self {
        let config = SoftwareConfig::default();
        let capabilities = software_capabilities(&config);
        Self::assemble(config, capabilities)
    }
}

impl std::fmt::Debug for SoftwareDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SoftwareDevice")
            .field("width", &state.config.width)
            .field("height", &state.config.height)
            .field("programs", &state.programs.len())
            .finish_non_exhaustive()
    }
}

impl CapabilityProbe for SoftwareDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.state.borrow().capabilities()
    }
}

impl GpuDevice for SoftwareDevice {
    fn create_program(&self, desc: &ProgramDesc) -> Result<ProgramId, GpuError> {
        let mut state = self.state.borrow_mut();
        let capabilities = state.capabilities();
        if desc.flags.uses_uniform_buffers() && !capabilities.uniform_buffers {
            return Err(GpuError::Unsupported(Capability::UniformBuffers));
        }
        let required = desc.uniform_block_bytes();
        let limit = capabilities.max_uniform_block_size as u64;
        if required > limit {
            return Err(GpuError::ResourceExhausted { required, limit });
        }

        let id = ProgramId::new(state.allocate());
        state.programs.insert(
            id,
            Program {
                desc: *desc,
                immediate: None,
            },
        );
        tracing::debug!(program = id.raw(), flags = ?desc.flags, "software program linked");
        Ok(id)
    }

    fn destroy_program(&self, program: ProgramId) {
        if self.state.borrow_mut().programs.remove(&program).is_none() {
            tracing::warn!(program = program.raw(), "destroying unknown program");
        }
    }

    fn upload_uniforms(&self, program: ProgramId, uniforms: &UniformUpload<'_>) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        let dimensions = state.program(program)?.desc.dimensions;
        let blocks = ImmediateBlocks {
            projection: decode_projection(dimensions, uniforms.transformation_projection)?,
            draw: uniforms.draw,
            texture_transformation: uniforms.texture_transformation,
        };
        if let Some(entry) = state.programs.get_mut(&program) {
            entry.immediate = Some(blocks);
        }
        Ok(())
    }

    fn bind_uniform_buffer(&self, channel: UniformChannel, range: BufferRange) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        let capabilities = state.capabilities();
        if !capabilities.uniform_buffers {
            return Err(GpuError::Unsupported(Capability::UniformBuffers));
        }
        let buffer_size = state
            .buffers
            .get(&range.buffer)
            .ok_or(GpuError::UnknownHandle {
                kind: "buffer",
                id: range.buffer.raw(),
            })?
            .len() as u64;
        let alignment = capabilities.min_uniform_offset_alignment.max(1) as u64;
        if range.offset % alignment != 0 {
            return Err(GpuError::MisalignedOffset {
                offset: range.offset,
                alignment,
            });
        }
        if range
            .offset
            .checked_add(range.size)
            .map_or(true, |end| end > buffer_size)
        {
            return Err(GpuError::RangeOutOfBounds {
                offset: range.offset,
                size: range.size,
                buffer_size,
            });
        }
        state.bindings[channel.index()] = Some(range);
        Ok(())
    }

    fn bind_texture(&self, unit: u32, texture: TextureId) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        if unit != 0 {
            return Err(GpuError::UnknownHandle {
                kind: "texture unit",
                id: unit,
            });
        }
        if !state.textures.contains_key(&texture) {
            return Err(GpuError::UnknownHandle {
                kind: "texture",
                id: texture.raw(),
            });
        }
        state.texture = Some(texture);
        Ok(())
    }

    fn draw(&self, program: ProgramId, command: &DrawCommand) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        state.render(program, &command.view, command.draw_offset)?;
        state.commands.push(RecordedCommand::Draw {
            program,
            mesh: command.view.mesh,
            draw_offset: command.draw_offset,
        });
        Ok(())
    }

    fn multi_draw(&self, program: ProgramId, command: &MultiDrawCommand<'_>) -> Result<(), GpuError> {
        let mut state = self.state.borrow_mut();
        let batched = state.program(program)?.desc.flags.contains(FlatFlags::MULTI_DRAW);
        if !batched || !state.capabilities().multi_draw {
            return Err(GpuError::Unsupported(Capability::MultiDraw));
        }
        for (i, view) in command.views.iter().enumerate() {
            state.render(program, view, command.draw_offset + i as u32)?;
        }
        state.commands.push(RecordedCommand::MultiDraw {
            program,
            draws: command.views.len() as u32,
            draw_offset: command.draw_offset,
        });
        Ok(())
    }
}
