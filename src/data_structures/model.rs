//! Renderable objects.
//!
//! A [`Model`] owns the GPU side of one catalog entry: its vertex and index
//! buffers, a material uniform, per-frame instance storage, bind groups and a
//! pipeline. Programs and textures are shared through `Rc` with the caches in
//! [`Aquarium`](crate::aquarium::Aquarium).
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --init--> Initialized --prepare--> Prepared --accumulate--> Accumulating
//!                                          ^                                   |
//!                                          +------ Drawn <------draw-----------+
//! any state --destroy--> Destroyed
//! ```
//!
//! Out-of-order calls return [`ModelError::InvalidState`]. `draw` is also valid
//! straight from `Prepared`, in which case nothing is submitted.

use std::{collections::HashMap, rc::Rc};

use crate::{
    backend::{
        BindGroupDesc, Binding, BufferContents, BufferDesc, BufferUsage, GraphicsBackend,
        PipelineDesc, VertexFormat, VertexLayout,
    },
    data_structures::{
        catalog::{BufferName, ModelGroup, ModelName, ProgramName, TextureSlot},
        instance::{FishInstanceRaw, InstanceData, InstanceRaw, MaterialUniform},
    },
    error::ModelError,
    frame::FrameSlot,
    render::{BoundGroup, DrawCall, DrawStrategy},
};

/// Per-frame instance capacity of every non-fish object.
pub const MAX_WORLD_INSTANCES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Generic,
    Fish,
    FishInstanced,
    Inner,
    Outside,
    Seaweed,
}

impl ModelKind {
    pub fn for_group(group: ModelGroup, instanced_fish: bool) -> Self {
        match group {
            ModelGroup::Generic => ModelKind::Generic,
            ModelGroup::Fish if instanced_fish => ModelKind::FishInstanced,
            ModelGroup::Fish => ModelKind::Fish,
            ModelGroup::Inner => ModelKind::Inner,
            ModelGroup::Seaweed => ModelKind::Seaweed,
            ModelGroup::Outside => ModelKind::Outside,
        }
    }

    pub fn is_fish(self) -> bool {
        matches!(self, ModelKind::Fish | ModelKind::FishInstanced)
    }

    /// Size in bytes of one instance payload.
    pub fn instance_size(self) -> usize {
        if self.is_fish() {
            std::mem::size_of::<FishInstanceRaw>()
        } else {
            std::mem::size_of::<InstanceRaw>()
        }
    }

    pub fn instance_layout(self) -> VertexLayout {
        if self.is_fish() {
            FishInstanceRaw::layout()
        } else {
            InstanceRaw::layout()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Initialized,
    Prepared,
    Accumulating,
    Drawn,
    Destroyed,
}

/// A per-vertex stream and the attribute format it holds.
pub struct VertexStream<B: GraphicsBackend> {
    pub buffer: B::Buffer,
    pub format: VertexFormat,
}

/// Everything [`Model::init`] needs from the loader.
pub struct ModelInputs<B: GraphicsBackend> {
    pub program_name: ProgramName,
    pub program: Rc<B::Program>,
    pub vertex_buffers: HashMap<BufferName, VertexStream<B>>,
    pub index_buffer: Option<B::Buffer>,
    pub index_count: u32,
    pub textures: HashMap<TextureSlot, Rc<B::Texture>>,
    pub material: MaterialUniform,
}

struct FrameInstances<B: GraphicsBackend> {
    buffer: B::Buffer,
    /// Empty on the instanced path, one group with a dynamic offset, or one
    /// group per instance slot.
    groups: Vec<B::BindGroup>,
}

struct GpuResources<B: GraphicsBackend> {
    pipeline: B::Pipeline,
    material_group: B::BindGroup,
    frames: Vec<FrameInstances<B>>,
    _material_buffer: B::Buffer,
    vertex_buffers: Vec<B::Buffer>,
    index_buffer: B::Buffer,
    index_count: u32,
    textures: Vec<Rc<B::Texture>>,
    program: Rc<B::Program>,
}

pub struct Model<B: GraphicsBackend> {
    name: ModelName,
    kind: ModelKind,
    blend: bool,
    strategy: DrawStrategy,
    capacity: usize,
    state: ModelState,
    /// Distance between instance slots of a per-instance uniform buffer.
    slot_stride: u64,
    frame_index: usize,
    count: usize,
    pending: Vec<u8>,
    resources: Option<GpuResources<B>>,
}

fn align_up(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

impl<B: GraphicsBackend> Model<B> {
    pub fn new(
        name: ModelName,
        kind: ModelKind,
        blend: bool,
        strategy: DrawStrategy,
        capacity: usize,
    ) -> Self {
        Self {
            name,
            kind,
            blend,
            strategy,
            capacity,
            state: ModelState::Uninitialized,
            slot_stride: kind.instance_size() as u64,
            frame_index: 0,
            count: 0,
            pending: Vec::with_capacity(capacity * kind.instance_size()),
            resources: None,
        }
    }

    pub fn name(&self) -> ModelName {
        self.name
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn strategy(&self) -> DrawStrategy {
        self.strategy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Instances accumulated since the last prepare.
    pub fn instance_count(&self) -> usize {
        self.count
    }

    fn invalid(&self, operation: &'static str) -> ModelError {
        ModelError::InvalidState {
            model: self.name,
            operation,
            state: self.state,
        }
    }

    /// Create the object's GPU resources. Fails if the program's buffers or
    /// textures are not all present in `inputs`.
    pub fn init(&mut self, backend: &mut B, mut inputs: ModelInputs<B>) -> Result<(), ModelError> {
        if self.state != ModelState::Uninitialized {
            return Err(self.invalid("init"));
        }
        let program_name = inputs.program_name;

        let mut vertex_buffers = Vec::new();
        let mut vertex_layouts = Vec::new();
        for &buffer_name in program_name.vertex_buffers() {
            let stream = inputs
                .vertex_buffers
                .remove(&buffer_name)
                .ok_or(ModelError::MissingBuffer {
                    model: self.name,
                    buffer: buffer_name.key(),
                })?;
            if let Some(location) = buffer_name.location() {
                vertex_layouts.push(VertexLayout::single(location, stream.format));
            }
            vertex_buffers.push(stream.buffer);
        }
        let index_buffer = inputs.index_buffer.take().ok_or(ModelError::MissingBuffer {
            model: self.name,
            buffer: BufferName::Indices.key(),
        })?;

        let mut textures = Vec::new();
        for &slot in program_name.textures() {
            let texture = inputs
                .textures
                .remove(&slot)
                .ok_or(ModelError::MissingTexture {
                    model: self.name,
                    texture: slot.key(),
                })?;
            textures.push(texture);
        }

        let material_buffer = backend.create_buffer(&BufferDesc {
            label: &format!("{} material", self.name),
            usage: BufferUsage::Uniform,
            contents: BufferContents::Init(bytemuck::bytes_of(&inputs.material)),
        })?;
        let material_group = {
            let mut entries: Vec<Binding<'_, B>> = vec![Binding::Uniform {
                buffer: &material_buffer,
                offset: 0,
                size: std::mem::size_of::<MaterialUniform>() as u64,
            }];
            entries.extend(textures.iter().map(|texture| Binding::Texture(&**texture)));
            backend.create_bind_group(&BindGroupDesc {
                label: &format!("{} material", self.name),
                entries: &entries,
            })?
        };

        let instance_size = self.kind.instance_size() as u64;
        let slots = self.capacity.max(1) as u64;
        let mut frames = Vec::with_capacity(backend.frames_in_flight());
        for frame in 0..backend.frames_in_flight() {
            let label = format!("{} instances [frame {}]", self.name, frame);
            let instances = match self.strategy {
                DrawStrategy::Instanced => FrameInstances {
                    buffer: backend.create_buffer(&BufferDesc {
                        label: &label,
                        usage: BufferUsage::Instance,
                        contents: BufferContents::Zeroed(instance_size * slots),
                    })?,
                    groups: Vec::new(),
                },
                DrawStrategy::PerInstance { dynamic_offset } => {
                    self.slot_stride = align_up(instance_size, backend.uniform_alignment());
                    let buffer = backend.create_buffer(&BufferDesc {
                        label: &label,
                        usage: BufferUsage::Uniform,
                        contents: BufferContents::Zeroed(self.slot_stride * slots),
                    })?;
                    let groups = if dynamic_offset {
                        vec![backend.create_bind_group(&BindGroupDesc {
                            label: &label,
                            entries: &[Binding::DynamicUniform {
                                buffer: &buffer,
                                size: instance_size,
                            }],
                        })?]
                    } else {
                        (0..slots)
                            .map(|slot| {
                                backend.create_bind_group(&BindGroupDesc {
                                    label: &label,
                                    entries: &[Binding::Uniform {
                                        buffer: &buffer,
                                        offset: slot * self.slot_stride,
                                        size: instance_size,
                                    }],
                                })
                            })
                            .collect::<Result<Vec<_>, _>>()?
                    };
                    FrameInstances { buffer, groups }
                }
            };
            frames.push(instances);
        }

        let instanced = self.strategy.is_instanced();
        if instanced {
            vertex_layouts.push(self.kind.instance_layout());
        }
        let pipeline = {
            let mut layout_groups = vec![&material_group];
            if let Some(group) = frames.first().and_then(|frame| frame.groups.first()) {
                layout_groups.push(group);
            }
            backend.create_pipeline(&PipelineDesc {
                label: &self.name.to_string(),
                program: &inputs.program,
                vertex_layouts: &vertex_layouts,
                bind_groups: &layout_groups,
                blend: self.blend,
                instanced,
            })?
        };

        log::debug!(
            "initialised {} ({:?}, {:?}, capacity {})",
            self.name,
            self.kind,
            self.strategy,
            self.capacity
        );
        self.resources = Some(GpuResources {
            pipeline,
            material_group,
            frames,
            _material_buffer: material_buffer,
            vertex_buffers,
            index_buffer,
            index_count: inputs.index_count,
            textures,
            program: inputs.program,
        });
        self.state = ModelState::Initialized;
        Ok(())
    }

    /// Select the instance storage of `slot` and reset the instance counter.
    pub fn prepare_for_frame(&mut self, slot: FrameSlot) -> Result<(), ModelError> {
        match (self.state, &self.resources) {
            (ModelState::Initialized | ModelState::Drawn, Some(resources)) => {
                self.frame_index = slot.index % resources.frames.len();
            }
            _ => return Err(self.invalid("prepare for frame")),
        }
        self.count = 0;
        self.pending.clear();
        self.state = ModelState::Prepared;
        Ok(())
    }

    /// Append one instance. Records no GPU commands.
    pub fn accumulate_instance(&mut self, data: InstanceData) -> Result<(), ModelError> {
        if !matches!(self.state, ModelState::Prepared | ModelState::Accumulating) {
            return Err(self.invalid("accumulate an instance"));
        }
        let shape_matches = match data {
            InstanceData::Fish(_) => self.kind.is_fish(),
            InstanceData::World(_) => !self.kind.is_fish(),
        };
        if !shape_matches {
            return Err(ModelError::PayloadMismatch { model: self.name });
        }
        if self.count >= self.capacity {
            return Err(ModelError::CapacityExceeded {
                model: self.name,
                capacity: self.capacity,
            });
        }
        self.pending.extend_from_slice(data.bytes());
        self.count += 1;
        self.state = ModelState::Accumulating;
        Ok(())
    }

    /// Submit the accumulated instances and reset the counter.
    pub fn draw(&mut self, backend: &mut B) -> Result<(), ModelError> {
        let resources = match (self.state, &self.resources) {
            (ModelState::Prepared | ModelState::Accumulating, Some(resources)) => resources,
            _ => return Err(self.invalid("draw")),
        };
        let frame = &resources.frames[self.frame_index];
        let material = BoundGroup::<B> {
            group: &resources.material_group,
            dynamic_offsets: &[],
        };
        let mut vertex_buffers: Vec<&B::Buffer> = resources.vertex_buffers.iter().collect();

        match self.strategy {
            DrawStrategy::Instanced if self.count > 0 => {
                backend.write_buffer(&frame.buffer, 0, &self.pending);
                vertex_buffers.push(&frame.buffer);
                backend.draw_indexed(&DrawCall {
                    pipeline: &resources.pipeline,
                    bind_groups: &[material],
                    vertex_buffers: &vertex_buffers,
                    index_buffer: &resources.index_buffer,
                    index_count: resources.index_count,
                    instances: 0..self.count as u32,
                });
            }
            DrawStrategy::Instanced => {}
            DrawStrategy::PerInstance { dynamic_offset } => {
                let size = self.kind.instance_size();
                for (index, instance) in self.pending.chunks_exact(size).enumerate() {
                    let offset = index as u64 * self.slot_stride;
                    backend.write_buffer(&frame.buffer, offset, instance);

                    let dynamic = [offset as u32];
                    let instance_group = if dynamic_offset {
                        BoundGroup::<B> {
                            group: &frame.groups[0],
                            dynamic_offsets: &dynamic,
                        }
                    } else {
                        BoundGroup::<B> {
                            group: &frame.groups[index],
                            dynamic_offsets: &[],
                        }
                    };
                    let groups = [
                        BoundGroup::<B> {
                            group: &resources.material_group,
                            dynamic_offsets: &[],
                        },
                        instance_group,
                    ];
                    backend.draw_indexed(&DrawCall {
                        pipeline: &resources.pipeline,
                        bind_groups: &groups,
                        vertex_buffers: &vertex_buffers,
                        index_buffer: &resources.index_buffer,
                        index_count: resources.index_count,
                        instances: 0..1,
                    });
                }
            }
        }

        self.count = 0;
        self.pending.clear();
        self.state = ModelState::Drawn;
        Ok(())
    }

    /// Release every GPU resource the object owns. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == ModelState::Destroyed {
            return;
        }
        if let Some(resources) = self.resources.take() {
            log::debug!(
                "destroying {} ({} vertex buffers, {} textures, program shared by {})",
                self.name,
                resources.vertex_buffers.len(),
                resources.textures.len(),
                Rc::strong_count(&resources.program)
            );
            drop(resources);
        }
        self.count = 0;
        self.pending.clear();
        self.state = ModelState::Destroyed;
    }
}

impl<B: GraphicsBackend> Drop for Model<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
