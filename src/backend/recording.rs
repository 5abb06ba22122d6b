//! A backend that records instead of rendering.
//!
//! [`RecordingBackend`] satisfies the full [`GraphicsBackend`] contract without
//! a device. Every call is appended to a shared [`Command`] log, and every
//! handle it returns logs [`Command::Released`] when dropped, so tests can
//! assert on draw counts, upload counts, frame pacing and release order.

use std::{
    cell::RefCell,
    ops::Range,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    backend::{
        BackendType, BindGroupDesc, Binding, BufferDesc, BufferUsage, GraphicsBackend,
        PipelineDesc, TextureDesc, Toggles,
    },
    camera::GlobalUniforms,
    error::BackendError,
    frame::{FRAMES_IN_FLIGHT, FrameRing, FrameSlot},
    render::DrawCall,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Program,
    BindGroup,
    Pipeline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer {
        id: u64,
        label: String,
        usage: BufferUsage,
        size: u64,
    },
    WriteBuffer {
        buffer: u64,
        offset: u64,
        size: u64,
        data: Vec<u8>,
    },
    CreateTexture {
        id: u64,
        label: String,
    },
    CreateProgram {
        id: u64,
        vertex: PathBuf,
        fragment: PathBuf,
    },
    CreateBindGroup {
        id: u64,
        label: String,
        entries: usize,
    },
    CreatePipeline {
        id: u64,
        label: String,
        instanced: bool,
        blend: bool,
    },
    Draw {
        pipeline: u64,
        index_count: u32,
        instances: Range<u32>,
        dynamic_offsets: Vec<u32>,
    },
    FlushLoad,
    BeginFrame {
        serial: u64,
    },
    /// Waited for frame `serial` to retire before reusing its slot.
    WaitFrame {
        serial: u64,
    },
    UpdateGlobals,
    Submit {
        serial: u64,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Terminate,
    Released {
        kind: ResourceKind,
        id: u64,
    },
}

pub type CommandLog = Rc<RefCell<Vec<Command>>>;

/// Handle to a recorded resource. Logs its release on drop.
#[derive(Debug)]
pub struct Recorded {
    id: u64,
    kind: ResourceKind,
    log: CommandLog,
}

impl Recorded {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Recorded {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Command::Released {
            kind: self.kind,
            id: self.id,
        });
    }
}

pub struct RecordingBackend {
    backend_type: BackendType,
    toggles: Toggles,
    log: CommandLog,
    next_id: u64,
    ring: FrameRing<u64>,
    current: Option<FrameSlot>,
    width: u32,
    height: u32,
    quit_requested: bool,
    last_globals: Option<GlobalUniforms>,
}

impl RecordingBackend {
    /// A recording backend for `backend_type` running with `toggles`, which
    /// must be a subset of that backend's capabilities.
    pub fn new(backend_type: BackendType, toggles: Toggles) -> Result<Self, BackendError> {
        let available = backend_type.capabilities();
        if !available.contains(toggles) {
            return Err(BackendError::ToggleMismatch {
                requested: toggles,
                available,
            });
        }
        Ok(Self {
            backend_type,
            toggles,
            log: Rc::new(RefCell::new(Vec::new())),
            next_id: 0,
            ring: FrameRing::new(FRAMES_IN_FLIGHT),
            current: None,
            width: 1024,
            height: 768,
            quit_requested: false,
            last_globals: None,
        })
    }

    /// A shared handle to the command log; stays valid after the backend is dropped.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn last_globals(&self) -> Option<&GlobalUniforms> {
        self.last_globals.as_ref()
    }

    fn record(&self, command: Command) {
        self.log.borrow_mut().push(command);
    }

    fn handle(&mut self, kind: ResourceKind) -> Recorded {
        let id = self.next_id;
        self.next_id += 1;
        Recorded {
            id,
            kind,
            log: self.log.clone(),
        }
    }
}

impl GraphicsBackend for RecordingBackend {
    type Buffer = Recorded;
    type Texture = Recorded;
    type Program = Recorded;
    type BindGroup = Recorded;
    type Pipeline = Recorded;

    fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    fn available_toggles(&self) -> Toggles {
        self.backend_type.capabilities()
    }

    fn enabled_toggles(&self) -> Toggles {
        self.toggles
    }

    fn frames_in_flight(&self) -> usize {
        self.ring.depth()
    }

    fn uniform_alignment(&self) -> u64 {
        256
    }

    fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<Self::Buffer, BackendError> {
        let handle = self.handle(ResourceKind::Buffer);
        self.record(Command::CreateBuffer {
            id: handle.id,
            label: desc.label.to_string(),
            usage: desc.usage,
            size: desc.contents.size(),
        });
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]) {
        self.record(Command::WriteBuffer {
            buffer: buffer.id,
            offset,
            size: data.len() as u64,
            data: data.to_vec(),
        });
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<Self::Texture, BackendError> {
        let handle = self.handle(ResourceKind::Texture);
        self.record(Command::CreateTexture {
            id: handle.id,
            label: desc.label.to_string(),
        });
        Ok(handle)
    }

    fn create_program(
        &mut self,
        vertex: &Path,
        fragment: &Path,
    ) -> Result<Self::Program, BackendError> {
        let handle = self.handle(ResourceKind::Program);
        self.record(Command::CreateProgram {
            id: handle.id,
            vertex: vertex.to_path_buf(),
            fragment: fragment.to_path_buf(),
        });
        Ok(handle)
    }

    fn create_bind_group(
        &mut self,
        desc: &BindGroupDesc<'_, Self>,
    ) -> Result<Self::BindGroup, BackendError> {
        if desc.entries.is_empty() {
            return Err(BackendError::InvalidDescriptor {
                label: desc.label.to_string(),
                reason: "bind group has no entries".to_string(),
            });
        }
        for entry in desc.entries {
            if let Binding::Uniform { size: 0, .. } | Binding::DynamicUniform { size: 0, .. } =
                entry
            {
                return Err(BackendError::InvalidDescriptor {
                    label: desc.label.to_string(),
                    reason: "zero-sized uniform binding".to_string(),
                });
            }
        }
        let handle = self.handle(ResourceKind::BindGroup);
        self.record(Command::CreateBindGroup {
            id: handle.id,
            label: desc.label.to_string(),
            entries: desc.entries.len(),
        });
        Ok(handle)
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc<'_, Self>,
    ) -> Result<Self::Pipeline, BackendError> {
        let handle = self.handle(ResourceKind::Pipeline);
        self.record(Command::CreatePipeline {
            id: handle.id,
            label: desc.label.to_string(),
            instanced: desc.instanced,
            blend: desc.blend,
        });
        Ok(handle)
    }

    fn draw_indexed(&mut self, call: &DrawCall<'_, Self>) {
        if self.current.is_none() {
            log::warn!("draw recorded outside of a frame");
        }
        self.record(Command::Draw {
            pipeline: call.pipeline.id,
            index_count: call.index_count,
            instances: call.instances.clone(),
            dynamic_offsets: call
                .bind_groups
                .iter()
                .flat_map(|group| group.dynamic_offsets.iter().copied())
                .collect(),
        });
    }

    fn flush_load_commands(&mut self) -> Result<(), BackendError> {
        self.record(Command::FlushLoad);
        Ok(())
    }

    fn pre_frame(&mut self) -> Result<FrameSlot, BackendError> {
        let (slot, fence) = self.ring.begin_frame();
        self.record(Command::BeginFrame {
            serial: slot.serial,
        });
        if let Some(serial) = fence {
            self.record(Command::WaitFrame { serial });
        }
        self.current = Some(slot);
        Ok(slot)
    }

    fn update_global_uniforms(&mut self, globals: &GlobalUniforms) {
        self.last_globals = Some(*globals);
        self.record(Command::UpdateGlobals);
    }

    fn do_flush(&mut self) -> Result<(), BackendError> {
        if let Some(slot) = self.current.take() {
            self.record(Command::Submit {
                serial: slot.serial,
            });
            self.ring.end_frame(slot, slot.serial);
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
            self.record(Command::Resize { width, height });
        }
    }

    fn should_quit(&self) -> bool {
        self.quit_requested
    }

    fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    fn terminate(&mut self) {
        for serial in self.ring.drain() {
            self.record(Command::WaitFrame { serial });
        }
        self.record(Command::Terminate);
    }
}
