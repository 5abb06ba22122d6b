//! The wgpu implementation of [`GraphicsBackend`].
//!
//! [`WgpuBackend`] owns the surface, device, queue, depth (and MSAA) targets and
//! the frame-global uniform block. Which native API wgpu drives is chosen by the
//! [`BackendType`]; capabilities stay those of the selected backend type so the
//! benchmark behaves the same whichever adapter wgpu ends up picking.
//!
//! A frame is a single render pass: `pre_frame` waits for the ring slot,
//! acquires the swapchain image and opens the pass, `draw_indexed` records into
//! it and `do_flush` ends the pass, submits and presents.

use std::{collections::HashMap, iter, num::NonZeroU64, path::Path, sync::Arc};

use instant::Duration;
use winit::window::Window;

use crate::{
    backend::{
        BackendType, BindGroupDesc, Binding, BufferContents, BufferDesc, BufferUsage,
        GraphicsBackend, PipelineDesc, StepMode, TextureDesc, TextureSource, Toggles,
        VertexFormat,
    },
    camera::GlobalUniforms,
    data_structures::texture::Texture,
    error::BackendError,
    frame::{FRAMES_IN_FLIGHT, FrameRing, FrameSlot},
    pipelines::{
        basic::{self, ShaderStages, VS_INSTANCED, VS_PER_INSTANCE},
        globals::GlobalsResources,
    },
    render::DrawCall,
};

const FRAME_TIMEOUT: Duration = Duration::from_secs(3);
const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.8,
    b: 1.0,
    a: 1.0,
};

/// The wgpu backends a [`BackendType`] asks for.
pub fn wgpu_backends(backend: BackendType) -> wgpu::Backends {
    match backend {
        BackendType::OpenGl | BackendType::Angle => wgpu::Backends::GL,
        BackendType::DawnD3d12 | BackendType::D3d12 => wgpu::Backends::DX12,
        BackendType::DawnMetal => wgpu::Backends::METAL,
        BackendType::DawnVulkan => wgpu::Backends::VULKAN,
    }
}

fn power_preference(toggles: Toggles) -> wgpu::PowerPreference {
    if toggles.contains(Toggles::DISCRETE_GPU) {
        wgpu::PowerPreference::HighPerformance
    } else if toggles.contains(Toggles::INTEGRATED_GPU) {
        wgpu::PowerPreference::LowPower
    } else {
        wgpu::PowerPreference::default()
    }
}

#[derive(Debug)]
pub struct WgpuProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

#[derive(Debug)]
pub struct WgpuBindGroup {
    pub bind_group: wgpu::BindGroup,
    pub layout: wgpu::BindGroupLayout,
}

/// Shape of one layout entry, used to share identical bind group layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LayoutEntry {
    Uniform { dynamic: bool, size: u64 },
    Texture(wgpu::TextureViewDimension),
    Sampler,
}

/// What to do when the swapchain image cannot be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRecovery {
    /// Reconfigure once and try again.
    Reconfigure,
    SkipFrame,
    Fail,
}

impl SurfaceRecovery {
    pub fn for_error(error: &wgpu::SurfaceError) -> Self {
        match error {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigure,
            wgpu::SurfaceError::Timeout => Self::SkipFrame,
            _ => Self::Fail,
        }
    }
}

struct FrameInFlight {
    slot: FrameSlot,
    surface: wgpu::SurfaceTexture,
    encoder: wgpu::CommandEncoder,
    pass: wgpu::RenderPass<'static>,
}

pub struct WgpuBackend {
    backend_type: BackendType,
    toggles: Toggles,
    pub(crate) window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    depth_texture: Texture,
    msaa_target: Option<Texture>,
    globals: GlobalsResources,
    layouts: HashMap<Vec<LayoutEntry>, wgpu::BindGroupLayout>,
    ring: FrameRing<wgpu::SubmissionIndex>,
    frame: Option<FrameInFlight>,
    is_surface_configured: bool,
    quit_requested: bool,
}

impl WgpuBackend {
    pub async fn new(
        window: Arc<Window>,
        backend_type: BackendType,
        toggles: Toggles,
    ) -> Result<Self, BackendError> {
        let available = backend_type.capabilities();
        if !available.contains(toggles) {
            return Err(BackendError::ToggleMismatch {
                requested: toggles,
                available,
            });
        }
        let size = window.inner_size();

        log::info!("creating {} backend", backend_type);
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu_backends(backend_type),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| BackendError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power_preference(toggles),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| BackendError::AdapterUnavailable(backend_type))?;
        log::info!("using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("aquarium device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .map_err(|e| BackendError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| BackendError::Surface("surface reports no formats".to_string()))?;
        let present_mode = if toggles.contains(Toggles::TURN_OFF_VSYNC) {
            wgpu::PresentMode::AutoNoVsync
        } else {
            wgpu::PresentMode::AutoVsync
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: FRAMES_IN_FLIGHT as u32,
        };

        let sample_count = if toggles.contains(Toggles::MSAA_X4) { 4 } else { 1 };
        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_target =
            (sample_count > 1).then(|| Texture::create_msaa_target(&device, &config, sample_count));
        let globals = GlobalsResources::new(&device);

        let mut backend = Self {
            backend_type,
            toggles,
            window,
            surface,
            device,
            queue,
            config,
            sample_count,
            depth_texture,
            msaa_target,
            globals,
            layouts: HashMap::new(),
            ring: FrameRing::new(FRAMES_IN_FLIGHT),
            frame: None,
            is_surface_configured: false,
            quit_requested: false,
        };
        backend.resize(size.width, size.height);
        Ok(backend)
    }

    fn bind_group_layout(&mut self, entries: &[LayoutEntry]) -> wgpu::BindGroupLayout {
        if let Some(layout) = self.layouts.get(entries) {
            return layout.clone();
        }
        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .enumerate()
            .map(|(binding, entry)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: match *entry {
                    LayoutEntry::Uniform { dynamic, size } => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: dynamic,
                        min_binding_size: NonZeroU64::new(size),
                    },
                    LayoutEntry::Texture(view_dimension) => wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    LayoutEntry::Sampler => {
                        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                    }
                },
                count: None,
            })
            .collect();
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &layout_entries,
                label: Some("aquarium_bind_group_layout"),
            });
        self.layouts.insert(entries.to_vec(), layout.clone());
        layout
    }

    /// `None` when this frame should be skipped.
    fn acquire_surface(&mut self) -> Result<Option<wgpu::SurfaceTexture>, BackendError> {
        let error = match self.surface.get_current_texture() {
            Ok(output) => return Ok(Some(output)),
            Err(e) => e,
        };
        match SurfaceRecovery::for_error(&error) {
            SurfaceRecovery::Reconfigure => {
                log::warn!("surface {}, reconfiguring", error);
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                match self.surface.get_current_texture() {
                    Ok(output) => Ok(Some(output)),
                    Err(e) if SurfaceRecovery::for_error(&e) == SurfaceRecovery::SkipFrame => {
                        log::warn!("surface {}, skipping frame", e);
                        Ok(None)
                    }
                    Err(e) => Err(BackendError::Surface(e.to_string())),
                }
            }
            SurfaceRecovery::SkipFrame => {
                log::warn!("surface {}, skipping frame", error);
                Ok(None)
            }
            SurfaceRecovery::Fail => Err(BackendError::Surface(error.to_string())),
        }
    }

    fn wait_for(&self, index: wgpu::SubmissionIndex, serial: u64) -> Result<(), BackendError> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: Some(FRAME_TIMEOUT),
            })
            .map(|_| ())
            .map_err(|e| {
                log::error!("waiting for frame {} failed: {}", serial, e);
                BackendError::FrameTimeout { serial }
            })
    }
}

impl GraphicsBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Texture = Texture;
    type Program = WgpuProgram;
    type BindGroup = WgpuBindGroup;
    type Pipeline = wgpu::RenderPipeline;

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
        self.device.limits().min_uniform_buffer_offset_alignment as u64
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<Self::Buffer, BackendError> {
        use wgpu::util::DeviceExt;

        let usage = match desc.usage {
            BufferUsage::Vertex | BufferUsage::Instance => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;
        log::debug!("buffer '{}' ({} bytes)", desc.label, desc.contents.size());
        let buffer = match desc.contents {
            BufferContents::Init(contents) => {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(desc.label),
                        contents,
                        usage,
                    })
            }
            BufferContents::Zeroed(size) => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size,
                usage,
                mapped_at_creation: false,
            }),
        };
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<Self::Texture, BackendError> {
        log::debug!("texture '{}'", desc.label);
        match desc.source {
            TextureSource::Image(img) => Ok(Texture::from_image(
                &self.device,
                &self.queue,
                img,
                desc.label,
                desc.srgb,
            )),
            TextureSource::Cube(faces) => {
                Texture::from_cube_faces(&self.device, &self.queue, faces, desc.label, desc.srgb)
                    .map_err(|e| BackendError::InvalidDescriptor {
                        label: desc.label.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    fn create_program(
        &mut self,
        vertex: &Path,
        fragment: &Path,
    ) -> Result<Self::Program, BackendError> {
        let load = |path: &Path| -> Result<wgpu::ShaderModule, BackendError> {
            let source =
                std::fs::read_to_string(path).map_err(|source| BackendError::ShaderSource {
                    path: path.display().to_string(),
                    source,
                })?;
            log::debug!("compiling {}", path.display());
            Ok(self
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: path.file_name().and_then(|name| name.to_str()),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                }))
        };
        Ok(WgpuProgram {
            vertex: load(vertex)?,
            fragment: load(fragment)?,
        })
    }

    fn create_bind_group(
        &mut self,
        desc: &BindGroupDesc<'_, Self>,
    ) -> Result<Self::BindGroup, BackendError> {
        let mut shape = Vec::new();
        for entry in desc.entries {
            match entry {
                Binding::Uniform { size, .. } => shape.push(LayoutEntry::Uniform {
                    dynamic: false,
                    size: *size,
                }),
                Binding::DynamicUniform { size, .. } => shape.push(LayoutEntry::Uniform {
                    dynamic: true,
                    size: *size,
                }),
                Binding::Texture(texture) => {
                    shape.push(LayoutEntry::Texture(texture.dimension));
                    shape.push(LayoutEntry::Sampler);
                }
            }
        }
        let layout = self.bind_group_layout(&shape);

        let mut resources = Vec::with_capacity(shape.len());
        for entry in desc.entries {
            match entry {
                Binding::Uniform {
                    buffer,
                    offset,
                    size,
                } => resources.push(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: *buffer,
                    offset: *offset,
                    size: NonZeroU64::new(*size),
                })),
                Binding::DynamicUniform { buffer, size } => {
                    resources.push(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: *buffer,
                        offset: 0,
                        size: NonZeroU64::new(*size),
                    }))
                }
                Binding::Texture(texture) => {
                    let sampler =
                        texture
                            .sampler
                            .as_ref()
                            .ok_or_else(|| BackendError::InvalidDescriptor {
                                label: desc.label.to_string(),
                                reason: "texture has no sampler".to_string(),
                            })?;
                    resources.push(wgpu::BindingResource::TextureView(&texture.view));
                    resources.push(wgpu::BindingResource::Sampler(sampler));
                }
            }
        }
        let entries: Vec<wgpu::BindGroupEntry> = resources
            .into_iter()
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource,
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &entries,
            label: Some(desc.label),
        });
        Ok(WgpuBindGroup { bind_group, layout })
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc<'_, Self>,
    ) -> Result<Self::Pipeline, BackendError> {
        let mut group_layouts = vec![&self.globals.bind_group_layout];
        group_layouts.extend(desc.bind_groups.iter().map(|group| &group.layout));
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &group_layouts,
                push_constant_ranges: &[],
            });

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|attribute| wgpu::VertexAttribute {
                        offset: attribute.offset,
                        shader_location: attribute.location,
                        format: match attribute.format {
                            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
                            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
                        },
                    })
                    .collect()
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout> = desc
            .vertex_layouts
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.stride,
                step_mode: match layout.step {
                    StepMode::Vertex => wgpu::VertexStepMode::Vertex,
                    StepMode::Instance => wgpu::VertexStepMode::Instance,
                },
                attributes,
            })
            .collect();

        Ok(basic::mk_render_pipeline(
            &self.device,
            desc.label,
            &layout,
            self.config.format,
            desc.blend,
            self.sample_count,
            &buffers,
            ShaderStages {
                vertex: &desc.program.vertex,
                vertex_entry: if desc.instanced {
                    VS_INSTANCED
                } else {
                    VS_PER_INSTANCE
                },
                fragment: &desc.program.fragment,
            },
        ))
    }

    fn draw_indexed(&mut self, call: &DrawCall<'_, Self>) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let pass = &mut frame.pass;
        pass.set_pipeline(call.pipeline);
        pass.set_bind_group(0, &self.globals.bind_group, &[]);
        for (index, group) in call.bind_groups.iter().enumerate() {
            pass.set_bind_group(
                index as u32 + 1,
                &group.group.bind_group,
                group.dynamic_offsets,
            );
        }
        for (slot, buffer) in call.vertex_buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        pass.set_index_buffer(call.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..call.index_count, 0, call.instances.clone());
    }

    fn flush_load_commands(&mut self) -> Result<(), BackendError> {
        let index = self.queue.submit(iter::empty());
        self.wait_for(index, 0)
    }

    fn pre_frame(&mut self) -> Result<FrameSlot, BackendError> {
        let (slot, fence) = self.ring.begin_frame();
        if let Some(index) = fence {
            self.wait_for(index, slot.serial.saturating_sub(self.ring.depth() as u64))?;
        }

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(slot);
        }

        let Some(output) = self.acquire_surface()? else {
            return Ok(slot);
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let (target, resolve_target) = match &self.msaa_target {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOUR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            })
            .forget_lifetime();

        self.frame = Some(FrameInFlight {
            slot,
            surface: output,
            encoder,
            pass,
        });
        Ok(slot)
    }

    fn update_global_uniforms(&mut self, globals: &GlobalUniforms) {
        self.queue
            .write_buffer(&self.globals.buffer, 0, bytemuck::bytes_of(globals));
    }

    fn do_flush(&mut self) -> Result<(), BackendError> {
        let Some(FrameInFlight {
            slot,
            surface,
            encoder,
            pass,
        }) = self.frame.take()
        else {
            return Ok(());
        };
        drop(pass);
        let index = self.queue.submit(iter::once(encoder.finish()));
        self.window.pre_present_notify();
        surface.present();
        self.ring.end_frame(slot, index);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.is_surface_configured = true;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Texture::create_depth_texture(
                &self.device,
                [width, height],
                self.sample_count,
                "depth_texture",
            );
            if self.sample_count > 1 {
                self.msaa_target = Some(Texture::create_msaa_target(
                    &self.device,
                    &self.config,
                    self.sample_count,
                ));
            }
        }
    }

    fn should_quit(&self) -> bool {
        self.quit_requested
    }

    fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    fn terminate(&mut self) {
        // An unfinished frame is dropped without being submitted.
        self.frame = None;
        self.ring.drain();
        if let Err(e) = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(FRAME_TIMEOUT),
        }) {
            log::warn!("device did not go idle before shutdown: {}", e);
        }
    }
}
