//! The backend-agnostic graphics contract.
//!
//! [`GraphicsBackend`] is the single seam between the scene orchestration and
//! a graphics API. Implementations own the device, queue and swapchain and hand
//! out opaque resource handles through associated types, so that renderable
//! objects can hold buffers, textures and pipelines without knowing which API
//! produced them.
//!
//! # Implementations
//!
//! - [`crate::context::WgpuBackend`] drives a real GPU. Which native API it
//!   uses (GL, D3D12, Metal, Vulkan) is selected by a [`BackendType`].
//! - [`recording::RecordingBackend`] executes nothing and records every call;
//!   it backs the test-suite and headless dry runs.
//!
//! # Capabilities
//!
//! Every [`BackendType`] reports a capability set ([`Toggles`]). Requested
//! toggles are checked against it before a backend is created, so a capability
//! mismatch is always a startup error and never a mid-frame failure.

use std::{fmt, path::Path, str::FromStr};

use bitflags::bitflags;

use crate::{
    camera::GlobalUniforms,
    data_structures::{
        catalog::ModelName,
        model::{Model, ModelKind},
    },
    error::{BackendError, ConfigError},
    frame::FrameSlot,
    render::{DrawCall, DrawStrategy},
};

pub mod recording;

bitflags! {
    /// Optional features a backend may support and a user may request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Toggles: u32 {
        const MSAA_X4 = 1 << 0;
        const INSTANCED_DRAWS = 1 << 1;
        const DYNAMIC_BUFFER_OFFSET = 1 << 2;
        const DISCRETE_GPU = 1 << 3;
        const INTEGRATED_GPU = 1 << 4;
        const FULL_SCREEN = 1 << 5;
        const ALPHA_BLENDING = 1 << 6;
        const TURN_OFF_VSYNC = 1 << 7;
        const FISH_COME_AND_GO = 1 << 8;
    }
}

impl Toggles {
    /// The command-line flag that requests a toggle, used in diagnostics.
    pub fn flag_name(self) -> &'static str {
        match self {
            Toggles::MSAA_X4 => "--enable-msaa",
            Toggles::INSTANCED_DRAWS => "--enable-instanced-draws",
            Toggles::DYNAMIC_BUFFER_OFFSET => "--disable-dynamic-buffer-offset",
            Toggles::DISCRETE_GPU => "--discrete-gpu",
            Toggles::INTEGRATED_GPU => "--integrated-gpu",
            Toggles::FULL_SCREEN => "--enable-full-screen-mode",
            Toggles::ALPHA_BLENDING => "--enable-alpha-blending",
            Toggles::TURN_OFF_VSYNC => "--turn-off-vsync",
            Toggles::FISH_COME_AND_GO => "--simulating-fish-come-and-go",
            _ => "<combined toggles>",
        }
    }
}

/// Which graphics API a backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    OpenGl,
    Angle,
    DawnD3d12,
    DawnMetal,
    DawnVulkan,
    D3d12,
}

/// Backends that share draw behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFamily {
    Gl,
    D3d12,
    Dawn,
}

impl BackendType {
    pub const ALL: [BackendType; 6] = [
        BackendType::OpenGl,
        BackendType::Angle,
        BackendType::DawnD3d12,
        BackendType::DawnMetal,
        BackendType::DawnVulkan,
        BackendType::D3d12,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendType::OpenGl => "opengl",
            BackendType::Angle => "angle",
            BackendType::DawnD3d12 => "dawn_d3d12",
            BackendType::DawnMetal => "dawn_metal",
            BackendType::DawnVulkan => "dawn_vulkan",
            BackendType::D3d12 => "d3d12",
        }
    }

    pub fn family(self) -> BackendFamily {
        match self {
            BackendType::OpenGl | BackendType::Angle => BackendFamily::Gl,
            BackendType::D3d12 => BackendFamily::D3d12,
            BackendType::DawnD3d12 | BackendType::DawnMetal | BackendType::DawnVulkan => {
                BackendFamily::Dawn
            }
        }
    }

    /// The capability bitset of this backend.
    pub fn capabilities(self) -> Toggles {
        let common = Toggles::MSAA_X4
            | Toggles::FULL_SCREEN
            | Toggles::ALPHA_BLENDING
            | Toggles::TURN_OFF_VSYNC
            | Toggles::FISH_COME_AND_GO;
        let gpu_preference = Toggles::DISCRETE_GPU | Toggles::INTEGRATED_GPU;
        match self.family() {
            BackendFamily::Gl => common,
            BackendFamily::D3d12 => common | gpu_preference | Toggles::INSTANCED_DRAWS,
            BackendFamily::Dawn => {
                common
                    | gpu_preference
                    | Toggles::INSTANCED_DRAWS
                    | Toggles::DYNAMIC_BUFFER_OFFSET
            }
        }
    }

    pub fn is_supported_on_platform(self) -> bool {
        match self {
            BackendType::OpenGl | BackendType::Angle => {
                cfg!(any(target_os = "windows", target_os = "linux"))
            }
            BackendType::DawnD3d12 | BackendType::D3d12 => cfg!(target_os = "windows"),
            BackendType::DawnMetal => cfg!(any(target_os = "macos", target_os = "ios")),
            BackendType::DawnVulkan => cfg!(any(
                target_os = "windows",
                target_os = "linux",
                target_os = "android"
            )),
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendType::ALL
            .into_iter()
            .find(|backend| backend.name() == s)
            .ok_or_else(|| ConfigError::UnknownBackend(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    Instance,
}

pub enum BufferContents<'a> {
    Init(&'a [u8]),
    Zeroed(u64),
}

impl BufferContents<'_> {
    pub fn size(&self) -> u64 {
        match self {
            BufferContents::Init(bytes) => bytes.len() as u64,
            BufferContents::Zeroed(size) => *size,
        }
    }
}

pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub contents: BufferContents<'a>,
}

pub enum TextureSource<'a> {
    Image(&'a image::RgbaImage),
    /// Faces in +x, -x, +y, -y, +z, -z order.
    Cube([&'a image::RgbaImage; 6]),
}

pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub source: TextureSource<'a>,
    /// Colour textures are sampled as sRGB, data textures (normal maps) linearly.
    pub srgb: bool,
}

/// One entry of a bind group. Textures occupy two bindings: the view and its sampler.
pub enum Binding<'a, B: GraphicsBackend + ?Sized> {
    Uniform {
        buffer: &'a B::Buffer,
        offset: u64,
        size: u64,
    },
    /// Bound with a dynamic offset supplied at draw time.
    DynamicUniform { buffer: &'a B::Buffer, size: u64 },
    Texture(&'a B::Texture),
}

pub struct BindGroupDesc<'a, B: GraphicsBackend + ?Sized> {
    pub label: &'a str,
    pub entries: &'a [Binding<'a, B>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u64 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub step: StepMode,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// A tightly packed, single-attribute per-vertex stream.
    pub fn single(location: u32, format: VertexFormat) -> Self {
        Self {
            stride: format.size(),
            step: StepMode::Vertex,
            attributes: vec![VertexAttribute {
                location,
                format,
                offset: 0,
            }],
        }
    }
}

pub struct PipelineDesc<'a, B: GraphicsBackend + ?Sized> {
    pub label: &'a str,
    pub program: &'a B::Program,
    pub vertex_layouts: &'a [VertexLayout],
    /// Layouts for groups 1.. ; group 0 always holds the backend's frame globals.
    pub bind_groups: &'a [&'a B::BindGroup],
    pub blend: bool,
    /// Selects the program's instanced vertex entry point.
    pub instanced: bool,
}

/// The contract every graphics API implementation fulfils.
///
/// Resource creation happens during loading; the per-frame calls are
/// `pre_frame`, `update_global_uniforms`, `write_buffer`, `draw_indexed` and
/// `do_flush`, always issued from one thread in that order.
pub trait GraphicsBackend {
    type Buffer;
    type Texture;
    type Program;
    type BindGroup;
    type Pipeline;

    fn backend_type(&self) -> BackendType;

    /// The capability bitset of the running backend.
    fn available_toggles(&self) -> Toggles;

    /// The toggles this backend was created with.
    fn enabled_toggles(&self) -> Toggles;

    fn frames_in_flight(&self) -> usize;

    /// Required alignment of dynamic uniform offsets.
    fn uniform_alignment(&self) -> u64;

    fn aspect_ratio(&self) -> f32;

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<Self::Buffer, BackendError>;

    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<Self::Texture, BackendError>;

    /// Compile the shader pair found at `vertex` and `fragment`.
    fn create_program(
        &mut self,
        vertex: &Path,
        fragment: &Path,
    ) -> Result<Self::Program, BackendError>;

    fn create_bind_group(
        &mut self,
        desc: &BindGroupDesc<'_, Self>,
    ) -> Result<Self::BindGroup, BackendError>;

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc<'_, Self>,
    ) -> Result<Self::Pipeline, BackendError>;

    /// Record one indexed draw into the current frame.
    fn draw_indexed(&mut self, call: &DrawCall<'_, Self>);

    /// Submit everything queued while loading and wait for it to complete.
    fn flush_load_commands(&mut self) -> Result<(), BackendError>;

    /// Begin a frame: claim the next ring slot, blocking until the GPU retired
    /// the frame that used it last.
    fn pre_frame(&mut self) -> Result<FrameSlot, BackendError>;

    fn update_global_uniforms(&mut self, globals: &GlobalUniforms);

    /// Submit the recorded frame and present it.
    fn do_flush(&mut self) -> Result<(), BackendError>;

    fn resize(&mut self, width: u32, height: u32);

    fn should_quit(&self) -> bool;

    fn request_quit(&mut self);

    /// Wait for the GPU to go idle. Called once, after every object and cached
    /// resource has been released.
    fn terminate(&mut self);

    /// Build an uninitialised renderable object whose draw strategy matches
    /// this backend and its enabled toggles.
    fn create_model(
        &self,
        name: ModelName,
        kind: ModelKind,
        blend: bool,
        capacity: usize,
    ) -> Model<Self>
    where
        Self: Sized,
    {
        let strategy = DrawStrategy::select(kind, self.backend_type(), self.enabled_toggles());
        Model::new(name, kind, blend, strategy, capacity)
    }
}
