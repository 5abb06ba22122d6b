//! aquarium
//!
//! A cross-backend 3D aquarium benchmark. Hundreds to tens of thousands of
//! procedurally animated fish swim around static scenery while the frame rate
//! is measured. The interesting part is draw submission: every object either
//! issues one draw per instance or one instanced draw, depending on the
//! selected backend and toggles.
//!
//! High-level modules
//! - `aquarium`: the scene orchestrator that owns objects, caches and backend
//! - `backend`: the backend-agnostic `GraphicsBackend` contract, capability
//!   toggles and a recording backend for headless runs
//! - `camera`: view settings, the orbiting camera and the frame globals
//! - `config`: command-line options and their validation
//! - `context`: the wgpu implementation of `GraphicsBackend`
//! - `data_structures`: model catalog, instance payloads, renderable objects, textures
//! - `fish`: species table, population split and procedural motion
//! - `flow`: the winit event loop
//! - `frame`: the ring of in-flight frames
//! - `pipelines`: wgpu render pipeline and frame-global bind group helpers
//! - `render`: draw strategies and draw calls
//! - `resources`: loading meshes, placements and images from disk
//!

pub mod aquarium;
pub mod backend;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod fish;
pub mod flow;
pub mod fps;
pub mod frame;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use aquarium::{Aquarium, FrameOutcome};
pub use backend::{BackendType, GraphicsBackend, Toggles};
pub use config::{Args, Config};
pub use error::{AquariumError, BackendError, ConfigError, ModelError};
