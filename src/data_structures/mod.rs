//! Aquarium data structures: the model catalog, renderable objects, instances and textures.
//!
//! - `catalog` lists every model, program, vertex buffer and texture slot
//! - `model` is the renderable object and its per-frame state machine
//! - `instance` holds per-instance uniforms and their vertex layouts
//! - `texture` is the wgpu texture wrapper used by the wgpu backend

pub mod catalog;
pub mod instance;
pub mod model;
pub mod texture;
