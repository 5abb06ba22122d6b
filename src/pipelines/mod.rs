//! Render pipeline construction for the wgpu backend.
//!
//! - `basic` builds render pipelines from a program and vertex layouts
//! - `globals` owns the per-frame uniform block bound at group 0

pub mod basic;
pub mod globals;
