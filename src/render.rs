//! Draw submission types.
//!
//! This module defines how a renderable object turns its accumulated instances
//! into backend draw calls.
//!
//! # Key types
//!
//! - [`DrawStrategy`] is picked once per object and decides between one draw
//!   per instance and one instanced draw
//! - [`DrawCall`] is a single indexed draw handed to
//!   [`GraphicsBackend::draw_indexed`](crate::backend::GraphicsBackend::draw_indexed)
//! - [`BoundGroup`] is a bind group plus its dynamic offsets
//!

use std::ops::Range;

use crate::{
    backend::{BackendFamily, BackendType, GraphicsBackend, Toggles},
    data_structures::model::ModelKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStrategy {
    /// Write each instance's uniform slot, then draw it alone. The slot is
    /// selected either by a dynamic offset or by a bind group per slot.
    PerInstance { dynamic_offset: bool },
    /// Upload the packed instance array once and issue one instanced draw.
    Instanced,
}

impl DrawStrategy {
    pub fn select(kind: ModelKind, backend: BackendType, toggles: Toggles) -> Self {
        let per_instance = DrawStrategy::PerInstance {
            dynamic_offset: toggles.contains(Toggles::DYNAMIC_BUFFER_OFFSET),
        };
        match kind {
            ModelKind::FishInstanced => DrawStrategy::Instanced,
            ModelKind::Fish => per_instance,
            ModelKind::Generic | ModelKind::Inner | ModelKind::Outside | ModelKind::Seaweed => {
                if backend.family() == BackendFamily::Dawn {
                    DrawStrategy::Instanced
                } else {
                    per_instance
                }
            }
        }
    }

    pub fn is_instanced(self) -> bool {
        matches!(self, DrawStrategy::Instanced)
    }
}

/// A bind group for groups 1.. of a draw.
pub struct BoundGroup<'a, B: GraphicsBackend + ?Sized> {
    pub group: &'a B::BindGroup,
    pub dynamic_offsets: &'a [u32],
}

/// One indexed draw. Group 0 (frame globals) is bound by the backend itself.
pub struct DrawCall<'a, B: GraphicsBackend + ?Sized> {
    pub pipeline: &'a B::Pipeline,
    pub bind_groups: &'a [BoundGroup<'a, B>],
    /// Per-vertex buffers in slot order, followed by the instance buffer on the
    /// instanced path.
    pub vertex_buffers: &'a [&'a B::Buffer],
    pub index_buffer: &'a B::Buffer,
    pub index_count: u32,
    pub instances: Range<u32>,
}
