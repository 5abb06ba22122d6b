//! Per-instance data for GPU rendering.
//!
//! Each renderable object stores one of these per accumulated instance. On the
//! per-instance path the struct is written into a uniform slot; on the
//! instanced path the packed array is bound as a vertex buffer with step mode
//! `Instance`, starting at shader location 5.

use cgmath::{Matrix, Matrix4, SquareMatrix};

use crate::{
    backend::{StepMode, VertexAttribute, VertexFormat, VertexLayout},
    fish::FishInstanceState,
};

/// First shader location used by instance attributes.
pub const FIRST_INSTANCE_LOCATION: u32 = 5;

/**
 * World transforms of a placed object. `world_view_projection` is only read
 * by the per-instance vertex entry point; the instanced one rebuilds it from
 * the frame globals.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub world: [[f32; 4]; 4],
    pub world_view_projection: [[f32; 4]; 4],
    pub world_inverse_transpose: [[f32; 4]; 4],
    /// Object specific; seaweed keeps its sway time in `extra[0]`.
    pub extra: [f32; 4],
}

impl InstanceRaw {
    pub fn new(world: Matrix4<f32>, view_projection: Matrix4<f32>, extra: [f32; 4]) -> Self {
        let world_inverse_transpose = world
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);
        Self {
            world: world.into(),
            world_view_projection: (view_projection * world).into(),
            world_inverse_transpose: world_inverse_transpose.into(),
            extra,
        }
    }

    /**
     * Stride layout: world (4 x vec4), skip world_view_projection,
     * world_inverse_transpose (4 x vec4), extra (vec4). Locations 5..=13.
     */
    pub fn layout() -> VertexLayout {
        use std::mem;
        let vec4 = mem::size_of::<[f32; 4]>() as u64;
        let world = (0..4).map(|column| VertexAttribute {
            location: FIRST_INSTANCE_LOCATION + column,
            format: VertexFormat::Float32x4,
            offset: vec4 * column as u64,
        });
        let inverse_transpose = (0..4).map(|column| VertexAttribute {
            location: FIRST_INSTANCE_LOCATION + 4 + column,
            format: VertexFormat::Float32x4,
            offset: vec4 * (8 + column as u64),
        });
        let extra = VertexAttribute {
            location: FIRST_INSTANCE_LOCATION + 8,
            format: VertexFormat::Float32x4,
            offset: vec4 * 12,
        };
        VertexLayout {
            stride: mem::size_of::<InstanceRaw>() as u64,
            step: StepMode::Instance,
            attributes: world.chain(inverse_transpose).chain([extra]).collect(),
        }
    }
}

/// A fish pose as the fish shaders read it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FishInstanceRaw {
    pub world_position: [f32; 3],
    pub scale: f32,
    pub next_position: [f32; 3],
    pub time: f32,
}

impl FishInstanceRaw {
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<FishInstanceRaw>() as u64,
            step: StepMode::Instance,
            attributes: vec![
                VertexAttribute {
                    location: FIRST_INSTANCE_LOCATION,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                },
                VertexAttribute {
                    location: FIRST_INSTANCE_LOCATION + 1,
                    format: VertexFormat::Float32,
                    offset: 12,
                },
                VertexAttribute {
                    location: FIRST_INSTANCE_LOCATION + 2,
                    format: VertexFormat::Float32x3,
                    offset: 16,
                },
                VertexAttribute {
                    location: FIRST_INSTANCE_LOCATION + 3,
                    format: VertexFormat::Float32,
                    offset: 28,
                },
            ],
        }
    }
}

impl From<FishInstanceState> for FishInstanceRaw {
    fn from(state: FishInstanceState) -> Self {
        Self {
            world_position: state.world_position,
            scale: state.scale,
            next_position: state.next_position,
            time: state.time,
        }
    }
}

/// Payload handed to [`Model::accumulate_instance`](super::model::Model::accumulate_instance).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstanceData {
    World(InstanceRaw),
    Fish(FishInstanceRaw),
}

impl InstanceData {
    pub fn bytes(&self) -> &[u8] {
        match self {
            InstanceData::World(raw) => bytemuck::bytes_of(raw),
            InstanceData::Fish(raw) => bytemuck::bytes_of(raw),
        }
    }
}

/// Material constants bound at group 1, binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// shininess, specular factor, fog enabled (0/1), unused
    pub params: [f32; 4],
    /// Fish: length, wave length, bend amount. Inner: eta, tank colour fudge,
    /// refraction fudge.
    pub extra: [f32; 4],
}

impl MaterialUniform {
    pub fn new(shininess: f32, specular_factor: f32, fog: bool, extra: [f32; 4]) -> Self {
        Self {
            params: [shininess, specular_factor, if fog { 1.0 } else { 0.0 }, 0.0],
            extra,
        }
    }
}
