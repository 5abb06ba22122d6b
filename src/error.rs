//! Error types for the aquarium core.
//!
//! Every error here is fatal: the benchmark reports it and exits before (or
//! instead of) running the frame loop. The split mirrors where a failure is
//! detected:
//!
//! - [`ConfigError`] is raised while validating command-line input against the
//!   selected backend's capabilities
//! - [`BackendError`] is raised by a [`GraphicsBackend`](crate::backend::GraphicsBackend)
//!   while creating the device or GPU resources
//! - [`ModelError`] is raised by a renderable object when it is initialised
//!   without its resources or driven out of order
//! - [`AquariumError`] wraps the three above plus scene loading failures

use crate::{
    backend::{BackendType, Toggles},
    data_structures::catalog::ModelName,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown backend '{0}', expected one of: opengl, angle, dawn_d3d12, dawn_metal, dawn_vulkan, d3d12")]
    UnknownBackend(String),

    #[error("backend '{0}' is not supported on this platform")]
    UnsupportedBackend(BackendType),

    #[error("--num-fish must be a non-negative integer, got {0}")]
    NegativeFishCount(i64),

    #[error("{flag} is not supported by backend '{backend}'")]
    UnsupportedToggle {
        flag: &'static str,
        backend: BackendType,
    },

    #[error("invalid window size '{0}', expected WIDTHxHEIGHT")]
    InvalidWindowSize(String),

    #[error("failed to read view settings from {path}: {reason}")]
    ViewSettings { path: String, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("no compatible adapter found for backend '{0}'")]
    AdapterUnavailable(BackendType),

    #[error("failed to create surface: {0}")]
    Surface(String),

    #[error("failed to request device: {0}")]
    Device(String),

    #[error("failed to load shader '{path}': {source}")]
    ShaderSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resource descriptor for '{label}': {reason}")]
    InvalidDescriptor { label: String, reason: String },

    #[error("timed out waiting for frame {serial} to retire")]
    FrameTimeout { serial: u64 },

    #[error("the backend was asked to run with toggles {requested:?} but only supports {available:?}")]
    ToggleMismatch {
        requested: Toggles,
        available: Toggles,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("model {model} requires buffer '{buffer}' but none was provided")]
    MissingBuffer {
        model: ModelName,
        buffer: &'static str,
    },

    #[error("model {model} requires texture '{texture}' but none was provided")]
    MissingTexture {
        model: ModelName,
        texture: &'static str,
    },

    #[error("model {model} can hold at most {capacity} instances per frame")]
    CapacityExceeded { model: ModelName, capacity: usize },

    #[error("model {model} cannot {operation} while {state:?}")]
    InvalidState {
        model: ModelName,
        operation: &'static str,
        state: crate::data_structures::model::ModelState,
    },

    #[error("model {model} received instance data of the wrong shape")]
    PayloadMismatch { model: ModelName },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(thiserror::Error, Debug)]
pub enum AquariumError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("scene has no mesh for model {0}")]
    MissingMesh(ModelName),

    #[error("model {model} has {placements} placements but can draw at most {capacity} per frame")]
    TooManyPlacements {
        model: ModelName,
        placements: usize,
        capacity: usize,
    },

    #[error("failed to load scene: {0:#}")]
    Scene(anyhow::Error),
}
