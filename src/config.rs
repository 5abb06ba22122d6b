//! Command-line options and their validation.
//!
//! [`Args`] is the raw clap surface. [`Config::from_args`] turns it into a
//! validated [`Config`]; [`resolve_toggles`] then checks the requested toggles
//! against the selected backend's capabilities. Both run before any window or
//! device exists, so every configuration error is reported up front.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::{
    backend::{BackendType, Toggles},
    camera::ViewSettings,
    error::ConfigError,
};

pub const DEFAULT_NUM_FISH: i64 = 500;
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1024, 768);

/// The backend used when none is given on the command line.
pub fn default_backend() -> BackendType {
    if cfg!(target_os = "windows") {
        BackendType::DawnD3d12
    } else if cfg!(any(target_os = "macos", target_os = "ios")) {
        BackendType::DawnMetal
    } else {
        BackendType::DawnVulkan
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "aquarium", version, about = "A cross-backend aquarium benchmark")]
pub struct Args {
    /// One of opengl, angle, dawn_d3d12, dawn_metal, dawn_vulkan, d3d12
    #[arg(long)]
    pub backend: Option<String>,

    #[arg(long, default_value_t = DEFAULT_NUM_FISH, allow_negative_numbers = true)]
    pub num_fish: i64,

    #[arg(long)]
    pub enable_msaa: bool,

    #[arg(long)]
    pub enable_instanced_draws: bool,

    #[arg(long)]
    pub disable_dynamic_buffer_offset: bool,

    #[arg(long)]
    pub integrated_gpu: bool,

    #[arg(long)]
    pub discrete_gpu: bool,

    #[arg(long)]
    pub enable_full_screen_mode: bool,

    #[arg(long)]
    pub enable_alpha_blending: bool,

    #[arg(long)]
    pub turn_off_vsync: bool,

    #[arg(long)]
    pub simulating_fish_come_and_go: bool,

    /// Log the frame rate once per second
    #[arg(long)]
    pub print_log: bool,

    /// Quit after this many seconds and report the average frame rate
    #[arg(long, value_name = "SECONDS")]
    pub test_time: Option<f64>,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH")]
    pub window_size: Option<String>,

    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// JSON file overriding camera, fog and fish motion constants
    #[arg(long, value_name = "FILE")]
    pub view_settings: Option<PathBuf>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendType,
    pub num_fish: usize,
    pub enable_msaa: bool,
    pub enable_instanced_draws: bool,
    pub disable_dynamic_buffer_offset: bool,
    pub integrated_gpu: bool,
    pub discrete_gpu: bool,
    pub enable_full_screen_mode: bool,
    pub enable_alpha_blending: bool,
    pub turn_off_vsync: bool,
    pub simulating_fish_come_and_go: bool,
    pub print_log: bool,
    pub test_time: Option<f64>,
    pub window_size: (u32, u32),
    pub assets: PathBuf,
    pub view_settings: ViewSettings,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let backend = match &args.backend {
            Some(name) => name.parse::<BackendType>()?,
            None => default_backend(),
        };
        if !backend.is_supported_on_platform() {
            return Err(ConfigError::UnsupportedBackend(backend));
        }
        if args.num_fish < 0 {
            return Err(ConfigError::NegativeFishCount(args.num_fish));
        }
        let window_size = match &args.window_size {
            Some(size) => parse_window_size(size)?,
            None => DEFAULT_WINDOW_SIZE,
        };
        let view_settings = match &args.view_settings {
            Some(path) => load_view_settings(path)?,
            None => ViewSettings::default(),
        };

        Ok(Self {
            backend,
            num_fish: args.num_fish as usize,
            enable_msaa: args.enable_msaa,
            enable_instanced_draws: args.enable_instanced_draws,
            disable_dynamic_buffer_offset: args.disable_dynamic_buffer_offset,
            integrated_gpu: args.integrated_gpu,
            discrete_gpu: args.discrete_gpu,
            enable_full_screen_mode: args.enable_full_screen_mode,
            enable_alpha_blending: args.enable_alpha_blending,
            turn_off_vsync: args.turn_off_vsync,
            simulating_fish_come_and_go: args.simulating_fish_come_and_go,
            print_log: args.print_log,
            test_time: args.test_time,
            window_size,
            assets: args.assets,
            view_settings,
        })
    }

    /// A default configuration for `backend` that skips the platform check.
    pub fn for_backend(backend: BackendType) -> Self {
        Self {
            backend,
            num_fish: DEFAULT_NUM_FISH as usize,
            enable_msaa: false,
            enable_instanced_draws: false,
            disable_dynamic_buffer_offset: false,
            integrated_gpu: false,
            discrete_gpu: false,
            enable_full_screen_mode: false,
            enable_alpha_blending: false,
            turn_off_vsync: false,
            simulating_fish_come_and_go: false,
            print_log: false,
            test_time: None,
            window_size: DEFAULT_WINDOW_SIZE,
            assets: PathBuf::from("assets"),
            view_settings: ViewSettings::default(),
        }
    }
}

pub fn parse_window_size(text: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::InvalidWindowSize(text.to_string());
    let (width, height) = text.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

fn load_view_settings(path: &Path) -> Result<ViewSettings, ConfigError> {
    let to_error = |reason: String| ConfigError::ViewSettings {
        path: path.display().to_string(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| to_error(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| to_error(e.to_string()))
}

/// Turn the requested options into the toggle set the backend runs with.
///
/// Fails on any option the backend cannot honour. Requesting both GPU
/// preferences is only a warning, and neither is applied. Dynamic buffer
/// offsets are on wherever supported unless explicitly disabled.
pub fn resolve_toggles(config: &Config) -> Result<Toggles, ConfigError> {
    let available = config.backend.capabilities();
    let mut requested = Toggles::empty();
    requested.set(Toggles::MSAA_X4, config.enable_msaa);
    requested.set(Toggles::INSTANCED_DRAWS, config.enable_instanced_draws);
    requested.set(Toggles::FULL_SCREEN, config.enable_full_screen_mode);
    requested.set(Toggles::ALPHA_BLENDING, config.enable_alpha_blending);
    requested.set(Toggles::TURN_OFF_VSYNC, config.turn_off_vsync);
    requested.set(Toggles::FISH_COME_AND_GO, config.simulating_fish_come_and_go);
    if config.integrated_gpu && config.discrete_gpu {
        log::warn!("both --integrated-gpu and --discrete-gpu given, ignoring both");
    } else {
        requested.set(Toggles::INTEGRATED_GPU, config.integrated_gpu);
        requested.set(Toggles::DISCRETE_GPU, config.discrete_gpu);
    }

    if let Some(flag) = requested.difference(available).iter().next() {
        return Err(ConfigError::UnsupportedToggle {
            flag: flag.flag_name(),
            backend: config.backend,
        });
    }

    let dynamic_offsets = available.contains(Toggles::DYNAMIC_BUFFER_OFFSET);
    if config.disable_dynamic_buffer_offset && !dynamic_offsets {
        return Err(ConfigError::UnsupportedToggle {
            flag: Toggles::DYNAMIC_BUFFER_OFFSET.flag_name(),
            backend: config.backend,
        });
    }
    if dynamic_offsets && !config.disable_dynamic_buffer_offset {
        requested |= Toggles::DYNAMIC_BUFFER_OFFSET;
    }
    Ok(requested)
}
