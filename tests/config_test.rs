use aquarium::{
    Args, BackendType, Config, ConfigError, Toggles,
    config::{DEFAULT_WINDOW_SIZE, default_backend, parse_window_size, resolve_toggles},
};
use clap::Parser;
use tempfile::tempdir;

fn parse(args: &[&str]) -> Result<Config, ConfigError> {
    let args = Args::try_parse_from(std::iter::once("aquarium").chain(args.iter().copied()))
        .expect("arguments should parse");
    Config::from_args(args)
}

#[test]
fn defaults_match_the_platform() {
    let config = parse(&[]).unwrap();
    assert_eq!(config.backend, default_backend());
    assert_eq!(config.num_fish, 500);
    assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
    assert!(!config.enable_msaa);
    assert_eq!(config.test_time, None);
}

#[test]
fn flags_are_parsed() {
    let config = parse(&[
        "--num-fish",
        "10000",
        "--enable-msaa",
        "--enable-instanced-draws",
        "--print-log",
        "--test-time",
        "30",
        "--window-size",
        "1920x1080",
    ])
    .unwrap();
    assert_eq!(config.num_fish, 10000);
    assert!(config.enable_msaa);
    assert!(config.enable_instanced_draws);
    assert!(config.print_log);
    assert_eq!(config.test_time, Some(30.0));
    assert_eq!(config.window_size, (1920, 1080));
}

#[test]
fn negative_fish_counts_are_rejected() {
    assert!(matches!(
        parse(&["--num-fish", "-5"]),
        Err(ConfigError::NegativeFishCount(-5))
    ));
}

#[test]
fn unknown_backends_are_rejected() {
    assert!(matches!(
        parse(&["--backend", "vulkan9"]),
        Err(ConfigError::UnknownBackend(name)) if name == "vulkan9"
    ));
}

#[test]
fn backend_names_round_trip() {
    for backend in BackendType::ALL {
        assert_eq!(backend.name().parse::<BackendType>().unwrap(), backend);
    }
}

#[test]
fn window_sizes() {
    assert_eq!(parse_window_size("800x600").unwrap(), (800, 600));
    assert_eq!(parse_window_size("1920X1080").unwrap(), (1920, 1080));
    assert!(parse_window_size("800").is_err());
    assert!(parse_window_size("0x600").is_err());
    assert!(parse_window_size("wide x tall").is_err());
}

#[test]
fn view_settings_override_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("view.json");
    std::fs::write(&path, r#"{ "fishSpeed": 0.5, "fogColor": [0.0, 0.0, 0.0] }"#).unwrap();

    let config = parse(&["--view-settings", path.to_str().unwrap()]).unwrap();
    assert_eq!(config.view_settings.fish_speed, 0.5);
    assert_eq!(config.view_settings.fog_color, [0.0, 0.0, 0.0]);
    assert_eq!(config.view_settings.eye_radius, 13.2);
}

#[test]
fn unreadable_view_settings_are_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    assert!(matches!(
        parse(&["--view-settings", path.to_str().unwrap()]),
        Err(ConfigError::ViewSettings { .. })
    ));
}

#[test]
fn instanced_draws_are_unsupported_on_gl() {
    for backend in [BackendType::OpenGl, BackendType::Angle] {
        let mut config = Config::for_backend(backend);
        config.enable_instanced_draws = true;
        assert!(matches!(
            resolve_toggles(&config),
            Err(ConfigError::UnsupportedToggle {
                flag: "--enable-instanced-draws",
                ..
            })
        ));
    }
}

#[test]
fn dynamic_offsets_are_on_where_supported() {
    let config = Config::for_backend(BackendType::DawnMetal);
    assert!(resolve_toggles(&config).unwrap().contains(Toggles::DYNAMIC_BUFFER_OFFSET));

    let mut config = Config::for_backend(BackendType::DawnMetal);
    config.disable_dynamic_buffer_offset = true;
    assert!(!resolve_toggles(&config).unwrap().contains(Toggles::DYNAMIC_BUFFER_OFFSET));

    let config = Config::for_backend(BackendType::D3d12);
    assert!(!resolve_toggles(&config).unwrap().contains(Toggles::DYNAMIC_BUFFER_OFFSET));
}

#[test]
fn disabling_dynamic_offsets_needs_the_capability() {
    let mut config = Config::for_backend(BackendType::OpenGl);
    config.disable_dynamic_buffer_offset = true;
    assert!(matches!(
        resolve_toggles(&config),
        Err(ConfigError::UnsupportedToggle {
            flag: "--disable-dynamic-buffer-offset",
            backend: BackendType::OpenGl,
        })
    ));
}

#[test]
fn gpu_preferences_need_a_capable_backend() {
    let mut config = Config::for_backend(BackendType::OpenGl);
    config.discrete_gpu = true;
    assert!(resolve_toggles(&config).is_err());

    let mut config = Config::for_backend(BackendType::DawnVulkan);
    config.integrated_gpu = true;
    assert!(resolve_toggles(&config).unwrap().contains(Toggles::INTEGRATED_GPU));
}

#[test]
fn conflicting_gpu_preferences_are_both_dropped() {
    let mut config = Config::for_backend(BackendType::DawnD3d12);
    config.integrated_gpu = true;
    config.discrete_gpu = true;
    let toggles = resolve_toggles(&config).unwrap();
    assert!(!toggles.intersects(Toggles::INTEGRATED_GPU | Toggles::DISCRETE_GPU));
}

#[test]
fn common_options_are_supported_everywhere() {
    for backend in BackendType::ALL {
        let mut config = Config::for_backend(backend);
        config.enable_msaa = true;
        config.enable_alpha_blending = true;
        config.turn_off_vsync = true;
        config.simulating_fish_come_and_go = true;
        let toggles = resolve_toggles(&config).unwrap();
        assert!(toggles.contains(
            Toggles::MSAA_X4
                | Toggles::ALPHA_BLENDING
                | Toggles::TURN_OFF_VSYNC
                | Toggles::FISH_COME_AND_GO
        ));
    }
}
