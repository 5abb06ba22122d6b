mod common;

use std::{cell::Cell, time::Duration};

use aquarium::{
    Aquarium, AquariumError, BackendType, ConfigError, FrameOutcome, GraphicsBackend, ModelError,
    Toggles,
    aquarium::AquariumState,
    backend::recording::{Command, RecordingBackend, ResourceKind},
    config::resolve_toggles,
    data_structures::catalog::{ModelGroup, ModelName},
    fish::FishAllocation,
};
use cgmath::{Matrix4, SquareMatrix};

use crate::common::test_utils::{
    FRAME, config, draw_count, drawn_labels, recording_aquarium, render_frames, scene,
    scene_with,
};

const NON_FISH_MODELS: usize = 21;

#[test]
fn unsupported_toggles_fail_before_a_backend_exists() {
    let config = config(BackendType::Angle, 10);
    let created = Cell::new(false);

    let result = Aquarium::<RecordingBackend>::init(
        config,
        Toggles::INSTANCED_DRAWS,
        |_| Ok(scene()),
        |config, toggles| {
            created.set(true);
            RecordingBackend::new(config.backend, toggles)
        },
    );

    assert!(matches!(
        result,
        Err(AquariumError::Config(ConfigError::UnsupportedToggle {
            flag: "--enable-instanced-draws",
            backend: BackendType::Angle,
        }))
    ));
    assert!(!created.get());
}

#[test]
fn every_placed_model_and_fish_species_is_created() {
    let aquarium = recording_aquarium(config(BackendType::OpenGl, 10), scene()).unwrap();
    assert_eq!(aquarium.state(), AquariumState::Running);
    assert_eq!(aquarium.models().len(), NON_FISH_MODELS + 5);
    assert_eq!(aquarium.live_fish(), 10);

    let commands = aquarium.backend().commands();
    let programs = commands
        .iter()
        .filter(|command| matches!(command, Command::CreateProgram { .. }))
        .count();
    assert_eq!(programs, 5);
    // diffuse, normal map, reflection map and skybox, each uploaded once
    let textures = commands
        .iter()
        .filter(|command| matches!(command, Command::CreateTexture { .. }))
        .count();
    assert_eq!(textures, 4);
    assert_eq!(commands.last(), Some(&Command::FlushLoad));
}

#[test]
fn no_fish_creates_no_fish_objects() {
    let aquarium = recording_aquarium(config(BackendType::OpenGl, 0), scene()).unwrap();
    assert_eq!(aquarium.models().len(), NON_FISH_MODELS);
    assert!(
        aquarium
            .models()
            .iter()
            .all(|model| model.name().info().group != ModelGroup::Fish)
    );
}

#[test]
fn unplaced_scenery_is_skipped() {
    let mut scene = scene();
    scene.placements.remove(&ModelName::Coral);
    let aquarium = recording_aquarium(config(BackendType::OpenGl, 0), scene).unwrap();
    assert!(aquarium.model(ModelName::Coral).is_none());
    assert_eq!(aquarium.models().len(), NON_FISH_MODELS - 1);
}

#[test]
fn a_placed_model_without_a_mesh_is_an_error() {
    let mut scene = scene();
    scene.meshes.remove(&ModelName::RockB);
    let result = recording_aquarium(config(BackendType::OpenGl, 0), scene);
    assert!(matches!(
        result,
        Err(AquariumError::MissingMesh(ModelName::RockB))
    ));
}

#[test]
fn the_inner_globe_needs_a_skybox() {
    let mut scene = scene();
    scene.skybox = None;
    let result = recording_aquarium(config(BackendType::OpenGl, 0), scene);
    assert!(matches!(
        result,
        Err(AquariumError::Model(ModelError::MissingTexture {
            model: ModelName::GlobeInner,
            texture: "skybox",
        }))
    ));
}

#[test]
fn too_many_placements_are_rejected() {
    let mut scene = scene();
    scene
        .placements
        .insert(ModelName::Arch, vec![Matrix4::<f32>::identity(); 21]);
    let result = recording_aquarium(config(BackendType::OpenGl, 0), scene);
    assert!(matches!(
        result,
        Err(AquariumError::TooManyPlacements {
            model: ModelName::Arch,
            placements: 21,
            capacity: 20,
        })
    ));
}

#[test]
fn scene_loading_failures_are_reported() {
    let result = Aquarium::<RecordingBackend>::init(
        config(BackendType::OpenGl, 0),
        Toggles::empty(),
        |_| Err(anyhow::anyhow!("no placement file")),
        |config, toggles| RecordingBackend::new(config.backend, toggles),
    );
    assert!(matches!(result, Err(AquariumError::Scene(_))));
}

#[test]
fn resolved_toggles_are_used_as_given() {
    let mut config = config(BackendType::DawnVulkan, 10);
    config.integrated_gpu = true;
    config.discrete_gpu = true;
    let toggles = resolve_toggles(&config).unwrap() | Toggles::MSAA_X4;

    let aquarium = Aquarium::<RecordingBackend>::init(
        config,
        toggles,
        |_| Ok(scene()),
        |config, toggles| RecordingBackend::new(config.backend, toggles),
    )
    .unwrap();

    assert_eq!(aquarium.toggles(), toggles);
    assert_eq!(aquarium.backend().enabled_toggles(), toggles);
    assert!(aquarium.backend().available_toggles().contains(toggles));
    assert!(!toggles.intersects(Toggles::INTEGRATED_GPU | Toggles::DISCRETE_GPU));
}

#[test]
fn per_instance_backends_draw_every_instance() {
    let mut aquarium = recording_aquarium(config(BackendType::OpenGl, 10), scene()).unwrap();
    aquarium.backend().clear_log();
    render_frames(&mut aquarium, 1);

    let commands = aquarium.backend().commands();
    assert_eq!(draw_count(&commands), NON_FISH_MODELS + 10);
    let uploads = commands
        .iter()
        .filter(|command| matches!(command, Command::UpdateGlobals))
        .count();
    assert_eq!(uploads, 1);
}

#[test]
fn instanced_fish_draw_once_per_species() {
    let mut config = config(BackendType::DawnVulkan, 10);
    config.enable_instanced_draws = true;
    let mut aquarium = recording_aquarium(config, scene()).unwrap();
    aquarium.backend().clear_log();
    render_frames(&mut aquarium, 1);

    let commands = aquarium.backend().commands();
    assert_eq!(draw_count(&commands), NON_FISH_MODELS + 5);
}

#[test]
fn draws_follow_group_order() {
    let mut aquarium = recording_aquarium(config(BackendType::D3d12, 50), scene_with(2)).unwrap();
    render_frames(&mut aquarium, 1);

    let mut labels = drawn_labels(&aquarium.backend().commands());
    labels.dedup();
    let expected: Vec<String> = ModelName::ALL
        .into_iter()
        .filter(|name| aquarium.model(*name).is_some())
        .map(|name| name.to_string())
        .collect();
    assert_eq!(labels, expected);

    let groups: Vec<ModelGroup> = labels
        .iter()
        .filter_map(|label| ModelName::from_file_stem(label))
        .map(|name| name.info().group)
        .collect();
    assert!(groups.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn seaweed_blends_and_alpha_blending_blends_everything() {
    let blended = |enable_alpha_blending: bool| {
        let mut config = config(BackendType::OpenGl, 10);
        config.enable_alpha_blending = enable_alpha_blending;
        let aquarium = recording_aquarium(config, scene()).unwrap();
        aquarium
            .backend()
            .commands()
            .into_iter()
            .filter_map(|command| match command {
                Command::CreatePipeline { label, blend, .. } => Some((label, blend)),
                _ => None,
            })
            .collect::<Vec<_>>()
    };

    for (label, blend) in blended(false) {
        let seaweed = label.starts_with("Seaweed");
        assert_eq!(blend, seaweed, "{}", label);
    }
    assert!(blended(true).iter().all(|(_, blend)| *blend));
}

#[test]
fn frame_globals_follow_the_clock() {
    let mut aquarium = recording_aquarium(config(BackendType::OpenGl, 0), scene()).unwrap();
    aquarium.render(Duration::from_secs(1)).unwrap();
    assert!((aquarium.globals().clock - 1.0).abs() < 1e-6);

    let globals = aquarium.backend().last_globals().copied().unwrap();
    let settings = &aquarium.config().view_settings;
    assert_eq!(
        globals.fog,
        [settings.fog_power, settings.fog_mult, settings.fog_offset, 0.0]
    );
}

fn written_bytes(commands: &[Command]) -> Vec<Vec<u8>> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::WriteBuffer { data, .. } => Some(data.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn fish_jitter_restarts_every_frame() {
    let mut aquarium = recording_aquarium(config(BackendType::OpenGl, 10), scene()).unwrap();
    aquarium.backend().clear_log();
    aquarium.render(Duration::ZERO).unwrap();
    let first = written_bytes(&aquarium.backend().commands());

    aquarium.backend().clear_log();
    aquarium.render(Duration::ZERO).unwrap();
    let second = written_bytes(&aquarium.backend().commands());

    // one write per placed model and per fish
    assert_eq!(first.len(), NON_FISH_MODELS + 10);
    assert_eq!(first, second);
}

#[test]
fn a_quit_request_shuts_down_on_the_next_frame() {
    let mut aquarium = recording_aquarium(config(BackendType::OpenGl, 10), scene()).unwrap();
    render_frames(&mut aquarium, 2);
    aquarium.request_quit();

    assert_eq!(aquarium.render(FRAME).unwrap(), FrameOutcome::Quit);
    assert_eq!(aquarium.state(), AquariumState::Terminated);
    assert!(aquarium.models().is_empty());
    assert_eq!(aquarium.render(FRAME).unwrap(), FrameOutcome::Quit);
}

#[test]
fn test_time_requests_a_quit() {
    let mut config = config(BackendType::OpenGl, 0);
    config.test_time = Some(0.05);
    let mut aquarium = recording_aquarium(config, scene()).unwrap();

    render_frames(&mut aquarium, 4);
    assert!(aquarium.backend().should_quit());
    assert_eq!(aquarium.render(FRAME).unwrap(), FrameOutcome::Quit);
    assert_eq!(aquarium.fps().frames(), 4);
}

#[test]
fn shutdown_releases_everything_before_terminating() {
    let mut aquarium = recording_aquarium(config(BackendType::OpenGl, 10), scene()).unwrap();
    render_frames(&mut aquarium, 3);
    let log = aquarium.backend().log();
    aquarium.backend().clear_log();

    aquarium.shutdown();
    aquarium.shutdown();

    let commands = log.borrow().clone();
    let terminate = commands
        .iter()
        .position(|command| *command == Command::Terminate)
        .unwrap();
    assert_eq!(
        commands
            .iter()
            .filter(|command| **command == Command::Terminate)
            .count(),
        1
    );
    let released: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, command)| matches!(command, Command::Released { .. }))
        .map(|(index, _)| index)
        .collect();
    assert!(!released.is_empty());
    assert!(released.iter().all(|index| *index < terminate));

    // cached textures and programs go after every object
    let last_pipeline = commands
        .iter()
        .rposition(|command| {
            matches!(
                command,
                Command::Released {
                    kind: ResourceKind::Pipeline,
                    ..
                }
            )
        })
        .unwrap();
    let first_program = commands
        .iter()
        .position(|command| {
            matches!(
                command,
                Command::Released {
                    kind: ResourceKind::Program,
                    ..
                }
            )
        })
        .unwrap();
    assert!(last_pipeline < first_program);
}

#[test]
fn fish_come_and_go() {
    let mut config = config(BackendType::DawnVulkan, 150);
    config.simulating_fish_come_and_go = true;
    let mut aquarium = recording_aquarium(config, scene()).unwrap();
    assert!(aquarium.toggles().contains(Toggles::FISH_COME_AND_GO));
    assert_eq!(aquarium.live_fish(), 150);

    render_frames(&mut aquarium, 200);
    assert_eq!(aquarium.live_fish(), 50);
    aquarium.backend().clear_log();
    render_frames(&mut aquarium, 1);
    assert_eq!(
        draw_count(&aquarium.backend().commands()),
        NON_FISH_MODELS + 50
    );

    render_frames(&mut aquarium, 199);
    assert_eq!(aquarium.live_fish(), 150);
    assert_eq!(
        *aquarium.allocation(),
        FishAllocation::allocate(150, &Default::default())
    );
}

#[test]
fn dropping_the_aquarium_terminates_the_backend() {
    let aquarium = recording_aquarium(config(BackendType::OpenGl, 10), scene()).unwrap();
    let log = aquarium.backend().log();
    drop(aquarium);
    assert!(log.borrow().contains(&Command::Terminate));
}
