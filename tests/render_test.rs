#[cfg(feature = "integration-tests")]
mod common;

// One event loop per process: every windowed test lives in its own file.
#[test]
#[cfg(feature = "integration-tests")]
fn renders_frames_on_the_platform_backend() {
    use aquarium::{Config, config::default_backend, flow};
    use tempfile::tempdir;

    use crate::common::test_utils::write_assets;

    let dir = tempdir().unwrap();
    write_assets(dir.path(), true);
    let mut config = Config::for_backend(default_backend());
    config.num_fish = 100;
    config.window_size = (320, 240);
    config.assets = dir.path().to_path_buf();

    let frames = flow::run_frames(config, 5).unwrap();
    assert_eq!(frames, 5);
}
