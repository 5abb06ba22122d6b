#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn instanced_fish_render_with_msaa() {
    use aquarium::{Config, config::default_backend, flow};
    use tempfile::tempdir;

    use crate::common::test_utils::write_assets;

    let dir = tempdir().unwrap();
    write_assets(dir.path(), true);
    let mut config = Config::for_backend(default_backend());
    config.num_fish = 1000;
    config.enable_instanced_draws = true;
    config.enable_msaa = true;
    config.window_size = (320, 240);
    config.assets = dir.path().to_path_buf();

    let frames = flow::run_frames(config, 5).unwrap();
    assert_eq!(frames, 5);
}
