mod common;

use aquarium::{
    data_structures::catalog::{BufferName, ModelName, TextureSlot},
    resources::{
        load_scene,
        mesh::{generate_tangents, parse_model_file},
        parse_placements,
        texture::default_normal_map,
    },
};
use tempfile::tempdir;

use crate::common::test_utils::{DIFFUSE, NORMAL, model_file_json, write_assets};

#[test]
fn model_files_are_parsed() {
    let mesh = parse_model_file(&model_file_json().to_string()).unwrap();
    assert_eq!(mesh.fields[&BufferName::Position].vertex_count(), 4);
    assert_eq!(mesh.fields[&BufferName::TexCoord].num_components, 2);
    assert_eq!(mesh.indices.as_deref(), Some(&[0, 1, 2, 0, 2, 3][..]));
    assert_eq!(mesh.index_count(), 6);
    assert_eq!(mesh.textures[&TextureSlot::Diffuse], DIFFUSE);
    assert_eq!(mesh.textures[&TextureSlot::NormalMap], NORMAL);
    assert!(!mesh.fields.contains_key(&BufferName::Tangent));
}

#[test]
fn unknown_fields_and_slots_are_ignored() {
    let text = r#"{ "models": [{
        "fields": {
            "position": { "numComponents": 3, "data": [0, 0, 0] },
            "colorMult": { "numComponents": 4, "data": [1, 1, 1, 1] }
        },
        "textures": { "diffuse": "a.png", "emissive": "b.png" }
    }] }"#;
    let mesh = parse_model_file(text).unwrap();
    assert_eq!(mesh.fields.len(), 1);
    assert_eq!(mesh.textures.len(), 1);
    assert!(mesh.indices.is_none());
}

#[test]
fn ragged_fields_are_rejected() {
    let text = r#"{ "models": [{
        "fields": { "position": { "numComponents": 3, "data": [0, 0, 0, 1] } }
    }] }"#;
    assert!(parse_model_file(text).is_err());
}

#[test]
fn empty_model_files_are_rejected() {
    assert!(parse_model_file(r#"{ "models": [] }"#).is_err());
    assert!(parse_model_file("not json").is_err());
}

#[test]
fn tangents_follow_texture_coordinates() {
    let mut mesh = parse_model_file(&model_file_json().to_string()).unwrap();
    generate_tangents(&mut mesh);

    let tangents = &mesh.fields[&BufferName::Tangent];
    let binormals = &mesh.fields[&BufferName::Binormal];
    assert_eq!(tangents.vertex_count(), 4);
    for vertex in tangents.data.chunks_exact(3) {
        assert!(vertex[0] > 0.0);
        assert_eq!(vertex[1], 0.0);
        assert_eq!(vertex[2], 0.0);
    }
    for vertex in binormals.data.chunks_exact(3) {
        assert_eq!(vertex[0], 0.0);
        assert!(vertex[1] > 0.0);
        assert_eq!(vertex[2], 0.0);
    }
}

#[test]
fn placements_are_grouped_by_model() {
    let text = r#"{ "objects": [
        { "name": "RockA", "worldMatrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 5,6,7,1] },
        { "name": "RockA", "worldMatrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1] },
        { "name": "Lighthouse", "worldMatrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1] },
        { "name": "SeaweedB", "worldMatrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1] }
    ] }"#;
    let placements = parse_placements(text).unwrap();
    assert_eq!(placements.len(), 2);
    let rocks = &placements[&ModelName::RockA];
    assert_eq!(rocks.len(), 2);
    // column-major: the last four values are the translation column
    assert_eq!((rocks[0].w.x, rocks[0].w.y, rocks[0].w.z), (5.0, 6.0, 7.0));
    assert_eq!(placements[&ModelName::SeaweedB].len(), 1);
}

#[test]
fn short_matrices_are_rejected() {
    let text = r#"{ "objects": [ { "name": "Arch", "worldMatrix": [1, 0, 0] } ] }"#;
    assert!(parse_placements(text).is_err());
}

#[test]
fn the_default_normal_map_is_flat() {
    let image = default_normal_map(0, 0);
    assert_eq!(image.dimensions(), (1, 1));
    assert_eq!(image.get_pixel(0, 0).0, [127, 127, 255, 255]);
}

#[tokio::test]
async fn scenes_load_from_an_asset_directory() {
    let dir = tempdir().unwrap();
    write_assets(dir.path(), false);

    let scene = load_scene(dir.path()).await.unwrap();
    assert_eq!(scene.meshes.len(), ModelName::ALL.len());
    assert!(
        scene
            .meshes
            .values()
            .all(|mesh| mesh.fields.contains_key(&BufferName::Tangent))
    );
    assert_eq!(scene.placements_of(ModelName::SeaweedA).len(), 2);
    assert!(scene.placements_of(ModelName::Coral).is_empty());
    assert_eq!(scene.images.len(), 3);
    assert!(scene.skybox.is_none());

    let (vertex, fragment) = scene.shader_paths("fish");
    assert!(vertex.ends_with("shaders/fish.vert.wgsl"));
    assert!(fragment.ends_with("shaders/fish.frag.wgsl"));
}

#[tokio::test]
async fn a_missing_placement_file_fails_the_load() {
    let dir = tempdir().unwrap();
    assert!(load_scene(dir.path()).await.is_err());
}
