use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use cgmath::Matrix4;
use image::RgbaImage;
use serde::Deserialize;

use crate::data_structures::catalog::ModelName;

/**
 * This module contains all logic for loading meshes, placements and images from
 * the assets directory. Nothing here touches the GPU: the result is a
 * [`SceneData`] the orchestrator uploads through its backend.
 */
pub mod mesh;
pub mod texture;

use mesh::MeshData;

pub const PLACEMENT_FILE: &str = "PropPlacement.js";
pub const SHADER_DIR: &str = "shaders";

/// Everything read from disk before GPU resources are created.
#[derive(Debug, Default)]
pub struct SceneData {
    pub meshes: HashMap<ModelName, MeshData>,
    /// Static world matrices per model, in file order.
    pub placements: HashMap<ModelName, Vec<Matrix4<f32>>>,
    /// Decoded images keyed by file name.
    pub images: HashMap<String, RgbaImage>,
    pub skybox: Option<[RgbaImage; 6]>,
    pub shader_dir: PathBuf,
}

impl SceneData {
    pub fn placements_of(&self, name: ModelName) -> &[Matrix4<f32>] {
        self.placements.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn shader_paths(&self, stem: &str) -> (PathBuf, PathBuf) {
        (
            self.shader_dir.join(format!("{}.vert.wgsl", stem)),
            self.shader_dir.join(format!("{}.frag.wgsl", stem)),
        )
    }
}

#[derive(Debug, Deserialize)]
struct PlacementFile {
    objects: Vec<PlacementRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementRecord {
    name: String,
    world_matrix: Vec<f32>,
}

/// Parse `PropPlacement.js`. Matrices are column-major; unknown names are skipped.
pub fn parse_placements(text: &str) -> anyhow::Result<HashMap<ModelName, Vec<Matrix4<f32>>>> {
    let file: PlacementFile = serde_json::from_str(text).context("malformed placement file")?;
    let mut placements: HashMap<ModelName, Vec<Matrix4<f32>>> = HashMap::new();
    for record in file.objects {
        let Some(name) = ModelName::from_file_stem(&record.name) else {
            log::debug!("skipping placement of unknown model '{}'", record.name);
            continue;
        };
        let m: [f32; 16] = record.world_matrix.as_slice().try_into().with_context(|| {
            format!(
                "placement of {} has {} matrix values, expected 16",
                record.name,
                record.world_matrix.len()
            )
        })?;
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            m[0], m[1], m[2], m[3],
            m[4], m[5], m[6], m[7],
            m[8], m[9], m[10], m[11],
            m[12], m[13], m[14], m[15],
        );
        placements.entry(name).or_default().push(matrix);
    }
    Ok(placements)
}

async fn load_mesh(
    assets: &Path,
    name: ModelName,
) -> anyhow::Result<Option<(ModelName, MeshData)>> {
    let path = assets.join(format!("{}.js", name.file_stem()));
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(None);
    }
    let text = texture::load_string(&path).await?;
    let mut mesh =
        mesh::parse_model_file(&text).with_context(|| format!("in {}", path.display()))?;
    mesh::generate_tangents(&mut mesh);
    Ok(Some((name, mesh)))
}

async fn load_named_image(assets: &Path, file_name: String) -> anyhow::Result<(String, RgbaImage)> {
    let img = texture::load_image(&assets.join(&file_name)).await?;
    Ok((file_name, img))
}

/// Read placements, every model file present, the images they reference and
/// the skybox from `assets`. Files are read concurrently.
pub async fn load_scene(assets: &Path) -> anyhow::Result<SceneData> {
    log::info!("loading scene from {}", assets.display());
    let placement_text = texture::load_string(&assets.join(PLACEMENT_FILE)).await?;
    let placements = parse_placements(&placement_text)?;

    let meshes: HashMap<ModelName, MeshData> = futures::future::join_all(
        ModelName::ALL
            .into_iter()
            .map(|name| load_mesh(assets, name)),
    )
    .await
    .into_iter()
    .collect::<anyhow::Result<Vec<_>>>()?
    .into_iter()
    .flatten()
    .collect();

    let file_names: HashSet<String> = meshes
        .values()
        .flat_map(|mesh| mesh.textures.values().cloned())
        .collect();
    let images: HashMap<String, RgbaImage> = futures::future::join_all(
        file_names
            .into_iter()
            .map(|file_name| load_named_image(assets, file_name)),
    )
    .await
    .into_iter()
    .collect::<anyhow::Result<_>>()?;

    let skybox = texture::load_skybox(assets).await?;
    log::info!(
        "loaded {} meshes, {} images, {} placed models",
        meshes.len(),
        images.len(),
        placements.len()
    );
    Ok(SceneData {
        meshes,
        placements,
        images,
        skybox,
        shader_dir: assets.join(SHADER_DIR),
    })
}
