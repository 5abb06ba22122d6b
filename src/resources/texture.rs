use std::path::Path;

use anyhow::Context as _;
use image::RgbaImage;

/// Skybox face files, in +x, -x, +y, -y, +z, -z order.
pub const SKYBOX_FACES: [&str; 6] = [
    "GlobeOuter_EM_positive_x.jpg",
    "GlobeOuter_EM_negative_x.jpg",
    "GlobeOuter_EM_positive_y.jpg",
    "GlobeOuter_EM_negative_y.jpg",
    "GlobeOuter_EM_positive_z.jpg",
    "GlobeOuter_EM_negative_z.jpg",
];

/// Name under which the flat normal map is cached.
pub const DEFAULT_NORMAL_MAP: &str = "<default normal map>";
pub const SKYBOX: &str = "<skybox>";

/// A normal map that leaves normals untouched. Used when a model declares no
/// normal or reflection map of its own.
pub fn default_normal_map(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba([127, 127, 255, 255]))
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

pub async fn load_image(path: &Path) -> anyhow::Result<RgbaImage> {
    let bytes = load_binary(path).await?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Load the six skybox faces, or `None` if the assets carry no skybox.
pub async fn load_skybox(assets: &Path) -> anyhow::Result<Option<[RgbaImage; 6]>> {
    if !tokio::fs::try_exists(assets.join(SKYBOX_FACES[0]))
        .await
        .unwrap_or(false)
    {
        log::warn!("no skybox found in {}", assets.display());
        return Ok(None);
    }
    let faces = futures::future::try_join_all(
        SKYBOX_FACES
            .iter()
            .map(|face| load_image_owned(assets.join(face))),
    )
    .await?;
    let faces: [RgbaImage; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected six skybox faces"))?;
    Ok(Some(faces))
}

async fn load_image_owned(path: std::path::PathBuf) -> anyhow::Result<RgbaImage> {
    load_image(&path).await
}
