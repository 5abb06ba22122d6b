use std::collections::HashMap;

use anyhow::Context as _;
use serde::Deserialize;

use crate::{
    backend::VertexFormat,
    data_structures::catalog::{BufferName, TextureSlot},
};

#[derive(Debug, Deserialize)]
struct ModelFile {
    models: Vec<MeshRecord>,
}

#[derive(Debug, Deserialize)]
struct MeshRecord {
    fields: HashMap<String, FieldRecord>,
    #[serde(default)]
    textures: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldRecord {
    num_components: u32,
    data: Vec<f64>,
}

/// One per-vertex attribute stream, tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexField {
    pub num_components: u32,
    pub data: Vec<f32>,
}

impl VertexField {
    pub fn format(&self) -> Option<VertexFormat> {
        match self.num_components {
            1 => Some(VertexFormat::Float32),
            2 => Some(VertexFormat::Float32x2),
            3 => Some(VertexFormat::Float32x3),
            4 => Some(VertexFormat::Float32x4),
            _ => None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.num_components.max(1) as usize
    }

    fn get<const N: usize>(&self, vertex: usize) -> [f32; N] {
        let mut out = [0.0; N];
        let start = vertex * self.num_components as usize;
        for (i, value) in out.iter_mut().enumerate() {
            if i < self.num_components as usize {
                *value = self.data.get(start + i).copied().unwrap_or(0.0);
            }
        }
        out
    }
}

/// A mesh as described by a `{Model}.js` file.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub fields: HashMap<BufferName, VertexField>,
    pub indices: Option<Vec<u32>>,
    /// Texture slot to image file name.
    pub textures: HashMap<TextureSlot, String>,
}

impl MeshData {
    pub fn index_count(&self) -> u32 {
        self.indices.as_ref().map_or(0, |indices| indices.len() as u32)
    }
}

/// Parse a model file. Only the first mesh record is used.
pub fn parse_model_file(text: &str) -> anyhow::Result<MeshData> {
    let file: ModelFile = serde_json::from_str(text).context("malformed model file")?;
    let count = file.models.len();
    let record = file
        .models
        .into_iter()
        .next()
        .context("model file contains no models")?;
    if count > 1 {
        log::warn!("model file holds {} meshes, only the first is used", count);
    }

    let mut mesh = MeshData::default();
    for (key, field) in record.fields {
        match BufferName::from_key(&key) {
            Some(BufferName::Indices) => {
                mesh.indices = Some(field.data.iter().map(|&i| i as u32).collect());
            }
            Some(name) => {
                let components = field.num_components as usize;
                if components == 0 || field.data.len() % components != 0 {
                    anyhow::bail!(
                        "field '{}' has {} values, not a multiple of {} components",
                        key,
                        field.data.len(),
                        field.num_components
                    );
                }
                mesh.fields.insert(
                    name,
                    VertexField {
                        num_components: field.num_components,
                        data: field.data.iter().map(|&v| v as f32).collect(),
                    },
                );
            }
            None => log::debug!("ignoring unknown field '{}'", key),
        }
    }
    for (key, file_name) in record.textures {
        match TextureSlot::from_key(&key) {
            Some(slot) => {
                mesh.textures.insert(slot, file_name);
            }
            None => log::debug!("ignoring unknown texture slot '{}'", key),
        }
    }
    Ok(mesh)
}

/**
 * Some model files ship without tangents and binormals, which the normal mapped
 * programs need. They are derived here from positions, texture coordinates and
 * triangles, then averaged per vertex.
 *
 * Does nothing when both streams are present or when the inputs are missing.
 */
pub fn generate_tangents(mesh: &mut MeshData) {
    if mesh.fields.contains_key(&BufferName::Tangent)
        && mesh.fields.contains_key(&BufferName::Binormal)
    {
        return;
    }
    let (Some(positions), Some(tex_coords), Some(indices)) = (
        mesh.fields.get(&BufferName::Position),
        mesh.fields.get(&BufferName::TexCoord),
        mesh.indices.as_ref(),
    ) else {
        return;
    };

    let vertex_count = positions.vertex_count();
    let mut tangents = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertex_count];
    let mut binormals = tangents.clone();
    let mut triangles_included = vec![0u32; vertex_count];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }
        let pos0: cgmath::Vector3<f32> = positions.get::<3>(i0).into();
        let pos1: cgmath::Vector3<f32> = positions.get::<3>(i1).into();
        let pos2: cgmath::Vector3<f32> = positions.get::<3>(i2).into();
        let uv0: cgmath::Vector2<f32> = tex_coords.get::<2>(i0).into();
        let uv1: cgmath::Vector2<f32> = tex_coords.get::<2>(i1).into();
        let uv2: cgmath::Vector2<f32> = tex_coords.get::<2>(i2).into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solves
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let r = 1.0 / (delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x);
        if !r.is_finite() {
            // Degenerate UVs
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let binormal = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;

        for i in [i0, i1, i2] {
            tangents[i] += tangent;
            binormals[i] += binormal;
            triangles_included[i] += 1;
        }
    }

    let mut tangent_data = Vec::with_capacity(vertex_count * 3);
    let mut binormal_data = Vec::with_capacity(vertex_count * 3);
    for (i, n) in triangles_included.into_iter().enumerate() {
        let denom = if n == 0 { 0.0 } else { 1.0 / n as f32 };
        let t = tangents[i] * denom;
        let b = binormals[i] * denom;
        tangent_data.extend_from_slice(&[t.x, t.y, t.z]);
        binormal_data.extend_from_slice(&[b.x, b.y, b.z]);
    }

    mesh.fields
        .entry(BufferName::Tangent)
        .or_insert(VertexField {
            num_components: 3,
            data: tangent_data,
        });
    mesh.fields
        .entry(BufferName::Binormal)
        .or_insert(VertexField {
            num_components: 3,
            data: binormal_data,
        });
}
