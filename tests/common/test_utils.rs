use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
    time::Duration,
};

use aquarium::{
    Aquarium, AquariumError, BackendType, Config, FrameOutcome, GraphicsBackend,
    backend::{
        BufferContents, BufferDesc, BufferUsage, TextureDesc, TextureSource,
        recording::{Command, RecordingBackend},
    },
    config::resolve_toggles,
    data_structures::{
        catalog::{BufferName, ModelGroup, ModelName, ProgramName, TextureSlot},
        instance::MaterialUniform,
        model::{ModelInputs, VertexStream},
    },
    resources::{
        PLACEMENT_FILE, SHADER_DIR, SceneData,
        mesh::{MeshData, VertexField},
    },
};
use cgmath::{Matrix4, SquareMatrix};
use image::RgbaImage;

pub const DIFFUSE: &str = "diffuse.png";
pub const NORMAL: &str = "normal.png";
pub const REFLECTION: &str = "reflection.png";

pub const FRAME: Duration = Duration::from_millis(16);

const QUAD_POSITIONS: [f32; 12] = [
    -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0,
];
const QUAD_NORMALS: [f32; 12] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
const QUAD_TEX_COORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
const QUAD_TANGENTS: [f32; 12] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
const QUAD_BINORMALS: [f32; 12] = [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

fn field(num_components: u32, data: &[f32]) -> VertexField {
    VertexField {
        num_components,
        data: data.to_vec(),
    }
}

/// A unit quad in the XY plane with every vertex stream and texture slot.
pub fn quad_mesh() -> MeshData {
    let fields = HashMap::from([
        (BufferName::Position, field(3, &QUAD_POSITIONS)),
        (BufferName::Normal, field(3, &QUAD_NORMALS)),
        (BufferName::TexCoord, field(2, &QUAD_TEX_COORDS)),
        (BufferName::Tangent, field(3, &QUAD_TANGENTS)),
        (BufferName::Binormal, field(3, &QUAD_BINORMALS)),
    ]);
    let textures = HashMap::from([
        (TextureSlot::Diffuse, DIFFUSE.to_string()),
        (TextureSlot::NormalMap, NORMAL.to_string()),
        (TextureSlot::ReflectionMap, REFLECTION.to_string()),
    ]);
    MeshData {
        fields,
        indices: Some(QUAD_INDICES.to_vec()),
        textures,
    }
}

pub fn pixel() -> RgbaImage {
    RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]))
}

/// Every model has a mesh and every non-fish model `placements` placements.
pub fn scene_with(placements: usize) -> SceneData {
    let mut meshes = HashMap::new();
    let mut placed = HashMap::new();
    for name in ModelName::ALL {
        meshes.insert(name, quad_mesh());
        if name.info().group != ModelGroup::Fish {
            placed.insert(name, vec![Matrix4::<f32>::identity(); placements]);
        }
    }
    let images = [DIFFUSE, NORMAL, REFLECTION]
        .into_iter()
        .map(|file_name| (file_name.to_string(), pixel()))
        .collect();
    SceneData {
        meshes,
        placements: placed,
        images,
        skybox: Some(std::array::from_fn(|_| pixel())),
        shader_dir: PathBuf::from(SHADER_DIR),
    }
}

pub fn scene() -> SceneData {
    scene_with(1)
}

pub fn config(backend: BackendType, num_fish: usize) -> Config {
    let mut config = Config::for_backend(backend);
    config.num_fish = num_fish;
    config
}

pub fn recording_aquarium(
    config: Config,
    scene: SceneData,
) -> Result<Aquarium<RecordingBackend>, AquariumError> {
    let toggles = resolve_toggles(&config)?;
    Aquarium::init(
        config,
        toggles,
        move |_| Ok(scene),
        |config, toggles| RecordingBackend::new(config.backend, toggles),
    )
}

pub fn render_frames(aquarium: &mut Aquarium<RecordingBackend>, frames: usize) {
    for _ in 0..frames {
        let outcome = aquarium.render(FRAME).expect("frame failed");
        assert_eq!(outcome, FrameOutcome::Rendered);
    }
}

pub fn draw_count(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|command| matches!(command, Command::Draw { .. }))
        .count()
}

/// Pipeline labels of every draw, in submission order.
pub fn drawn_labels(commands: &[Command]) -> Vec<String> {
    let labels: HashMap<u64, String> = commands
        .iter()
        .filter_map(|command| match command {
            Command::CreatePipeline { id, label, .. } => Some((*id, label.clone())),
            _ => None,
        })
        .collect();
    commands
        .iter()
        .filter_map(|command| match command {
            Command::Draw { pipeline, .. } => labels.get(pipeline).cloned(),
            _ => None,
        })
        .collect()
}

/// Buffers, textures and a program for a model drawn with `program`, leaving out
/// `skip_buffer` and `skip_texture`.
pub fn model_inputs(
    backend: &mut RecordingBackend,
    program: ProgramName,
    skip_buffer: Option<BufferName>,
    skip_texture: Option<TextureSlot>,
) -> ModelInputs<RecordingBackend> {
    let mesh = quad_mesh();
    let mut vertex_buffers = HashMap::new();
    for &name in program.vertex_buffers() {
        if Some(name) == skip_buffer {
            continue;
        }
        let field = &mesh.fields[&name];
        let buffer = backend
            .create_buffer(&BufferDesc {
                label: name.key(),
                usage: BufferUsage::Vertex,
                contents: BufferContents::Init(bytemuck::cast_slice(&field.data)),
            })
            .unwrap();
        let format = field.format().unwrap();
        vertex_buffers.insert(name, VertexStream { buffer, format });
    }
    let index_buffer = (skip_buffer != Some(BufferName::Indices)).then(|| {
        backend
            .create_buffer(&BufferDesc {
                label: "indices",
                usage: BufferUsage::Index,
                contents: BufferContents::Init(bytemuck::cast_slice(&QUAD_INDICES)),
            })
            .unwrap()
    });
    let image = pixel();
    let mut textures = HashMap::new();
    for &slot in program.textures() {
        if Some(slot) == skip_texture {
            continue;
        }
        let texture = backend
            .create_texture(&TextureDesc {
                label: slot.key(),
                source: TextureSource::Image(&image),
                srgb: slot.is_srgb(),
            })
            .unwrap();
        textures.insert(slot, Rc::new(texture));
    }
    let program_handle = backend
        .create_program(Path::new("test.vert.wgsl"), Path::new("test.frag.wgsl"))
        .unwrap();
    ModelInputs {
        program_name: program,
        program: Rc::new(program_handle),
        vertex_buffers,
        index_buffer,
        index_count: QUAD_INDICES.len() as u32,
        textures,
        material: MaterialUniform::new(50.0, 1.0, true, [0.0; 4]),
    }
}

pub fn model_file_json() -> serde_json::Value {
    serde_json::json!({
        "models": [{
            "fields": {
                "position": { "numComponents": 3, "type": "Float32Array", "data": QUAD_POSITIONS },
                "normal": { "numComponents": 3, "type": "Float32Array", "data": QUAD_NORMALS },
                "texCoord": { "numComponents": 2, "type": "Float32Array", "data": QUAD_TEX_COORDS },
                "indices": { "numComponents": 3, "type": "Uint16Array", "data": QUAD_INDICES }
            },
            "textures": {
                "diffuse": DIFFUSE,
                "normalMap": NORMAL,
                "reflectionMap": REFLECTION
            }
        }]
    })
}

/// Write a minimal asset directory: every model as a quad, a few placed props,
/// three textures and, when `with_shaders`, the shaders shipped in `assets/`.
pub fn write_assets(dir: &Path, with_shaders: bool) {
    let model = model_file_json().to_string();
    for name in ModelName::ALL {
        std::fs::write(dir.join(format!("{}.js", name.file_stem())), &model).unwrap();
    }
    let identity: Vec<f32> = vec![
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];
    let placements = serde_json::json!({
        "objects": [
            { "name": "FloorBase_Baked", "worldMatrix": identity },
            { "name": "RockA", "worldMatrix": identity },
            { "name": "SeaweedA", "worldMatrix": identity },
            { "name": "SeaweedA", "worldMatrix": identity },
        ]
    });
    std::fs::write(dir.join(PLACEMENT_FILE), placements.to_string()).unwrap();
    for file_name in [DIFFUSE, NORMAL, REFLECTION] {
        pixel().save(dir.join(file_name)).unwrap();
    }

    if with_shaders {
        let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(SHADER_DIR);
        let target = dir.join(SHADER_DIR);
        std::fs::create_dir_all(&target).unwrap();
        for entry in std::fs::read_dir(source).unwrap() {
            let entry = entry.unwrap();
            std::fs::copy(entry.path(), target.join(entry.file_name())).unwrap();
        }
    }
}
