//! The scene orchestrator.
//!
//! [`Aquarium`] validates the configuration, creates a backend, turns the
//! loaded [`SceneData`] into initialised [`Model`]s and then renders one frame
//! per [`render`](Aquarium::render) call:
//!
//! ```text
//! quit requested? -> reset rng -> pre_frame (ring wait) -> fish come and go
//!   -> advance clocks, camera -> upload globals
//!   -> generic -> fish -> inner -> seaweed -> outside   (prepare, accumulate, draw)
//!   -> do_flush (submit + present) -> fps bookkeeping
//! ```
//!
//! The aquarium owns its models, the texture and program caches and the
//! backend, and releases them in that order.

use std::{collections::HashMap, rc::Rc};

use cgmath::Matrix4;
use instant::Duration;

use crate::{
    backend::{
        BufferContents, BufferDesc, BufferUsage, GraphicsBackend, TextureDesc, TextureSource,
        Toggles,
    },
    camera::{SceneGlobalState, ViewSettings},
    config::Config,
    data_structures::{
        catalog::{BufferName, ModelGroup, ModelInfo, ModelName, ProgramName, TextureSlot},
        instance::{InstanceData, InstanceRaw, MaterialUniform},
        model::{MAX_WORLD_INSTANCES, Model, ModelInputs, ModelKind, VertexStream},
    },
    error::{AquariumError, BackendError, ConfigError},
    fish::{
        FishAllocation, FishCountThresholds, FishPopulation, FrameRng, SPECIES, compute_pose,
        default_behaviors, species_index,
    },
    fps::FpsTimer,
    resources::{
        SceneData,
        mesh::MeshData,
        texture::{DEFAULT_NORMAL_MAP, SKYBOX, default_normal_map},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AquariumState {
    Configuring,
    ResourceLoading,
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// A quit request was honoured and the aquarium has shut down.
    Quit,
}

/// Cache key of a texture: its file name and whether it is sampled as sRGB.
type TextureKey = (String, bool);

pub struct Aquarium<B: GraphicsBackend> {
    // Release order on shutdown: models, caches, backend.
    models: Vec<Model<B>>,
    textures: HashMap<TextureKey, Rc<B::Texture>>,
    programs: HashMap<ProgramName, Rc<B::Program>>,
    backend: B,
    config: Config,
    settings: ViewSettings,
    toggles: Toggles,
    globals: SceneGlobalState,
    placements: HashMap<ModelName, Vec<Matrix4<f32>>>,
    thresholds: FishCountThresholds,
    allocation: FishAllocation,
    population: Option<FishPopulation>,
    rng: FrameRng,
    fps: FpsTimer,
    state: AquariumState,
}

impl<B: GraphicsBackend> Aquarium<B> {
    /// Create the backend and every renderable object.
    ///
    /// `toggles` come from [`resolve_toggles`](crate::config::resolve_toggles).
    /// They are checked against the backend's capabilities before
    /// `create_backend` is called, so an unsupported option never creates a
    /// backend or any object.
    pub fn init<L, C>(
        config: Config,
        toggles: Toggles,
        load_scene: L,
        create_backend: C,
    ) -> Result<Self, AquariumError>
    where
        L: FnOnce(&Config) -> anyhow::Result<SceneData>,
        C: FnOnce(&Config, Toggles) -> Result<B, BackendError>,
    {
        log::info!("{:?}: backend {}", AquariumState::Configuring, config.backend);
        if let Some(flag) = toggles.difference(config.backend.capabilities()).iter().next() {
            return Err(ConfigError::UnsupportedToggle {
                flag: flag.flag_name(),
                backend: config.backend,
            }
            .into());
        }
        let mut backend = create_backend(&config, toggles)?;
        log::info!(
            "{:?}: toggles {:?} of {:?}",
            AquariumState::ResourceLoading,
            toggles,
            backend.available_toggles()
        );

        let thresholds = FishCountThresholds::default();
        let allocation = FishAllocation::allocate(config.num_fish, &thresholds);
        let come_and_go = toggles.contains(Toggles::FISH_COME_AND_GO);
        let fish_capacity = if come_and_go {
            FishAllocation::capacity_up_to(config.num_fish, &thresholds)
        } else {
            allocation
        };
        log::info!("fish per species: {:?}", allocation.counts());

        let mut scene = load_scene(&config).map_err(AquariumError::Scene)?;
        let instanced_fish = toggles.contains(Toggles::INSTANCED_DRAWS);
        let settings = config.view_settings.clone();

        let mut textures = HashMap::new();
        let mut programs = HashMap::new();
        let mut models = Vec::new();
        for name in ModelName::ALL {
            let info = name.info();
            let is_fish = info.group == ModelGroup::Fish;
            let capacity = if is_fish {
                fish_capacity.count_for(name)
            } else {
                MAX_WORLD_INSTANCES
            };
            let placements = scene.placements_of(name).len();
            if is_fish && capacity == 0 {
                log::debug!("no fish of {}, skipping", name);
                continue;
            }
            if !is_fish && placements == 0 {
                log::debug!("{} is never placed, skipping", name);
                continue;
            }
            if placements > capacity {
                return Err(AquariumError::TooManyPlacements {
                    model: name,
                    placements,
                    capacity,
                });
            }
            let mesh = scene
                .meshes
                .get(&name)
                .ok_or(AquariumError::MissingMesh(name))?;

            let program = match programs.get(&info.program) {
                Some(program) => Rc::clone(program),
                None => {
                    let (vertex, fragment) = scene.shader_paths(info.program.file_stem());
                    let program = Rc::new(backend.create_program(&vertex, &fragment)?);
                    programs.insert(info.program, Rc::clone(&program));
                    program
                }
            };
            let inputs = model_inputs(
                &mut backend,
                &mut textures,
                &scene,
                &info,
                mesh,
                program,
                &settings,
            )?;

            let kind = ModelKind::for_group(info.group, instanced_fish);
            let blend = info.blend || toggles.contains(Toggles::ALPHA_BLENDING);
            let mut model = backend.create_model(name, kind, blend, capacity);
            model.init(&mut backend, inputs)?;
            models.push(model);
        }
        backend.flush_load_commands()?;

        let population =
            come_and_go.then(|| FishPopulation::new(config.num_fish, default_behaviors()));
        let placements = std::mem::take(&mut scene.placements);
        log::info!("{:?}: {} models", AquariumState::Running, models.len());
        Ok(Self {
            models,
            textures,
            programs,
            backend,
            config,
            settings,
            toggles,
            globals: SceneGlobalState::new(),
            placements,
            thresholds,
            allocation,
            population,
            rng: FrameRng::new(),
            fps: FpsTimer::new(),
            state: AquariumState::Running,
        })
    }

    /// Render one frame, `elapsed` after the previous one.
    pub fn render(&mut self, elapsed: Duration) -> Result<FrameOutcome, AquariumError> {
        if self.state == AquariumState::Terminated {
            return Ok(FrameOutcome::Quit);
        }
        if self.backend.should_quit() {
            self.shutdown();
            return Ok(FrameOutcome::Quit);
        }

        self.rng.reset();
        let slot = self.backend.pre_frame()?;

        if let Some(population) = self.population.as_mut() {
            if let Some(live) = population.tick() {
                self.allocation = FishAllocation::allocate(live, &self.thresholds);
                log::debug!("fish come and go: {} live", live);
            }
        }

        let aspect = self.backend.aspect_ratio();
        self.globals.advance(elapsed.as_secs_f32(), &self.settings, aspect);
        self.backend
            .update_global_uniforms(&self.globals.uniforms(&self.settings));

        let clock = self.globals.clock;
        let view_projection = self.globals.view_projection;
        for model in self.models.iter_mut() {
            model.prepare_for_frame(slot)?;
            match model.kind() {
                ModelKind::Fish | ModelKind::FishInstanced => {
                    let Some(species) = species_index(model.name()) else {
                        continue;
                    };
                    for index in 0..self.allocation.count(species) {
                        let pose = compute_pose(
                            &SPECIES[species],
                            &self.settings,
                            clock,
                            index,
                            &mut self.rng,
                        );
                        model.accumulate_instance(InstanceData::Fish(pose.into()))?;
                    }
                }
                kind => {
                    let placements = self
                        .placements
                        .get(&model.name())
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    for (index, world) in placements.iter().enumerate() {
                        let extra = if kind == ModelKind::Seaweed {
                            [clock + index as f32, 0.0, 0.0, 0.0]
                        } else {
                            [0.0; 4]
                        };
                        model.accumulate_instance(InstanceData::World(InstanceRaw::new(
                            *world,
                            view_projection,
                            extra,
                        )))?;
                    }
                }
            }
            model.draw(&mut self.backend)?;
        }

        self.backend.do_flush()?;

        if self.fps.update(elapsed) && self.config.print_log {
            log::info!("{:.1} fps", self.fps.average_fps());
        }
        if let Some(test_time) = self.config.test_time {
            if self.fps.elapsed().as_secs_f64() >= test_time && !self.backend.should_quit() {
                log::info!(
                    "test finished after {} frames: average {:.1} fps",
                    self.fps.frames(),
                    self.fps.average_fps()
                );
                self.backend.request_quit();
            }
        }
        Ok(FrameOutcome::Rendered)
    }

    /// Ask the loop to stop. Honoured at the top of the next frame.
    pub fn request_quit(&mut self) {
        self.backend.request_quit();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
    }

    /// Release models, then caches, then the backend. Idempotent.
    pub fn shutdown(&mut self) {
        if self.state == AquariumState::Terminated {
            return;
        }
        for model in self.models.iter_mut() {
            model.destroy();
        }
        self.models.clear();
        self.textures.clear();
        self.programs.clear();
        self.backend.terminate();
        self.state = AquariumState::Terminated;
        log::info!("{:?}", AquariumState::Terminated);
    }

    pub fn state(&self) -> AquariumState {
        self.state
    }

    pub fn toggles(&self) -> Toggles {
        self.toggles
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn models(&self) -> &[Model<B>] {
        &self.models
    }

    pub fn model(&self, name: ModelName) -> Option<&Model<B>> {
        self.models.iter().find(|model| model.name() == name)
    }

    pub fn allocation(&self) -> &FishAllocation {
        &self.allocation
    }

    pub fn live_fish(&self) -> usize {
        self.allocation.total()
    }

    pub fn globals(&self) -> &SceneGlobalState {
        &self.globals
    }

    pub fn fps(&self) -> &FpsTimer {
        &self.fps
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<B: GraphicsBackend> Drop for Aquarium<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn material_for(info: &ModelInfo, settings: &ViewSettings) -> MaterialUniform {
    match info.group {
        ModelGroup::Fish => {
            let extra = species_index(info.name).map_or([0.0; 4], |index| {
                let species = &SPECIES[index];
                [
                    species.fish_length,
                    species.fish_wave_length,
                    species.fish_bend_amount,
                    0.0,
                ]
            });
            MaterialUniform::new(5.0, 0.3, info.fog, extra)
        }
        ModelGroup::Inner => MaterialUniform::new(
            50.0,
            1.0,
            info.fog,
            [
                settings.eta,
                settings.tank_color_fudge,
                settings.refraction_fudge,
                0.0,
            ],
        ),
        ModelGroup::Generic | ModelGroup::Seaweed | ModelGroup::Outside => {
            MaterialUniform::new(50.0, 1.0, info.fog, [0.0; 4])
        }
    }
}

/// Upload a mesh's buffers and gather the textures its program binds.
///
/// Buffers and textures the mesh lacks are left out; [`Model::init`] reports
/// them.
fn model_inputs<B: GraphicsBackend>(
    backend: &mut B,
    textures: &mut HashMap<TextureKey, Rc<B::Texture>>,
    scene: &SceneData,
    info: &ModelInfo,
    mesh: &MeshData,
    program: Rc<B::Program>,
    settings: &ViewSettings,
) -> Result<ModelInputs<B>, AquariumError> {
    let name = info.name;
    let mut vertex_buffers = HashMap::new();
    for &buffer_name in info.program.vertex_buffers() {
        let Some(field) = mesh.fields.get(&buffer_name) else {
            continue;
        };
        let format = field.format().ok_or_else(|| {
            AquariumError::Scene(anyhow::anyhow!(
                "{} field '{}' has {} components",
                name,
                buffer_name.key(),
                field.num_components
            ))
        })?;
        let buffer = backend.create_buffer(&BufferDesc {
            label: &format!("{} {}", name, buffer_name.key()),
            usage: BufferUsage::Vertex,
            contents: BufferContents::Init(bytemuck::cast_slice(&field.data)),
        })?;
        vertex_buffers.insert(buffer_name, VertexStream { buffer, format });
    }
    let index_buffer = mesh
        .indices
        .as_ref()
        .map(|indices| {
            backend.create_buffer(&BufferDesc {
                label: &format!("{} {}", name, BufferName::Indices.key()),
                usage: BufferUsage::Index,
                contents: BufferContents::Init(bytemuck::cast_slice(indices)),
            })
        })
        .transpose()?;

    let mut bound = HashMap::new();
    for &slot in info.program.textures() {
        if let Some(texture) = cached_texture(backend, textures, scene, mesh, slot)? {
            bound.insert(slot, texture);
        }
    }

    Ok(ModelInputs {
        program_name: info.program,
        program,
        vertex_buffers,
        index_buffer,
        index_count: mesh.index_count(),
        textures: bound,
        material: material_for(info, settings),
    })
}

fn cached_texture<B: GraphicsBackend>(
    backend: &mut B,
    cache: &mut HashMap<TextureKey, Rc<B::Texture>>,
    scene: &SceneData,
    mesh: &MeshData,
    slot: TextureSlot,
) -> Result<Option<Rc<B::Texture>>, BackendError> {
    let file_name = match (slot, mesh.textures.get(&slot)) {
        (TextureSlot::Skybox, _) => SKYBOX,
        (_, Some(file_name)) => file_name.as_str(),
        (TextureSlot::Diffuse, None) => return Ok(None),
        // Optional maps fall back to a flat normal map.
        (TextureSlot::NormalMap | TextureSlot::ReflectionMap, None) => DEFAULT_NORMAL_MAP,
    };
    let key = (file_name.to_string(), slot.is_srgb());
    if let Some(texture) = cache.get(&key) {
        return Ok(Some(Rc::clone(texture)));
    }

    let flat;
    let source = match file_name {
        SKYBOX => match &scene.skybox {
            Some(faces) => TextureSource::Cube(faces.each_ref()),
            None => return Ok(None),
        },
        DEFAULT_NORMAL_MAP => {
            flat = default_normal_map(1, 1);
            TextureSource::Image(&flat)
        }
        _ => match scene.images.get(file_name) {
            Some(img) => TextureSource::Image(img),
            None => {
                log::warn!("image '{}' was not loaded", file_name);
                return Ok(None);
            }
        },
    };
    let texture = Rc::new(backend.create_texture(&TextureDesc {
        label: file_name,
        source,
        srgb: slot.is_srgb(),
    })?);
    cache.insert(key, Rc::clone(&texture));
    Ok(Some(texture))
}
