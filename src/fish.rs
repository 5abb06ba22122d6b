//! Fish species, population split and procedural motion.
//!
//! Fish do not simulate anything: every frame each fish's pose is a closed-form
//! function of the scene clock, its index within its species and a handful of
//! random jitters. The jitters come from a [`FrameRng`] that is reset to the
//! same seed at the top of every frame and consumed in species, then instance
//! order, so a given fish draws the same jitters every frame.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{camera::ViewSettings, data_structures::catalog::ModelName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesInfo {
    pub model: ModelName,
    pub class: SizeClass,
    pub speed: f32,
    pub speed_range: f32,
    pub radius: f32,
    pub radius_range: f32,
    pub tail_speed: f32,
    pub height_offset: f32,
    pub height_range: f32,
    pub fish_length: f32,
    pub fish_wave_length: f32,
    pub fish_bend_amount: f32,
}

pub const SPECIES_COUNT: usize = 5;

pub const SPECIES: [SpeciesInfo; SPECIES_COUNT] = [
    SpeciesInfo {
        model: ModelName::SmallFishA,
        class: SizeClass::Small,
        speed: 1.0,
        speed_range: 1.5,
        radius: 30.0,
        radius_range: 25.0,
        tail_speed: 10.0,
        height_offset: 0.0,
        height_range: 16.0,
        fish_length: 10.0,
        fish_wave_length: 1.0,
        fish_bend_amount: 2.0,
    },
    SpeciesInfo {
        model: ModelName::MediumFishA,
        class: SizeClass::Medium,
        speed: 1.0,
        speed_range: 2.0,
        radius: 10.0,
        radius_range: 20.0,
        tail_speed: 1.0,
        height_offset: 0.0,
        height_range: 16.0,
        fish_length: 10.0,
        fish_wave_length: -2.0,
        fish_bend_amount: 2.0,
    },
    SpeciesInfo {
        model: ModelName::MediumFishB,
        class: SizeClass::Medium,
        speed: 0.5,
        speed_range: 4.0,
        radius: 10.0,
        radius_range: 20.0,
        tail_speed: 3.0,
        height_offset: -8.0,
        height_range: 5.0,
        fish_length: 10.0,
        fish_wave_length: -2.0,
        fish_bend_amount: 2.0,
    },
    SpeciesInfo {
        model: ModelName::BigFishA,
        class: SizeClass::Big,
        speed: 0.5,
        speed_range: 0.5,
        radius: 50.0,
        radius_range: 3.0,
        tail_speed: 1.5,
        height_offset: 0.0,
        height_range: 16.0,
        fish_length: 10.0,
        fish_wave_length: -1.0,
        fish_bend_amount: 0.5,
    },
    SpeciesInfo {
        model: ModelName::BigFishB,
        class: SizeClass::Big,
        speed: 0.5,
        speed_range: 0.5,
        radius: 45.0,
        radius_range: 3.0,
        tail_speed: 1.0,
        height_offset: 0.0,
        height_range: 16.0,
        fish_length: 10.0,
        fish_wave_length: -0.7,
        fish_bend_amount: 0.3,
    },
];

pub fn species_index(model: ModelName) -> Option<usize> {
    SPECIES.iter().position(|species| species.model == model)
}

/// Population thresholds that steer how a total is split across size classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FishCountThresholds {
    pub small_threshold: usize,
    pub medium_threshold: usize,
    pub big_threshold: usize,
    pub medium_count_small: usize,
    pub medium_count_big: usize,
}

impl Default for FishCountThresholds {
    fn default() -> Self {
        Self {
            small_threshold: 100,
            medium_threshold: 1000,
            big_threshold: 10000,
            medium_count_small: 80,
            medium_count_big: 160,
        }
    }
}

/// Per-species fish counts, indexed like [`SPECIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FishAllocation {
    counts: [usize; SPECIES_COUNT],
}

impl FishAllocation {
    /// Split `total` across species: big species first, then medium, the
    /// single small species takes the remainder.
    pub fn allocate(total: usize, thresholds: &FishCountThresholds) -> Self {
        let mut counts = [0; SPECIES_COUNT];
        let mut left = total;

        for class in [SizeClass::Big, SizeClass::Medium, SizeClass::Small] {
            for (index, species) in SPECIES.iter().enumerate() {
                if species.class != class {
                    continue;
                }
                let wanted = match class {
                    SizeClass::Big => {
                        if total < thresholds.small_threshold {
                            1
                        } else {
                            2
                        }
                    }
                    SizeClass::Medium => {
                        if total < thresholds.medium_threshold {
                            total / 10
                        } else if total < thresholds.big_threshold {
                            thresholds.medium_count_small
                        } else {
                            thresholds.medium_count_big
                        }
                    }
                    SizeClass::Small => left,
                };
                let count = wanted.min(left);
                counts[index] = count;
                left -= count;
            }
        }

        Self { counts }
    }

    /// Elementwise maximum of [`allocate`](Self::allocate) over `0..=max_total`.
    ///
    /// Between thresholds every species count is non-decreasing, except the
    /// small species which dips by one whenever `total / 10` steps up. The
    /// maximum is therefore reached at `max_total`, just before it, or on
    /// either side of a threshold.
    pub fn capacity_up_to(max_total: usize, thresholds: &FishCountThresholds) -> Self {
        let mut candidates = vec![max_total, max_total.saturating_sub(1)];
        for threshold in [
            thresholds.small_threshold,
            thresholds.medium_threshold,
            thresholds.big_threshold,
        ] {
            candidates.extend([threshold.saturating_sub(1), threshold]);
        }

        let mut counts = [0; SPECIES_COUNT];
        for total in candidates.into_iter().filter(|&total| total <= max_total) {
            let allocation = Self::allocate(total, thresholds);
            for (capacity, count) in counts.iter_mut().zip(allocation.counts) {
                *capacity = (*capacity).max(count);
            }
        }
        Self { counts }
    }

    pub fn count(&self, species: usize) -> usize {
        self.counts[species]
    }

    pub fn count_for(&self, model: ModelName) -> usize {
        species_index(model).map_or(0, |index| self.counts[index])
    }

    pub fn class_total(&self, class: SizeClass) -> usize {
        SPECIES
            .iter()
            .zip(self.counts)
            .filter(|(species, _)| species.class == class)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn counts(&self) -> [usize; SPECIES_COUNT] {
        self.counts
    }
}

const FISH_SEED: u64 = 0x5EED_F15E;

/// The per-frame jitter source.
#[derive(Debug, Clone)]
pub struct FrameRng {
    rng: StdRng,
}

impl FrameRng {
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(FISH_SEED),
        }
    }

    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(FISH_SEED);
    }

    /// Uniform in `[0, 1)`.
    pub fn next_unit(&mut self) -> f32 {
        self.rng.gen_range(0.0..1.0)
    }
}

impl Default for FrameRng {
    fn default() -> Self {
        Self::new()
    }
}

/// One fish's pose for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FishInstanceState {
    pub world_position: [f32; 3],
    pub scale: f32,
    pub next_position: [f32; 3],
    /// Tail phase in `[0, 2π)`.
    pub time: f32,
}

const TAIL_OFFSET_MULT: f32 = 1.0;

/// Pose of fish `index` of `species` at scene time `clock`. Draws exactly
/// five values from `rng`.
pub fn compute_pose(
    species: &SpeciesInfo,
    settings: &ViewSettings,
    clock: f32,
    index: usize,
    rng: &mut FrameRng,
) -> FishInstanceState {
    let i = index as f32;
    let fish_clock = clock * settings.fish_speed + i * settings.fish_offset;
    let height = settings.fish_height + species.height_offset;
    let height_range = settings.fish_height_range * species.height_range;
    let tail_speed = species.tail_speed * settings.fish_tail_speed;

    let speed = species.speed + rng.next_unit() * species.speed_range;
    let scale = 1.0 + rng.next_unit();
    let x_radius = species.radius + rng.next_unit() * species.radius_range;
    let y_radius = 2.0 + rng.next_unit() * height_range;
    let z_radius = species.radius + rng.next_unit() * species.radius_range;

    let speed_clock = fish_clock * speed;
    let x_clock = speed_clock * settings.fish_x_clock;
    let y_clock = speed_clock * settings.fish_y_clock;
    let z_clock = speed_clock * settings.fish_z_clock;

    FishInstanceState {
        world_position: [
            x_clock.sin() * x_radius,
            y_clock.sin() * y_radius + height,
            z_clock.cos() * z_radius,
        ],
        scale,
        next_position: [
            (x_clock - 0.04).sin() * x_radius,
            (y_clock - 0.01).sin() * y_radius + height,
            (z_clock - 0.04).cos() * z_radius,
        ],
        time: ((clock + i * TAIL_OFFSET_MULT) * tail_speed * speed).rem_euclid(TAU),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorOp {
    Add,
    Remove,
}

/// After `frames` frames, add or remove `count` fish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FishBehavior {
    pub frames: u32,
    pub op: BehaviorOp,
    pub count: usize,
}

pub fn default_behaviors() -> Vec<FishBehavior> {
    vec![
        FishBehavior {
            frames: 200,
            op: BehaviorOp::Remove,
            count: 100,
        },
        FishBehavior {
            frames: 200,
            op: BehaviorOp::Add,
            count: 100,
        },
    ]
}

/// The live fish count when fish come and go. Cycles through its schedule
/// forever and clamps the count to `[0, max]`.
#[derive(Debug, Clone)]
pub struct FishPopulation {
    max: usize,
    live: usize,
    schedule: Vec<FishBehavior>,
    cursor: usize,
    frames_waited: u32,
}

impl FishPopulation {
    pub fn new(max: usize, schedule: Vec<FishBehavior>) -> Self {
        Self {
            max,
            live: max,
            schedule,
            cursor: 0,
            frames_waited: 0,
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Advance one frame. Returns the new live count when it changed.
    pub fn tick(&mut self) -> Option<usize> {
        let behavior = *self.schedule.get(self.cursor)?;
        self.frames_waited += 1;
        if self.frames_waited < behavior.frames {
            return None;
        }
        self.frames_waited = 0;
        self.cursor = (self.cursor + 1) % self.schedule.len();

        let before = self.live;
        self.live = match behavior.op {
            BehaviorOp::Add => self.live.saturating_add(behavior.count).min(self.max),
            BehaviorOp::Remove => self.live.saturating_sub(behavior.count),
        };
        (self.live != before).then_some(self.live)
    }
}
