//! # Terrain Noise
//!
//! Layered noise fields turning a chunk coordinate into blocks:
//!
//! - a low frequency fBm heightmap giving the surface height of each column
//! - a 3D fBm detail field that perturbs the surface and erodes cliffs
//! - a 2D fBm field modulating the depth of the dirt layer
//! - a ridged multifractal cave field, stretched vertically, carving tunnels
//!
//! Every field is seeded from the world seed plus its own offset, so a fixed seed
//! and chunk coordinate always produce the same blocks.

use std::collections::BTreeMap;

use cgmath::Point3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin, RidgedMulti};

use super::column_state::ColumnSnapshot;
use crate::config::{NoiseFieldConfig, TerrainConfig};
use crate::engine_state::voxels::{
    block::{block_type::BlockType, Block},
    chunk::{ChunkCoordinate, LocalPosition, CHUNK_DIMENSION},
};

fn fbm(seed: u32, field: &NoiseFieldConfig) -> Fbm<Perlin> {
    Fbm::<Perlin>::new(seed.wrapping_add(field.seed_offset))
        .set_octaves(field.octaves)
        .set_frequency(field.frequency)
}

fn ridged(seed: u32, field: &NoiseFieldConfig) -> RidgedMulti<Perlin> {
    RidgedMulti::<Perlin>::new(seed.wrapping_add(field.seed_offset))
        .set_octaves(field.octaves)
        .set_frequency(field.frequency)
}

/// Maps a noise sample from `-1..1` to `0..1`.
fn normalize(value: f64) -> f32 {
    ((value + 1.0) / 2.0) as f32
}

/// The noise fields of one world seed.
pub struct TerrainNoise {
    seed: u32,
    config: TerrainConfig,
    /// World height in blocks.
    world_height_blocks: f32,
    /// Number of chunk layers.
    world_height: i32,
    heightmap: Fbm<Perlin>,
    detail: Fbm<Perlin>,
    dirt_depth: Fbm<Perlin>,
    caves: RidgedMulti<Perlin>,
}

impl TerrainNoise {
    pub fn new(seed: u32, config: &TerrainConfig, world_height: i32) -> Self {
        Self {
            seed,
            config: config.clone(),
            world_height_blocks: (world_height * CHUNK_DIMENSION) as f32,
            world_height,
            heightmap: fbm(seed, &config.heightmap),
            detail: fbm(seed, &config.detail),
            dirt_depth: fbm(seed, &config.dirt_depth),
            caves: ridged(seed, &config.caves),
        }
    }

    pub fn world_height(&self) -> i32 {
        self.world_height
    }

    /// Generates the chunk at `position` starting from `snapshot`, and advances
    /// `snapshot` to the state entering the layer below.
    pub fn generate_layer(
        &self,
        position: ChunkCoordinate,
        snapshot: &mut ColumnSnapshot,
    ) -> BTreeMap<LocalPosition, Block> {
        let mut blocks = BTreeMap::new();
        self.walk_layer(position, snapshot, |local, block| {
            blocks.insert(local, block);
        });
        blocks
    }

    /// Recomputes the snapshot entering the chunk at `position` by walking every
    /// layer above it.
    pub fn replay_snapshot(&self, position: ChunkCoordinate) -> ColumnSnapshot {
        let mut snapshot = ColumnSnapshot::fresh();
        for layer in (position.y + 1..self.world_height).rev() {
            let above = Point3::new(position.x, layer, position.z);
            self.walk_layer(above, &mut snapshot, |_, _| {});
        }
        snapshot
    }

    /// Generates the chunk at `position` without any stored column state.
    pub fn generate_chunk(&self, position: ChunkCoordinate) -> BTreeMap<LocalPosition, Block> {
        let mut snapshot = self.replay_snapshot(position);
        self.generate_layer(position, &mut snapshot)
    }

    /// Seed of the dirt jitter of one chunk layer of one column.
    fn jitter_seed(&self, position: ChunkCoordinate) -> u64 {
        (self.seed as u64)
            ^ (position.x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (position.z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ (position.y as u64).wrapping_mul(0x1656_67B1_9E37_79F9)
    }

    fn walk_layer(
        &self,
        position: ChunkCoordinate,
        snapshot: &mut ColumnSnapshot,
        mut place: impl FnMut(LocalPosition, Block),
    ) {
        let config = &self.config;
        let world_height = self.world_height_blocks;
        let mut rng = fastrand::Rng::with_seed(self.jitter_seed(position));

        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                let world_x = (position.x * CHUNK_DIMENSION + x) as f64;
                let world_z = (position.z * CHUNK_DIMENSION + z) as f64;

                let height = normalize(self.heightmap.get([world_x, 0.0, world_z]));
                let surface_level =
                    world_height * (config.surface_base + height * config.surface_range);

                let dirt_depth = normalize(self.dirt_depth.get([world_x, 0.0, world_z]));
                let dirt_depth =
                    (CHUNK_DIMENSION / 8) as f32 + dirt_depth * CHUNK_DIMENSION as f32;

                for y in (0..CHUNK_DIMENSION).rev() {
                    let world_y = position.y * CHUNK_DIMENSION + y;
                    let y_global = world_y as f32;

                    let mut detail = normalize(self.detail.get([world_x, world_y as f64, world_z]));
                    if y_global < surface_level {
                        detail = 0.0;
                    } else {
                        detail *= (y_global - surface_level) / (world_height * config.detail_gradient);
                    }

                    if detail > config.detail_cutoff {
                        if y_global > surface_level {
                            if let Some(surface) = snapshot.surface(x, z) {
                                if surface as f32 > y_global {
                                    let mut eroded = surface - config.cliff_erosion;
                                    if (eroded as f32) < y_global {
                                        eroded = world_y - 1;
                                    }
                                    snapshot.set_surface(x, z, Some(eroded));
                                }
                            }
                        }
                        continue;
                    }

                    let depth = match snapshot.surface(x, z) {
                        None if y_global > surface_level => {
                            snapshot.set_surface(x, z, Some(world_y));
                            0.0
                        }
                        surface => surface.unwrap_or(0) as f32 - y_global,
                    };

                    let mut cave = self.caves.get([
                        world_x,
                        world_y as f64 * config.cave_vertical_stretch,
                        world_z,
                    ]) as f32;
                    let band = (CHUNK_DIMENSION * 2) as f32;
                    let depth_clamped = depth.clamp(4.0, band) / band;
                    cave *= 0.9 + depth_clamped * 0.1;
                    if cave > config.cave_threshold {
                        continue;
                    }

                    let mut light = snapshot.light(x, z);
                    if light > 1.0 {
                        light = 1.0;
                        snapshot.set_light(x, z, 1.0);
                    } else if light < 1.0 {
                        snapshot.set_light(x, z, light + config.light_step);
                    }

                    let jitter = if config.dirt_jitter > 0 {
                        rng.i32(-config.dirt_jitter..config.dirt_jitter)
                    } else {
                        0
                    };
                    let block_type = if depth < 1.0 {
                        BlockType::GRASS
                    } else if depth < dirt_depth + jitter as f32 {
                        BlockType::DIRT
                    } else {
                        BlockType::STONE
                    };

                    if let Some(local) = LocalPosition::new(x, y, z) {
                        place(local, Block::new(block_type, 1.0 - light));
                    }
                }
            }
        }
    }
}
