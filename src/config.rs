//! # Configuration Module
//!
//! Every tunable constant the streaming pipeline consumes lives in
//! [`StreamingConfig`]. The configuration is plain serde data so it can be
//! loaded from a JSON file or built in code; missing fields fall back to the
//! defaults below.
//!
//! ## Example
//! ```
//! use voxel_streaming::config::StreamingConfig;
//!
//! let config = StreamingConfig::from_json_str(r#"{ "render_distance": 2, "seed": 7 }"#).unwrap();
//! assert_eq!(config.render_distance, 2);
//! assert_eq!(config.world_height, 8);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::error::{Result, StreamingError};

/// Top level configuration of the streaming pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Edge length of one block in world units.
    pub block_size: f32,
    /// Radius, in chunks, of the square region kept loaded around the viewpoint.
    pub render_distance: i32,
    /// Extra chunks beyond the render distance before a loaded chunk is removed.
    pub unload_margin: i32,
    /// World height in chunks. Chunk layers run from 0 to `world_height - 1`.
    pub world_height: i32,
    /// World seed. Each noise field derives its own seed from it.
    pub seed: u32,
    /// Noise fields and thresholds used by terrain generation.
    pub terrain: TerrainConfig,
    /// What to do with faces on a boundary whose neighbor chunk is not loaded.
    pub boundary_policy: BoundaryPolicy,
    /// Thread counts and polling intervals.
    pub workers: WorkerConfig,
    /// Queue limits used for backpressure and frame budgeting.
    pub queue_limits: QueueLimits,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            block_size: 2.0,
            render_distance: 8,
            unload_margin: 1,
            world_height: 8,
            seed: 1337,
            terrain: TerrainConfig::default(),
            boundary_policy: BoundaryPolicy::default(),
            workers: WorkerConfig::default(),
            queue_limits: QueueLimits::default(),
        }
    }
}

impl StreamingConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StreamingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| StreamingError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded streaming configuration from {}", path.display());
        Ok(config)
    }

    /// Checks that every value is usable by the pipeline.
    pub fn validate(&self) -> Result<()> {
        if !(self.block_size > 0.0) {
            return Err(StreamingError::InvalidConfig(format!(
                "block_size must be positive, got {}",
                self.block_size
            )));
        }
        if self.render_distance < 0 {
            return Err(StreamingError::InvalidConfig(format!(
                "render_distance must not be negative, got {}",
                self.render_distance
            )));
        }
        if self.unload_margin < 0 {
            return Err(StreamingError::InvalidConfig(format!(
                "unload_margin must not be negative, got {}",
                self.unload_margin
            )));
        }
        if self.world_height < 1 {
            return Err(StreamingError::InvalidConfig(format!(
                "world_height must be at least 1, got {}",
                self.world_height
            )));
        }
        if self.workers.generator_threads == 0 || self.workers.builder_threads == 0 {
            return Err(StreamingError::InvalidConfig(
                "at least one generator and one builder thread are required".to_string(),
            ));
        }
        self.terrain.validate()
    }

    /// Distance, in chunks, past which a chunk counts as out of range.
    pub fn unload_distance(&self) -> i32 {
        self.render_distance + self.unload_margin
    }
}

/// Seed offset, octave count and frequency of one noise field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseFieldConfig {
    pub seed_offset: u32,
    pub octaves: usize,
    pub frequency: f64,
}

impl NoiseFieldConfig {
    fn validate(&self, name: &str) -> Result<()> {
        if self.octaves == 0 || !(self.frequency > 0.0) {
            return Err(StreamingError::InvalidConfig(format!(
                "noise field {name} needs at least one octave and a positive frequency"
            )));
        }
        Ok(())
    }
}

/// Noise fields and shaping constants of the terrain generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Low frequency field giving the surface height of each column.
    pub heightmap: NoiseFieldConfig,
    /// Higher frequency 3D field perturbing the surface.
    pub detail: NoiseFieldConfig,
    /// Field modulating the depth of the dirt layer.
    pub dirt_depth: NoiseFieldConfig,
    /// Ridged multifractal field carving caves.
    pub caves: NoiseFieldConfig,
    /// Lowest surface height, as a fraction of the world height.
    pub surface_base: f32,
    /// Range added on top of `surface_base` by the heightmap.
    pub surface_range: f32,
    /// Detail values above this cutoff leave the position empty.
    pub detail_cutoff: f32,
    /// Height, as a fraction of the world height, over which the detail field fades in.
    pub detail_gradient: f32,
    /// Blocks removed from a column's surface when the detail field hollows it.
    pub cliff_erosion: i32,
    /// Cave values above this threshold carve the position to air.
    pub cave_threshold: f32,
    /// Vertical stretch applied to the cave field sample position.
    pub cave_vertical_stretch: f64,
    /// Light accumulated per placed block in a column.
    pub light_step: f32,
    /// Random jitter, in blocks, applied to the dirt depth.
    pub dirt_jitter: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            heightmap: NoiseFieldConfig {
                seed_offset: 0,
                octaves: 4,
                frequency: 1.0 / 128.0,
            },
            detail: NoiseFieldConfig {
                seed_offset: 1,
                octaves: 4,
                frequency: 1.0 / 86.0,
            },
            dirt_depth: NoiseFieldConfig {
                seed_offset: 2,
                octaves: 4,
                frequency: 1.0 / 64.0,
            },
            caves: NoiseFieldConfig {
                seed_offset: 3,
                octaves: 4,
                frequency: 1.0 / 64.0,
            },
            surface_base: 0.3,
            surface_range: 0.2,
            detail_cutoff: 0.2,
            detail_gradient: 0.1,
            cliff_erosion: 6,
            cave_threshold: 0.8,
            cave_vertical_stretch: 1.5,
            light_step: 0.1,
            dirt_jitter: 2,
        }
    }
}

impl TerrainConfig {
    fn validate(&self) -> Result<()> {
        self.heightmap.validate("heightmap")?;
        self.detail.validate("detail")?;
        self.dirt_depth.validate("dirt_depth")?;
        self.caves.validate("caves")?;
        if !(self.detail_gradient > 0.0) {
            return Err(StreamingError::InvalidConfig(
                "terrain.detail_gradient must be positive".to_string(),
            ));
        }
        if self.dirt_jitter < 0 {
            return Err(StreamingError::InvalidConfig(
                "terrain.dirt_jitter must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decides whether a face on a chunk boundary is drawn when the neighbor chunk
/// on that side is not loaded yet.
///
/// `suppress_all` hides every such face and `suppress_top` hides the top face
/// while a single flag decides the other five sides. The default draws the
/// vertical faces and suppresses the four lateral ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryPolicy {
    /// Draw faces towards a missing neighbor along x or z.
    pub lateral: bool,
    /// Draw faces towards a missing neighbor above.
    pub top: bool,
    /// Draw faces towards a missing neighbor below.
    pub bottom: bool,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        Self {
            lateral: false,
            top: true,
            bottom: true,
        }
    }
}

impl BoundaryPolicy {
    /// Never draws a face towards a missing neighbor.
    pub fn suppress_all() -> Self {
        Self {
            lateral: false,
            top: false,
            bottom: false,
        }
    }

    /// Suppresses the top face and uses `others` for the remaining sides.
    pub fn suppress_top(others: bool) -> Self {
        Self {
            lateral: others,
            top: false,
            bottom: others,
        }
    }

    /// Whether a face on `side` is drawn when the neighbor there is missing.
    pub fn draws(&self, side: BlockSide) -> bool {
        match side {
            BlockSide::TOP => self.top,
            BlockSide::BOTTOM => self.bottom,
            _ => self.lateral,
        }
    }
}

/// Thread counts and polling intervals of the worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub generator_threads: usize,
    pub builder_threads: usize,
    /// Sleep, in milliseconds, when a worker finds its queue empty.
    pub idle_backoff_ms: u64,
    /// Sleep, in milliseconds, between two allocator ticks.
    pub allocator_tick_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            generator_threads: 2,
            builder_threads: 4,
            idle_backoff_ms: 5,
            allocator_tick_ms: 50,
        }
    }
}

/// Limits applied to the scheduling queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueLimits {
    /// While more chunks than this wait for generation, the allocator holds off
    /// on new movement slices.
    pub max_pending_generation: usize,
    /// Upper bound on built chunks uploaded per frame. `None` drains fully.
    pub max_uploads_per_frame: Option<usize>,
}

impl Default for QueueLimits {
    fn default() -> Self {
        Self {
            max_pending_generation: 16_384,
            max_uploads_per_frame: None,
        }
    }
}
