//! # World Module
//!
//! This module provides the `World` struct which owns the shared chunk map and
//! every queue between the streaming stages. It is the only writer of the chunk
//! map and the only caller of the presentation layer, and it runs once per
//! frame on the consuming thread.
//!
//! ## Architecture
//!
//! ```text
//!  ChunkAllocator ──to_generate──▶ ChunkGenerator ──to_build──▶ ChunkBuilder
//!        │                                                         │
//!        └──────────── removals ──▶ World ◀──── uploads ───────────┘
//! ```
//!
//! The workers are created by World (`chunk_allocator`, `chunk_generator`,
//! `chunk_builder`) so that they share its map, region and queues, and are then
//! either handed to a `WorkerPool` or polled directly.
//!
//! ## Frame Processing
//!
//! 1. Drain the removal channel: detach and release geometry, erase the chunk
//! 2. Drain the upload channel (optionally bounded per frame):
//!    - a chunk new to the map is registered, uploaded and attached, and its
//!      loaded neighbors are marked Dirty and rebuilt, since the new chunk may
//!      hide or reveal their boundary faces
//!    - a chunk already in the map only has its buffers refreshed
//!    - results for removed chunks, stale first builds and duplicates of a
//!      coordinate held by another chunk object are discarded

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use cgmath::Point3;
use log::{debug, info, trace, warn};
use web_time::Instant;

use crate::config::StreamingConfig;
use crate::core::{MtResource, SharedPriorityQueue};
use crate::engine_state::presentation::PresentationLayer;
use crate::engine_state::rendering::meshing::{BuiltChunkResult, ChunkBuilder};
use crate::engine_state::viewpoint::Viewpoint;
use crate::error::{invariant_violation, Result};

use super::allocation::ChunkAllocator;
use super::block::{block_side::BlockSide, Block};
use super::chunk::{
    chunk_coordinate_of, chunk_placement, neighbor_coordinate, Chunk, ChunkCoordinate,
    LocalPosition, CHUNK_DIMENSION,
};
use super::generation::{column_state::ColumnStates, terrain::TerrainNoise, ChunkGenerator};
use super::region::{build_priority, StreamingRegion};

/// The shared chunk map. Written by World only; read by the builder and the allocator.
pub type ChunkMap = MtResource<HashMap<ChunkCoordinate, MtResource<Chunk>>>;

/// What one call to [`World::update`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Chunks erased from the map.
    pub removed: usize,
    /// Chunks registered for the first time.
    pub uploaded: usize,
    /// Rebuilt chunks whose buffers were refreshed in place.
    pub refreshed: usize,
    /// Neighbors marked Dirty because a chunk appeared next to them.
    pub neighbor_rebuilds: usize,
    /// Build results thrown away.
    pub discarded: usize,
    pub elapsed: Duration,
}

impl FrameReport {
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.uploaded == 0 && self.refreshed == 0 && self.discarded == 0
    }
}

/// Owner of the shared chunk map and the inter-stage queues.
///
/// # Examples
///
/// ```
/// use voxel_streaming::config::StreamingConfig;
/// use voxel_streaming::engine_state::viewpoint::Viewpoint;
/// use voxel_streaming::engine_state::voxels::world::World;
///
/// let config = StreamingConfig {
///     render_distance: 0,
///     world_height: 1,
///     ..StreamingConfig::default()
/// };
/// let world = World::new(config, Viewpoint::default()).unwrap();
/// assert_eq!(world.chunk_count(), 0);
/// ```
pub struct World {
    config: StreamingConfig,
    map: ChunkMap,
    region: MtResource<StreamingRegion>,
    terrain: Arc<TerrainNoise>,
    columns: Arc<ColumnStates>,
    to_generate: SharedPriorityQueue<MtResource<Chunk>>,
    to_build: SharedPriorityQueue<MtResource<Chunk>>,
    upload_sender: Sender<BuiltChunkResult>,
    uploads: Receiver<BuiltChunkResult>,
    removal_sender: Sender<MtResource<Chunk>>,
    removals: Receiver<MtResource<Chunk>>,
    viewpoint: Viewpoint,
}

impl World {
    /// Creates an empty world centered on the chunk containing `viewpoint`.
    ///
    /// Nothing is enqueued until the allocator's first tick.
    pub fn new(config: StreamingConfig, viewpoint: Viewpoint) -> Result<Self> {
        config.validate()?;

        let center = chunk_coordinate_of(viewpoint.position(), config.block_size);
        let terrain = Arc::new(TerrainNoise::new(
            config.seed,
            &config.terrain,
            config.world_height,
        ));
        let (upload_sender, uploads) = channel();
        let (removal_sender, removals) = channel();

        info!(
            "Created world around chunk {center:?}: render distance {}, height {}, seed {}",
            config.render_distance, config.world_height, config.seed
        );

        Ok(World {
            config,
            map: MtResource::new(HashMap::new()),
            region: MtResource::new(StreamingRegion::new(center)),
            terrain,
            columns: Arc::new(ColumnStates::new()),
            to_generate: SharedPriorityQueue::new(),
            to_build: SharedPriorityQueue::new(),
            upload_sender,
            uploads,
            removal_sender,
            removals,
            viewpoint,
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn viewpoint(&self) -> &Viewpoint {
        &self.viewpoint
    }

    /// The chunk the allocator currently centers the region on.
    pub fn region_center(&self) -> ChunkCoordinate {
        self.region.get().center()
    }

    /// Runs one frame: removals first, then uploads.
    pub fn update(&mut self, presentation: &mut dyn PresentationLayer) -> FrameReport {
        let started = Instant::now();
        let mut report = FrameReport::default();

        self.process_removals(presentation, &mut report);
        self.process_uploads(presentation, &mut report);

        report.elapsed = started.elapsed();
        if !report.is_empty() {
            debug!(
                "Frame: {} uploaded, {} refreshed, {} removed, {} neighbor rebuilds, {} discarded in {:?}",
                report.uploaded,
                report.refreshed,
                report.removed,
                report.neighbor_rebuilds,
                report.discarded,
                report.elapsed
            );
        }
        report
    }

    fn process_removals(&mut self, presentation: &mut dyn PresentationLayer, report: &mut FrameReport) {
        while let Ok(chunk) = self.removals.try_recv() {
            let position = chunk.get().position;

            let erased = {
                let mut map = self.map.get_mut();
                match map.get(&position).map(|entry| entry.ptr_eq(&chunk)) {
                    Some(true) => {
                        map.remove(&position);
                        true
                    }
                    Some(false) => {
                        trace!("Chunk {position:?} was already replaced, skipping removal");
                        false
                    }
                    None => {
                        invariant_violation(&format!(
                            "removal requested for chunk {position:?} which is not in the map"
                        ));
                        false
                    }
                }
            };
            if !erased {
                continue;
            }

            Self::release_chunk(presentation, &chunk);
            debug!("Removed chunk {position:?}");
            report.removed += 1;
        }
    }

    fn process_uploads(&mut self, presentation: &mut dyn PresentationLayer, report: &mut FrameReport) {
        let budget = self
            .config
            .queue_limits
            .max_uploads_per_frame
            .unwrap_or(usize::MAX);

        for _ in 0..budget {
            let Ok(result) = self.uploads.try_recv() else {
                break;
            };
            self.process_upload(result, presentation, report);
        }
    }

    fn process_upload(
        &mut self,
        result: BuiltChunkResult,
        presentation: &mut dyn PresentationLayer,
        report: &mut FrameReport,
    ) {
        let BuiltChunkResult {
            chunk,
            position,
            mesh,
            neighbors,
        } = result;

        if chunk.get().is_removal_requested() {
            trace!("Discarded mesh of chunk {position:?}, removal requested");
            report.discarded += 1;
            return;
        }

        let existing = self.map.get().get(&position).cloned();
        match existing {
            Some(existing) if existing.ptr_eq(&chunk) => {
                let Some(handles) = chunk.get().geometry() else {
                    invariant_violation(&format!("loaded chunk {position:?} has no geometry"));
                    return;
                };
                presentation.upload_geometry(handles, &mesh.vertices, &mesh.indices);
                debug!("Refreshed chunk {position:?}");
                report.refreshed += 1;
                return;
            }
            Some(existing) if existing.get().is_removal_requested() => {
                // The old chunk left and came back into range before its removal was processed.
                self.map.get_mut().remove(&position);
                Self::release_chunk(presentation, &existing);
                trace!("Replaced chunk {position:?} awaiting removal");
            }
            Some(_) => {
                warn!("Discarded duplicate build of chunk {position:?}");
                self.region.get_mut().clear_pending(position);
                report.discarded += 1;
                return;
            }
            None => {
                if self
                    .region
                    .get_mut()
                    .drop_if_stale(position, self.config.unload_distance())
                {
                    trace!("Discarded mesh of chunk {position:?}, out of range");
                    report.discarded += 1;
                    return;
                }
            }
        }

        let handles = presentation.create_geometry();
        presentation.upload_geometry(handles, &mesh.vertices, &mesh.indices);
        presentation.attach_chunk(
            position,
            chunk_placement(position, self.config.block_size),
            handles,
        );
        chunk.get_mut().set_geometry(handles);

        {
            let mut map = self.map.get_mut();
            map.insert(position, chunk.clone());
            self.region.get_mut().clear_pending(position);
        }
        debug!(
            "Uploaded chunk {position:?} with {} indices",
            mesh.indices.len()
        );
        report.uploaded += 1;
        report.neighbor_rebuilds += self.rebuild_neighbors(&chunk, position, neighbors);
    }

    fn release_chunk(presentation: &mut dyn PresentationLayer, chunk: &MtResource<Chunk>) {
        let mut chunk = chunk.get_mut();
        let position = chunk.position;
        if let Some(handles) = chunk.take_geometry() {
            presentation.detach_chunk(position, handles);
            presentation.release_geometry(handles);
        }
    }

    /// Marks the loaded neighbors of a newly registered chunk Dirty and schedules
    /// their rebuild.
    ///
    /// The chunk itself is rebuilt too if a neighbor was registered after its mesh
    /// was built: `built_with` holds one bit per side that was loaded at build time.
    fn rebuild_neighbors(
        &self,
        chunk: &MtResource<Chunk>,
        position: ChunkCoordinate,
        built_with: u8,
    ) -> usize {
        let neighbors: Vec<(BlockSide, MtResource<Chunk>)> = {
            let map = self.map.get();
            BlockSide::all()
                .into_iter()
                .filter_map(|side| {
                    map.get(&neighbor_coordinate(position, side))
                        .map(|neighbor| (side, neighbor.clone()))
                })
                .collect()
        };

        let mut scheduled = 0;
        let mut outdated = false;
        for (side, neighbor) in neighbors {
            outdated |= built_with & (1 << side as u8) == 0;
            if self.invalidate(&neighbor) {
                scheduled += 1;
            }
        }
        if outdated && self.invalidate(chunk) {
            trace!("Chunk {position:?} gained a neighbor while it was built");
            scheduled += 1;
        }
        scheduled
    }

    /// Marks a loaded chunk Dirty and enqueues it unless it is already waiting.
    ///
    /// # Returns
    /// `true` if the chunk was enqueued.
    fn invalidate(&self, chunk: &MtResource<Chunk>) -> bool {
        let (position, scheduled) = {
            let mut chunk = chunk.get_mut();
            if chunk.is_removal_requested() {
                return false;
            }
            let position = chunk.position;
            match chunk.invalidate() {
                Ok(scheduled) => (position, scheduled),
                Err(err) => {
                    invariant_violation(&format!("cannot rebuild loaded chunk: {err}"));
                    return false;
                }
            }
        };

        if scheduled {
            let center = self.region.get().center();
            self.to_build.enqueue(build_priority(position, center), chunk.clone());
        }
        scheduled
    }

    /// Sets (or with `None`, clears) the block at a world block coordinate.
    ///
    /// The owning chunk is rebuilt; an edit on a chunk boundary also rebuilds the
    /// neighbor sharing that boundary.
    ///
    /// # Returns
    /// `false` if the owning chunk is not loaded.
    pub fn modify_block(&self, block_position: Point3<i32>, block: Option<Block>) -> Result<bool> {
        let chunk_position = Point3::new(
            block_position.x.div_euclid(CHUNK_DIMENSION),
            block_position.y.div_euclid(CHUNK_DIMENSION),
            block_position.z.div_euclid(CHUNK_DIMENSION),
        );
        let Some(local) = LocalPosition::new(
            block_position.x.rem_euclid(CHUNK_DIMENSION),
            block_position.y.rem_euclid(CHUNK_DIMENSION),
            block_position.z.rem_euclid(CHUNK_DIMENSION),
        ) else {
            return Ok(false);
        };
        let Some(chunk) = self.chunk_at(chunk_position) else {
            return Ok(false);
        };

        let scheduled = {
            let mut chunk = chunk.get_mut();
            if chunk.is_removal_requested() {
                return Ok(false);
            }
            chunk.set_block(local, block)?
        };
        if scheduled {
            let center = self.region.get().center();
            self.to_build
                .enqueue(build_priority(chunk_position, center), chunk.clone());
        }

        for side in BlockSide::all() {
            if local.neighbor(side).is_some() {
                continue;
            }
            if let Some(neighbor) = self.chunk_at(neighbor_coordinate(chunk_position, side)) {
                self.invalidate(&neighbor);
            }
        }

        debug!("Modified block {block_position:?} in chunk {chunk_position:?}");
        Ok(true)
    }

    pub fn chunk_at(&self, position: ChunkCoordinate) -> Option<MtResource<Chunk>> {
        self.map.get().get(&position).cloned()
    }

    /// Coordinates of every loaded chunk, in no particular order.
    pub fn loaded_chunks(&self) -> Vec<ChunkCoordinate> {
        self.map.get().keys().copied().collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.map.get().len()
    }

    pub fn pending_generation(&self) -> usize {
        self.to_generate.len()
    }

    pub fn pending_build(&self) -> usize {
        self.to_build.len()
    }

    /// Coordinates handed to the pipeline that are not in the map yet.
    pub fn pending_coordinates(&self) -> usize {
        self.region.get().pending_count()
    }

    /// Whether every queue is drained and nothing is in flight.
    pub fn is_settled(&self) -> bool {
        self.to_generate.is_empty() && self.to_build.is_empty() && self.pending_coordinates() == 0
    }

    pub fn chunk_generator(&self, index: usize) -> ChunkGenerator {
        ChunkGenerator::new(
            format!("chunk-generator-{index}"),
            Arc::clone(&self.terrain),
            Arc::clone(&self.columns),
            self.region.clone(),
            self.to_generate.clone(),
            self.to_build.clone(),
            self.config.unload_distance(),
        )
    }

    pub fn chunk_builder(&self, index: usize) -> ChunkBuilder {
        ChunkBuilder::new(
            format!("chunk-builder-{index}"),
            self.map.clone(),
            self.region.clone(),
            self.to_build.clone(),
            self.upload_sender.clone(),
            self.config.boundary_policy,
            self.config.block_size,
            self.config.unload_distance(),
        )
    }

    pub fn chunk_allocator(&self) -> ChunkAllocator {
        ChunkAllocator::new(
            "chunk-allocator".to_string(),
            &self.config,
            self.map.clone(),
            self.region.clone(),
            self.viewpoint.clone(),
            self.to_generate.clone(),
            self.removal_sender.clone(),
            Arc::clone(&self.columns),
        )
    }
}
