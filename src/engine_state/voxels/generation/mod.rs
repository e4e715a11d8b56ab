//! # Chunk Generation
//!
//! This module provides the `ChunkGenerator` task which fills Empty chunks with
//! terrain and hands them on to the build queue.
//!
//! A chunk depends on the column state left behind by the chunk above it (see
//! [`column_state`]). When that state is not there yet and the chunk above is
//! still in flight, the chunk is put back into the generation queue at the
//! priority it was dequeued with. This deferral is the only retry path of the
//! pipeline. When the chunk above is not going to produce the state (it was
//! already loaded, or dropped), the state is replayed from the noise fields.

pub mod column_state;
pub mod terrain;

use std::sync::Arc;

use cgmath::Vector3;
use log::{debug, error, trace};

use crate::core::{MtResource, SharedPriorityQueue};
use crate::engine_state::task_management::task::{StreamingTask, TaskOutcome};
use crate::engine_state::voxels::{
    chunk::{Chunk, ChunkCoordinate, ChunkState},
    region::{build_priority, StreamingRegion},
};
use crate::error::{Result, StreamingError};

use column_state::{ColumnSnapshot, ColumnStates};
use terrain::TerrainNoise;

/// What happened to one dequeued chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Blocks filled, chunk sent to the build queue.
    Generated,
    /// Column state not available yet; chunk put back.
    Deferred,
    /// Chunk left the region before it was generated.
    Dropped,
}

/// A worker stage turning Empty chunks into Generated ones.
pub struct ChunkGenerator {
    name: String,
    terrain: Arc<TerrainNoise>,
    columns: Arc<ColumnStates>,
    region: MtResource<StreamingRegion>,
    to_generate: SharedPriorityQueue<MtResource<Chunk>>,
    to_build: SharedPriorityQueue<MtResource<Chunk>>,
    unload_distance: i32,
}

impl ChunkGenerator {
    pub fn new(
        name: String,
        terrain: Arc<TerrainNoise>,
        columns: Arc<ColumnStates>,
        region: MtResource<StreamingRegion>,
        to_generate: SharedPriorityQueue<MtResource<Chunk>>,
        to_build: SharedPriorityQueue<MtResource<Chunk>>,
        unload_distance: i32,
    ) -> Self {
        ChunkGenerator {
            name,
            terrain,
            columns,
            region,
            to_generate,
            to_build,
            unload_distance,
        }
    }

    /// Generates one chunk that was dequeued at `priority`.
    pub fn process(&self, priority: i32, chunk: MtResource<Chunk>) -> Result<GenerationOutcome> {
        let (position, state) = {
            let chunk = chunk.get();
            (chunk.position, chunk.state())
        };
        if state != ChunkState::Empty {
            return Err(StreamingError::UnexpectedState {
                position,
                state,
                expected: "Empty",
            });
        }

        if self.region.get_mut().drop_if_stale(position, self.unload_distance) {
            self.columns.forget(position);
            trace!("Dropped stale chunk {position:?} before generation");
            return Ok(GenerationOutcome::Dropped);
        }

        let mut snapshot = match self.checkout(position) {
            Some(snapshot) => snapshot,
            None => {
                trace!("Deferred chunk {position:?}, layer above not generated yet");
                self.to_generate.enqueue(priority, chunk);
                return Ok(GenerationOutcome::Deferred);
            }
        };

        let blocks = self.terrain.generate_layer(position, &mut snapshot);
        let block_count = blocks.len();
        chunk.get_mut().fill(blocks)?;

        if position.y > 0 {
            self.columns.store(position - Vector3::unit_y(), snapshot);
        }

        let center = self.region.get().center();
        self.to_build.enqueue(build_priority(position, center), chunk);
        debug!("Generated chunk {position:?} with {block_count} blocks");
        Ok(GenerationOutcome::Generated)
    }

    /// The column state entering `position`, or `None` if the chunk above will
    /// still produce it.
    fn checkout(&self, position: ChunkCoordinate) -> Option<ColumnSnapshot> {
        if position.y >= self.terrain.world_height() - 1 {
            return Some(ColumnSnapshot::fresh());
        }
        if let Some(snapshot) = self.columns.take(position) {
            return Some(snapshot);
        }
        if self.region.get().is_pending(position + Vector3::unit_y()) {
            return None;
        }
        Some(self.terrain.replay_snapshot(position))
    }
}

impl StreamingTask for ChunkGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> TaskOutcome {
        let Some((priority, chunk)) = self.to_generate.dequeue_with_priority() else {
            return TaskOutcome::Idle;
        };

        match self.process(priority, chunk) {
            Ok(GenerationOutcome::Deferred) => TaskOutcome::Deferred,
            Ok(_) => TaskOutcome::Progressed,
            Err(err) => {
                error!("{}: {err}", self.name);
                TaskOutcome::Progressed
            }
        }
    }
}
