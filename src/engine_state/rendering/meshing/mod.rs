//! Chunk meshing stage of the streaming pipeline.
//!
//! The `ChunkBuilder` task dequeues Generated or Dirty chunks, meshes them
//! against the neighbors currently in the chunk map, marks them Ready and
//! sends the result to World over the upload channel.
//!
//! # Locking
//! The builder never holds two locks at once: the map is read to clone the
//! neighbor handles, then each neighbor is locked on its own to copy its
//! boundary layer, then the chunk itself is locked to copy its blocks. Meshing
//! runs without any lock held.

pub mod mesh;

use std::sync::mpsc::Sender;

use log::{debug, error, trace};

use crate::config::BoundaryPolicy;
use crate::core::{MtResource, SharedPriorityQueue};
use crate::engine_state::task_management::task::{StreamingTask, TaskOutcome};
use crate::engine_state::voxels::{
    block::block_side::BlockSide,
    chunk::{neighbor_coordinate, Chunk, ChunkCoordinate, ChunkState},
    region::{build_priority, StreamingRegion},
    world::ChunkMap,
};
use crate::error::{invariant_violation, Result};

use mesh::{build_chunk_mesh, ChunkMesh, NeighborPlanes};

/// A finished build, consumed exactly once by World.
pub struct BuiltChunkResult {
    pub chunk: MtResource<Chunk>,
    pub position: ChunkCoordinate,
    pub mesh: ChunkMesh,
    /// Neighbors that were loaded when the mesh was built, see [`NeighborPlanes::mask`].
    pub neighbors: u8,
}

/// What happened to one dequeued chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Mesh sent to World.
    Built,
    /// Nothing to do: already Ready, or about to be removed.
    Skipped,
    /// Chunk left the region before its first build.
    Dropped,
}

/// A worker stage turning Generated and Dirty chunks into meshes.
pub struct ChunkBuilder {
    name: String,
    map: ChunkMap,
    region: MtResource<StreamingRegion>,
    to_build: SharedPriorityQueue<MtResource<Chunk>>,
    uploads: Sender<BuiltChunkResult>,
    boundary_policy: BoundaryPolicy,
    block_size: f32,
    unload_distance: i32,
}

impl ChunkBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        map: ChunkMap,
        region: MtResource<StreamingRegion>,
        to_build: SharedPriorityQueue<MtResource<Chunk>>,
        uploads: Sender<BuiltChunkResult>,
        boundary_policy: BoundaryPolicy,
        block_size: f32,
        unload_distance: i32,
    ) -> Self {
        ChunkBuilder {
            name,
            map,
            region,
            to_build,
            uploads,
            boundary_policy,
            block_size,
            unload_distance,
        }
    }

    /// Builds one dequeued chunk.
    pub fn process(&self, chunk: MtResource<Chunk>) -> Result<BuildOutcome> {
        let (position, state, removal_requested) = {
            let chunk = chunk.get();
            (chunk.position, chunk.state(), chunk.is_removal_requested())
        };

        match state {
            ChunkState::Empty => {
                invariant_violation(&format!("chunk {position:?} was queued for build while Empty"));
                return Ok(BuildOutcome::Skipped);
            }
            ChunkState::Ready => {
                trace!("Chunk {position:?} is already Ready");
                return Ok(BuildOutcome::Skipped);
            }
            ChunkState::Generated | ChunkState::Dirty => {}
        }

        if removal_requested {
            trace!("Skipped build of chunk {position:?}, removal requested");
            return Ok(BuildOutcome::Skipped);
        }

        // Only first builds are in flight outside the map; loaded chunks are
        // unloaded by the allocator's removal scan instead.
        if state == ChunkState::Generated
            && self.region.get_mut().drop_if_stale(position, self.unload_distance)
        {
            trace!("Dropped stale chunk {position:?} before build");
            return Ok(BuildOutcome::Dropped);
        }

        let neighbors = self.capture_neighbors(position);
        let (blocks, revision) = {
            let chunk = chunk.get();
            (chunk.blocks().clone(), chunk.revision())
        };

        let mesh = build_chunk_mesh(&blocks, &neighbors, &self.boundary_policy, self.block_size);

        let changed_meanwhile = chunk.get_mut().complete_build(revision)?;
        if changed_meanwhile {
            let center = self.region.get().center();
            self.to_build.enqueue(build_priority(position, center), chunk.clone());
        }

        debug!(
            "Built chunk {position:?}: {} faces, {} indices",
            mesh.face_count(),
            mesh.index_count()
        );
        let result = BuiltChunkResult {
            chunk,
            position,
            mesh,
            neighbors: neighbors.mask(),
        };
        if self.uploads.send(result).is_err() {
            debug!("Upload channel closed, dropping mesh of chunk {position:?}");
        }
        Ok(BuildOutcome::Built)
    }

    fn capture_neighbors(&self, position: ChunkCoordinate) -> NeighborPlanes {
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

        let mut planes = NeighborPlanes::new();
        for (side, neighbor) in neighbors {
            planes.capture(side, &neighbor.get());
        }
        planes
    }
}

impl StreamingTask for ChunkBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> TaskOutcome {
        let Some(chunk) = self.to_build.dequeue() else {
            return TaskOutcome::Idle;
        };

        if let Err(err) = self.process(chunk) {
            error!("{}: {err}", self.name);
        }
        TaskOutcome::Progressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{block_type::BlockType, Block};
    use crate::engine_state::voxels::chunk::LocalPosition;
    use cgmath::Point3;
    use std::collections::HashMap;
    use std::sync::mpsc::{channel, Receiver};

    struct Fixture {
        builder: ChunkBuilder,
        map: ChunkMap,
        region: MtResource<StreamingRegion>,
        to_build: SharedPriorityQueue<MtResource<Chunk>>,
        uploads: Receiver<BuiltChunkResult>,
    }

    fn fixture() -> Fixture {
        let map: ChunkMap = MtResource::new(HashMap::new());
        let region = MtResource::new(StreamingRegion::new(Point3::new(0, 0, 0)));
        let to_build = SharedPriorityQueue::new();
        let (sender, uploads) = channel();
        let builder = ChunkBuilder::new(
            "builder-test".to_string(),
            map.clone(),
            region.clone(),
            to_build.clone(),
            sender,
            BoundaryPolicy::default(),
            1.0,
            1,
        );
        Fixture {
            builder,
            map,
            region,
            to_build,
            uploads,
        }
    }

    fn chunk_with_block(position: Point3<i32>, local: (i32, i32, i32)) -> MtResource<Chunk> {
        let local = LocalPosition::new(local.0, local.1, local.2).unwrap();
        MtResource::new(Chunk::with_blocks(position, [(local, Block::new(BlockType::STONE, 1.0))]))
    }

    #[test]
    fn builds_generated_chunks_and_marks_them_ready() {
        let mut fixture = fixture();
        let chunk = chunk_with_block(Point3::new(0, 0, 0), (3, 3, 3));
        fixture.to_build.enqueue(0, chunk.clone());

        assert_eq!(fixture.builder.poll(), TaskOutcome::Progressed);
        assert_eq!(chunk.get().state(), ChunkState::Ready);

        let result = fixture.uploads.try_recv().unwrap();
        assert!(result.chunk.ptr_eq(&chunk));
        assert_eq!(result.mesh.face_count(), 6);
        assert_eq!(fixture.builder.poll(), TaskOutcome::Idle);
    }

    #[test]
    fn culls_against_loaded_neighbors() {
        let fixture = fixture();
        let neighbor = chunk_with_block(Point3::new(0, 0, 1), (3, 3, 0));
        fixture.map.get_mut().insert(Point3::new(0, 0, 1), neighbor);

        let chunk = chunk_with_block(Point3::new(0, 0, 0), (3, 3, 15));
        fixture.builder.process(chunk).unwrap();
        let result = fixture.uploads.try_recv().unwrap();
        // FRONT is culled by the neighbor, BACK faces air inside the chunk.
        assert_eq!(result.mesh.face_count(), 5);
        assert_eq!(result.neighbors, 1 << BlockSide::FRONT as u8);
    }

    #[test]
    fn skips_ready_chunks_and_drops_stale_first_builds() {
        let fixture = fixture();
        let ready = chunk_with_block(Point3::new(0, 0, 0), (0, 0, 0));
        ready.get_mut().transition(ChunkState::Ready).unwrap();
        assert_eq!(fixture.builder.process(ready).unwrap(), BuildOutcome::Skipped);

        let far = Point3::new(0, 0, 5);
        fixture.region.get_mut().mark_pending(far);
        let stale = chunk_with_block(far, (0, 0, 0));
        assert_eq!(fixture.builder.process(stale.clone()).unwrap(), BuildOutcome::Dropped);
        assert!(!fixture.region.get().is_pending(far));
        assert_eq!(stale.get().state(), ChunkState::Generated);
        assert!(fixture.uploads.try_recv().is_err());
    }

    #[test]
    fn chunks_left_dirty_by_a_racing_edit_are_rebuilt() {
        let fixture = fixture();
        let chunk = chunk_with_block(Point3::new(0, 0, 0), (1, 1, 1));
        chunk.get_mut().complete_build(0).unwrap();
        chunk.get_mut().invalidate().unwrap();
        let revision_before = chunk.get().revision();

        // Simulate an edit landing between snapshot and completion.
        chunk.get_mut().invalidate().unwrap();
        assert!(chunk.get_mut().complete_build(revision_before).unwrap());
        assert_eq!(chunk.get().state(), ChunkState::Dirty);

        fixture.builder.process(chunk.clone()).unwrap();
        assert_eq!(chunk.get().state(), ChunkState::Ready);
        assert!(fixture.to_build.is_empty());
    }
}
