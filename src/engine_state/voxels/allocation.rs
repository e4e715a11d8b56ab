//! # Chunk Allocation
//!
//! The `ChunkAllocator` keeps the loaded region centered on the viewpoint.
//!
//! - First tick: every coordinate of the square region (all layers) is enqueued
//!   for generation.
//! - Viewpoint moved: the region center moves one chunk towards the viewpoint per
//!   tick, x before z, and only the slice that entered the region is enqueued.
//! - Viewpoint still: the chunk map is scanned and chunks past the unload distance
//!   are flagged and sent to World for removal.
//!
//! A coordinate that is pending, or loaded and not flagged for removal, is never
//! enqueued again.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use cgmath::Point3;
use log::{debug, info, warn};

use crate::config::StreamingConfig;
use crate::core::{MtResource, SharedPriorityQueue};
use crate::engine_state::task_management::task::{StreamingTask, TaskOutcome};
use crate::engine_state::viewpoint::Viewpoint;

use super::chunk::{chunk_coordinate_of, planar_distance, Chunk, ChunkCoordinate};
use super::generation::column_state::ColumnStates;
use super::region::{generation_priority, region_coordinates, StreamingRegion};
use super::world::ChunkMap;

/// What one allocator tick did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocationTick {
    /// The initial region was enqueued.
    Started { enqueued: usize },
    /// The region center moved one step.
    Moved { enqueued: usize },
    /// The viewpoint is still; out-of-range chunks were flagged.
    Settled { removals: usize },
    /// Too much generation work is queued; movement is postponed.
    Throttled { removals: usize },
}

/// The controller stage deciding which chunks should exist.
pub struct ChunkAllocator {
    name: String,
    map: ChunkMap,
    region: MtResource<StreamingRegion>,
    viewpoint: Viewpoint,
    to_generate: SharedPriorityQueue<MtResource<Chunk>>,
    removals: Sender<MtResource<Chunk>>,
    columns: Arc<ColumnStates>,
    block_size: f32,
    render_distance: i32,
    unload_distance: i32,
    world_height: i32,
    max_pending_generation: usize,
    started: bool,
    throttled: bool,
}

impl ChunkAllocator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        config: &StreamingConfig,
        map: ChunkMap,
        region: MtResource<StreamingRegion>,
        viewpoint: Viewpoint,
        to_generate: SharedPriorityQueue<MtResource<Chunk>>,
        removals: Sender<MtResource<Chunk>>,
        columns: Arc<ColumnStates>,
    ) -> Self {
        ChunkAllocator {
            name,
            map,
            region,
            viewpoint,
            to_generate,
            removals,
            columns,
            block_size: config.block_size,
            render_distance: config.render_distance,
            unload_distance: config.unload_distance(),
            world_height: config.world_height,
            max_pending_generation: config.queue_limits.max_pending_generation,
            started: false,
            throttled: false,
        }
    }

    /// Runs one allocation step.
    pub fn tick(&mut self) -> AllocationTick {
        if !self.started {
            self.started = true;
            return AllocationTick::Started {
                enqueued: self.start(),
            };
        }

        let target = chunk_coordinate_of(self.viewpoint.position(), self.block_size);
        let center = self.region.get().center();
        if target == center {
            return AllocationTick::Settled {
                removals: self.scan_for_removals(),
            };
        }

        let pending = self.to_generate.len();
        if pending > self.max_pending_generation {
            if !self.throttled {
                warn!(
                    "{} chunks waiting for generation (soft cap {}), postponing region moves",
                    pending, self.max_pending_generation
                );
                self.throttled = true;
            }
            return AllocationTick::Throttled {
                removals: self.scan_for_removals(),
            };
        }
        if self.throttled {
            info!("Generation backlog down to {pending}, resuming region moves");
            self.throttled = false;
        }

        AllocationTick::Moved {
            enqueued: self.step_towards(center, target),
        }
    }

    /// Enqueues the whole region around the current center.
    fn start(&mut self) -> usize {
        let center = chunk_coordinate_of(self.viewpoint.position(), self.block_size);
        self.region.get_mut().set_center(center);

        let coordinates: Vec<_> =
            region_coordinates(center, self.render_distance, self.world_height).collect();
        let enqueued = self.enqueue(coordinates);
        info!("Streaming started around chunk {center:?}, {enqueued} chunks enqueued");
        enqueued
    }

    /// Moves the region center one chunk from `center` towards `target` and
    /// enqueues the slice that entered the region.
    fn step_towards(&mut self, center: ChunkCoordinate, target: ChunkCoordinate) -> usize {
        let dx = (target.x - center.x).signum();
        let dz = (target.z - center.z).signum();
        let radius = self.render_distance;

        let (next, slice): (ChunkCoordinate, Vec<ChunkCoordinate>) = if dx != 0 {
            let next = Point3::new(center.x + dx, target.y, center.z);
            let x = next.x + dx * radius;
            let slice = (next.z - radius..=next.z + radius)
                .flat_map(|z| (0..self.world_height).map(move |y| Point3::new(x, y, z)))
                .collect();
            (next, slice)
        } else if dz != 0 {
            let next = Point3::new(center.x, target.y, center.z + dz);
            let z = next.z + dz * radius;
            let slice = (next.x - radius..=next.x + radius)
                .flat_map(|x| (0..self.world_height).map(move |y| Point3::new(x, y, z)))
                .collect();
            (next, slice)
        } else {
            // Only the vertical layer changed; the region already spans every layer.
            (target, Vec::new())
        };

        self.region.get_mut().set_center(next);
        let enqueued = self.enqueue(slice);
        if enqueued > 0 {
            info!("Region moved to chunk {next:?}, {enqueued} chunks enqueued");
        }
        enqueued
    }

    /// Enqueues a fresh Empty chunk for every coordinate not already pending or loaded.
    fn enqueue(&self, coordinates: Vec<ChunkCoordinate>) -> usize {
        let map = self.map.get();
        let mut region = self.region.get_mut();
        let center = region.center();

        let mut enqueued = 0;
        for position in coordinates {
            if region.is_pending(position) {
                continue;
            }
            if map
                .get(&position)
                .is_some_and(|chunk| !chunk.get().is_removal_requested())
            {
                continue;
            }

            region.mark_pending(position);
            self.to_generate.enqueue(
                generation_priority(position, center, self.world_height),
                MtResource::new(Chunk::new(position)),
            );
            enqueued += 1;
        }
        enqueued
    }

    /// Flags every loaded chunk past the unload distance and hands it to World.
    fn scan_for_removals(&self) -> usize {
        let center = self.region.get().center();
        let stale: Vec<MtResource<Chunk>> = {
            let map = self.map.get();
            map.iter()
                .filter(|(position, _)| planar_distance(**position, center) > self.unload_distance)
                .filter(|(_, chunk)| chunk.get().request_removal())
                .map(|(_, chunk)| chunk.clone())
                .collect()
        };

        let removals = stale.len();
        for chunk in stale {
            if self.removals.send(chunk).is_err() {
                debug!("Removal channel closed");
                break;
            }
        }

        let unload_distance = self.unload_distance;
        self.columns
            .retain(|position| planar_distance(position, center) <= unload_distance);

        if removals > 0 {
            debug!("Flagged {removals} chunks for removal");
        }
        removals
    }
}

impl StreamingTask for ChunkAllocator {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> TaskOutcome {
        match self.tick() {
            AllocationTick::Started { .. } | AllocationTick::Moved { .. } => TaskOutcome::Progressed,
            AllocationTick::Settled { .. } => TaskOutcome::Idle,
            AllocationTick::Throttled { .. } => TaskOutcome::Deferred,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{block_type::BlockType, Block};
    use crate::engine_state::voxels::chunk::LocalPosition;
    use crate::engine_state::voxels::generation::column_state::ColumnSnapshot;
    use cgmath::Vector3;
    use std::collections::HashMap;
    use std::sync::mpsc::{channel, Receiver};

    struct Fixture {
        allocator: ChunkAllocator,
        map: ChunkMap,
        region: MtResource<StreamingRegion>,
        viewpoint: Viewpoint,
        to_generate: SharedPriorityQueue<MtResource<Chunk>>,
        removals: Receiver<MtResource<Chunk>>,
        columns: Arc<ColumnStates>,
    }

    fn fixture(config: StreamingConfig) -> Fixture {
        let map: ChunkMap = MtResource::new(HashMap::new());
        let region = MtResource::new(StreamingRegion::new(Point3::new(0, 0, 0)));
        let viewpoint = Viewpoint::default();
        let to_generate = SharedPriorityQueue::new();
        let (sender, removals) = channel();
        let columns = Arc::new(ColumnStates::new());
        let allocator = ChunkAllocator::new(
            "allocator-test".to_string(),
            &config,
            map.clone(),
            region.clone(),
            viewpoint.clone(),
            to_generate.clone(),
            sender,
            Arc::clone(&columns),
        );
        Fixture {
            allocator,
            map,
            region,
            viewpoint,
            to_generate,
            removals,
            columns,
        }
    }

    fn config(render_distance: i32, world_height: i32) -> StreamingConfig {
        StreamingConfig {
            render_distance,
            unload_margin: 0,
            world_height,
            block_size: 1.0,
            ..StreamingConfig::default()
        }
    }

    fn drain(queue: &SharedPriorityQueue<MtResource<Chunk>>) -> Vec<ChunkCoordinate> {
        std::iter::from_fn(|| queue.dequeue())
            .map(|chunk| chunk.get().position)
            .collect()
    }

    #[test]
    fn first_tick_enqueues_the_region_top_layers_first() {
        let mut fixture = fixture(config(1, 2));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Started { enqueued: 18 });
        assert_eq!(fixture.region.get().pending_count(), 18);

        let order = drain(&fixture.to_generate);
        assert_eq!(order[0], Point3::new(0, 1, 0));
        assert_eq!(order.len(), 18);

        assert_eq!(fixture.allocator.tick(), AllocationTick::Settled { removals: 0 });
    }

    #[test]
    fn moving_one_chunk_enqueues_only_the_new_slice() {
        let mut fixture = fixture(config(1, 2));
        fixture.allocator.tick();
        drain(&fixture.to_generate);

        fixture.viewpoint.translate(Vector3::new(16.0, 0.0, 0.0));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Moved { enqueued: 6 });
        assert_eq!(fixture.region.get().center(), Point3::new(1, 0, 0));

        let slice = drain(&fixture.to_generate);
        assert!(slice.iter().all(|position| position.x == 2));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Settled { removals: 0 });
    }

    #[test]
    fn diagonal_moves_are_taken_one_axis_at_a_time() {
        let mut fixture = fixture(config(0, 1));
        fixture.allocator.tick();
        drain(&fixture.to_generate);

        fixture.viewpoint.set_position(Point3::new(20.0, 0.0, -20.0));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Moved { enqueued: 1 });
        assert_eq!(fixture.region.get().center(), Point3::new(1, 0, 0));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Moved { enqueued: 1 });
        assert_eq!(fixture.allocator.tick(), AllocationTick::Moved { enqueued: 1 });
        assert_eq!(fixture.region.get().center(), Point3::new(1, 0, -2));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Settled { removals: 0 });

        let mut enqueued = drain(&fixture.to_generate);
        enqueued.sort_by_key(|position| position.z);
        assert_eq!(
            enqueued,
            vec![Point3::new(1, 0, -2), Point3::new(1, 0, -1), Point3::new(1, 0, 0)]
        );
    }

    #[test]
    fn loaded_and_pending_coordinates_are_not_enqueued_twice() {
        let mut fixture = fixture(config(1, 1));
        let loaded = MtResource::new(Chunk::new(Point3::new(0, 0, 0)));
        fixture.map.get_mut().insert(Point3::new(0, 0, 0), loaded.clone());
        fixture.region.get_mut().mark_pending(Point3::new(1, 0, 1));

        assert_eq!(fixture.allocator.tick(), AllocationTick::Started { enqueued: 7 });

        // A chunk flagged for removal may be replaced by a fresh one.
        fixture.region.get_mut().clear_pending(Point3::new(1, 0, 1));
        loaded.get().request_removal();
        let coordinates = vec![Point3::new(0, 0, 0), Point3::new(1, 0, 1), Point3::new(1, 0, 1)];
        assert_eq!(fixture.allocator.enqueue(coordinates), 2);
    }

    #[test]
    fn out_of_range_chunks_are_flagged_once() {
        let mut fixture = fixture(config(1, 1));
        fixture.allocator.tick();
        drain(&fixture.to_generate);

        let block = (LocalPosition::new(0, 0, 0).unwrap(), Block::new(BlockType::STONE, 1.0));
        for x in [0, 3] {
            let position = Point3::new(x, 0, 0);
            let chunk = MtResource::new(Chunk::with_blocks(position, [block]));
            fixture.map.get_mut().insert(position, chunk);
        }
        fixture.columns.store(Point3::new(4, 0, 0), ColumnSnapshot::fresh());
        fixture.columns.store(Point3::new(1, 0, 0), ColumnSnapshot::fresh());

        assert_eq!(fixture.allocator.tick(), AllocationTick::Settled { removals: 1 });
        let removed = fixture.removals.try_recv().unwrap();
        assert_eq!(removed.get().position, Point3::new(3, 0, 0));
        assert!(removed.get().is_removal_requested());
        assert_eq!(fixture.columns.len(), 1);

        assert_eq!(fixture.allocator.tick(), AllocationTick::Settled { removals: 0 });
        assert!(fixture.removals.try_recv().is_err());
    }

    #[test]
    fn backlog_postpones_movement() {
        let mut config = config(1, 1);
        config.queue_limits.max_pending_generation = 4;
        let mut fixture = fixture(config);
        assert_eq!(fixture.allocator.tick(), AllocationTick::Started { enqueued: 9 });

        fixture.viewpoint.translate(Vector3::new(16.0, 0.0, 0.0));
        assert_eq!(fixture.allocator.tick(), AllocationTick::Throttled { removals: 0 });
        assert_eq!(fixture.allocator.poll(), TaskOutcome::Deferred);
        assert_eq!(fixture.region.get().center(), Point3::new(0, 0, 0));

        drain(&fixture.to_generate);
        assert_eq!(fixture.allocator.tick(), AllocationTick::Moved { enqueued: 3 });
    }
}
