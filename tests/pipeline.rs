//! End-to-end streaming scenarios.
//!
//! Most scenarios drive the stages by calling `poll()` / `tick()` directly on
//! the test thread, so every interleaving is reproducible. The last one runs the
//! threaded engine.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use cgmath::{Point3, Vector3};
use voxel_streaming::config::StreamingConfig;
use voxel_streaming::engine_state::presentation::HeadlessPresentation;
use voxel_streaming::engine_state::rendering::meshing::ChunkBuilder;
use voxel_streaming::engine_state::task_management::task::{StreamingTask, TaskOutcome};
use voxel_streaming::engine_state::viewpoint::Viewpoint;
use voxel_streaming::engine_state::voxels::allocation::{AllocationTick, ChunkAllocator};
use voxel_streaming::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType, Block};
use voxel_streaming::engine_state::voxels::chunk::{ChunkCoordinate, ChunkState, LocalPosition};
use voxel_streaming::engine_state::voxels::generation::terrain::TerrainNoise;
use voxel_streaming::engine_state::voxels::generation::ChunkGenerator;
use voxel_streaming::engine_state::voxels::world::World;
use voxel_streaming::engine_state::StreamingEngine;

const BLOCK_SIZE: f32 = 1.0;

struct Pipeline {
    world: World,
    allocator: ChunkAllocator,
    generator: ChunkGenerator,
    builder: ChunkBuilder,
    presentation: HeadlessPresentation,
}

impl Pipeline {
    fn new(config: StreamingConfig) -> Self {
        let viewpoint = Viewpoint::new(Point3::new(8.0, 8.0, 8.0));
        let world = World::new(config, viewpoint).unwrap();
        Pipeline {
            allocator: world.chunk_allocator(),
            generator: world.chunk_generator(0),
            builder: world.chunk_builder(0),
            presentation: HeadlessPresentation::new(),
            world,
        }
    }

    /// Polls generator, builder and World until nothing is left in flight.
    fn settle(&mut self) {
        for _ in 0..1_000 {
            let mut progressed = false;
            while self.generator.poll() != TaskOutcome::Idle {
                progressed = true;
            }
            while self.builder.poll() != TaskOutcome::Idle {
                progressed = true;
            }
            if !self.world.update(&mut self.presentation).is_empty() {
                progressed = true;
            }
            if !progressed && self.world.is_settled() {
                return;
            }
        }
        panic!("pipeline did not settle");
    }

    fn state_of(&self, position: ChunkCoordinate) -> ChunkState {
        self.world.chunk_at(position).unwrap().get().state()
    }

    fn x_range(&self) -> (i32, i32) {
        let loaded = self.world.loaded_chunks();
        let min = loaded.iter().map(|position| position.x).min().unwrap();
        let max = loaded.iter().map(|position| position.x).max().unwrap();
        (min, max)
    }
}

fn config(render_distance: i32, world_height: i32) -> StreamingConfig {
    StreamingConfig {
        block_size: BLOCK_SIZE,
        render_distance,
        unload_margin: 0,
        world_height,
        ..StreamingConfig::default()
    }
}

#[test]
fn single_chunk_world_ends_up_ready_with_geometry() {
    let mut pipeline = Pipeline::new(config(0, 1));
    assert_eq!(pipeline.allocator.tick(), AllocationTick::Started { enqueued: 1 });
    pipeline.settle();

    let origin = Point3::new(0, 0, 0);
    assert_eq!(pipeline.world.loaded_chunks(), vec![origin]);
    assert_eq!(pipeline.state_of(origin), ChunkState::Ready);

    let geometry = pipeline.presentation.chunk_geometry(origin).unwrap();
    assert!(geometry.index_count() > 0);
    assert_eq!(geometry.index_count(), geometry.vertices.len() / 4 * 6);
    assert!(geometry.faces_by_block_type().contains_key(&BlockType::GRASS));
}

#[test]
fn moving_one_chunk_along_x_shifts_the_region() {
    let mut pipeline = Pipeline::new(config(1, 2));
    assert_eq!(pipeline.allocator.tick(), AllocationTick::Started { enqueued: 18 });
    pipeline.settle();
    assert_eq!(pipeline.world.chunk_count(), 18);
    assert_eq!(pipeline.x_range(), (-1, 1));

    pipeline
        .world
        .viewpoint()
        .translate(Vector3::new(16.0 * BLOCK_SIZE, 0.0, 0.0));
    assert_eq!(pipeline.allocator.tick(), AllocationTick::Moved { enqueued: 6 });
    assert_eq!(pipeline.world.region_center(), Point3::new(1, 0, 0));
    assert_eq!(pipeline.world.pending_generation(), 6);
    pipeline.settle();

    assert_eq!(pipeline.allocator.tick(), AllocationTick::Settled { removals: 6 });
    let report = pipeline.world.update(&mut pipeline.presentation);
    assert_eq!(report.removed, 6);

    assert_eq!(pipeline.world.chunk_count(), 18);
    assert_eq!(pipeline.x_range(), (0, 2));
    assert_eq!(pipeline.presentation.attached().len(), 18);
    assert_eq!(pipeline.presentation.released(), 6);
    for position in pipeline.world.loaded_chunks() {
        assert_eq!(pipeline.state_of(position), ChunkState::Ready);
    }
}

#[test]
fn generated_blocks_match_a_fresh_generation() {
    let config = config(1, 3);
    let terrain = TerrainNoise::new(config.seed, &config.terrain, config.world_height);
    let mut pipeline = Pipeline::new(config);
    pipeline.allocator.tick();
    pipeline.settle();

    for position in pipeline.world.loaded_chunks() {
        let chunk = pipeline.world.chunk_at(position).unwrap();
        assert_eq!(chunk.get().blocks(), &terrain.generate_chunk(position), "{position:?}");
    }
}

#[test]
fn boundary_faces_are_drawn_only_towards_air_in_the_neighbor() {
    let mut pipeline = Pipeline::new(config(1, 1));
    pipeline.allocator.tick();
    pipeline.settle();

    let a = pipeline.world.chunk_at(Point3::new(0, 0, 0)).unwrap();
    let b = pipeline.world.chunk_at(Point3::new(1, 0, 0)).unwrap();

    let expected: BTreeSet<(i32, i32)> = a
        .get()
        .blocks()
        .keys()
        .filter(|local| local.x == 15)
        .filter(|local| {
            b.get().get_block(local.mirrored(BlockSide::RIGHT)).is_none()
        })
        .map(|local| (local.y as i32, local.z as i32))
        .collect();

    let geometry = pipeline.presentation.chunk_geometry(Point3::new(0, 0, 0)).unwrap();
    let boundary = 16.0 * BLOCK_SIZE;
    let drawn: BTreeSet<(i32, i32)> = geometry
        .vertices
        .chunks(4)
        .filter(|face| face[0].normal == [1.0, 0.0, 0.0] && face[0].position[0] == boundary)
        .map(|face| {
            let y = face.iter().map(|vertex| vertex.position[1]).fold(f32::MAX, f32::min);
            let z = face.iter().map(|vertex| vertex.position[2]).fold(f32::MAX, f32::min);
            ((y / BLOCK_SIZE) as i32, (z / BLOCK_SIZE) as i32)
        })
        .collect();

    assert_eq!(drawn, expected);
}

#[test]
fn block_edits_go_dirty_then_ready() {
    let mut pipeline = Pipeline::new(config(0, 1));
    pipeline.allocator.tick();
    pipeline.settle();

    let origin = Point3::new(0, 0, 0);
    let chunk = pipeline.world.chunk_at(origin).unwrap();
    let handles = chunk.get().geometry().unwrap();
    let local = LocalPosition::new(8, 15, 8).unwrap();
    let block = Block::new(BlockType::STONE, 1.0);

    assert!(pipeline.world.modify_block(Point3::new(8, 15, 8), Some(block)).unwrap());
    assert_eq!(pipeline.state_of(origin), ChunkState::Dirty);
    assert_eq!(pipeline.world.pending_build(), 1);

    pipeline.settle();
    assert_eq!(pipeline.state_of(origin), ChunkState::Ready);
    assert_eq!(chunk.get().get_block(local), Some(&block));
    assert_eq!(chunk.get().geometry(), Some(handles));
    assert_eq!(pipeline.presentation.geometry(handles).unwrap().uploads, 2);

    assert!(pipeline.world.modify_block(Point3::new(8, 15, 8), None).unwrap());
    pipeline.settle();
    assert_eq!(chunk.get().get_block(local), None);
    assert_eq!(pipeline.presentation.geometry(handles).unwrap().uploads, 3);
}

#[test]
fn threaded_engine_streams_the_region() {
    let mut config = config(1, 2);
    config.workers.idle_backoff_ms = 1;
    config.workers.allocator_tick_ms = 1;
    let terrain = TerrainNoise::new(config.seed, &config.terrain, config.world_height);

    let viewpoint = Viewpoint::new(Point3::new(8.0, 8.0, 8.0));
    let mut engine = StreamingEngine::start(config, viewpoint).unwrap();
    assert_eq!(engine.worker_count(), 1 + 2 + 4);
    let mut presentation = HeadlessPresentation::new();

    let all_ready = |engine: &StreamingEngine| {
        let world = engine.world();
        world.chunk_count() == 18
            && world.is_settled()
            && world
                .loaded_chunks()
                .into_iter()
                .all(|position| world.chunk_at(position).unwrap().get().state() == ChunkState::Ready)
    };

    let deadline = Instant::now() + Duration::from_secs(60);
    while !all_ready(&engine) {
        assert!(Instant::now() < deadline, "region was not streamed in time");
        engine.frame(&mut presentation);
        std::thread::sleep(Duration::from_millis(1));
    }

    for position in engine.world().loaded_chunks() {
        let chunk = engine.world().chunk_at(position).unwrap();
        assert_eq!(chunk.get().blocks(), &terrain.generate_chunk(position));
    }
    assert_eq!(presentation.attached().len(), 18);
    engine.shutdown();
}
