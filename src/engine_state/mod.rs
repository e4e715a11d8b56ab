//! # Engine State Module
//!
//! The streaming engine: a [`World`](voxels::world::World) plus the worker
//! threads feeding it.
//!
//! ## Key Components
//!
//! * `StreamingEngine` - Starts the workers and runs World once per frame
//! * `presentation` - The boundary to whatever draws the chunks
//! * `rendering` - Vertex layout and the chunk meshing stage
//! * `task_management` - Long-lived worker threads
//! * `viewpoint` - The position the loaded region follows
//! * `voxels` - Blocks, chunks, generation, allocation and World
//!
//! ## Threads
//!
//! One allocator thread, `generator_threads` generator threads and
//! `builder_threads` builder threads run until `shutdown()`. Everything that
//! touches the presentation layer happens inside `frame()`, on the caller's thread.

use std::time::Duration;

use log::info;

use crate::config::StreamingConfig;
use crate::error::Result;

use presentation::PresentationLayer;
use task_management::WorkerPool;
use viewpoint::Viewpoint;
use voxels::world::{FrameReport, World};

pub mod presentation;
pub mod rendering;
pub mod task_management;
pub mod viewpoint;
pub mod voxels;

/// A running streaming pipeline.
///
/// # Examples
///
/// ```
/// use voxel_streaming::config::StreamingConfig;
/// use voxel_streaming::engine_state::presentation::HeadlessPresentation;
/// use voxel_streaming::engine_state::viewpoint::Viewpoint;
/// use voxel_streaming::engine_state::StreamingEngine;
///
/// let config = StreamingConfig {
///     render_distance: 0,
///     world_height: 1,
///     ..StreamingConfig::default()
/// };
/// let mut engine = StreamingEngine::start(config, Viewpoint::default()).unwrap();
/// let mut presentation = HeadlessPresentation::new();
/// let _report = engine.frame(&mut presentation);
/// engine.shutdown();
/// ```
pub struct StreamingEngine {
    world: World,
    pool: WorkerPool,
}

impl StreamingEngine {
    /// Creates the world and spawns every worker.
    pub fn start(config: StreamingConfig, viewpoint: Viewpoint) -> Result<Self> {
        let world = World::new(config, viewpoint)?;
        let workers = world.config().workers.clone();
        let idle_backoff = Duration::from_millis(workers.idle_backoff_ms);
        let allocator_tick = Duration::from_millis(workers.allocator_tick_ms);

        let mut pool = WorkerPool::new();
        pool.spawn(Box::new(world.chunk_allocator()), allocator_tick)?;
        for index in 0..workers.generator_threads {
            pool.spawn(Box::new(world.chunk_generator(index)), idle_backoff)?;
        }
        for index in 0..workers.builder_threads {
            pool.spawn(Box::new(world.chunk_builder(index)), idle_backoff)?;
        }

        info!(
            "Streaming engine started with {} generators and {} builders",
            workers.generator_threads, workers.builder_threads
        );
        Ok(StreamingEngine { world, pool })
    }

    /// Runs one World frame on the calling thread.
    pub fn frame(&mut self, presentation: &mut dyn PresentationLayer) -> FrameReport {
        self.world.update(presentation)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn viewpoint(&self) -> &Viewpoint {
        self.world.viewpoint()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Stops every worker and waits for it to finish its current work item.
    pub fn shutdown(self) {
        let StreamingEngine { world, pool } = self;
        pool.shutdown();
        info!(
            "Streaming engine stopped with {} chunks loaded",
            world.chunk_count()
        );
    }
}
