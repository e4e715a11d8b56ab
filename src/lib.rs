#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streaming
//!
//! A multi-threaded pipeline that keeps a region of voxel terrain loaded
//! around a moving viewpoint.
//!
//! Chunks flow through four stages: the allocator decides which chunk
//! coordinates should exist, generators fill them from layered noise, builders
//! turn them into face-culled meshes, and World hands the meshes to a
//! presentation layer on the consuming thread and erases chunks that fell out
//! of range.
//!
//! ## Key Modules
//!
//! * `config` - Every tunable of the pipeline, loadable from JSON
//! * `core` - Shared resources and priority queues
//! * `engine_state` - The streaming engine, its stages and World
//! * `error` - The crate's error type
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Vector3;
//! use voxel_streaming::config::StreamingConfig;
//! use voxel_streaming::engine_state::presentation::HeadlessPresentation;
//! use voxel_streaming::engine_state::viewpoint::Viewpoint;
//! use voxel_streaming::engine_state::StreamingEngine;
//!
//! let config = StreamingConfig {
//!     render_distance: 1,
//!     world_height: 2,
//!     ..StreamingConfig::default()
//! };
//! let viewpoint = Viewpoint::default();
//! let mut engine = StreamingEngine::start(config, viewpoint.clone()).unwrap();
//! let mut presentation = HeadlessPresentation::new();
//!
//! for _ in 0..10 {
//!     viewpoint.translate(Vector3::new(1.0, 0.0, 0.0));
//!     engine.frame(&mut presentation);
//! }
//! engine.shutdown();
//! ```

use std::path::Path;
use std::thread;
use std::time::Duration;

use cgmath::{Point3, Vector3};
use log::info;

use config::StreamingConfig;
use engine_state::presentation::HeadlessPresentation;
use engine_state::viewpoint::Viewpoint;
use engine_state::voxels::chunk::CHUNK_DIMENSION;
use engine_state::StreamingEngine;

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

/// Frames the headless demo runs for.
const DEMO_FRAMES: u32 = 600;
/// Frames it takes the demo viewpoint to cross one chunk.
const DEMO_FRAMES_PER_CHUNK: f32 = 60.0;
const DEMO_FRAME_TIME: Duration = Duration::from_millis(16);

/// Initializes `env_logger` on stdout, filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        info!("Logger initialized");
    }
}

/// Runs the headless demo: walks a viewpoint along +x and logs every frame
/// that changed something.
///
/// # Arguments
/// * `config_path` - Optional JSON configuration file; defaults are used without one
pub fn run(config_path: Option<&Path>) -> error::Result<()> {
    init_logger();

    let config = match config_path {
        Some(path) => StreamingConfig::load(path)?,
        None => StreamingConfig::default(),
    };
    let chunk_extent = CHUNK_DIMENSION as f32 * config.block_size;
    let step = chunk_extent / DEMO_FRAMES_PER_CHUNK;

    // Start halfway up the world so builds favour the middle layers.
    let viewpoint = Viewpoint::new(Point3::new(
        chunk_extent / 2.0,
        chunk_extent * config.world_height as f32 / 2.0,
        chunk_extent / 2.0,
    ));
    let mut engine = StreamingEngine::start(config, viewpoint.clone())?;
    let mut presentation = HeadlessPresentation::new();

    for frame in 0..DEMO_FRAMES {
        viewpoint.translate(Vector3::new(step, 0.0, 0.0));
        let report = engine.frame(&mut presentation);
        if !report.is_empty() {
            info!(
                "Frame {frame}: {} uploaded, {} refreshed, {} removed, {} chunks loaded, {} waiting for generation",
                report.uploaded,
                report.refreshed,
                report.removed,
                engine.world().chunk_count(),
                engine.world().pending_generation()
            );
        }
        thread::sleep(DEMO_FRAME_TIME);
    }

    info!(
        "Demo finished: {} chunks attached, {} indices per frame, {} geometry allocations released",
        presentation.attached().len(),
        presentation.drawn_indices(),
        presentation.released()
    );
    engine.shutdown();
    Ok(())
}
