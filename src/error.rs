//! # Error Module
//!
//! Error types shared by the streaming pipeline.
//!
//! Only configuration loading and thread spawning surface errors to the caller.
//! Everything that happens inside a worker loop is logged and swallowed by the
//! worker pool, so a single bad chunk never stops world streaming.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine_state::voxels::chunk::{ChunkCoordinate, ChunkState};

/// Errors produced by the streaming pipeline.
#[derive(Debug, Error)]
pub enum StreamingError {
    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for `StreamingConfig`.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A chunk was asked to make a transition its state machine forbids.
    #[error("chunk {position:?} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        position: ChunkCoordinate,
        from: ChunkState,
        to: ChunkState,
    },

    /// A stage received a chunk in a state it cannot process.
    #[error("chunk {position:?} is {state:?}, expected {expected}")]
    UnexpectedState {
        position: ChunkCoordinate,
        state: ChunkState,
        expected: &'static str,
    },

    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StreamingError>;

/// Reports a broken pipeline invariant.
///
/// Debug builds panic so the fault is caught where it happens. Release builds
/// log the message and let the caller fall through to its no-op path.
#[track_caller]
pub fn invariant_violation(message: &str) {
    log::error!("Invariant violation: {message}");
    debug_assert!(false, "invariant violation: {message}");
}
