//! Rendering side of the streaming pipeline.
//!
//! This module turns chunk blocks into GPU-ready geometry: the interleaved
//! [`Vertex`] layout and the `ChunkBuilder` stage that meshes chunks on worker
//! threads. Uploading and drawing belong to the presentation layer.

pub mod meshing;
mod vertex;

pub use vertex::{Vertex, VERTEX_FLOATS};
