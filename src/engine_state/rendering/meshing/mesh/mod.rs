//! Mesh generation for chunk geometry.
//!
//! This module provides the conversion from block data into GPU-friendly
//! vertex and index buffers.
//!
//! # Architecture
//! - [`ChunkMesh`]: The vertex and index buffers of one chunk
//! - [`Face`]: A single visible quad of a block
//! - [`NeighborPlanes`] / [`OccupancyGrid`]: Cross-chunk occupancy used for culling
//!
//! # Usage
//! ```
//! use std::collections::BTreeMap;
//! use voxel_streaming::config::BoundaryPolicy;
//! use voxel_streaming::engine_state::rendering::meshing::mesh::{build_chunk_mesh, NeighborPlanes};
//! use voxel_streaming::engine_state::voxels::block::{block_type::BlockType, Block};
//! use voxel_streaming::engine_state::voxels::chunk::LocalPosition;
//!
//! let mut blocks = BTreeMap::new();
//! blocks.insert(LocalPosition::new(1, 1, 1).unwrap(), Block::new(BlockType::STONE, 1.0));
//! let mesh = build_chunk_mesh(&blocks, &NeighborPlanes::new(), &BoundaryPolicy::default(), 2.0);
//! assert_eq!(mesh.face_count(), 6);
//! ```

mod face;
mod mesh;
mod occupancy;

pub use face::Face;
pub use mesh::*;
pub use occupancy::{NeighborPlanes, OccupancyGrid};
