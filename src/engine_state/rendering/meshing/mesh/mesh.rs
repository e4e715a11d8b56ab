//! Mesh data structures and face-culled meshing.
//!
//! This module turns the blocks of one chunk into vertex and index buffers.
//! Every occupied position is tested against its six neighbors; a face is
//! emitted unless the neighbor cell is solid. Neighbor cells outside the chunk
//! are answered by the [`OccupancyGrid`] border.

use std::collections::BTreeMap;

use crate::config::BoundaryPolicy;
use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::{
    block::{block_side::BlockSide, Block},
    chunk::LocalPosition,
};

use super::face::Face;
use super::occupancy::{NeighborPlanes, OccupancyGrid};

/// Vertex and index buffers of one chunk.
///
/// Each face contributes 4 vertices and 6 indices, so
/// `indices.len() == vertices.len() / 4 * 6` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one face, offsetting its indices by the vertices emitted so far.
    pub fn push_face(&mut self, face: &Face, block_size: f32) {
        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&face.vertices(block_size));
        self.indices.extend_from_slice(&Face::indices(first_vertex));
    }

    pub fn face_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The vertex buffer as raw floats, in the interleaved upload layout.
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Builds the face-culled mesh of a chunk.
///
/// # Arguments
/// * `blocks` - The chunk's blocks
/// * `neighbors` - Boundary layers of the loaded neighbor chunks
/// * `policy` - What to do on sides without a loaded neighbor
/// * `block_size` - Edge length of one block in world units
///
/// Blocks are visited in local-position order, so the same inputs always give
/// byte-identical buffers.
pub fn build_chunk_mesh(
    blocks: &BTreeMap<LocalPosition, Block>,
    neighbors: &NeighborPlanes,
    policy: &BoundaryPolicy,
    block_size: f32,
) -> ChunkMesh {
    let occupancy = OccupancyGrid::new(blocks, neighbors, policy);
    let mut mesh = ChunkMesh::new();

    for (position, block) in blocks {
        for side in BlockSide::all() {
            if occupancy.is_solid(position.as_point() + side.offset()) {
                continue;
            }
            mesh.push_face(&Face::new(*position, *block, side), block_size);
        }
    }

    mesh
}
