//! # Presentation Layer
//!
//! The boundary between the streaming pipeline and whatever draws the chunks.
//!
//! World calls into a [`PresentationLayer`] from the consuming thread only:
//! geometry handles are created the first time a chunk is uploaded, reused for
//! every rebuild, and released when the chunk is removed. Placement is the
//! chunk's world-space origin; vertex positions are relative to it.
//!
//! [`HeadlessPresentation`] keeps everything in memory. It backs the demo binary
//! and the tests, and doubles as a reference for what a GPU-backed
//! implementation has to track.

use std::collections::HashMap;

use cgmath::Vector3;

use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::ChunkCoordinate;

/// Opaque identifiers of the GPU-side resources of one chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandles {
    pub vertex_buffer: u32,
    pub index_buffer: u32,
    pub vertex_array: u32,
}

/// Receives chunk geometry from World.
pub trait PresentationLayer {
    /// Allocates buffers for a chunk seen for the first time.
    fn create_geometry(&mut self) -> GeometryHandles;

    /// Copies a chunk's buffers to `handles`, replacing earlier contents.
    /// The draw call uses `indices.len()` as its index count.
    fn upload_geometry(&mut self, handles: GeometryHandles, vertices: &[Vertex], indices: &[u32]);

    /// Starts drawing `handles` at `placement` for the chunk at `position`.
    fn attach_chunk(
        &mut self,
        position: ChunkCoordinate,
        placement: Vector3<f32>,
        handles: GeometryHandles,
    );

    /// Stops drawing the chunk at `position`.
    fn detach_chunk(&mut self, position: ChunkCoordinate, handles: GeometryHandles);

    /// Frees the buffers behind `handles`.
    fn release_geometry(&mut self, handles: GeometryHandles);
}

/// Buffer contents held by [`HeadlessPresentation`].
#[derive(Debug, Clone, Default)]
pub struct UploadedGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub uploads: usize,
}

impl UploadedGeometry {
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of faces per block type, read back from the vertex texture indices.
    pub fn faces_by_block_type(&self) -> HashMap<BlockType, usize> {
        let mut faces = HashMap::new();
        for face in self.vertices.chunks(4) {
            if let Some(block_type) = BlockType::from_texture_index(face[0].texture_index) {
                *faces.entry(block_type).or_insert(0) += 1;
            }
        }
        faces
    }
}

/// A chunk currently drawn by [`HeadlessPresentation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachedChunk {
    pub placement: Vector3<f32>,
    pub handles: GeometryHandles,
}

/// An in-memory presentation layer.
#[derive(Debug, Default)]
pub struct HeadlessPresentation {
    next_handle: u32,
    geometry: HashMap<GeometryHandles, UploadedGeometry>,
    attached: HashMap<ChunkCoordinate, AttachedChunk>,
    released: usize,
}

impl HeadlessPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> &HashMap<ChunkCoordinate, AttachedChunk> {
        &self.attached
    }

    pub fn geometry(&self, handles: GeometryHandles) -> Option<&UploadedGeometry> {
        self.geometry.get(&handles)
    }

    /// Geometry currently drawn for the chunk at `position`.
    pub fn chunk_geometry(&self, position: ChunkCoordinate) -> Option<&UploadedGeometry> {
        self.attached
            .get(&position)
            .and_then(|attached| self.geometry.get(&attached.handles))
    }

    /// Number of live geometry allocations.
    pub fn live_geometry(&self) -> usize {
        self.geometry.len()
    }

    pub fn released(&self) -> usize {
        self.released
    }

    /// Total index count of everything attached, i.e. what one frame would draw.
    pub fn drawn_indices(&self) -> usize {
        self.attached
            .values()
            .filter_map(|attached| self.geometry.get(&attached.handles))
            .map(UploadedGeometry::index_count)
            .sum()
    }

    fn next_id(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl PresentationLayer for HeadlessPresentation {
    fn create_geometry(&mut self) -> GeometryHandles {
        let handles = GeometryHandles {
            vertex_buffer: self.next_id(),
            index_buffer: self.next_id(),
            vertex_array: self.next_id(),
        };
        self.geometry.insert(handles, UploadedGeometry::default());
        handles
    }

    fn upload_geometry(&mut self, handles: GeometryHandles, vertices: &[Vertex], indices: &[u32]) {
        let geometry = self.geometry.entry(handles).or_default();
        geometry.vertices.clear();
        geometry.vertices.extend_from_slice(vertices);
        geometry.indices.clear();
        geometry.indices.extend_from_slice(indices);
        geometry.uploads += 1;
    }

    fn attach_chunk(
        &mut self,
        position: ChunkCoordinate,
        placement: Vector3<f32>,
        handles: GeometryHandles,
    ) {
        self.attached
            .insert(position, AttachedChunk { placement, handles });
    }

    fn detach_chunk(&mut self, position: ChunkCoordinate, handles: GeometryHandles) {
        if self
            .attached
            .get(&position)
            .is_some_and(|attached| attached.handles == handles)
        {
            self.attached.remove(&position);
        }
    }

    fn release_geometry(&mut self, handles: GeometryHandles) {
        if self.geometry.remove(&handles).is_some() {
            self.released += 1;
        }
    }
}
