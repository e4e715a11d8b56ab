//! # Chunk Module
//!
//! This module provides the `Chunk` struct, the spatial unit of the streaming
//! pipeline: a 16x16x16 cube of blocks keyed by local coordinate, plus its
//! lifecycle state and the presentation handles of its uploaded geometry.
//!
//! ## Storage
//!
//! Blocks are stored sparsely; a local position with no entry is air. The map is
//! ordered, so iterating a chunk's blocks always visits them in the same order and
//! meshing the same chunk twice produces identical buffers.
//!
//! ## Coordinates
//!
//! * `ChunkCoordinate`: position of a chunk in chunk-grid units
//! * `LocalPosition`: position of a block inside its chunk, `0..CHUNK_DIMENSION` per axis
//! * world units: `chunk * CHUNK_DIMENSION * block_size`

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use cgmath::{Point3, Vector3};

use super::block::block_side::BlockSide;
use super::block::Block;
use crate::engine_state::presentation::GeometryHandles;
use crate::error::{Result, StreamingError};

mod chunk_state;

pub use chunk_state::ChunkState;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The dimension of a chunk including an extra layer of blocks on each side for neighbor lookups.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The number of blocks in a wrapped 2D chunk plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of blocks in a wrapped chunk.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_DIMENSION_WRAPPED;

/// Position of a chunk in chunk-grid units.
pub type ChunkCoordinate = Point3<i32>;

/// Returns the chunk containing a world-space position.
pub fn chunk_coordinate_of(world_position: Point3<f32>, block_size: f32) -> ChunkCoordinate {
    let chunk_extent = CHUNK_DIMENSION as f32 * block_size;
    Point3::new(
        (world_position.x / chunk_extent).floor() as i32,
        (world_position.y / chunk_extent).floor() as i32,
        (world_position.z / chunk_extent).floor() as i32,
    )
}

/// World-space translation of a chunk's origin.
pub fn chunk_placement(position: ChunkCoordinate, block_size: f32) -> Vector3<f32> {
    let chunk_extent = CHUNK_DIMENSION as f32 * block_size;
    Vector3::new(
        position.x as f32 * chunk_extent,
        position.y as f32 * chunk_extent,
        position.z as f32 * chunk_extent,
    )
}

/// The chunk adjacent to `position` on `side`.
pub fn neighbor_coordinate(position: ChunkCoordinate, side: BlockSide) -> ChunkCoordinate {
    position + side.offset()
}

/// Chebyshev distance between two chunks in the x/z plane.
pub fn planar_distance(a: ChunkCoordinate, b: ChunkCoordinate) -> i32 {
    (a.x - b.x).abs().max((a.z - b.z).abs())
}

/// Position of a block inside its chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPosition {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPosition {
    /// Creates a local position, or `None` if any axis is outside the chunk.
    pub fn new(x: i32, y: i32, z: i32) -> Option<Self> {
        let range = 0..CHUNK_DIMENSION;
        if range.contains(&x) && range.contains(&y) && range.contains(&z) {
            Some(Self {
                x: x as u8,
                y: y as u8,
                z: z as u8,
            })
        } else {
            None
        }
    }

    pub fn as_point(self) -> Point3<i32> {
        Point3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    /// The position one step towards `side`, or `None` if that crosses the chunk boundary.
    pub fn neighbor(self, side: BlockSide) -> Option<Self> {
        let next = self.as_point() + side.offset();
        Self::new(next.x, next.y, next.z)
    }

    /// The position inside the neighbor chunk on `side` that touches this block.
    ///
    /// Only meaningful for positions on the boundary facing `side`.
    pub fn mirrored(self, side: BlockSide) -> Self {
        let next = self.as_point() + side.offset();
        let wrap = |value: i32| value.rem_euclid(CHUNK_DIMENSION) as u8;
        Self {
            x: wrap(next.x),
            y: wrap(next.y),
            z: wrap(next.z),
        }
    }
}

/// A 16x16x16 cube of blocks and its pipeline state.
///
/// Chunks are shared as `MtResource<Chunk>`; every field except the removal flag
/// is only touched under the chunk's lock, so state transitions happen in the same
/// lock scope as the mutation that causes them.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: ChunkCoordinate,
    blocks: BTreeMap<LocalPosition, Block>,
    state: ChunkState,
    /// Bumped whenever something the mesh depends on changes.
    revision: u64,
    geometry: Option<GeometryHandles>,
    removal_requested: AtomicBool,
}

impl Chunk {
    /// Creates a new chunk in state Empty with no blocks.
    pub fn new(position: ChunkCoordinate) -> Self {
        Chunk {
            position,
            blocks: BTreeMap::new(),
            state: ChunkState::Empty,
            revision: 0,
            geometry: None,
            removal_requested: AtomicBool::new(false),
        }
    }

    /// Creates a chunk already in state Generated holding `blocks`.
    ///
    /// Used for hand-built chunks, e.g. fixtures and imported data.
    pub fn with_blocks(
        position: ChunkCoordinate,
        blocks: impl IntoIterator<Item = (LocalPosition, Block)>,
    ) -> Self {
        let mut chunk = Chunk::new(position);
        chunk.blocks = blocks.into_iter().collect();
        chunk.state = ChunkState::Generated;
        chunk
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Moves the chunk to `next` if the state machine allows it.
    pub fn transition(&mut self, next: ChunkState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(StreamingError::InvalidTransition {
                position: self.position,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Stores freshly generated blocks and marks the chunk Generated.
    pub fn fill(&mut self, blocks: BTreeMap<LocalPosition, Block>) -> Result<()> {
        if self.state != ChunkState::Empty {
            return Err(StreamingError::UnexpectedState {
                position: self.position,
                state: self.state,
                expected: "Empty",
            });
        }
        self.blocks = blocks;
        self.transition(ChunkState::Generated)
    }

    /// Replaces (or with `None`, clears) one block of a built chunk.
    ///
    /// # Returns
    /// `true` if the chunk just became Dirty and has to be scheduled for a rebuild,
    /// `false` if it was already waiting for one.
    pub fn set_block(&mut self, position: LocalPosition, block: Option<Block>) -> Result<bool> {
        if !matches!(self.state, ChunkState::Ready | ChunkState::Dirty) {
            return Err(StreamingError::UnexpectedState {
                position: self.position,
                state: self.state,
                expected: "Ready or Dirty",
            });
        }

        match block {
            Some(block) => self.blocks.insert(position, block),
            None => self.blocks.remove(&position),
        };
        self.invalidate()
    }

    /// Records that the chunk's mesh is out of date, either because its own blocks
    /// changed or because a neighbor appeared.
    ///
    /// A build already running on an older revision notices the change in
    /// [`complete_build`](Self::complete_build) and asks for another pass.
    ///
    /// # Returns
    /// `true` if the chunk moved from Ready to Dirty and has to be scheduled.
    pub fn invalidate(&mut self) -> Result<bool> {
        match self.state {
            ChunkState::Ready => {
                self.revision += 1;
                self.transition(ChunkState::Dirty)?;
                Ok(true)
            }
            ChunkState::Dirty => {
                self.revision += 1;
                Ok(false)
            }
            state => Err(StreamingError::UnexpectedState {
                position: self.position,
                state,
                expected: "Ready or Dirty",
            }),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks a finished build of `built_revision` as Ready.
    ///
    /// # Returns
    /// `true` if the chunk changed while it was being built. It is then Dirty
    /// again and has to be re-enqueued.
    pub fn complete_build(&mut self, built_revision: u64) -> Result<bool> {
        if !self.state.is_buildable() {
            return Err(StreamingError::UnexpectedState {
                position: self.position,
                state: self.state,
                expected: "Generated or Dirty",
            });
        }
        self.transition(ChunkState::Ready)?;
        if self.revision != built_revision {
            self.transition(ChunkState::Dirty)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// All blocks of the chunk in a stable order.
    pub fn blocks(&self) -> &BTreeMap<LocalPosition, Block> {
        &self.blocks
    }

    pub fn get_block(&self, position: LocalPosition) -> Option<&Block> {
        self.blocks.get(&position)
    }

    /// Whether the block at `position` is solid. Absent blocks are air.
    pub fn is_block_solid(&self, position: LocalPosition) -> bool {
        self.blocks.contains_key(&position)
    }

    pub fn geometry(&self) -> Option<GeometryHandles> {
        self.geometry
    }

    pub fn set_geometry(&mut self, handles: GeometryHandles) {
        self.geometry = Some(handles);
    }

    pub fn take_geometry(&mut self) -> Option<GeometryHandles> {
        self.geometry.take()
    }

    /// Flags the chunk for removal.
    ///
    /// # Returns
    /// `true` the first time it is called, so a chunk is only queued for removal once.
    pub fn request_removal(&self) -> bool {
        !self.removal_requested.swap(true, Ordering::AcqRel)
    }

    pub fn is_removal_requested(&self) -> bool {
        self.removal_requested.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    fn stone() -> Block {
        Block::new(BlockType::STONE, 1.0)
    }

    #[test]
    fn world_positions_map_to_chunks_with_floor() {
        let block_size = 2.0;
        assert_eq!(chunk_coordinate_of(Point3::new(0.0, 0.0, 0.0), block_size), Point3::new(0, 0, 0));
        assert_eq!(chunk_coordinate_of(Point3::new(31.9, 32.0, 64.5), block_size), Point3::new(0, 1, 2));
        assert_eq!(chunk_coordinate_of(Point3::new(-0.1, -32.0, -33.0), block_size), Point3::new(-1, -1, -2));
    }

    #[test]
    fn placement_scales_by_chunk_extent() {
        assert_eq!(chunk_placement(Point3::new(1, -2, 3), 2.0), Vector3::new(32.0, -64.0, 96.0));
    }

    #[test]
    fn planar_distance_ignores_height() {
        assert_eq!(planar_distance(Point3::new(0, 0, 0), Point3::new(3, 7, -2)), 3);
        assert_eq!(planar_distance(Point3::new(-1, 0, 4), Point3::new(-1, 5, -1)), 5);
    }

    #[test]
    fn local_positions_stay_inside_the_chunk() {
        assert!(LocalPosition::new(0, 15, 7).is_some());
        assert!(LocalPosition::new(16, 0, 0).is_none());
        assert!(LocalPosition::new(0, -1, 0).is_none());

        let corner = LocalPosition::new(15, 0, 0).unwrap();
        assert_eq!(corner.neighbor(BlockSide::RIGHT), None);
        assert_eq!(corner.mirrored(BlockSide::RIGHT), LocalPosition::new(0, 0, 0).unwrap());
        assert_eq!(corner.mirrored(BlockSide::BOTTOM), LocalPosition::new(15, 15, 0).unwrap());
        assert_eq!(corner.neighbor(BlockSide::LEFT), LocalPosition::new(14, 0, 0));
    }

    #[test]
    fn follows_the_state_machine() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert_eq!(chunk.state(), ChunkState::Empty);
        assert!(chunk.transition(ChunkState::Ready).is_err());

        let mut blocks = BTreeMap::new();
        blocks.insert(LocalPosition::new(1, 2, 3).unwrap(), stone());
        chunk.fill(blocks).unwrap();
        assert_eq!(chunk.state(), ChunkState::Generated);
        assert!(chunk.fill(BTreeMap::new()).is_err());

        chunk.transition(ChunkState::Ready).unwrap();
        assert!(chunk.transition(ChunkState::Generated).is_err());
        chunk.transition(ChunkState::Dirty).unwrap();
        chunk.transition(ChunkState::Ready).unwrap();
        assert_eq!(chunk.state(), ChunkState::Ready);
    }

    #[test]
    fn editing_marks_the_chunk_dirty_once() {
        let position = LocalPosition::new(4, 4, 4).unwrap();
        let mut chunk = Chunk::with_blocks(Point3::new(0, 0, 0), [(position, stone())]);
        assert!(chunk.set_block(position, None).is_err());

        chunk.transition(ChunkState::Ready).unwrap();
        assert!(chunk.set_block(position, None).unwrap());
        assert_eq!(chunk.state(), ChunkState::Dirty);
        assert!(!chunk.is_block_solid(position));

        assert!(!chunk.set_block(position, Some(stone())).unwrap());
        assert!(chunk.is_block_solid(position));
    }

    #[test]
    fn edits_during_a_build_are_not_lost() {
        let position = LocalPosition::new(0, 0, 0).unwrap();
        let mut chunk = Chunk::with_blocks(Point3::new(0, 0, 0), [(position, stone())]);
        let first_build = chunk.revision();
        assert!(!chunk.complete_build(first_build).unwrap());
        assert_eq!(chunk.state(), ChunkState::Ready);

        assert!(chunk.invalidate().unwrap());
        let second_build = chunk.revision();
        chunk.set_block(position, None).unwrap();

        assert!(chunk.complete_build(second_build).unwrap());
        assert_eq!(chunk.state(), ChunkState::Dirty);
        assert!(!chunk.complete_build(chunk.revision()).unwrap());
        assert_eq!(chunk.state(), ChunkState::Ready);
    }

    #[test]
    fn removal_is_requested_once() {
        let chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(!chunk.is_removal_requested());
        assert!(chunk.request_removal());
        assert!(!chunk.request_removal());
        assert!(chunk.is_removal_requested());
    }
}
