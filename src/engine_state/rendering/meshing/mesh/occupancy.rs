//! Padded occupancy grid used for face culling.
//!
//! The grid holds one bit per block for the chunk plus a one block border on
//! every side (`CHUNK_DIMENSION_WRAPPED` per axis). The border is filled from
//! the boundary planes of the neighbor chunks, so every face test is a single
//! bit lookup whether or not it crosses the chunk boundary.

use std::collections::BTreeMap;

use bitvec::vec::BitVec;
use cgmath::Point3;

use crate::config::BoundaryPolicy;
use crate::engine_state::voxels::{
    block::{block_side::BlockSide, Block},
    chunk::{
        Chunk, LocalPosition, CHUNK_DIMENSION, CHUNK_DIMENSION_WRAPPED, CHUNK_PLANE_SIZE,
        CHUNK_PLANE_SIZE_WRAPPED, CHUNK_SIZE_WRAPPED,
    },
};

/// The two in-plane coordinates of a position on a plane perpendicular to `side`.
fn plane_coordinates(side: BlockSide, position: LocalPosition) -> (i32, i32) {
    let position = position.as_point();
    match side {
        BlockSide::LEFT | BlockSide::RIGHT => (position.y, position.z),
        BlockSide::BOTTOM | BlockSide::TOP => (position.x, position.z),
        BlockSide::BACK | BlockSide::FRONT => (position.x, position.y),
    }
}

/// The border position on `side` for in-plane coordinates `(u, v)`.
fn border_position(side: BlockSide, u: i32, v: i32) -> Point3<i32> {
    match side {
        BlockSide::LEFT => Point3::new(-1, u, v),
        BlockSide::RIGHT => Point3::new(CHUNK_DIMENSION, u, v),
        BlockSide::BOTTOM => Point3::new(u, -1, v),
        BlockSide::TOP => Point3::new(u, CHUNK_DIMENSION, v),
        BlockSide::BACK => Point3::new(u, v, -1),
        BlockSide::FRONT => Point3::new(u, v, CHUNK_DIMENSION),
    }
}

/// Whether a block of the neighbor on `side` touches this chunk.
fn touches(side: BlockSide, neighbor_position: LocalPosition) -> bool {
    let position = neighbor_position.as_point();
    let touching_layer = |offset: i32| if offset > 0 { 0 } else { CHUNK_DIMENSION - 1 };
    let offset = side.offset();
    match side {
        BlockSide::LEFT | BlockSide::RIGHT => position.x == touching_layer(offset.x),
        BlockSide::BOTTOM | BlockSide::TOP => position.y == touching_layer(offset.y),
        BlockSide::BACK | BlockSide::FRONT => position.z == touching_layer(offset.z),
    }
}

/// Occupancy of the neighbor layers touching a chunk, captured from the chunk map.
///
/// A side with no plane means the neighbor chunk was not loaded.
#[derive(Debug, Clone, Default)]
pub struct NeighborPlanes {
    planes: [Option<BitVec>; 6],
}

impl NeighborPlanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the layer of `neighbor` that touches the chunk on `side`.
    pub fn capture(&mut self, side: BlockSide, neighbor: &Chunk) {
        let mut plane = BitVec::repeat(false, CHUNK_PLANE_SIZE as usize);
        for position in neighbor.blocks().keys().filter(|position| touches(side, **position)) {
            let (u, v) = plane_coordinates(side, *position);
            plane.set((u + v * CHUNK_DIMENSION) as usize, true);
        }
        self.planes[side as usize] = Some(plane);
    }

    pub fn has(&self, side: BlockSide) -> bool {
        self.planes[side as usize].is_some()
    }

    /// One bit per side (`1 << side`) for every captured neighbor.
    pub fn mask(&self) -> u8 {
        BlockSide::all()
            .into_iter()
            .filter(|side| self.has(*side))
            .fold(0, |mask, side| mask | 1 << side as u8)
    }
}

/// Solid/air bits of a chunk and its border.
pub struct OccupancyGrid {
    bits: BitVec,
}

impl OccupancyGrid {
    /// Builds the grid for `blocks`.
    ///
    /// Border cells come from `neighbors`; on a side without a neighbor they are
    /// solid exactly when `policy` suppresses that side, which hides the faces.
    pub fn new(
        blocks: &BTreeMap<LocalPosition, Block>,
        neighbors: &NeighborPlanes,
        policy: &BoundaryPolicy,
    ) -> Self {
        let mut grid = OccupancyGrid {
            bits: BitVec::repeat(false, CHUNK_SIZE_WRAPPED),
        };

        for position in blocks.keys() {
            grid.set(position.as_point(), true);
        }

        for side in BlockSide::all() {
            let plane = &neighbors.planes[side as usize];
            let missing_is_solid = !policy.draws(side);
            for v in 0..CHUNK_DIMENSION {
                for u in 0..CHUNK_DIMENSION {
                    let solid = match plane {
                        Some(plane) => plane[(u + v * CHUNK_DIMENSION) as usize],
                        None => missing_is_solid,
                    };
                    if solid {
                        grid.set(border_position(side, u, v), true);
                    }
                }
            }
        }

        grid
    }

    fn index(position: Point3<i32>) -> usize {
        let x = (position.x + 1) as usize;
        let y = (position.y + 1) as usize;
        let z = (position.z + 1) as usize;
        x + y * CHUNK_DIMENSION_WRAPPED + z * CHUNK_PLANE_SIZE_WRAPPED
    }

    fn set(&mut self, position: Point3<i32>, solid: bool) {
        self.bits.set(Self::index(position), solid);
    }

    /// Whether the cell at `position` is solid. `position` may lie one block outside the chunk.
    pub fn is_solid(&self, position: Point3<i32>) -> bool {
        self.bits[Self::index(position)]
    }
}
