//! # Block Module
//!
//! This module provides the block-related types of the streaming pipeline:
//! block type definitions, block faces and the block value stored in chunks.

use block_type::BlockType;

use self::block_side::BlockSide;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types.
pub type BlockTypeSize = u8;

/// Maps each block type to its texture index for each face.
///
/// The outer array is indexed by `BlockType` as a `usize`.
/// The inner array is indexed by `BlockSide` as a `usize`:
/// [Front, Back, Bottom, Top, Left, Right]
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[u32; 6]; 3] = [
    [0, 0, 0, 0, 0, 0], // STONE
    [1, 1, 1, 1, 1, 1], // DIRT
    [2, 2, 2, 2, 2, 2], // GRASS
];

/// A single voxel of generated terrain.
///
/// Blocks are written once by the generator and only replaced afterwards through
/// the edit path, which marks the owning chunk dirty.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Block {
    pub block_type: BlockType,
    /// Ambient brightness in `0.0..=1.0`; deeper blocks are darker.
    pub light: f32,
}

impl Block {
    /// Creates a new block of the specified type and brightness.
    pub fn new(block_type: BlockType, light: f32) -> Self {
        Block {
            block_type,
            light: light.clamp(0.0, 1.0),
        }
    }

    /// Texture index of this block's face on `side`.
    pub fn texture_index(&self, side: BlockSide) -> u32 {
        BLOCK_TYPE_TO_TEXTURE_INDICES[self.block_type as usize][side as usize]
    }
}
