//! # Block Type Module
//!
//! This module defines the different types of blocks the terrain generator places.
//! Air is not a block type: an absent block means air.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all solid block types in the voxel world.
///
/// The discriminant doubles as the block's texture index, which is why the
/// `FromPrimitive` derive is used to map texture indices back to types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Bulk rock below the dirt layer.
    STONE = 0,

    /// The layer between the surface and the stone.
    DIRT = 1,

    /// The topmost solid block of a column.
    GRASS = 2,
}

impl BlockType {
    /// Converts a `BlockTypeSize` back into a `BlockType`.
    ///
    /// # Returns
    /// `None` if the value does not name a block type.
    pub fn get_block_type_from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// Maps a texture index found in a vertex back to the block type it was emitted for.
    pub fn from_texture_index(texture_index: f32) -> Option<Self> {
        if texture_index < 0.0 || texture_index.fract() != 0.0 {
            return None;
        }
        Self::get_block_type_from_int(texture_index as BlockTypeSize)
    }
}
