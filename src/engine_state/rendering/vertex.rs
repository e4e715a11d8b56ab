//! Vertex data structures for chunk geometry.
//!
//! This module defines the vertex format emitted by the chunk builder and
//! consumed by the presentation layer.

use bytemuck::{Pod, Zeroable};

/// A vertex of chunk geometry.
///
/// Positions are chunk-local and already scaled by the block size; the chunk's
/// placement translation is supplied separately when the chunk is attached.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Texture Index: f32 (4 bytes)
/// - Light: f32 (4 bytes)
///
/// Total size: 40 bytes, ten floats
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Chunk-local position in world units
    pub position: [f32; 3],
    /// Outward normal of the face
    pub normal: [f32; 3],
    /// UV texture coordinates (0.0 or 1.0 per corner)
    pub tex_coords: [f32; 2],
    /// Index of the texture in the texture array; equals the block type discriminant
    pub texture_index: f32,
    /// Baked light of the block, 0.0 (dark) to 1.0 (bright)
    pub light: f32,
}

/// Number of floats in one vertex.
pub const VERTEX_FLOATS: usize = std::mem::size_of::<Vertex>() / std::mem::size_of::<f32>();

impl Vertex {
    /// Creates a new vertex with the given parameters.
    pub fn new(
        position: [f32; 3],
        normal: [f32; 3],
        tex_coords: [f32; 2],
        texture_index: u32,
        light: f32,
    ) -> Self {
        Vertex {
            position,
            normal,
            tex_coords,
            texture_index: texture_index as f32,
            light,
        }
    }
}
