use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::{
    block::{block_side::BlockSide, Block},
    chunk::LocalPosition,
};

/// Corner offsets of each face, in block units, indexed by `BlockSide`.
///
/// Corners run counter-clockwise when looking at the face from outside, and are
/// paired with [`FACE_UVS`] in the same order.
const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // FRONT (+Z)
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
    // BACK (-Z)
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    // BOTTOM (-Y)
    [[1.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
    // TOP (+Y)
    [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    // LEFT (-X)
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
    // RIGHT (+X)
    [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
];

const FACE_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Index pattern of the two triangles of a quad, relative to its first vertex.
const FACE_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Represents a single visible quad of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// The block the face belongs to
    pub position: LocalPosition,
    /// The block's type and light
    pub block: Block,
    /// Which side of the block this face represents
    pub side: BlockSide,
}

impl Face {
    pub fn new(position: LocalPosition, block: Block, side: BlockSide) -> Self {
        Face {
            position,
            block,
            side,
        }
    }

    /// The four corners of the face, scaled to world units but relative to the chunk origin.
    pub fn vertices(&self, block_size: f32) -> [Vertex; 4] {
        let origin = [
            self.position.x as f32,
            self.position.y as f32,
            self.position.z as f32,
        ];
        let normal = self.side.normal();
        let texture_index = self.block.texture_index(self.side);
        let corners = &FACE_CORNERS[self.side as usize];

        std::array::from_fn(|corner| {
            let offset = corners[corner];
            Vertex::new(
                [
                    (origin[0] + offset[0]) * block_size,
                    (origin[1] + offset[1]) * block_size,
                    (origin[2] + offset[2]) * block_size,
                ],
                normal,
                FACE_UVS[corner],
                texture_index,
                self.block.light,
            )
        })
    }

    /// The six indices of the face, offset by the number of vertices emitted before it.
    pub fn indices(first_vertex: u32) -> [u32; 6] {
        FACE_INDICES.map(|index| index + first_vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    #[test]
    fn corners_lie_on_the_face_plane() {
        let position = LocalPosition::new(0, 0, 0).unwrap();
        for side in BlockSide::all() {
            let face = Face::new(position, Block::new(BlockType::DIRT, 1.0), side);
            let normal = side.normal();
            let axis = normal.iter().position(|component| *component != 0.0).unwrap();
            let expected = if normal[axis] > 0.0 { 1.0 } else { 0.0 };
            for vertex in face.vertices(1.0) {
                assert_eq!(vertex.position[axis], expected, "{side:?}");
                assert_eq!(vertex.normal, normal);
                assert_eq!(vertex.texture_index, 1.0);
            }
        }
    }

    #[test]
    fn winding_faces_outwards() {
        let position = LocalPosition::new(3, 4, 5).unwrap();
        for side in BlockSide::all() {
            let [a, b, c, _] = Face::new(position, Block::new(BlockType::STONE, 1.0), side).vertices(1.0);
            let ab = [b.position[0] - a.position[0], b.position[1] - a.position[1], b.position[2] - a.position[2]];
            let ac = [c.position[0] - a.position[0], c.position[1] - a.position[1], c.position[2] - a.position[2]];
            let cross = [
                ab[1] * ac[2] - ab[2] * ac[1],
                ab[2] * ac[0] - ab[0] * ac[2],
                ab[0] * ac[1] - ab[1] * ac[0],
            ];
            assert_eq!(cross, side.normal(), "{side:?}");
        }
    }

    #[test]
    fn positions_are_scaled_by_block_size() {
        let face = Face::new(
            LocalPosition::new(1, 2, 3).unwrap(),
            Block::new(BlockType::GRASS, 0.4),
            BlockSide::TOP,
        );
        let vertices = face.vertices(2.0);
        assert_eq!(vertices[0].position, [2.0, 6.0, 8.0]);
        assert_eq!(vertices[2].position, [4.0, 6.0, 6.0]);
        assert_eq!(vertices[0].light, 0.4);
        assert_eq!(Face::indices(8), [8, 9, 10, 8, 10, 11]);
    }
}
