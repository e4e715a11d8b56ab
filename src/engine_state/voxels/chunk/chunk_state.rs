//! # Chunk State Module
//!
//! The lifecycle of a chunk as it moves through the pipeline:
//!
//! ```text
//! Empty --generate--> Generated --build--> Ready --edit--> Dirty --build--> Ready
//! ```
//!
//! Empty is only entered at creation. Dirty is the only state reachable from
//! Ready; there is no way back to Empty or Generated short of destroying the
//! chunk and creating a new one.

/// Lifecycle state of a chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Created by the allocator, no blocks yet.
    Empty,
    /// Blocks filled in by the generator.
    Generated,
    /// Mesh built and handed to the presentation layer.
    Ready,
    /// Blocks or neighbors changed after the last build; waiting for a rebuild.
    Dirty,
}

impl ChunkState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ChunkState) -> bool {
        matches!(
            (self, next),
            (ChunkState::Empty, ChunkState::Generated)
                | (ChunkState::Generated, ChunkState::Ready)
                | (ChunkState::Ready, ChunkState::Dirty)
                | (ChunkState::Dirty, ChunkState::Ready)
        )
    }

    /// Whether a builder may mesh a chunk in this state.
    pub fn is_buildable(self) -> bool {
        matches!(self, ChunkState::Generated | ChunkState::Dirty)
    }
}
