//! # Voxel World
//!
//! This module contains the voxel side of the streaming pipeline: what a chunk
//! is, how it is filled, which chunks should exist, and the World that owns them.
//!
//! ## Architecture
//!
//! * **Block**: Block types, faces and the block value stored in chunks
//! * **Chunk**: A 16x16x16 cube of blocks with its lifecycle state
//! * **Generation**: The `ChunkGenerator` stage and the terrain noise behind it
//! * **Allocation**: The `ChunkAllocator` stage following the viewpoint
//! * **Region**: Region center, in-flight coordinates and queue priorities
//! * **World**: The chunk map, the queues and per-frame upload/removal
//!
//! ## Data Flow
//!
//! 1. The allocator enqueues Empty chunks for coordinates entering the region
//! 2. Generators fill them top layer first and pass them to the build queue
//! 3. Builders mesh them (see `rendering::meshing`) and send the result to World
//! 4. World registers the chunk, uploads its geometry and rebuilds its neighbors
//! 5. Chunks leaving the region are flagged by the allocator and erased by World

pub mod allocation;
pub mod block;
pub mod chunk;
pub mod generation;
pub mod region;
pub mod world;
