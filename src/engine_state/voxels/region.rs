//! # Streaming Region
//!
//! The bookkeeping shared by every scheduling stage: the chunk-grid center the
//! allocator last settled on and the set of coordinates that have been handed to
//! the pipeline but are not in the chunk map yet.
//!
//! Both live behind one lock so that "is this coordinate still wanted" and
//! "forget this coordinate" are answered atomically. Workers read the center
//! from here rather than from the raw viewpoint, which keeps their stale checks
//! consistent with what the allocator has already enqueued.
//!
//! Lock order: chunk map first, then the region.

use std::collections::HashSet;

use cgmath::{InnerSpace, Point3, Vector3};

use super::chunk::{planar_distance, ChunkCoordinate};

/// Scale applied to the distance of newly allocated chunks.
const GENERATION_PRIORITY_SCALE: f32 = 90.0;
/// Scale applied to the distance of chunks re-enqueued by a worker or by World.
const BUILD_PRIORITY_SCALE: f32 = 120.0;

/// Center of the loaded region plus the coordinates in flight.
pub struct StreamingRegion {
    center: ChunkCoordinate,
    pending: HashSet<ChunkCoordinate>,
}

impl StreamingRegion {
    pub fn new(center: ChunkCoordinate) -> Self {
        Self {
            center,
            pending: HashSet::new(),
        }
    }

    pub fn center(&self) -> ChunkCoordinate {
        self.center
    }

    pub fn set_center(&mut self, center: ChunkCoordinate) {
        self.center = center;
    }

    /// Whether `position` lies farther than `unload_distance` from the center in the x/z plane.
    pub fn is_out_of_range(&self, position: ChunkCoordinate, unload_distance: i32) -> bool {
        planar_distance(position, self.center) > unload_distance
    }

    /// Records `position` as handed to the pipeline.
    ///
    /// # Returns
    /// `false` if it was already pending.
    pub fn mark_pending(&mut self, position: ChunkCoordinate) -> bool {
        self.pending.insert(position)
    }

    pub fn is_pending(&self, position: ChunkCoordinate) -> bool {
        self.pending.contains(&position)
    }

    /// Removes `position` from the pending set once World has registered (or discarded) it.
    pub fn clear_pending(&mut self, position: ChunkCoordinate) -> bool {
        self.pending.remove(&position)
    }

    /// Forgets `position` if it has left the region.
    ///
    /// # Returns
    /// `true` if the caller should drop its work item.
    pub fn drop_if_stale(&mut self, position: ChunkCoordinate, unload_distance: i32) -> bool {
        if self.is_out_of_range(position, unload_distance) {
            self.pending.remove(&position);
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Priority of a chunk entering the generation queue.
///
/// Columns closest to the center go first and, within a column, higher layers
/// go first: a layer cannot generate before the one above it.
pub fn generation_priority(
    position: ChunkCoordinate,
    center: ChunkCoordinate,
    world_height: i32,
) -> i32 {
    let offset = Vector3::new(
        (position.x - center.x) as f32,
        (world_height - position.y) as f32,
        (position.z - center.z) as f32,
    );
    (offset.magnitude() * GENERATION_PRIORITY_SCALE) as i32
}

/// Priority of a chunk entering the build queue.
///
/// Chunks near the viewpoint's own layer are preferred.
pub fn build_priority(position: ChunkCoordinate, center: ChunkCoordinate) -> i32 {
    let offset = position - center;
    let offset = Vector3::new(offset.x as f32, offset.y as f32, offset.z as f32);
    (offset.magnitude() * BUILD_PRIORITY_SCALE) as i32
}

/// Every coordinate of the square region of `radius` around `center`, all layers.
pub fn region_coordinates(
    center: ChunkCoordinate,
    radius: i32,
    world_height: i32,
) -> impl Iterator<Item = ChunkCoordinate> {
    (center.x - radius..=center.x + radius).flat_map(move |x| {
        (center.z - radius..=center.z + radius)
            .flat_map(move |z| (0..world_height).map(move |y| Point3::new(x, y, z)))
    })
}
