//! # Column State
//!
//! Terrain generation of a chunk depends on the chunks stacked above it: the
//! surface height found in a column and the light accumulated while walking down
//! it are carried from layer to layer. A [`ColumnSnapshot`] is that carried state
//! as it enters one chunk layer; [`ColumnStates`] holds the snapshots produced by
//! finished layers until the layer below picks them up.
//!
//! Snapshots are a pure function of the seed and the chunk coordinate, so a
//! missing snapshot can always be recomputed and two generators producing the
//! same snapshot never disagree.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::engine_state::voxels::chunk::{ChunkCoordinate, CHUNK_DIMENSION, CHUNK_PLANE_SIZE};

/// Per-block-column state entering one chunk layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSnapshot {
    /// World-space y of the surface found so far, per (x, z).
    surface: Vec<Option<i32>>,
    /// Light accumulated so far, per (x, z).
    light: Vec<f32>,
}

impl ColumnSnapshot {
    /// The state entering the topmost layer: no surface found, no light accumulated.
    pub fn fresh() -> Self {
        Self {
            surface: vec![None; CHUNK_PLANE_SIZE as usize],
            light: vec![0.0; CHUNK_PLANE_SIZE as usize],
        }
    }

    fn index(x: i32, z: i32) -> usize {
        (x + z * CHUNK_DIMENSION) as usize
    }

    pub fn surface(&self, x: i32, z: i32) -> Option<i32> {
        self.surface[Self::index(x, z)]
    }

    pub fn set_surface(&mut self, x: i32, z: i32, surface: Option<i32>) {
        self.surface[Self::index(x, z)] = surface;
    }

    pub fn light(&self, x: i32, z: i32) -> f32 {
        self.light[Self::index(x, z)]
    }

    pub fn set_light(&mut self, x: i32, z: i32, light: f32) {
        self.light[Self::index(x, z)] = light;
    }
}

/// Snapshots waiting for the chunk layer they were produced for.
///
/// Keyed by the coordinate of the chunk that consumes the snapshot.
#[derive(Default)]
pub struct ColumnStates {
    snapshots: Mutex<HashMap<ChunkCoordinate, ColumnSnapshot>>,
}

impl ColumnStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the snapshot for the chunk at `position`.
    pub fn take(&self, position: ChunkCoordinate) -> Option<ColumnSnapshot> {
        self.snapshots.lock().remove(&position)
    }

    /// Stores the snapshot the chunk at `position` will start from.
    pub fn store(&self, position: ChunkCoordinate, snapshot: ColumnSnapshot) {
        self.snapshots.lock().insert(position, snapshot);
    }

    pub fn forget(&self, position: ChunkCoordinate) {
        self.snapshots.lock().remove(&position);
    }

    /// Drops every snapshot whose chunk coordinate fails `keep`.
    pub fn retain(&self, mut keep: impl FnMut(ChunkCoordinate) -> bool) {
        self.snapshots.lock().retain(|position, _| keep(*position));
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    #[test]
    fn fresh_snapshot_is_unlit_without_surface() {
        let snapshot = ColumnSnapshot::fresh();
        assert_eq!(snapshot.surface(15, 15), None);
        assert_eq!(snapshot.light(0, 7), 0.0);
    }

    #[test]
    fn snapshots_are_taken_once() {
        let states = ColumnStates::new();
        let position = Point3::new(0, 2, 0);
        let mut snapshot = ColumnSnapshot::fresh();
        snapshot.set_surface(3, 4, Some(40));
        snapshot.set_light(3, 4, 0.3);
        states.store(position, snapshot.clone());

        assert_eq!(states.take(position), Some(snapshot));
        assert_eq!(states.take(position), None);
    }

    #[test]
    fn retain_prunes_by_coordinate() {
        let states = ColumnStates::new();
        states.store(Point3::new(0, 1, 0), ColumnSnapshot::fresh());
        states.store(Point3::new(9, 1, 0), ColumnSnapshot::fresh());
        states.retain(|position| position.x < 5);
        assert_eq!(states.len(), 1);
        states.forget(Point3::new(0, 1, 0));
        assert!(states.is_empty());
    }
}
