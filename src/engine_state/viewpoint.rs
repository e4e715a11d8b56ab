//! # Viewpoint
//!
//! The world-space position the loaded region follows. The host moves it,
//! the allocator reads it once per tick.

use cgmath::{Point3, Vector3};

use crate::core::MtResource;

/// Shared handle to the viewpoint position. Clones observe the same position.
#[derive(Clone)]
pub struct Viewpoint {
    position: MtResource<Point3<f32>>,
}

impl Viewpoint {
    pub fn new(position: Point3<f32>) -> Self {
        Viewpoint {
            position: MtResource::new(position),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        *self.position.get()
    }

    pub fn set_position(&self, position: Point3<f32>) {
        *self.position.get_mut() = position;
    }

    /// Moves the viewpoint by `offset` world units.
    pub fn translate(&self, offset: Vector3<f32>) {
        *self.position.get_mut() += offset;
    }
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_position() {
        let viewpoint = Viewpoint::default();
        let observer = viewpoint.clone();
        viewpoint.translate(Vector3::new(3.0, 0.0, -1.0));
        assert_eq!(observer.position(), Point3::new(3.0, 0.0, -1.0));

        observer.set_position(Point3::new(0.0, 8.0, 0.0));
        assert_eq!(viewpoint.position().y, 8.0);
    }
}
