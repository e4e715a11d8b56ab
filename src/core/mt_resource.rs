use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can be shared
/// across threads. It wraps an `Arc<RwLock<T>>`; cloning the resource clones the handle,
/// not the value. The lock does not poison, so a worker that panics while holding a
/// guard leaves the value usable for every other thread.
///
/// # Examples
///
/// ```
/// use voxel_streaming::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let counter_clone = counter.clone();
///
/// std::thread::spawn(move || {
///     *counter_clone.get_mut() += 1;
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// # Performance Considerations
/// - Read operations (`get()`) can occur concurrently
/// - Write operations (`get_mut()`) are exclusive and will block other operations
/// - Keep guards short-lived; never hold one across a generation or build computation
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a guard that allows reading the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read()
    }

    /// Returns a guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write()
    }

    /// Whether two handles point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let resource = MtResource::new(vec![1, 2]);
        let handle = resource.clone();
        handle.get_mut().push(3);

        assert_eq!(*resource.get(), vec![1, 2, 3]);
        assert!(resource.ptr_eq(&handle));
        assert!(!resource.ptr_eq(&MtResource::new(vec![1, 2, 3])));
    }

    #[test]
    fn survives_a_panicking_writer() {
        let resource = MtResource::new(5);
        let handle = resource.clone();

        let result = std::thread::spawn(move || {
            let mut guard = handle.get_mut();
            *guard = 6;
            panic!("worker failed");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(*resource.get(), 6);
    }
}
