//! # Priority Queue
//!
//! A min-priority queue used by every scheduling stage. Lower priority values
//! are dequeued first; priorities are derived from the distance between a chunk
//! and the viewpoint, so the closest work runs first.
//!
//! [`PriorityQueue`] has no internal synchronization. [`SharedPriorityQueue`]
//! puts one behind a mutex that is held for exactly one operation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Heap entry ordered by priority only.
struct Entry<T> {
    priority: i32,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest priority sits on top
        other.priority.cmp(&self.priority)
    }
}

/// A binary-heap backed queue ordering items by an integer priority (lower = sooner).
///
/// Ties are broken arbitrarily.
///
/// # Examples
/// ```
/// use voxel_streaming::core::PriorityQueue;
///
/// let mut queue = PriorityQueue::new();
/// queue.enqueue(30, "far");
/// queue.enqueue(10, "near");
/// assert_eq!(queue.dequeue(), Some("near"));
/// assert_eq!(queue.len(), 1);
/// ```
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Inserts `item` in O(log n).
    pub fn enqueue(&mut self, priority: i32, item: T) {
        self.heap.push(Entry { priority, item });
    }

    /// Removes and returns the item with the lowest priority in O(log n).
    pub fn dequeue(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    /// Like [`dequeue`](Self::dequeue) but also returns the item's priority.
    pub fn dequeue_with_priority(&mut self) -> Option<(i32, T)> {
        self.heap.pop().map(|entry| (entry.priority, entry.item))
    }

    /// Priority of the next item to be dequeued.
    pub fn peek_priority(&self) -> Option<i32> {
        self.heap.peek().map(|entry| entry.priority)
    }

    /// Number of queued items, O(1).
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`PriorityQueue`] shared between threads.
///
/// Every method acquires the lock for the duration of that single operation.
pub struct SharedPriorityQueue<T> {
    queue: Arc<Mutex<PriorityQueue<T>>>,
}

impl<T> SharedPriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(PriorityQueue::new())),
        }
    }

    pub fn enqueue(&self, priority: i32, item: T) {
        self.queue.lock().enqueue(priority, item);
    }

    pub fn dequeue(&self) -> Option<T> {
        self.queue.lock().dequeue()
    }

    pub fn dequeue_with_priority(&self) -> Option<(i32, T)> {
        self.queue.lock().dequeue_with_priority()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Clone for SharedPriorityQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T> Default for SharedPriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequeues_in_non_decreasing_priority_order() {
        let mut queue = PriorityQueue::new();
        let priorities = [50, 3, 17, 3, 99, -4, 0, 42, 17, 8];
        for (index, priority) in priorities.iter().enumerate() {
            queue.enqueue(*priority, index);
        }

        let mut last = i32::MIN;
        let mut seen = 0;
        while let Some((priority, index)) = queue.dequeue_with_priority() {
            assert!(priority >= last);
            assert_eq!(priorities[index], priority);
            last = priority;
            seen += 1;
        }
        assert_eq!(seen, priorities.len());
    }

    #[test]
    fn strictly_increasing_priorities_come_back_in_order() {
        let mut queue = PriorityQueue::new();
        for priority in (0..64).rev() {
            queue.enqueue(priority * 90, priority);
        }
        let order: Vec<i32> = std::iter::from_fn(|| queue.dequeue()).collect();
        assert_eq!(order, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn empty_queue_yields_none() {
        let mut queue: PriorityQueue<u8> = PriorityQueue::default();
        assert!(queue.is_empty());
        assert_eq!(queue.peek_priority(), None);
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn shared_queue_is_usable_from_many_threads() {
        let queue = SharedPriorityQueue::new();
        let producers: Vec<_> = (0..4)
            .map(|thread| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        queue.enqueue(i, thread * 100 + i);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(queue.len(), 400);
        let mut last = i32::MIN;
        while let Some((priority, _)) = queue.dequeue_with_priority() {
            assert!(priority >= last);
            last = priority;
        }
        assert!(queue.is_empty());
    }
}
