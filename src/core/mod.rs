//! # Core Module
//!
//! Concurrency primitives shared by every stage of the streaming pipeline.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `PriorityQueue`: Min-priority queue without internal synchronization
//! - `SharedPriorityQueue`: `PriorityQueue` behind a lock held for one operation at a time
//!
//! ## Usage
//! ```rust
//! use voxel_streaming::core::{MtResource, SharedPriorityQueue};
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let queue = SharedPriorityQueue::new();
//! queue.enqueue(2, "later");
//! queue.enqueue(1, "sooner");
//! assert_eq!(queue.dequeue(), Some("sooner"));
//! ```

pub mod mt_resource;
pub mod priority_queue;

pub use mt_resource::MtResource;
pub use priority_queue::{PriorityQueue, SharedPriorityQueue};
