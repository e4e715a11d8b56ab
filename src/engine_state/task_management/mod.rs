//! # Task Management System
//!
//! This module runs the streaming stages on long-lived worker threads.
//!
//! ## Architecture Overview
//!
//! - `WorkerPool`: spawns one named thread per task and owns the shared
//!   "world active" flag
//! - `StreamingTask`: a pipeline stage that is polled in a loop
//! - `TaskOutcome`: tells the pool whether to poll again or back off
//!
//! Work does not travel through the pool itself. Each stage pulls from the
//! shared queue it was built with; the pool only paces and stops the threads.
//!
//! ## Failure Handling
//! Each poll runs inside `catch_unwind`. A panic while processing one chunk is
//! logged and the thread keeps polling; one bad chunk must not stop streaming.
//! Locks are `parking_lot` locks, which do not poison, so shared state stays
//! usable after such a panic.
//!
//! ## Shutdown
//! `shutdown()` clears the active flag and joins every thread. No poll is
//! interrupted, so no chunk is left half-written.

pub mod task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, trace};
use task::{StreamingTask, TaskOutcome};

use crate::error::{Result, StreamingError};

/// A worker thread and the name of the task it drives.
struct Worker {
    name: String,
    handle: JoinHandle<()>,
}

/// Keeps the streaming stages running on their own threads.
///
/// # Implementation Notes
/// - One OS thread per task, named after the task
/// - Every thread observes the same active flag
/// - Dropping the pool shuts it down
pub struct WorkerPool {
    active: Arc<AtomicBool>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    pub fn new() -> Self {
        WorkerPool {
            active: Arc::new(AtomicBool::new(true)),
            workers: Vec::new(),
        }
    }

    /// Spawns a thread that polls `task` until the pool shuts down.
    ///
    /// # Arguments
    /// * `task` - The stage to drive
    /// * `backoff` - Sleep after a poll that returned `Idle` or `Deferred`
    pub fn spawn(&mut self, mut task: Box<dyn StreamingTask>, backoff: Duration) -> Result<()> {
        let name = task.name().to_string();
        let active = Arc::clone(&self.active);
        let thread_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                info!("Worker {thread_name} started");
                while active.load(Ordering::Acquire) {
                    match panic::catch_unwind(AssertUnwindSafe(|| task.poll())) {
                        Ok(TaskOutcome::Progressed) => {}
                        Ok(outcome) => {
                            trace!("Worker {thread_name} backing off after {outcome:?}");
                            thread::sleep(backoff);
                        }
                        Err(_) => {
                            error!("Worker {thread_name} panicked while processing a work item");
                        }
                    }
                }
                info!("Worker {thread_name} stopped");
            })
            .map_err(|source| StreamingError::WorkerSpawn {
                name: name.clone(),
                source,
            })?;

        self.workers.push(Worker { name, handle });
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Clears the active flag and waits for every worker to finish its current poll.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::Release);
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                error!("Worker {} exited with a panic", worker.name);
            }
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}
