//! # Task System Core Traits
//!
//! This module defines the unit of work driven by the worker pool.
//!
//! Every streaming stage is a long-lived task that is polled over and over by
//! one dedicated thread: each `poll()` pulls at most one item from the stage's
//! input queue, processes it, and reports what happened so the pool can decide
//! whether to poll again right away or back off.
//!
//! ## Task Lifecycle
//! 1. A `StreamingTask` is handed to `WorkerPool::spawn()`
//! 2. The worker thread calls `poll()` while the world is active
//! 3. `Progressed` polls again immediately, `Idle` and `Deferred` sleep first
//! 4. Clearing the active flag ends the loop after the current poll returns
//!
//! ## Thread Safety
//! - `StreamingTask` must be `Send` to be moved onto its worker thread
//! - All shared state the task touches must be synchronized by the task itself

/// What a single poll of a streaming task accomplished.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A work item was processed (or dropped); poll again right away.
    Progressed,
    /// The input queue was empty.
    Idle,
    /// A work item could not be processed yet and was put back.
    Deferred,
}

/// A stage of the streaming pipeline that can be driven by a worker thread.
///
/// Implementations must not block indefinitely inside `poll()`; the pool only
/// observes shutdown between polls.
pub trait StreamingTask: Send {
    /// Name of the task, used for the worker thread and in log messages.
    fn name(&self) -> &str;

    /// Processes at most one unit of work.
    ///
    /// Errors for a single work item are handled (logged) inside the task;
    /// the outcome only tells the pool how to schedule the next poll.
    fn poll(&mut self) -> TaskOutcome;
}
