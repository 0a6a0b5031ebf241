// src/dispatch/mod.rs

//! Dispatch queues.
//!
//! Two independent FIFO queues of task handles, each behind its own mutex
//! and condition variable so that draining the main queue never contends
//! with worker wake-ups:
//!
//! - the worker queue, popped by worker threads and by any thread helping
//!   inside `wait`;
//! - the main queue, popped only by the designated main thread.

pub(crate) mod queue;

pub use queue::QueueKind;
pub(crate) use queue::DispatchQueue;
