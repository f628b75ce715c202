//! Testing utilities for Herald.
//!
//! This module provides utilities to make testing listeners and bus
//! configurations easier.
//!
//! # Features
//!
//! - [`Recorder`]: A shared, clonable log that handlers append to
//! - [`ManualExecutor`]: An executor that queues tasks until the test runs them

use herald_core::{Executor, Task};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

// ============================================================================
// Recorder
// ============================================================================

/// A shared log of values recorded by handlers.
///
/// Clones share the same log, so one clone can live inside a listener while
/// the test inspects another.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = Recorder::<String>::new();
/// let listener = Arc::new(Audit { log: recorder.clone() });
///
/// bus.register(listener)?;
/// bus.post(String::from("login"));
///
/// assert_eq!(recorder.events(), vec!["login".to_string()]);
/// ```
pub struct Recorder<T> {
    events: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a value.
    pub fn record(&self, value: T) {
        self.events.lock().push(value);
    }

    /// Get a clone of the recorded values, in recording order.
    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }

    /// Remove and return every recorded value.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Get the number of recorded values.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Check whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clear all recorded values.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<T: Clone> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

// ============================================================================
// Manual Executor
// ============================================================================

/// An executor that only queues tasks.
///
/// Nothing runs until the test calls [`run_pending`](Self::run_pending) or
/// [`run_one`](Self::run_one), which makes asynchronous delivery
/// deterministic. Clones share the same queue.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualExecutor {
    /// Create an executor with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest queued task. Returns `false` if the queue was empty.
    pub fn run_one(&self) -> bool {
        // The lock is released before running so tasks may submit more tasks.
        let next = self.queue.lock().pop_front();
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run queued tasks until the queue is empty, including tasks submitted
    /// while running. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn submit(&self, task: Task) {
        self.queue.lock().push_back(task);
    }
}
