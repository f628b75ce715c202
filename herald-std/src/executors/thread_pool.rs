use super::ExecutorError;
use crossbeam::channel::{self, Sender};
use herald_core::{Executor, Task};
use std::{
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
};

/// A fixed-size pool of worker threads.
///
/// Tasks are queued on an unbounded channel and picked up by whichever worker
/// is free. A panicking task is caught and logged; the worker keeps running.
/// Dropping the pool closes the queue, lets the workers finish what was
/// already submitted, and joins them.
///
/// # Example
///
/// ```rust,ignore
/// let pool = ThreadPool::new(4)?;
/// let bus = EventBus::builder().executor(pool).build();
/// ```
#[derive(Debug)]
pub struct ThreadPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Create a pool with `size` workers.
    pub fn new(size: usize) -> Result<Self, ExecutorError> {
        Self::builder().size(size).build()
    }

    /// Create a builder for configuring a pool.
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::new()
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }
}

impl Executor for ThreadPool {
    fn submit(&self, task: Task) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(task).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("thread pool is shut down, task dropped");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // The last handle may be dropped from inside a task.
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
    }
}

/// Builder for [`ThreadPool`].
#[derive(Debug, Clone)]
pub struct ThreadPoolBuilder {
    size: usize,
    name: String,
}

impl ThreadPoolBuilder {
    /// Create a builder with one worker per available CPU.
    pub fn new() -> Self {
        Self {
            size: thread::available_parallelism().map_or(1, |n| n.get()),
            name: "herald-worker".to_string(),
        }
    }

    /// Set the number of workers.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the worker thread name prefix.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawn the workers.
    pub fn build(self) -> Result<ThreadPool, ExecutorError> {
        if self.size == 0 {
            return Err(ExecutorError::NoWorkers);
        }

        let (sender, receiver) = channel::unbounded::<Task>();
        let mut workers = Vec::with_capacity(self.size);
        for index in 0..self.size {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{index}", self.name))
                .spawn(move || {
                    for task in receiver.iter() {
                        run_task(task);
                    }
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Already spawned workers exit once the sender is gone.
                    drop(sender);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(err.into());
                }
            }
        }

        Ok(ThreadPool {
            sender: Some(sender),
            workers,
        })
    }
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        #[cfg(feature = "tracing")]
        {
            let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
                message
            } else if let Some(message) = payload.downcast_ref::<String>() {
                message.as_str()
            } else {
                "non-string panic payload"
            };
            tracing::error!(panic = message, "task panicked on worker thread");
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = payload;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(ThreadPool::new(0), Err(ExecutorError::NoWorkers)));
    }

    #[test]
    fn drop_drains_submitted_tasks() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::builder().size(2).name("test-pool").build().unwrap();
            assert_eq!(pool.size(), 2);
            for _ in 0..50 {
                let hits = Arc::clone(&hits);
                pool.submit(Box::new(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }
        assert_eq!(hits.load(Ordering::SeqCst), 50);
    }

    fn explode() {
        panic!("boom");
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(1).unwrap();
            pool.submit(Box::new(explode));
            let counter = Arc::clone(&hits);
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tasks_run_off_the_submitting_thread() {
        let (tx, rx) = channel::bounded(1);
        let pool = ThreadPool::new(1).unwrap();
        pool.submit(Box::new(move || {
            let _ = tx.send(thread::current().id());
        }));
        let worker = rx.recv().unwrap();
        assert_ne!(worker, thread::current().id());
    }
}
