//! Standard executors.
//!
//! - [`ThreadPool`]: fixed set of worker threads fed by a channel
//! - [`TokioExecutor`]: runs tasks on a tokio runtime's blocking pool
//!   (requires the `tokio` feature)

mod thread_pool;
#[cfg(feature = "tokio")]
mod tokio_runtime;

pub use thread_pool::{ThreadPool, ThreadPoolBuilder};
#[cfg(feature = "tokio")]
pub use tokio_runtime::TokioExecutor;

use thiserror::Error;

/// Errors raised while constructing an executor.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// A pool was configured with no workers.
    #[error("thread pool needs at least one worker")]
    NoWorkers,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// No tokio runtime is running on the current thread.
    #[error("no tokio runtime available")]
    NoRuntime,
}
