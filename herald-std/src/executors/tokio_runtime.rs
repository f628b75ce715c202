use super::ExecutorError;
use herald_core::{Executor, Task};
use tokio::runtime::Handle;

/// Runs tasks on a tokio runtime's blocking thread pool.
///
/// Handlers are synchronous, so they go to `spawn_blocking` rather than
/// occupying the async workers.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Use the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    pub fn current() -> Result<Self, ExecutorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ExecutorError::NoRuntime)
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, task: Task) {
        drop(self.handle.spawn_blocking(task));
    }
}
