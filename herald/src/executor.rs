//! Inline or pooled execution, chosen per post.

use herald_core::{DirectExecutor, Executor, Task};
use std::{fmt, sync::Arc};

/// Pairs an inline executor with an asynchronous one.
///
/// Inline posts run their subscriber tasks on `sync` (the posting thread by
/// default); asynchronous posts submit them to `async`.
#[derive(Clone)]
pub struct HybridExecutor {
    sync: Arc<dyn Executor>,
    r#async: Arc<dyn Executor>,
}

impl HybridExecutor {
    /// Run inline posts on the posting thread and asynchronous ones on `executor`.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_sync(Arc::new(DirectExecutor), executor)
    }

    /// Use explicit executors for both modes.
    pub fn with_sync(sync: Arc<dyn Executor>, r#async: Arc<dyn Executor>) -> Self {
        Self { sync, r#async }
    }

    /// Submit `task` to the executor for the given mode.
    pub fn execute(&self, sync: bool, task: Task) {
        if sync {
            self.sync.submit(task);
        } else {
            self.r#async.submit(task);
        }
    }
}

impl Default for HybridExecutor {
    fn default() -> Self {
        Self::new(Arc::new(DirectExecutor))
    }
}

impl fmt::Debug for HybridExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridExecutor").finish_non_exhaustive()
    }
}
