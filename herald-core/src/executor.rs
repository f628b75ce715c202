//! Task execution primitive.
//!
//! The bus never spawns threads itself. Asynchronous delivery hands each
//! subscriber invocation to an [`Executor`] as a boxed [`Task`].

/// A unit of work submitted to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks, inline or on other threads.
///
/// Implemented for any `Fn(Task)` closure:
///
/// ```rust,ignore
/// let spawn = |task: Task| { std::thread::spawn(task); };
/// let bus = EventBus::builder().executor(spawn).build();
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an Executor",
    label = "missing `Executor` implementation",
    note = "Executors accept boxed tasks via `submit(Task)`. Closures `Fn(Task)` implement it automatically."
)]
pub trait Executor: Send + Sync + 'static {
    /// Submit a task for execution.
    fn submit(&self, task: Task);
}

impl<F> Executor for F
where
    F: Fn(Task) + Send + Sync + 'static,
{
    fn submit(&self, task: Task) {
        self(task)
    }
}

/// Runs every task on the submitting thread before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    fn submit(&self, task: Task) {
        task()
    }
}
