use super::{BusInner, EventBus};
use crate::{
    dispatch::Dispatcher,
    exception::{LoggingHandler, SubscriberExceptionHandler},
    executor::HybridExecutor,
    registry::{ObserverRegistry, SubscriberRegistry},
};
use herald_core::{DirectExecutor, Executor};
use std::{fmt, sync::Arc};

/// Builder for constructing an [`EventBus`].
///
/// # Example
/// ```ignore
/// let bus = EventBus::builder()
///     .name("orders")
///     .executor(ThreadPool::new(4)?)
///     .dispatcher(Dispatcher::immediate())
///     .exception_handler(|err: &SubscriberError, ctx: &SubscriberExceptionContext<'_>| {
///         eprintln!("{} failed: {err}", ctx.method());
///     })
///     .build();
/// ```
pub struct EventBusBuilder {
    name: String,
    executor: Option<Arc<dyn Executor>>,
    sync_executor: Option<Arc<dyn Executor>>,
    dispatcher: Option<Dispatcher>,
    exception_handler: Option<Box<dyn SubscriberExceptionHandler>>,
    catch_panics: bool,
}

impl EventBusBuilder {
    /// Create a builder with defaults: named `"default"`, inline execution,
    /// hybrid dispatch, logging exception handler, panics propagate.
    pub fn new() -> Self {
        Self {
            name: "default".to_string(),
            executor: None,
            sync_executor: None,
            dispatcher: None,
            exception_handler: None,
            catch_panics: false,
        }
    }

    /// Set the bus name, used in `Debug` output and log records.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the executor for asynchronous posts.
    pub fn executor(mut self, executor: impl Executor) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Set the executor for asynchronous posts, shared with other owners.
    pub fn shared_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the executor for inline posts. Defaults to running on the posting thread.
    pub fn sync_executor(mut self, executor: impl Executor) -> Self {
        self.sync_executor = Some(Arc::new(executor));
        self
    }

    /// Set the ordering policy.
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Set the handler receiving subscriber failures.
    pub fn exception_handler(mut self, handler: impl SubscriberExceptionHandler) -> Self {
        self.exception_handler = Some(Box::new(handler));
        self
    }

    /// Catch subscriber panics and report them as
    /// [`SubscriberError::Panicked`](herald_core::SubscriberError::Panicked)
    /// instead of letting them unwind.
    pub fn catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    /// Build the bus.
    pub fn build(self) -> EventBus {
        let r#async = self.executor.unwrap_or_else(|| Arc::new(DirectExecutor));
        let sync = self
            .sync_executor
            .unwrap_or_else(|| Arc::new(DirectExecutor));

        EventBus {
            inner: Arc::new(BusInner {
                name: self.name,
                executor: HybridExecutor::with_sync(sync, r#async),
                dispatcher: self.dispatcher.unwrap_or_default(),
                exception_handler: self
                    .exception_handler
                    .unwrap_or_else(|| Box::new(LoggingHandler)),
                subscribers: SubscriberRegistry::new(),
                observers: ObserverRegistry::new(),
                catch_panics: self.catch_panics,
            }),
        }
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field("name", &self.name)
            .field("dispatcher", &self.dispatcher)
            .field("catch_panics", &self.catch_panics)
            .finish_non_exhaustive()
    }
}
