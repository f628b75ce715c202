//! The event bus.

mod builder;
mod dead_event;

pub use builder::EventBusBuilder;
pub use dead_event::DeadEvent;

use crate::{
    dispatch::Dispatcher,
    exception::{SubscriberExceptionContext, SubscriberExceptionHandler},
    executor::HybridExecutor,
    observer::{Notification, NotificationStrategy, Observer},
    registry::{ObserverRegistry, SubscriberRegistry},
};
use herald_core::{
    Always, AnyEvent, Condition, DEFAULT_SUBJECT, Event, HeraldError, IntoHandlerOutcome,
    OBSERVER_SUBJECT, RegistrationError, Subscribe, SubscriberError,
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

pub(crate) struct BusInner {
    name: String,
    executor: HybridExecutor,
    dispatcher: Dispatcher,
    exception_handler: Box<dyn SubscriberExceptionHandler>,
    subscribers: SubscriberRegistry,
    observers: ObserverRegistry,
    catch_panics: bool,
}

/// Dispatches events to listeners, and provides ways for listeners to
/// register themselves.
///
/// Cloning a bus yields another handle to the same bus.
///
/// # Example
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// bus.register(Arc::new(Audit::default()))?;
///
/// bus.post(Login { user: "ada".into() });
/// bus.post_to("billing", Invoice { total: 42 })?;
/// ```
#[derive(Clone)]
pub struct EventBus {
    pub(crate) inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with default settings.
    pub fn new() -> Self {
        EventBusBuilder::new().build()
    }

    /// Create a bus with default settings and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        EventBusBuilder::new().name(name).build()
    }

    /// Create a builder for configuring a bus.
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// The name of this bus.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles refer to the same bus.
    pub fn ptr_eq(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The subscriber index, for inspection.
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.inner.subscribers
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register every handler declared by `listener`.
    ///
    /// Registering the same object again has no effect.
    pub fn register<L: Subscribe>(&self, listener: Arc<L>) -> Result<(), HeraldError> {
        self.inner.subscribers.register(&listener)?;
        tracing::debug!(
            bus = %self.inner.name,
            listener = std::any::type_name::<L>(),
            "registered listener"
        );
        Ok(())
    }

    /// Unregister every handler of a registered `listener`.
    ///
    /// Fails with [`RegistrationError::UnknownSubscriber`] and changes nothing
    /// if the object is not registered.
    pub fn unregister<L: Subscribe>(&self, listener: &Arc<L>) -> Result<(), HeraldError> {
        self.inner.subscribers.unregister(listener)?;
        tracing::debug!(
            bus = %self.inner.name,
            listener = std::any::type_name::<L>(),
            "unregistered listener"
        );
        Ok(())
    }

    /// Observe `listener` for notifications sent with [`notify::<T>`](Self::notify).
    pub fn register_observer<T>(&self, listener: Arc<T>) -> Result<(), HeraldError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_observer_when(listener, Always)
    }

    /// Observe `listener`, notifying it only while `condition` holds.
    ///
    /// Observing an already observed listener replaces its condition.
    pub fn register_observer_when<T>(
        &self,
        listener: Arc<T>,
        condition: impl Condition,
    ) -> Result<(), HeraldError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let _writer = self.inner.observers.lock_writes();
        if let Some(existing) = self.inner.observers.lookup(&listener) {
            existing.replace_condition(condition);
            tracing::debug!(
                bus = %self.inner.name,
                listener = std::any::type_name::<T>(),
                "replaced observer condition"
            );
            return Ok(());
        }

        let observer = Arc::new(Observer::new(listener, condition));
        self.inner.subscribers.register(&observer)?;
        self.inner.observers.register(&observer);
        tracing::debug!(
            bus = %self.inner.name,
            listener = std::any::type_name::<T>(),
            "registered observer"
        );
        Ok(())
    }

    /// Stop observing `listener`.
    ///
    /// Fails with [`RegistrationError::UnknownListener`] if it is not observed
    /// as a `T`.
    pub fn unregister_observer<T>(&self, listener: &Arc<T>) -> Result<(), HeraldError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let _writer = self.inner.observers.lock_writes();
        let observer = self.inner.observers.lookup(listener).ok_or(
            RegistrationError::UnknownListener {
                listener_type: std::any::type_name::<T>(),
            },
        )?;
        self.inner.subscribers.unregister(&observer)?;
        self.inner.observers.unregister(&observer);
        tracing::debug!(
            bus = %self.inner.name,
            listener = std::any::type_name::<T>(),
            "unregistered observer"
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Posting
    // ------------------------------------------------------------------------

    /// Post `event` under the default subject and deliver it inline.
    ///
    /// Returns once every subscriber has handled or failed to handle the
    /// event. Failures go to the exception handler. If nothing subscribes to
    /// the event, it is reposted wrapped in a [`DeadEvent`].
    pub fn post<E: Event>(&self, event: E) {
        self.publish(DEFAULT_SUBJECT, AnyEvent::new(event), true);
    }

    /// Post `event` under the default subject and deliver it on the
    /// asynchronous executor.
    pub fn post_async<E: Event>(&self, event: E) {
        self.publish(DEFAULT_SUBJECT, AnyEvent::new(event), false);
    }

    /// Post `event` under `subject` and deliver it inline.
    pub fn post_to<E: Event>(&self, subject: &str, event: E) -> Result<(), HeraldError> {
        self.post_with(subject, event, true)
    }

    /// Post `event` under `subject`, inline when `sync` is true.
    pub fn post_with<E: Event>(&self, subject: &str, event: E, sync: bool) -> Result<(), HeraldError> {
        self.post_any(subject, AnyEvent::new(event), sync)
    }

    /// Post an already erased event under `subject`.
    pub fn post_any(&self, subject: &str, event: AnyEvent, sync: bool) -> Result<(), HeraldError> {
        if subject.is_empty() {
            return Err(HeraldError::EmptySubject);
        }
        self.publish(subject, event, sync);
        Ok(())
    }

    /// Apply `strategy` to every listener observed as a `T`, inline.
    ///
    /// ```rust,ignore
    /// bus.notify::<dyn Cache, _>(|cache| cache.flush());
    /// ```
    pub fn notify<T, R>(&self, strategy: impl Fn(&T) -> R + Send + Sync + 'static)
    where
        T: ?Sized + Send + Sync + 'static,
        R: IntoHandlerOutcome,
    {
        self.notify_with::<T>(strategy, true);
    }

    /// Apply `strategy` to every listener observed as a `T`, inline when
    /// `sync` is true.
    pub fn notify_with<T>(&self, strategy: impl NotificationStrategy<T>, sync: bool)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let notification = AnyEvent::new(Notification::<T>::new(strategy));
        self.publish(OBSERVER_SUBJECT, notification, sync);
    }

    fn publish(&self, subject: &str, event: AnyEvent, sync: bool) {
        let subscribers = self.inner.subscribers.subscribers(subject, &event);
        if subscribers.has_next() {
            self.inner
                .dispatcher
                .dispatch(self, event, subscribers, sync);
        } else if !event.is::<DeadEvent>() {
            tracing::debug!(
                bus = %self.inner.name,
                subject,
                event = event.type_key().name(),
                "no subscribers, posting dead event"
            );
            let dead = DeadEvent::new(self.clone(), event);
            self.publish(DEFAULT_SUBJECT, AnyEvent::new(dead), sync);
        } else {
            tracing::trace!(bus = %self.inner.name, "dead event has no subscribers, dropped");
        }
    }

    // ------------------------------------------------------------------------
    // Used by subscribers
    // ------------------------------------------------------------------------

    pub(crate) fn executor(&self) -> &HybridExecutor {
        &self.inner.executor
    }

    pub(crate) fn catches_panics(&self) -> bool {
        self.inner.catch_panics
    }

    pub(crate) fn handle_subscriber_exception(
        &self,
        error: &SubscriberError,
        context: &SubscriberExceptionContext<'_>,
    ) {
        let handled = panic::catch_unwind(AssertUnwindSafe(|| {
            self.inner.exception_handler.handle_exception(error, context)
        }));
        if handled.is_err() {
            tracing::warn!(
                bus = %self.inner.name,
                method = context.method(),
                "exception handler panicked while reporting a subscriber failure"
            );
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventBus").field(&self.inner.name).finish()
    }
}
