//! Reporting of subscriber failures.

use crate::{EventBus, subscriber::Subscriber};
use herald_core::{AnyEvent, SubscriberError};

/// Where a subscriber failure happened.
pub struct SubscriberExceptionContext<'a> {
    bus: &'a EventBus,
    event: &'a AnyEvent,
    subscriber: &'a Subscriber,
}

impl<'a> SubscriberExceptionContext<'a> {
    pub(crate) fn new(bus: &'a EventBus, event: &'a AnyEvent, subscriber: &'a Subscriber) -> Self {
        Self {
            bus,
            event,
            subscriber,
        }
    }

    /// The bus that was delivering the event.
    pub fn event_bus(&self) -> &'a EventBus {
        self.bus
    }

    /// The event being delivered.
    pub fn event(&self) -> &'a AnyEvent {
        self.event
    }

    /// The failing subscriber: listener object and handler method.
    pub fn subscriber(&self) -> &'a Subscriber {
        self.subscriber
    }

    /// Name of the failing handler method.
    pub fn method(&self) -> &'static str {
        self.subscriber.method()
    }
}

impl std::fmt::Debug for SubscriberExceptionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberExceptionContext")
            .field("bus", &self.bus.name())
            .field("event", self.event)
            .field("subscriber", self.subscriber)
            .finish()
    }
}

/// Receives the failures of subscribers.
///
/// Called on the thread that ran the failing handler. A panic raised here is
/// caught and dropped by the bus.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a SubscriberExceptionHandler",
    label = "missing `SubscriberExceptionHandler` implementation",
    note = "Closures `Fn(&SubscriberError, &SubscriberExceptionContext<'_>)` implement it automatically."
)]
pub trait SubscriberExceptionHandler: Send + Sync + 'static {
    /// Handle a failure of the subscriber described by `context`.
    fn handle_exception(&self, error: &SubscriberError, context: &SubscriberExceptionContext<'_>);
}

impl<F> SubscriberExceptionHandler for F
where
    F: Fn(&SubscriberError, &SubscriberExceptionContext<'_>) + Send + Sync + 'static,
{
    fn handle_exception(&self, error: &SubscriberError, context: &SubscriberExceptionContext<'_>) {
        self(error, context)
    }
}

/// The default exception handler. Emits a debug record and drops the failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl SubscriberExceptionHandler for LoggingHandler {
    fn handle_exception(&self, error: &SubscriberError, context: &SubscriberExceptionContext<'_>) {
        let subscriber = context.subscriber();
        tracing::debug!(
            bus = context.event_bus().name(),
            listener = subscriber.listener_type().name(),
            method = subscriber.method(),
            parameter = subscriber.event_type().name(),
            event = ?context.event(),
            error = %error,
            "exception thrown by subscriber"
        );
    }
}
