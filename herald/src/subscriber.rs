//! A single registered handler: one listener object paired with one method.

use crate::{EventBus, exception::SubscriberExceptionContext};
use herald_core::{AnyEvent, HandlerMeta, Subscribe, SubscriberError, TypeKey};
use parking_lot::ReentrantMutex;
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

type Invoker = Arc<dyn Fn(&AnyEvent) -> Result<(), SubscriberError> + Send + Sync>;

/// How concurrent deliveries to one subscriber are handled.
enum Invocation {
    /// The handler is marked concurrency-safe.
    Concurrent,
    /// At most one delivery at a time. Reentrant, so a handler may post an
    /// event it handles itself.
    Synchronized(ReentrantMutex<()>),
}

/// A listener object paired with one of its handler methods.
///
/// Two subscribers are equal when they wrap the same object (by pointer) and
/// the same method. Distinct objects that compare equal by value are distinct
/// subscribers.
pub struct Subscriber {
    target: Arc<dyn Any + Send + Sync>,
    target_addr: usize,
    listener: TypeKey,
    method: &'static str,
    event_type: TypeKey,
    subject: Arc<str>,
    invoker: Invoker,
    invocation: Invocation,
}

impl Subscriber {
    /// Creates the subscriber for one handler of `target`.
    pub(crate) fn new<L: Subscribe>(target: &Arc<L>, meta: &HandlerMeta<L>) -> Self {
        let listener = Arc::clone(target);
        let handler = meta.clone();
        let invocation = if meta.allows_concurrent() {
            Invocation::Concurrent
        } else {
            Invocation::Synchronized(ReentrantMutex::new(()))
        };

        Self {
            target: Arc::clone(target) as Arc<dyn Any + Send + Sync>,
            target_addr: Arc::as_ptr(target).cast::<()>() as usize,
            listener: TypeKey::of::<L>(),
            method: meta.name(),
            event_type: meta.event_type(),
            subject: Arc::from(meta.subject()),
            invoker: Arc::new(move |event: &AnyEvent| handler.invoke(&listener, event)),
            invocation,
        }
    }

    /// The listener object.
    pub fn target(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.target
    }

    /// The listener object as `L`, if it is one.
    pub fn target_as<L: Any>(&self) -> Option<&L> {
        self.target.downcast_ref::<L>()
    }

    /// Whether this subscriber wraps exactly `listener`.
    pub fn is_target<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        Arc::as_ptr(listener).cast::<()>() as usize == self.target_addr
    }

    /// The listener type.
    pub fn listener_type(&self) -> TypeKey {
        self.listener
    }

    /// The handler method name.
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// The event type the handler accepts.
    pub fn event_type(&self) -> TypeKey {
        self.event_type
    }

    /// The subject the handler listens on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether deliveries to this subscriber are serialized.
    pub fn is_synchronized(&self) -> bool {
        matches!(self.invocation, Invocation::Synchronized(_))
    }

    /// Hands `event` to the bus's executor for delivery to this subscriber.
    ///
    /// Failures are reported to the bus's exception handler, never to the caller.
    pub(crate) fn dispatch_event(self: &Arc<Self>, bus: &EventBus, event: &AnyEvent, sync: bool) {
        let subscriber = Arc::clone(self);
        let handle = bus.clone();
        let event = event.clone();
        bus.executor().execute(
            sync,
            Box::new(move || subscriber.deliver(&handle, &event)),
        );
    }

    fn deliver(&self, bus: &EventBus, event: &AnyEvent) {
        let outcome = if bus.catches_panics() {
            panic::catch_unwind(AssertUnwindSafe(|| self.invoke(event)))
                .unwrap_or_else(|payload| Err(SubscriberError::from_panic(payload)))
        } else {
            self.invoke(event)
        };

        if let Err(err) = outcome {
            let context = SubscriberExceptionContext::new(bus, event, self);
            bus.handle_subscriber_exception(&err, &context);
        }
    }

    /// Invokes the handler on the calling thread.
    pub fn invoke(&self, event: &AnyEvent) -> Result<(), SubscriberError> {
        match &self.invocation {
            Invocation::Concurrent => (self.invoker)(event),
            Invocation::Synchronized(lock) => {
                let _guard = lock.lock();
                (self.invoker)(event)
            }
        }
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.target_addr == other.target_addr
            && self.listener == other.listener
            && self.method == other.method
            && self.event_type == other.event_type
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("listener", &self.listener)
            .field("method", &self.method)
            .field("event_type", &self.event_type)
            .field("subject", &self.subject)
            .field("synchronized", &self.is_synchronized())
            .finish()
    }
}
