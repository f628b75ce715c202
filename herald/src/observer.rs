//! Typed observers.
//!
//! An observer wraps a listener object of type `T` and receives
//! [`Notification<T>`]s posted with [`EventBus::notify`]. Each notification
//! carries a strategy, a callable over `&T`, which the observer applies to its
//! listener when its [`Condition`] holds.
//!
//! Observers are ordinary subscribers listening on [`OBSERVER_SUBJECT`], so
//! they share the bus's dispatching, execution and failure reporting.
//!
//! [`EventBus::notify`]: crate::EventBus::notify

use herald_core::{
    BoxError, Condition, Event, Handlers, IntoHandlerOutcome, OBSERVER_SUBJECT, Subscribe,
};
use parking_lot::RwLock;
use std::{fmt, sync::Arc};

/// Something to do with every observed listener of type `T`.
pub trait NotificationStrategy<T: ?Sized>: Send + Sync + 'static {
    /// Apply the strategy to one listener.
    fn notify(&self, listener: &T) -> Result<(), BoxError>;
}

impl<T, F, R> NotificationStrategy<T> for F
where
    T: ?Sized,
    F: Fn(&T) -> R + Send + Sync + 'static,
    R: IntoHandlerOutcome,
{
    fn notify(&self, listener: &T) -> Result<(), BoxError> {
        self(listener).into_outcome()
    }
}

/// The event observers of listener type `T` receive.
pub struct Notification<T: ?Sized> {
    strategy: Arc<dyn NotificationStrategy<T>>,
}

impl<T: ?Sized + 'static> Notification<T> {
    /// Wrap a strategy.
    pub fn new(strategy: impl NotificationStrategy<T>) -> Self {
        Self {
            strategy: Arc::new(strategy),
        }
    }

    /// Apply the strategy to `listener`.
    pub fn apply(&self, listener: &T) -> Result<(), BoxError> {
        self.strategy.notify(listener)
    }
}

impl<T: ?Sized> Clone for Notification<T> {
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
        }
    }
}

impl<T: ?Sized + 'static> Event for Notification<T> {}

impl<T: ?Sized> fmt::Debug for Notification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("listener_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// A listener object registered for notifications.
pub struct Observer<T: ?Sized> {
    listener: Arc<T>,
    condition: RwLock<Box<dyn Condition>>,
}

impl<T: ?Sized + Send + Sync + 'static> Observer<T> {
    /// Observe `listener` while `condition` holds.
    pub fn new(listener: Arc<T>, condition: impl Condition) -> Self {
        Self {
            listener,
            condition: RwLock::new(Box::new(condition)),
        }
    }

    /// Swap the condition gating this observer.
    pub(crate) fn replace_condition(&self, condition: impl Condition) {
        *self.condition.write() = Box::new(condition);
    }

    /// The observed listener.
    pub fn listener(&self) -> &Arc<T> {
        &self.listener
    }

    fn on_receive(&self, notification: &Notification<T>) -> Result<(), BoxError> {
        if self.condition.read().should_notify() {
            notification.apply(&self.listener)
        } else {
            Ok(())
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Subscribe for Observer<T> {
    fn handlers(handlers: &mut Handlers<Self>) {
        handlers
            .on::<Notification<T>, _, _>("on_receive", Self::on_receive)
            .subject(OBSERVER_SUBJECT)
            .allow_concurrent();
    }
}

impl<T: ?Sized> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("listener_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{AnyEvent, HandlerSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Gauge {
        reads: AtomicUsize,
    }

    #[test]
    fn observer_applies_strategy_when_condition_holds() {
        let gauge = Arc::new(Gauge {
            reads: AtomicUsize::new(0),
        });
        let open = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&open);
        let observer = Observer::new(Arc::clone(&gauge), move || gate.load(Ordering::SeqCst));

        let set = HandlerSet::<Observer<Gauge>>::of().unwrap();
        let meta = set.iter().next().unwrap();
        assert_eq!(meta.subject(), OBSERVER_SUBJECT);
        assert!(meta.allows_concurrent());

        let event = AnyEvent::new(Notification::new(|g: &Gauge| {
            g.reads.fetch_add(1, Ordering::SeqCst);
        }));
        meta.invoke(&observer, &event).unwrap();
        open.store(false, Ordering::SeqCst);
        meta.invoke(&observer, &event).unwrap();

        assert_eq!(gauge.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replaced_condition_takes_effect() {
        let gauge = Arc::new(Gauge {
            reads: AtomicUsize::new(0),
        });
        let observer = Observer::new(Arc::clone(&gauge), || false);
        let set = HandlerSet::<Observer<Gauge>>::of().unwrap();
        let meta = set.iter().next().unwrap();
        let event = AnyEvent::new(Notification::new(|g: &Gauge| {
            g.reads.fetch_add(1, Ordering::SeqCst);
        }));

        meta.invoke(&observer, &event).unwrap();
        assert_eq!(gauge.reads.load(Ordering::SeqCst), 0);

        observer.replace_condition(|| true);
        meta.invoke(&observer, &event).unwrap();
        assert_eq!(gauge.reads.load(Ordering::SeqCst), 1);
    }
}
