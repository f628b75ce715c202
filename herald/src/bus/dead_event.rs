use crate::EventBus;
use herald_core::{AnyEvent, Event};

/// Wraps an event that was posted but had no subscribers.
///
/// Registering a handler for `DeadEvent` lets an application notice events
/// that nobody listens to, usually a sign of a missing registration. A
/// `DeadEvent` that itself has no subscribers is dropped, never wrapped again.
#[derive(Clone, Debug)]
pub struct DeadEvent {
    source: EventBus,
    event: AnyEvent,
}

impl DeadEvent {
    /// Wrap `event`, which `source` could not deliver.
    pub fn new(source: EventBus, event: AnyEvent) -> Self {
        Self { source, event }
    }

    /// The bus the event was posted to.
    pub fn source(&self) -> &EventBus {
        &self.source
    }

    /// The undelivered event.
    pub fn event(&self) -> &AnyEvent {
        &self.event
    }
}

impl Event for DeadEvent {}
