use crate::{EventBus, registry::SubscriberIter, subscriber::Subscriber};
use crossbeam::queue::SegQueue;
use herald_core::AnyEvent;
use std::sync::Arc;

#[derive(Debug)]
struct Pending {
    event: AnyEvent,
    subscriber: Arc<Subscriber>,
    sync: bool,
}

/// One concurrent queue shared by every thread posting through this dispatcher.
///
/// A post enqueues a pair for each subscriber and then drains the queue,
/// possibly delivering pairs enqueued by other threads. Events posted from
/// one thread are not guaranteed to reach a subscriber in posting order when
/// other threads post concurrently.
#[derive(Debug, Default)]
pub struct LegacyAsync {
    queue: SegQueue<Pending>,
}

impl LegacyAsync {
    /// Create a dispatcher with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn dispatch(
        &self,
        bus: &EventBus,
        event: AnyEvent,
        subscribers: SubscriberIter,
        sync: bool,
    ) {
        for subscriber in subscribers {
            self.queue.push(Pending {
                event: event.clone(),
                subscriber,
                sync,
            });
        }

        while let Some(pending) = self.queue.pop() {
            pending
                .subscriber
                .dispatch_event(bus, &pending.event, pending.sync);
        }
    }
}
