//! Delivery ordering policies.
//!
//! A [`Dispatcher`] receives a posted event together with the snapshot of its
//! subscribers and decides in what order, relative to other posts, each
//! subscriber is handed the event.
//!
//! | policy | reentrant posts | across threads |
//! |---|---|---|
//! | [`PerThreadQueue`] | breadth-first: queued until the current event is fully dispatched | independent per thread |
//! | [`LegacyAsync`] | queued behind everything pending | one shared queue, no ordering guarantee |
//! | `Immediate` | depth-first: delivered before the outer post resumes | none |
//! | `Hybrid` | per-thread queue for inline posts, legacy queue for asynchronous ones | |

mod legacy_async;
mod per_thread;

pub use legacy_async::LegacyAsync;
pub use per_thread::PerThreadQueue;

use crate::{EventBus, registry::SubscriberIter};
use herald_core::AnyEvent;

/// Selects how posted events are ordered on their way to subscribers.
#[derive(Debug)]
pub enum Dispatcher {
    /// Breadth-first per thread.
    PerThreadQueue(PerThreadQueue),
    /// One queue shared by every posting thread.
    LegacyAsync(LegacyAsync),
    /// Depth-first, no queueing.
    Immediate,
    /// One policy for inline posts, another for asynchronous ones.
    Hybrid {
        /// Used when a post is inline.
        sync: Box<Dispatcher>,
        /// Used when a post is asynchronous.
        r#async: Box<Dispatcher>,
    },
}

impl Dispatcher {
    /// A fresh per-thread queue dispatcher.
    pub fn per_thread_queue() -> Self {
        Dispatcher::PerThreadQueue(PerThreadQueue::new())
    }

    /// A fresh legacy async dispatcher with its own queue.
    pub fn legacy_async() -> Self {
        Dispatcher::LegacyAsync(LegacyAsync::new())
    }

    /// The immediate dispatcher.
    pub fn immediate() -> Self {
        Dispatcher::Immediate
    }

    /// Per-thread queue for inline posts and legacy async for asynchronous ones.
    pub fn hybrid() -> Self {
        Self::hybrid_with(Self::per_thread_queue(), Self::legacy_async())
    }

    /// Combine two policies, selected per post by its `sync` flag.
    pub fn hybrid_with(sync: Dispatcher, r#async: Dispatcher) -> Self {
        Dispatcher::Hybrid {
            sync: Box::new(sync),
            r#async: Box::new(r#async),
        }
    }

    /// Deliver `event` to every subscriber in `subscribers`.
    pub(crate) fn dispatch(
        &self,
        bus: &EventBus,
        event: AnyEvent,
        subscribers: SubscriberIter,
        sync: bool,
    ) {
        match self {
            Dispatcher::PerThreadQueue(queue) => queue.dispatch(bus, event, subscribers, sync),
            Dispatcher::LegacyAsync(queue) => queue.dispatch(bus, event, subscribers, sync),
            Dispatcher::Immediate => {
                for subscriber in subscribers {
                    subscriber.dispatch_event(bus, &event, sync);
                }
            }
            Dispatcher::Hybrid { sync: inline, r#async } => {
                let selected = if sync { inline } else { r#async };
                selected.dispatch(bus, event, subscribers, sync);
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::hybrid()
    }
}
