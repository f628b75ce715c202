use crate::{EventBus, registry::SubscriberIter};
use herald_core::AnyEvent;
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

struct Queued {
    event: AnyEvent,
    subscribers: SubscriberIter,
    sync: bool,
}

#[derive(Default)]
struct ThreadState {
    queue: VecDeque<Queued>,
    dispatching: bool,
}

thread_local! {
    /// Per dispatcher instance, the events waiting on this thread.
    static STATES: RefCell<HashMap<u64, ThreadState>> = RefCell::new(HashMap::new());
}

/// Breadth-first dispatch per thread.
///
/// Each thread keeps its own queue. A post on a thread that is already
/// dispatching is queued and runs after every subscriber of the current event
/// has been handed its event. Posts on different threads do not interact.
#[derive(Debug)]
pub struct PerThreadQueue {
    id: u64,
}

impl PerThreadQueue {
    /// Create a dispatcher with its own per-thread queues.
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub(crate) fn dispatch(
        &self,
        bus: &EventBus,
        event: AnyEvent,
        subscribers: SubscriberIter,
        sync: bool,
    ) {
        let start = STATES.with(|states| {
            let mut states = states.borrow_mut();
            let state = states.entry(self.id).or_default();
            state.queue.push_back(Queued {
                event,
                subscribers,
                sync,
            });
            !std::mem::replace(&mut state.dispatching, true)
        });
        if !start {
            return;
        }

        let _reset = ResetOnExit { id: self.id };
        while let Some(mut next) = self.pop() {
            for subscriber in next.subscribers.by_ref() {
                subscriber.dispatch_event(bus, &next.event, next.sync);
            }
        }
    }

    fn pop(&self) -> Option<Queued> {
        STATES.with(|states| {
            states
                .borrow_mut()
                .get_mut(&self.id)
                .and_then(|state| state.queue.pop_front())
        })
    }
}

impl Default for PerThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the thread's queue once the outermost dispatch ends, unwinding included.
struct ResetOnExit {
    id: u64,
}

impl Drop for ResetOnExit {
    fn drop(&mut self) {
        let _ = STATES.try_with(|states| {
            if let Ok(mut states) = states.try_borrow_mut() {
                states.remove(&self.id);
            }
        });
    }
}
