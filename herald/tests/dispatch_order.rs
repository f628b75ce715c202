//! Ordering of events posted from within handlers.

mod common;

use herald::{Dispatcher, Event, EventBus, subscribers, testing::{ManualExecutor, Recorder}};
use std::{
    panic,
    sync::{Arc, OnceLock},
};

#[derive(Event)]
struct First;

#[derive(Event)]
struct Second;

/// Handles `First` by posting `Second` on the same bus.
struct Relay {
    name: &'static str,
    bus: OnceLock<EventBus>,
    log: Recorder<String>,
}

#[subscribers]
impl Relay {
    #[subscribe]
    fn on_first(&self, _event: &First) {
        self.log.record(format!("{}:first", self.name));
        if let Some(bus) = self.bus.get() {
            bus.post(Second);
        }
    }

    #[subscribe]
    fn on_second(&self, _event: &Second) {
        self.log.record(format!("{}:second", self.name));
    }
}

/// Only records.
struct Witness {
    name: &'static str,
    log: Recorder<String>,
}

#[subscribers]
impl Witness {
    #[subscribe]
    fn on_first(&self, _event: &First) {
        self.log.record(format!("{}:first", self.name));
    }

    #[subscribe]
    fn on_second(&self, _event: &Second) {
        self.log.record(format!("{}:second", self.name));
    }
}

fn run_script(dispatcher: Dispatcher) -> Vec<String> {
    let bus = EventBus::builder().dispatcher(dispatcher).build();
    let log = Recorder::new();

    let relay = Arc::new(Relay {
        name: "A",
        bus: OnceLock::new(),
        log: log.clone(),
    });
    let _ = relay.bus.set(bus.clone());
    let witness = Arc::new(Witness {
        name: "B",
        log: log.clone(),
    });

    bus.register(Arc::clone(&relay)).unwrap();
    bus.register(witness).unwrap();
    bus.post(First);

    // Break the bus <-> listener cycle.
    bus.unregister(&relay).unwrap();
    log.events()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn per_thread_queue_is_breadth_first() {
    assert_eq!(
        run_script(Dispatcher::per_thread_queue()),
        strings(&["A:first", "B:first", "A:second", "B:second"])
    );
}

#[test]
fn immediate_is_depth_first() {
    assert_eq!(
        run_script(Dispatcher::immediate()),
        strings(&["A:first", "A:second", "B:second", "B:first"])
    );
}

#[test]
fn orderings_differ_on_the_same_script() {
    assert_ne!(
        run_script(Dispatcher::per_thread_queue()),
        run_script(Dispatcher::immediate())
    );
}

#[test]
fn legacy_async_drains_in_queue_order() {
    assert_eq!(
        run_script(Dispatcher::legacy_async()),
        strings(&["A:first", "B:first", "A:second", "B:second"])
    );
}

#[test]
fn hybrid_is_breadth_first_for_inline_posts() {
    assert_eq!(
        run_script(Dispatcher::default()),
        strings(&["A:first", "B:first", "A:second", "B:second"])
    );
}

#[test]
fn hybrid_routes_async_posts_through_the_executor() {
    let executor = ManualExecutor::new();
    let bus = EventBus::builder()
        .executor(executor.clone())
        .dispatcher(Dispatcher::hybrid())
        .build();
    let log = Recorder::new();
    bus.register(Arc::new(Witness {
        name: "B",
        log: log.clone(),
    }))
    .unwrap();

    bus.post_async(First);
    bus.post(Second);
    assert_eq!(log.events(), strings(&["B:second"]));

    executor.run_pending();
    assert_eq!(log.events(), strings(&["B:second", "B:first"]));
}

struct Exploder;

#[subscribers]
impl Exploder {
    #[subscribe]
    fn on_first(&self, _event: &First) {
        panic!("first is not allowed");
    }
}

#[test]
fn per_thread_queue_recovers_after_a_panic() {
    let bus = EventBus::builder()
        .dispatcher(Dispatcher::per_thread_queue())
        .build();
    let exploder = Arc::new(Exploder);
    let log = Recorder::new();
    bus.register(Arc::clone(&exploder)).unwrap();
    bus.register(Arc::new(Witness {
        name: "B",
        log: log.clone(),
    }))
    .unwrap();

    let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| bus.post(First)));
    assert!(outcome.is_err());

    bus.post(Second);
    assert_eq!(log.events(), strings(&["B:second"]));
}

#[test]
fn separate_buses_do_not_share_queues() {
    let outer = EventBus::builder()
        .dispatcher(Dispatcher::per_thread_queue())
        .build();
    let inner = EventBus::builder()
        .dispatcher(Dispatcher::per_thread_queue())
        .build();
    let log = Recorder::new();

    // A handler on `outer` posting to `inner` is not deferred by `outer`'s queue.
    let relay = Arc::new(Relay {
        name: "A",
        bus: OnceLock::new(),
        log: log.clone(),
    });
    let _ = relay.bus.set(inner.clone());
    outer.register(Arc::clone(&relay)).unwrap();
    outer
        .register(Arc::new(Witness {
            name: "B",
            log: log.clone(),
        }))
        .unwrap();
    inner
        .register(Arc::new(Witness {
            name: "C",
            log: log.clone(),
        }))
        .unwrap();

    outer.post(First);
    assert_eq!(log.events(), strings(&["A:first", "C:second", "B:first"]));
    outer.unregister(&relay).unwrap();
}
