//! Typed observers and notifications.

mod common;

use common::CollectingExceptionHandler;
use herald::{
    BoxError, EventBus, HeraldError, RegistrationError, conditions::ConditionHandle,
    testing::{ManualExecutor, Recorder},
};
use std::{
    sync::{
        Arc, Barrier,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

trait Cache: Send + Sync {
    fn flush(&self);
    fn flushes(&self) -> usize;
}

#[derive(Default)]
struct Memory {
    flushes: AtomicUsize,
}

impl Cache for Memory {
    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

struct Journal {
    name: &'static str,
    lines: Recorder<String>,
}

impl Journal {
    fn new(name: &'static str, lines: &Recorder<String>) -> Self {
        Self {
            name,
            lines: lines.clone(),
        }
    }
}

#[test]
fn notify_reaches_every_observer_of_the_type() {
    let bus = EventBus::new();
    let lines = Recorder::new();
    let first = Arc::new(Journal::new("first", &lines));
    let second = Arc::new(Journal::new("second", &lines));
    bus.register_observer(Arc::clone(&first)).unwrap();
    bus.register_observer(Arc::clone(&second)).unwrap();

    bus.notify::<Journal, _>(|journal| journal.lines.record(format!("{} synced", journal.name)));

    let mut seen = lines.take();
    seen.sort();
    assert_eq!(seen, vec!["first synced", "second synced"]);
}

#[test]
fn notifications_are_typed() {
    let bus = EventBus::new();
    let lines = Recorder::new();
    let journal = Arc::new(Journal::new("journal", &lines));
    let cache: Arc<dyn Cache> = Arc::new(Memory::default());
    bus.register_observer(Arc::clone(&journal)).unwrap();
    bus.register_observer(Arc::clone(&cache)).unwrap();

    bus.notify::<dyn Cache, _>(|cache| cache.flush());

    assert_eq!(cache.flushes(), 1);
    assert!(lines.is_empty());
}

#[test]
fn condition_gates_notifications() {
    let bus = EventBus::new();
    let cache: Arc<dyn Cache> = Arc::new(Memory::default());
    let gate = ConditionHandle::new(false);
    bus.register_observer_when(Arc::clone(&cache), gate.clone())
        .unwrap();

    bus.notify::<dyn Cache, _>(|cache| cache.flush());
    assert_eq!(cache.flushes(), 0);

    gate.set(true);
    bus.notify::<dyn Cache, _>(|cache| cache.flush());
    assert_eq!(cache.flushes(), 1);
}

#[test]
fn observing_again_replaces_the_condition() {
    let bus = EventBus::new();
    let cache: Arc<dyn Cache> = Arc::new(Memory::default());
    bus.register_observer_when(Arc::clone(&cache), || false)
        .unwrap();
    bus.register_observer(Arc::clone(&cache)).unwrap();

    bus.notify::<dyn Cache, _>(|cache| cache.flush());

    assert_eq!(cache.flushes(), 1);
}

#[test]
fn unregistered_observers_are_not_notified() {
    let bus = EventBus::new();
    let cache: Arc<dyn Cache> = Arc::new(Memory::default());
    bus.register_observer(Arc::clone(&cache)).unwrap();
    bus.unregister_observer(&cache).unwrap();

    bus.notify::<dyn Cache, _>(|cache| cache.flush());

    assert_eq!(cache.flushes(), 0);
    assert!(bus.registry().is_empty());
}

#[test]
fn unregistering_an_unknown_observer_fails() {
    let bus = EventBus::new();
    let stranger: Arc<dyn Cache> = Arc::new(Memory::default());

    let err = bus.unregister_observer(&stranger).unwrap_err();

    assert!(matches!(
        err,
        HeraldError::Registration(RegistrationError::UnknownListener { .. })
    ));
}

#[test]
fn failing_strategies_are_reported() {
    let failures = CollectingExceptionHandler::new();
    let bus = EventBus::builder()
        .exception_handler(failures.clone())
        .build();
    let lines = Recorder::new();
    bus.register_observer(Arc::new(Journal::new("journal", &lines)))
        .unwrap();

    bus.notify::<Journal, _>(|_journal| -> Result<(), BoxError> { Err("disk full".into()) });

    let reported = failures.failures();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].method, "on_receive");
    assert!(reported[0].message.contains("disk full"));
}

#[test]
fn asynchronous_notifications_use_the_executor() {
    let executor = ManualExecutor::default();
    let bus = EventBus::builder().executor(executor.clone()).build();
    let cache: Arc<dyn Cache> = Arc::new(Memory::default());
    bus.register_observer(Arc::clone(&cache)).unwrap();

    bus.notify_with::<dyn Cache>(|cache: &(dyn Cache + 'static)| cache.flush(), false);
    assert_eq!(cache.flushes(), 0);

    executor.run_pending();
    assert_eq!(cache.flushes(), 1);
}

#[test]
fn racing_registrations_observe_once() {
    let bus = EventBus::new();
    for _ in 0..200 {
        let cache: Arc<dyn Cache> = Arc::new(Memory::default());
        let start = Arc::new(Barrier::new(2));
        let racers: Vec<_> = (0..2)
            .map(|_| {
                let bus = bus.clone();
                let cache = Arc::clone(&cache);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    bus.register_observer(cache).unwrap();
                })
            })
            .collect();
        for racer in racers {
            racer.join().unwrap();
        }

        bus.notify::<dyn Cache, _>(|cache| cache.flush());
        assert_eq!(cache.flushes(), 1);

        bus.unregister_observer(&cache).unwrap();
        bus.notify::<dyn Cache, _>(|cache| cache.flush());
        assert_eq!(cache.flushes(), 1);
        assert!(bus.registry().is_empty());
    }
}

#[test]
fn racing_unregistrations_succeed_once() {
    let bus = EventBus::new();
    for _ in 0..200 {
        let cache: Arc<dyn Cache> = Arc::new(Memory::default());
        bus.register_observer(Arc::clone(&cache)).unwrap();
        let start = Arc::new(Barrier::new(2));
        let racers: Vec<_> = (0..2)
            .map(|_| {
                let bus = bus.clone();
                let cache = Arc::clone(&cache);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    bus.unregister_observer(&cache)
                })
            })
            .collect();
        let outcomes: Vec<_> = racers.into_iter().map(|r| r.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|o| matches!(
            o,
            Err(HeraldError::Registration(RegistrationError::UnknownListener { .. }))
        )));
    }
}
