#![cfg(feature = "macros")]

//! Listeners declared with `#[subscribers]`.

mod common;

use common::{CollectingExceptionHandler, Ping};
use herald::{BoxError, EventBus, Event, TypeKey, subscribers, testing::Recorder};
use std::sync::Arc;

#[derive(Event, Clone, Debug)]
struct Deposit {
    amount: i64,
}

struct Ledger {
    log: Recorder<String>,
}

#[subscribers]
impl Ledger {
    #[subscribe]
    fn on_deposit(&self, event: &Deposit) {
        self.log.record(format!("ledger deposit {}", event.amount));
    }

    #[subscribe]
    fn on_ping(&self, event: &Ping) {
        self.log.record(format!("ledger ping {}", event.seq));
    }

    #[subscribe(subject = "audit")]
    fn on_audit(&self, event: &Deposit) {
        self.log.record(format!("ledger audit {}", event.amount));
    }
}

struct Vault {
    ledger: Ledger,
    log: Recorder<String>,
}

#[subscribers(extends(ledger: Ledger))]
impl Vault {
    /// Overrides the inherited handler of the same name.
    #[subscribe]
    fn on_deposit(&self, event: &Deposit) {
        self.log.record(format!("vault deposit {}", event.amount));
    }

    fn balance_hint(&self) -> usize {
        self.log.count()
    }
}

#[test]
fn inherited_handlers_are_registered_and_overridable() {
    let bus = EventBus::new();
    let log = Recorder::new();
    let vault = Arc::new(Vault {
        ledger: Ledger { log: log.clone() },
        log: log.clone(),
    });
    bus.register(Arc::clone(&vault)).unwrap();

    bus.post(Deposit { amount: 10 });
    bus.post(Ping { seq: 4 });
    bus.post_to("audit", Deposit { amount: 3 }).unwrap();

    assert_eq!(
        log.events(),
        vec!["vault deposit 10", "ledger ping 4", "ledger audit 3"]
    );
    assert_eq!(vault.balance_hint(), 3);
    assert_eq!(bus.registry().len(), 3);
}

#[test]
fn handler_options_reach_the_registry() {
    let bus = EventBus::new();
    let vault = Arc::new(Vault {
        ledger: Ledger {
            log: Recorder::new(),
        },
        log: Recorder::new(),
    });
    bus.register(Arc::clone(&vault)).unwrap();

    let mut deposits: Vec<_> = bus
        .registry()
        .subscribers_of(TypeKey::of::<Deposit>())
        .iter()
        .map(|subscriber| (subscriber.method(), subscriber.subject().to_string()))
        .collect();
    deposits.sort();

    assert_eq!(
        deposits,
        vec![
            ("on_audit", "audit".to_string()),
            ("on_deposit", herald::DEFAULT_SUBJECT.to_string()),
        ]
    );
}

struct Teller {
    log: Recorder<&'static str>,
}

#[subscribers]
impl Teller {
    #[par_subscribe]
    fn on_ping(&self, _event: &Ping) {
        self.log.record("teller ping");
    }

    #[subscribe]
    #[subject("withdrawals")]
    #[allow_concurrent_events]
    fn on_withdrawal(&self, event: &Deposit) -> Result<(), BoxError> {
        if event.amount > 100 {
            return Err(format!("limit exceeded: {}", event.amount).into());
        }
        self.log.record("teller withdrawal");
        Ok(())
    }
}

#[test]
fn concurrency_flags_follow_attributes() {
    let bus = EventBus::new();
    bus.register(Arc::new(Teller {
        log: Recorder::new(),
    }))
    .unwrap();

    let subscribers: Vec<_> = [TypeKey::of::<Ping>(), TypeKey::of::<Deposit>()]
        .into_iter()
        .flat_map(|key| bus.registry().subscribers_of(key))
        .collect();

    assert_eq!(subscribers.len(), 2);
    assert!(subscribers.iter().all(|subscriber| !subscriber.is_synchronized()));
}

#[test]
fn result_returning_handlers_report_errors() {
    let failures = CollectingExceptionHandler::new();
    let bus = EventBus::builder()
        .exception_handler(failures.clone())
        .build();
    let teller = Arc::new(Teller {
        log: Recorder::new(),
    });
    bus.register(Arc::clone(&teller)).unwrap();

    bus.post_to("withdrawals", Deposit { amount: 50 }).unwrap();
    bus.post_to("withdrawals", Deposit { amount: 500 }).unwrap();
    bus.post(Ping { seq: 1 });

    assert_eq!(teller.log.events(), vec!["teller withdrawal", "teller ping"]);
    let reported = failures.failures();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].method, "on_withdrawal");
    assert!(reported[0].message.contains("limit exceeded: 500"));
}
