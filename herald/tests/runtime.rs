//! Asynchronous delivery on a tokio runtime.

mod common;

use common::Ping;
use herald::{EventBus, executors::TokioExecutor, subscribers};
use tokio::sync::mpsc::{self, UnboundedSender};

struct Forwarder {
    tx: UnboundedSender<(u32, bool)>,
}

#[subscribers]
impl Forwarder {
    #[subscribe]
    fn on_ping(&self, event: &Ping) {
        let on_runtime = tokio::runtime::Handle::try_current().is_ok();
        let _ = self.tx.send((event.seq, on_runtime));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_posts_run_on_the_blocking_pool() {
    let bus = EventBus::builder()
        .executor(TokioExecutor::current().unwrap())
        .build();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(std::sync::Arc::new(Forwarder { tx })).unwrap();

    bus.post_async(Ping { seq: 1 });
    bus.post_async(Ping { seq: 2 });

    let mut seen = Vec::new();
    for _ in 0..2 {
        let received = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        seen.push(received.unwrap());
    }
    seen.sort();

    assert_eq!(seen, vec![(1, true), (2, true)]);
}

#[tokio::test]
async fn inline_posts_stay_on_the_caller() {
    let bus = EventBus::builder()
        .executor(TokioExecutor::current().unwrap())
        .build();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(std::sync::Arc::new(Forwarder { tx })).unwrap();

    bus.post(Ping { seq: 7 });

    assert_eq!(rx.try_recv().unwrap(), (7, true));
}
