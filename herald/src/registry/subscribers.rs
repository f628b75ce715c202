use crate::subscriber::Subscriber;
use dashmap::DashMap;
use herald_core::{AnyEvent, HandlerSet, RegistrationError, Subscribe, TypeKey};
use parking_lot::Mutex;
use std::{fmt, sync::Arc};

type Bucket = Arc<Vec<Arc<Subscriber>>>;

/// Registry of subscribers, indexed by the event type they accept.
///
/// Each bucket is copy-on-write: readers clone the current `Arc` and iterate
/// it without holding any lock, so registration and unregistration never
/// affect an iteration already in progress. Writers are serialized among
/// themselves, which makes a registration spanning several buckets and an
/// all-or-nothing unregistration atomic with respect to each other.
pub struct SubscriberRegistry {
    subscribers: DashMap<TypeKey, Bucket>,
    writer: Mutex<()>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            writer: Mutex::new(()),
        }
    }

    /// Register every handler of `listener`.
    ///
    /// Registering the same object again is a no-op.
    pub fn register<L: Subscribe>(&self, listener: &Arc<L>) -> Result<(), RegistrationError> {
        let grouped = Self::find_all_subscribers(listener)?;

        let _writer = self.writer.lock();
        for (event_type, candidates) in grouped {
            let mut bucket = self
                .subscribers
                .entry(event_type)
                .or_insert_with(|| Arc::new(Vec::new()));

            let fresh: Vec<_> = candidates
                .into_iter()
                .filter(|candidate| !bucket.iter().any(|existing| existing == candidate))
                .collect();
            if fresh.is_empty() {
                continue;
            }

            let mut next = Vec::with_capacity(bucket.len() + fresh.len());
            next.extend(bucket.iter().cloned());
            next.extend(fresh);
            *bucket = Arc::new(next);
        }
        Ok(())
    }

    /// Unregister every handler of `listener`.
    ///
    /// Fails without changing anything if any of them is not registered.
    pub fn unregister<L: Subscribe>(&self, listener: &Arc<L>) -> Result<(), RegistrationError> {
        let grouped = Self::find_all_subscribers(listener)?;

        let _writer = self.writer.lock();
        for (event_type, expected) in &grouped {
            let present = self.subscribers.get(event_type).is_some_and(|bucket| {
                expected
                    .iter()
                    .all(|subscriber| bucket.iter().any(|existing| existing == subscriber))
            });
            if !present {
                return Err(RegistrationError::UnknownSubscriber {
                    listener: std::any::type_name::<L>(),
                });
            }
        }

        for (event_type, expected) in grouped {
            let emptied = match self.subscribers.get_mut(&event_type) {
                Some(mut bucket) => {
                    let next: Vec<_> = bucket
                        .iter()
                        .filter(|existing| !expected.contains(existing))
                        .cloned()
                        .collect();
                    let emptied = next.is_empty();
                    *bucket = Arc::new(next);
                    emptied
                }
                None => false,
            };
            if emptied {
                self.subscribers
                    .remove_if(&event_type, |_, bucket| bucket.is_empty());
            }
        }
        Ok(())
    }

    /// Snapshot of the subscribers that should receive `event` under `subject`.
    ///
    /// Buckets are visited in hierarchy order: the concrete type first, then
    /// its supertypes in declaration order.
    pub fn subscribers(&self, subject: &str, event: &AnyEvent) -> SubscriberIter {
        let buckets = event
            .hierarchy()
            .types()
            .filter_map(|event_type| {
                self.subscribers
                    .get(&event_type)
                    .map(|bucket| Arc::clone(bucket.value()))
            })
            .collect();
        SubscriberIter::new(Arc::from(subject), buckets)
    }

    /// Subscribers currently registered for exactly `event_type`.
    pub fn subscribers_of(&self, event_type: TypeKey) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .get(&event_type)
            .map(|bucket| bucket.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.iter().map(|bucket| bucket.len()).sum()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// One subscriber per handler of `listener`, grouped by event type in
    /// declaration order.
    fn find_all_subscribers<L: Subscribe>(
        listener: &Arc<L>,
    ) -> Result<Vec<(TypeKey, Vec<Arc<Subscriber>>)>, RegistrationError> {
        let handlers = HandlerSet::<L>::of()?;
        let mut grouped: Vec<(TypeKey, Vec<Arc<Subscriber>>)> = Vec::new();
        for meta in handlers.iter() {
            let subscriber = Arc::new(Subscriber::new(listener, meta));
            match grouped.iter_mut().find(|(ty, _)| *ty == meta.event_type()) {
                Some((_, group)) => group.push(subscriber),
                None => grouped.push((meta.event_type(), vec![subscriber])),
            }
        }
        Ok(grouped)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("event_types", &self.subscribers.len())
            .field("subscribers", &self.len())
            .finish()
    }
}

// ============================================================================
// SubscriberIter - immutable snapshot
// ============================================================================

/// Lazily filtered walk over snapshots of the matching buckets.
pub struct SubscriberIter {
    subject: Arc<str>,
    buckets: Vec<Bucket>,
    bucket: usize,
    index: usize,
}

impl SubscriberIter {
    fn new(subject: Arc<str>, buckets: Vec<Bucket>) -> Self {
        Self {
            subject,
            buckets,
            bucket: 0,
            index: 0,
        }
    }

    /// Whether at least one more subscriber remains.
    pub fn has_next(&self) -> bool {
        self.buckets
            .iter()
            .enumerate()
            .skip(self.bucket)
            .any(|(position, bucket)| {
                let start = if position == self.bucket { self.index } else { 0 };
                bucket
                    .iter()
                    .skip(start)
                    .any(|subscriber| subscriber.subject() == &*self.subject)
            })
    }

    /// The subject being matched.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl Iterator for SubscriberIter {
    type Item = Arc<Subscriber>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(bucket) = self.buckets.get(self.bucket) {
            match bucket.get(self.index) {
                Some(subscriber) => {
                    self.index += 1;
                    if subscriber.subject() == &*self.subject {
                        return Some(Arc::clone(subscriber));
                    }
                }
                None => {
                    self.bucket += 1;
                    self.index = 0;
                }
            }
        }
        None
    }
}

impl fmt::Debug for SubscriberIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberIter")
            .field("subject", &self.subject)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{Handlers, RegistrationError};

    #[derive(Default)]
    struct Listener;

    impl Listener {
        fn on_text(&self, _event: &String) {}
        fn on_str(&self, _event: &str) {}
        fn on_tagged(&self, _event: &String) {}
    }

    impl Subscribe for Listener {
        fn handlers(handlers: &mut Handlers<Self>) {
            handlers.on("on_text", Self::on_text);
            handlers.on("on_str", Self::on_str);
            handlers.on("on_tagged", Self::on_tagged).subject("tagged");
        }
    }

    fn methods(iter: SubscriberIter) -> Vec<&'static str> {
        iter.map(|s| s.method()).collect()
    }

    #[test]
    fn register_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let listener = Arc::new(Listener);
        registry.register(&listener).unwrap();
        registry.register(&listener).unwrap();
        assert_eq!(registry.len(), 3);

        let other = Arc::new(Listener);
        registry.register(&other).unwrap();
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn lookup_filters_by_subject_and_walks_the_hierarchy() {
        let registry = SubscriberRegistry::new();
        registry.register(&Arc::new(Listener)).unwrap();

        let event = AnyEvent::new(String::from("hi"));
        assert_eq!(
            methods(registry.subscribers(herald_core::DEFAULT_SUBJECT, &event)),
            vec!["on_text", "on_str"]
        );
        assert_eq!(methods(registry.subscribers("tagged", &event)), vec!["on_tagged"]);
        assert!(!registry.subscribers("other", &event).has_next());
    }

    #[test]
    fn snapshots_ignore_later_mutation() {
        let registry = SubscriberRegistry::new();
        let listener = Arc::new(Listener);
        registry.register(&listener).unwrap();

        let event = AnyEvent::new(String::from("hi"));
        let snapshot = registry.subscribers(herald_core::DEFAULT_SUBJECT, &event);
        assert!(snapshot.has_next());
        registry.unregister(&listener).unwrap();

        assert_eq!(methods(snapshot), vec!["on_text", "on_str"]);
        assert!(!registry.subscribers(herald_core::DEFAULT_SUBJECT, &event).has_next());
    }

    #[test]
    fn unregister_unknown_fails_and_removes_empty_buckets() {
        let registry = SubscriberRegistry::new();
        let listener = Arc::new(Listener);

        let err = registry.unregister(&listener).unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownSubscriber { .. }));

        registry.register(&listener).unwrap();
        registry.unregister(&listener).unwrap();
        assert!(registry.is_empty());
        assert!(registry.subscribers_of(TypeKey::of::<String>()).is_empty());
    }
}
