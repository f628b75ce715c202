use crate::observer::Observer;
use dashmap::DashMap;
use herald_core::TypeKey;
use parking_lot::{Mutex, MutexGuard};
use std::{any::Any, fmt, sync::Arc};

struct Entry {
    listener_addr: usize,
    observer: Arc<dyn Any + Send + Sync>,
}

/// Registry of observers, indexed by observed listener type.
///
/// Used to find the [`Observer`] wrapping a given listener object so it can be
/// unregistered from the bus.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: DashMap<TypeKey, Vec<Entry>>,
    /// Held across a whole observe or unobserve, including the subscriber
    /// registry changes it makes.
    writer: Mutex<()>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize observer registration changes until the guard drops.
    pub(crate) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    /// Record `observer` under its listener's type.
    pub fn register<T: ?Sized + Send + Sync + 'static>(&self, observer: &Arc<Observer<T>>) {
        self.observers
            .entry(TypeKey::of::<T>())
            .or_default()
            .push(Entry {
                listener_addr: addr(observer.listener()),
                observer: Arc::clone(observer) as Arc<dyn Any + Send + Sync>,
            });
    }

    /// Forget `observer`. Returns whether it was recorded.
    pub fn unregister<T: ?Sized + Send + Sync + 'static>(&self, observer: &Arc<Observer<T>>) -> bool {
        let key = TypeKey::of::<T>();
        let target = Arc::as_ptr(observer).cast::<()>();
        let (removed, emptied) = match self.observers.get_mut(&key) {
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|entry| Arc::as_ptr(&entry.observer).cast::<()>() != target);
                (entries.len() != before, entries.is_empty())
            }
            None => (false, false),
        };
        if emptied {
            self.observers.remove_if(&key, |_, entries| entries.is_empty());
        }
        removed
    }

    /// The observer wrapping `listener`, if one is registered.
    pub fn lookup<T: ?Sized + Send + Sync + 'static>(&self, listener: &Arc<T>) -> Option<Arc<Observer<T>>> {
        let wanted = addr(listener);
        let entries = self.observers.get(&TypeKey::of::<T>())?;
        let found = entries
            .iter()
            .find(|entry| entry.listener_addr == wanted)
            .and_then(|entry| Arc::clone(&entry.observer).downcast::<Observer<T>>().ok());
        found
    }

    /// Number of observers registered for listener type `T`.
    pub fn count<T: ?Sized + 'static>(&self) -> usize {
        self.observers
            .get(&TypeKey::of::<T>())
            .map_or(0, |entries| entries.len())
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("listener_types", &self.observers.len())
            .finish()
    }
}

fn addr<T: ?Sized>(listener: &Arc<T>) -> usize {
    Arc::as_ptr(listener).cast::<()>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::Always;

    trait Cache: Send + Sync {}
    struct Memory;
    impl Cache for Memory {}

    #[test]
    fn lookup_is_by_listener_identity() {
        let registry = ObserverRegistry::new();
        let first: Arc<dyn Cache> = Arc::new(Memory);
        let second: Arc<dyn Cache> = Arc::new(Memory);

        let observer = Arc::new(Observer::new(Arc::clone(&first), Always));
        registry.register(&observer);

        assert!(registry.lookup(&first).is_some());
        assert!(registry.lookup(&second).is_none());
        assert_eq!(registry.count::<dyn Cache>(), 1);

        assert!(registry.unregister(&observer));
        assert!(!registry.unregister(&observer));
        assert!(registry.lookup(&first).is_none());
        assert_eq!(registry.count::<dyn Cache>(), 0);
    }
}
