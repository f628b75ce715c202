//! Runtime-controllable conditions.

use herald_core::Condition;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A gate for an observer that the application flips after registration.
///
/// Clones share one flag. Register one clone with
/// `EventBus::register_observer_when` and keep another to pause or resume
/// that observer's notifications.
///
/// ```rust,ignore
/// let gate = ConditionHandle::new(false);
/// bus.register_observer_when(Arc::clone(&cache), gate.clone())?;
///
/// bus.notify::<dyn Cache, _>(|cache| cache.flush()); // skipped
/// gate.set(true);
/// bus.notify::<dyn Cache, _>(|cache| cache.flush()); // delivered
/// ```
#[derive(Debug, Clone)]
pub struct ConditionHandle(Arc<AtomicBool>);

impl ConditionHandle {
    /// Create a gate, open or closed.
    pub fn new(open: bool) -> Self {
        Self(Arc::new(AtomicBool::new(open)))
    }

    /// Open or close the gate for every clone.
    pub fn set(&self, open: bool) {
        self.0.store(open, Ordering::Release);
    }
}

/// Open.
impl Default for ConditionHandle {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Condition for ConditionHandle {
    fn should_notify(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
