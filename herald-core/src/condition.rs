//! Gates for observer notifications.

/// Decides, at notification time, whether an observer is called.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Condition",
    label = "missing `Condition` implementation",
    note = "Closures `Fn() -> bool` implement Condition automatically."
)]
pub trait Condition: Send + Sync + 'static {
    /// Whether the observer should be notified right now.
    fn should_notify(&self) -> bool;
}

/// A condition that always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Always;

impl Condition for Always {
    fn should_notify(&self) -> bool {
        true
    }
}

impl<F> Condition for F
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn should_notify(&self) -> bool {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    #[test]
    fn closures_read_live_state() {
        let flag = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&flag);
        let condition = move || observed.load(Ordering::SeqCst);

        assert!(!condition.should_notify());
        flag.store(true, Ordering::SeqCst);
        assert!(condition.should_notify());
        assert!(Always.should_notify());
    }
}
