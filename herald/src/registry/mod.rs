//! Indexes of registered subscribers and observers.

mod observers;
mod subscribers;

pub use observers::ObserverRegistry;
pub use subscribers::{SubscriberIter, SubscriberRegistry};
