//! # herald - Typed In-Process Event Bus
//!
//! `herald` delivers events posted under a subject to every registered handler
//! that declared interest in the event's type, or in any of its supertypes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Event)]
//! struct Login {
//!     user: String,
//! }
//!
//! #[derive(Default)]
//! struct Audit;
//!
//! #[herald::subscribers]
//! impl Audit {
//!     #[subscribe]
//!     fn on_login(&self, event: &Login) {
//!         println!("{} logged in", event.user);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.register(Arc::new(Audit))?;
//! bus.post(Login { user: "ada".into() });
//! ```
//!
//! ## Delivery
//!
//! - Inline posts ([`EventBus::post`]) run handlers before returning, on the
//!   posting thread by default.
//! - Asynchronous posts ([`EventBus::post_async`]) hand each handler call to
//!   the bus's executor, e.g. a [`ThreadPool`](executors::ThreadPool).
//! - The [`Dispatcher`] decides the ordering of events posted from within
//!   handlers; see the [`dispatch`] module.
//! - Handlers not marked concurrency-safe never run twice at the same time.
//! - A failing handler is reported to the [`SubscriberExceptionHandler`] and
//!   does not affect other handlers or the poster.
//!
//! ## Observers
//!
//! [`EventBus::register_observer`] and [`EventBus::notify`] offer a typed
//! shortcut: apply a closure to every registered listener of a type.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

extern crate self as herald;

pub mod bus;
pub mod dispatch;
pub mod exception;
pub mod executor;
pub mod observer;
pub mod registry;
pub mod subscriber;

pub use bus::{DeadEvent, EventBus, EventBusBuilder};
pub use dispatch::Dispatcher;
pub use exception::{LoggingHandler, SubscriberExceptionContext, SubscriberExceptionHandler};
pub use executor::HybridExecutor;
pub use observer::{Notification, NotificationStrategy, Observer};
pub use subscriber::Subscriber;

pub use herald_core::{
    // Conditions
    Always,
    // Events
    AnyEvent,
    // Errors
    BoxError,
    Condition,
    DEFAULT_SUBJECT,
    // Executors
    DirectExecutor,
    Event,
    Executor,
    // Handlers
    HandlerFlags,
    HandlerMeta,
    HandlerOptions,
    HandlerSet,
    Handlers,
    HeraldError,
    Hierarchy,
    IntoHandlerOutcome,
    OBSERVER_SUBJECT,
    RegistrationError,
    Subscribe,
    SubscriberError,
    Supertypes,
    Task,
    TypeKey,
};

/// Standard executors.
pub mod executors {
    #![allow(clippy::wildcard_imports)]
    pub use herald_std::executors::*;
}

/// Standard conditions.
pub mod conditions {
    #![allow(clippy::wildcard_imports)]
    pub use herald_std::conditions::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use herald_std::testing::*;
}

/// Prelude module - common imports for Herald.
///
/// # Usage
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AnyEvent, BoxError, Condition, DeadEvent, Dispatcher, Event, EventBus, Handlers,
        HeraldError, RegistrationError, Subscribe, SubscriberError, Supertypes,
    };

    #[cfg(feature = "macros")]
    pub use crate::subscribers;
}

#[cfg(feature = "macros")]
pub use herald_macros::{Event, subscribers};
