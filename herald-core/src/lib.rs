//! # herald-core
//!
//! Core types for the Herald event bus.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! libraries that declare events and listeners without pulling in the bus
//! itself.
//!
//! ## Events ([`Event`])
//!
//! Any `Send + Sync + 'static` value can be an event. An event type declares
//! the types it can also be delivered as: parent events it contains
//! ([`Supertypes::extends`]) and views such as trait objects
//! ([`Supertypes::implements`]). The flattened closure is computed once per
//! type ([`Hierarchy`]) and shared by every bus.
//!
//! ## Listeners ([`Subscribe`])
//!
//! A listener type lists its handler methods with [`Handlers`]. The resolved
//! list, inherited handlers included, is cached per type ([`HandlerSet`]).
//!
//! ## Execution ([`Executor`], [`Condition`])
//!
//! Collaborator traits the bus is parameterized over: where tasks run, and
//! whether an observer is called.
//!
//! # Error Types
//!
//! - [`HeraldError`] - Top-level error type
//! - [`RegistrationError`] - Registration errors
//! - [`SubscriberError`] - Subscriber failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod condition;
mod error;
mod event;
mod executor;
mod handler;
mod subject;

// Re-exports
pub use condition::{Always, Condition};
pub use error::{BoxError, HeraldError, RegistrationError, SubscriberError};
pub use event::{AnyEvent, Event, Hierarchy, Supertypes, TypeKey};
pub use executor::{DirectExecutor, Executor, Task};
pub use handler::{
    HandlerFlags, HandlerMeta, HandlerOptions, HandlerSet, Handlers, IntoHandlerOutcome,
    Subscribe,
};
pub use subject::{DEFAULT_SUBJECT, OBSERVER_SUBJECT};
