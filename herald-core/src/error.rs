//! Error types for Herald.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`HeraldError`] - Top-level error type for all bus operations
//! - [`RegistrationError`] - Errors raised while registering or unregistering listeners
//! - [`SubscriberError`] - Failures of an individual subscriber, routed to the
//!   exception handler instead of the poster

use crate::event::TypeKey;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Herald operations.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// An error occurred while registering or unregistering a listener.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// An event was posted with an empty subject.
    #[error("subject is required")]
    EmptySubject,

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors that can occur while registering or unregistering listeners.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A handler declaration is malformed. This is a configuration error and is
    /// reported to the registering caller before anything is inserted.
    #[error("invalid handler `{method}` on `{listener}`: {reason}")]
    InvalidHandler {
        /// Type name of the listener declaring the handler.
        listener: &'static str,
        /// Declared handler method name.
        method: &'static str,
        /// What is wrong with the declaration.
        reason: String,
    },

    /// The object is not currently registered, or its handler set no longer
    /// matches what was registered.
    #[error("missing event subscriber for a declared handler. Is `{listener}` registered?")]
    UnknownSubscriber {
        /// Type name of the listener.
        listener: &'static str,
    },

    /// No observer is registered for this listener under the given type.
    #[error("no observer registered for listener of type `{listener_type}`")]
    UnknownListener {
        /// Name of the observed listener type.
        listener_type: &'static str,
    },
}

/// Failure of a single subscriber while handling an event.
///
/// These never reach the poster; the bus hands them to its exception handler.
#[derive(Error, Debug)]
pub enum SubscriberError {
    /// The handler returned an error.
    #[error("subscriber failed: {0}")]
    Failed(#[source] BoxError),

    /// The handler panicked and the bus was configured to catch panics.
    #[error("subscriber panicked: {0}")]
    Panicked(String),

    /// The event or target could not be viewed as the type the handler declared.
    #[error("subscriber expected `{}` but got `{}`", expected.name(), found.name())]
    TypeMismatch {
        /// Type the handler declared.
        expected: TypeKey,
        /// Type actually presented.
        found: TypeKey,
    },
}

impl SubscriberError {
    /// Builds a [`SubscriberError::Panicked`] from a panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        SubscriberError::Panicked(message)
    }
}

// Convenience conversions
impl From<BoxError> for HeraldError {
    fn from(err: BoxError) -> Self {
        HeraldError::Custom(err)
    }
}

impl From<BoxError> for SubscriberError {
    fn from(err: BoxError) -> Self {
        SubscriberError::Failed(err)
    }
}
