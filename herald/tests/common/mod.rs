//! Shared fixtures for integration tests.

#![allow(dead_code)]

use herald::{
    SubscriberError, SubscriberExceptionContext, SubscriberExceptionHandler, testing::Recorder,
};

// ============================================================================
// Exception Handling
// ============================================================================

/// One reported subscriber failure.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub listener: &'static str,
    pub method: &'static str,
    pub event_type: &'static str,
    pub message: String,
}

/// An exception handler that keeps every failure it is given.
#[derive(Clone, Default)]
pub struct CollectingExceptionHandler {
    failures: Recorder<Failure>,
}

impl CollectingExceptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.failures.events()
    }

    pub fn count(&self) -> usize {
        self.failures.count()
    }
}

impl SubscriberExceptionHandler for CollectingExceptionHandler {
    fn handle_exception(&self, error: &SubscriberError, context: &SubscriberExceptionContext<'_>) {
        self.failures.record(Failure {
            listener: context.subscriber().listener_type().name(),
            method: context.method(),
            event_type: context.event().type_key().name(),
            message: error.to_string(),
        });
    }
}

// ============================================================================
// Test Events
// ============================================================================

#[derive(herald::Event, Clone, Debug, PartialEq)]
pub struct Ping {
    pub seq: u32,
}

#[derive(herald::Event, Clone, Debug)]
pub struct Unheard;
