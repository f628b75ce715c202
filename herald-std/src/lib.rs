//! # herald-std
//!
//! Standard implementations for the Herald event bus.
//!
//! This crate provides:
//! - **Executors**: [`ThreadPool`](executors::ThreadPool) and, with the `tokio`
//!   feature, [`TokioExecutor`](executors::TokioExecutor)
//! - **Conditions**: [`ConditionHandle`](conditions::ConditionHandle), a
//!   runtime-toggleable observer gate
//! - **Testing utilities**: [`Recorder`](testing::Recorder) and
//!   [`ManualExecutor`](testing::ManualExecutor)

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use herald_core;

// Modules
pub mod conditions;
pub mod executors;
pub mod testing;
