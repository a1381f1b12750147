// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

#![warn(missing_docs)]

//! Single-assignment asynchronous results.
//!
//! A [`Task`] represents the eventual outcome of work happening elsewhere - a
//! cross-process call, a service bind, a network request. The producer holds the
//! paired [`CompletionSource`] and settles it exactly once, with a value, an error, or
//! by cancellation; everyone else holds cheap read-only [`Task`] clones and observes
//! the outcome through listeners, continuations, blocking waits, or `await`.
//!
//! # Quick Start
//!
//! ```rust
//! use hopper::Dispatcher;
//! use pledge::CompletionSource;
//!
//! let source = CompletionSource::new();
//! let task = source.task();
//!
//! task.on_success(&Dispatcher::inline(), |value: &i32| {
//!     println!("got {value}");
//! });
//!
//! source.set_value(42);
//! assert_eq!(task.result().unwrap(), 42);
//! ```
//!
//! # Continuations
//!
//! Derived tasks chain work without nesting callbacks; errors returned by a
//! continuation land in the derived task, never in the antecedent:
//!
//! ```rust
//! use hopper::Dispatcher;
//! use pledge::{CompletionSource, Task};
//!
//! let source = CompletionSource::new();
//! let doubled: Task<i32> = source
//!     .task()
//!     .continue_with(&Dispatcher::inline(), |task| Ok(task.result()? * 2));
//!
//! source.set_value(21);
//! assert_eq!(doubled.result().unwrap(), 42);
//! ```
//!
//! # Threading
//!
//! Any thread may settle a task and any thread may attach listeners, concurrently.
//! Each listener is registered with a [`Dispatcher`](hopper::Dispatcher) deciding
//! where its callback runs: inline on the completing thread, hopped onto a driven
//! queue (the moral equivalent of a UI loop), or onto a thread pool. Results are
//! `Send + Sync` because they may be observed from anywhere.
//!
//! # Lifecycle scoping
//!
//! Listeners can be scoped to a [`LifecycleHost`] through a [`LifecycleRegistry`]:
//! once the host reports it has stopped, scoped listeners are revoked and never fire,
//! while the underlying task and its other listeners are unaffected.

mod cancellation;
mod combine;
mod continuation;
mod error;
mod future;
mod lifecycle;
mod listener;
mod source;
mod state;
mod task;

pub use cancellation::{CancellationToken, CancellationTokenSource};
pub use combine::{run, when_all, when_all_results, when_all_settled, with_timeout};
pub use error::{AggregateError, OutcomeError, TaskError, TimeoutElapsed, TypedOutcomeError, WaitError};
pub use future::TaskFuture;
pub use lifecycle::{LifecycleHost, LifecycleRegistry};
pub use source::CompletionSource;
pub use task::Task;

pub(crate) const ERR_POISONED_LOCK: &str = "a panic on another thread poisoned an internal lock";
