// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

#![warn(missing_docs)]

//! A runtime-agnostic callback dispatcher.
//!
//! This crate provides a [`Dispatcher`] type that answers one question - "where does this
//! callback run?" - without coupling the code that produces a notification to the thread
//! that wants to observe it.
//!
//! # Design Philosophy
//!
//! - **Concrete type**: No generics needed in your code
//! - **Closed strategy set**: Inline, queue, pool, or a custom closure
//! - **Decoupled**: Completion and observation never need to share a thread
//!
//! # Quick Start
//!
//! ## Running inline
//!
//! ```rust
//! use hopper::Dispatcher;
//!
//! let dispatcher = Dispatcher::inline();
//! dispatcher.dispatch(|| println!("runs on the calling thread"));
//! ```
//!
//! ## Hopping onto a driven queue
//!
//! A queue dispatcher plays the role a UI message loop does on platforms that have one:
//! jobs cross a channel and run only when the owning thread drives the queue.
//!
//! ```rust
//! use hopper::Dispatcher;
//!
//! let (dispatcher, queue) = Dispatcher::queue();
//!
//! dispatcher.dispatch(|| println!("deferred"));
//! assert_eq!(queue.run_until_idle(), 1);
//! ```
//!
//! # Features
//!
//! - `pool` (default): Enables the [`Dispatcher::pool`] constructor

mod custom;
mod dispatcher;
mod queue;

pub use dispatcher::{Dispatcher, Job};
pub use queue::DispatchQueue;
