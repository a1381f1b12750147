// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! [`Dispatcher`] and its execution strategies.

use std::fmt::Debug;
use std::sync::Arc;

use crate::custom::CustomDispatcher;
use crate::queue::{self, DispatchQueue};

/// A deferred unit of work handed to a dispatcher.
pub type Job = Box<dyn FnOnce() + Send>;

/// Strategy-agnostic callback dispatcher.
///
/// A `Dispatcher` runs callbacks either on the calling thread or hopped onto another
/// execution context. Handles are cheap to clone and every clone targets the same
/// underlying context.
///
/// # Examples
///
/// Thread-pool execution:
///
/// ```rust
/// use std::sync::mpsc;
///
/// use hopper::Dispatcher;
///
/// let dispatcher = Dispatcher::pool(2);
/// let (tx, rx) = mpsc::channel();
/// dispatcher.dispatch(move || tx.send(1 + 1).expect("receiver alive"));
/// assert_eq!(rx.recv(), Ok(2));
/// ```
///
/// Custom strategy:
///
/// ```rust
/// use hopper::Dispatcher;
///
/// let dispatcher = Dispatcher::custom(|job| {
///     std::thread::spawn(move || job());
/// });
/// dispatcher.dispatch(|| println!("runs on a throwaway thread"));
/// ```
#[derive(Clone)]
pub struct Dispatcher(DispatcherKind);

#[derive(Clone)]
enum DispatcherKind {
    Inline,
    Queue(crossbeam_channel::Sender<Job>),
    #[cfg(feature = "pool")]
    Pool(threadpool::ThreadPool),
    Custom(CustomDispatcher),
}

impl Dispatcher {
    /// Creates a dispatcher that runs each job synchronously on the thread that calls
    /// [`dispatch`](Self::dispatch).
    ///
    /// A panicking job propagates its panic to the dispatching thread.
    #[must_use]
    pub fn inline() -> Self {
        Self(DispatcherKind::Inline)
    }

    /// Creates a dispatcher backed by a job queue, together with the [`DispatchQueue`]
    /// that drains it.
    ///
    /// Jobs run only when the queue owner drives the queue, in dispatch order. This is
    /// the stand-in for a UI message loop: whichever thread drives the queue is the
    /// thread every dispatched callback observes. Jobs dispatched after the queue has
    /// been dropped are discarded.
    #[must_use]
    pub fn queue() -> (Self, DispatchQueue) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self(DispatcherKind::Queue(tx)), queue::new(rx))
    }

    /// Creates a dispatcher that runs jobs on a shared thread pool with `threads` workers.
    ///
    /// Jobs may run concurrently; nothing orders two jobs dispatched to the same pool.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is zero.
    #[must_use]
    #[cfg(feature = "pool")]
    pub fn pool(threads: usize) -> Self {
        Self(DispatcherKind::Pool(threadpool::ThreadPool::new(threads)))
    }

    /// Creates a dispatcher from a custom strategy closure.
    ///
    /// The closure receives each boxed job and decides where it runs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hopper::Dispatcher;
    ///
    /// let dispatcher = Dispatcher::custom(|job| {
    ///     std::thread::spawn(move || job());
    /// });
    /// ```
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        Self(DispatcherKind::Custom(CustomDispatcher(Arc::new(f))))
    }

    /// Hands a job to the dispatcher's execution context.
    ///
    /// Inline dispatchers run the job before returning; every other strategy returns
    /// immediately.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        match &self.0 {
            DispatcherKind::Inline => job(),
            DispatcherKind::Queue(tx) => {
                if tx.send(Box::new(job)).is_err() {
                    tracing::trace!("dispatch queue gone; job discarded");
                }
            }
            #[cfg(feature = "pool")]
            DispatcherKind::Pool(pool) => pool.execute(job),
            DispatcherKind::Custom(custom) => custom.call(Box::new(job)),
        }
    }
}

impl Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategy = match &self.0 {
            DispatcherKind::Inline => "inline",
            DispatcherKind::Queue(_) => "queue",
            #[cfg(feature = "pool")]
            DispatcherKind::Pool(_) => "pool",
            DispatcherKind::Custom(_) => "custom",
        };

        f.debug_struct("Dispatcher").field("strategy", &strategy).finish()
    }
}
