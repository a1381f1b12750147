// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! [`Task`], the read-only view of a single-assignment asynchronous result.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};
use std::time::Duration;

use hopper::Dispatcher;

use crate::continuation;
use crate::error::{OutcomeError, TypedOutcomeError, WaitError};
use crate::lifecycle::{LifecycleHost, LifecycleRegistry};
use crate::listener::{Callback, Listener, RevokeListener};
use crate::state::{Outcome, TaskCore};
use crate::TaskError;

/// Read-only handle to a single-assignment asynchronous result.
///
/// A task starts pending and settles exactly once - with a value, an error, or by
/// cancellation - after which it is immutable. Handles are cheap to clone and every
/// clone observes the same state. Only the paired
/// [`CompletionSource`](crate::CompletionSource) can settle a task.
///
/// Observation is callback-first: listeners attached before completion are invoked in
/// attachment order when the task settles; listeners attached afterwards are invoked
/// immediately. Every callback runs through the [`Dispatcher`] it was registered with,
/// so completing a task never borrows the observer's thread.
pub struct Task<T> {
    core: Arc<TaskCore<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("state", &self.core.phase_name()).finish()
    }
}

impl<T: Send + Sync + 'static> Task<T> {
    pub(crate) fn from_core(core: Arc<TaskCore<T>>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<TaskCore<T>> {
        &self.core
    }

    pub(crate) fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        self.core.outcome()
    }

    /// Returns a task already settled with `value`.
    #[must_use]
    pub fn from_value(value: T) -> Self {
        let core = TaskCore::new();
        let settled = core.try_settle(Outcome::Value(value));
        debug_assert!(settled);
        Self { core }
    }

    /// Returns a task already settled with `error`.
    #[must_use]
    pub fn from_error(error: TaskError) -> Self {
        let core = TaskCore::new();
        let settled = core.try_settle(Outcome::Error(error));
        debug_assert!(settled);
        Self { core }
    }

    /// Returns a task already settled by cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        let core = TaskCore::new();
        let settled = core.try_settle(Outcome::Cancelled);
        debug_assert!(settled);
        Self { core }
    }

    /// Returns `true` once the task has settled, whatever the outcome.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome().is_some()
    }

    /// Returns `true` if the task settled with a value.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(self.outcome().as_deref(), Some(Outcome::Value(_)))
    }

    /// Returns `true` if the task settled by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome().as_deref(), Some(Outcome::Cancelled))
    }

    /// Returns the producer error if the task failed, `None` otherwise.
    #[must_use]
    pub fn error(&self) -> Option<TaskError> {
        match self.outcome().as_deref() {
            Some(Outcome::Error(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Returns the settled value.
    ///
    /// # Errors
    ///
    /// [`OutcomeError::NotComplete`] if the task is still pending (a caller mistake -
    /// observe completion through a listener or [`wait`](Self::wait) instead),
    /// [`OutcomeError::Cancelled`] if it was cancelled, and
    /// [`OutcomeError::Failed`] wrapping the producer error if it failed.
    pub fn result(&self) -> Result<T, OutcomeError>
    where
        T: Clone,
    {
        match self.outcome().as_deref() {
            None => Err(OutcomeError::NotComplete),
            Some(Outcome::Value(value)) => Ok(value.clone()),
            Some(Outcome::Error(error)) => Err(OutcomeError::Failed(error.clone())),
            Some(Outcome::Cancelled) => Err(OutcomeError::Cancelled),
        }
    }

    /// Like [`result`](Self::result), but surfaces a failure of type `E` as the
    /// original error, unwrapped.
    ///
    /// # Errors
    ///
    /// [`TypedOutcomeError::Original`] when the task failed with an `E`;
    /// [`TypedOutcomeError::Other`] for every other non-value outcome.
    pub fn result_as<E>(&self) -> Result<T, TypedOutcomeError<E>>
    where
        T: Clone,
        E: std::error::Error + Send + Sync + 'static,
    {
        match self.result() {
            Err(OutcomeError::Failed(error)) => match error.downcast::<E>() {
                Some(original) => Err(TypedOutcomeError::Original(original)),
                None => Err(TypedOutcomeError::Other(OutcomeError::Failed(error))),
            },
            other => other.map_err(TypedOutcomeError::from),
        }
    }

    /// Adds a listener invoked with the value if the task succeeds.
    ///
    /// Runs through `dispatcher`. If the task already succeeded the invocation is
    /// scheduled immediately. Returns `&self` for chaining.
    pub fn on_success(&self, dispatcher: &Dispatcher, callback: impl FnOnce(&T) + Send + 'static) -> &Self {
        self.attach(dispatcher, Callback::Success(Box::new(callback)));
        self
    }

    /// Adds a listener invoked with the error if the task fails.
    ///
    /// Cancellation does not count as failure. Returns `&self` for chaining.
    pub fn on_failure(&self, dispatcher: &Dispatcher, callback: impl FnOnce(TaskError) + Send + 'static) -> &Self {
        self.attach(dispatcher, Callback::Failure(Box::new(callback)));
        self
    }

    /// Adds a listener invoked with the task once it settles, whatever the outcome.
    ///
    /// Returns `&self` for chaining.
    pub fn on_complete(&self, dispatcher: &Dispatcher, callback: impl FnOnce(Task<T>) + Send + 'static) -> &Self {
        self.attach(dispatcher, Callback::Complete(Box::new(callback)));
        self
    }

    /// Adds a listener invoked if the task is cancelled.
    ///
    /// Returns `&self` for chaining.
    pub fn on_cancelled(&self, dispatcher: &Dispatcher, callback: impl FnOnce() + Send + 'static) -> &Self {
        self.attach(dispatcher, Callback::Cancelled(Box::new(callback)));
        self
    }

    /// [`on_success`](Self::on_success), scoped to `host`: the listener is revoked and
    /// never fires once the host reports it has stopped.
    pub fn on_success_scoped(
        &self,
        registry: &LifecycleRegistry,
        host: &LifecycleHost,
        dispatcher: &Dispatcher,
        callback: impl FnOnce(&T) + Send + 'static,
    ) -> &Self {
        self.attach_scoped(registry, host, dispatcher, Callback::Success(Box::new(callback)));
        self
    }

    /// [`on_failure`](Self::on_failure), scoped to `host`.
    pub fn on_failure_scoped(
        &self,
        registry: &LifecycleRegistry,
        host: &LifecycleHost,
        dispatcher: &Dispatcher,
        callback: impl FnOnce(TaskError) + Send + 'static,
    ) -> &Self {
        self.attach_scoped(registry, host, dispatcher, Callback::Failure(Box::new(callback)));
        self
    }

    /// [`on_complete`](Self::on_complete), scoped to `host`.
    pub fn on_complete_scoped(
        &self,
        registry: &LifecycleRegistry,
        host: &LifecycleHost,
        dispatcher: &Dispatcher,
        callback: impl FnOnce(Task<T>) + Send + 'static,
    ) -> &Self {
        self.attach_scoped(registry, host, dispatcher, Callback::Complete(Box::new(callback)));
        self
    }

    /// [`on_cancelled`](Self::on_cancelled), scoped to `host`.
    pub fn on_cancelled_scoped(
        &self,
        registry: &LifecycleRegistry,
        host: &LifecycleHost,
        dispatcher: &Dispatcher,
        callback: impl FnOnce() + Send + 'static,
    ) -> &Self {
        self.attach_scoped(registry, host, dispatcher, Callback::Cancelled(Box::new(callback)));
        self
    }

    /// Derives a new task by applying `f` to this task once it settles, whatever the
    /// outcome.
    ///
    /// `f` runs through `dispatcher` and receives the settled task. `Ok` becomes the
    /// derived task's value; `Err` becomes its failure - including when this task
    /// succeeded, and vice versa: a continuation that returns `Ok` after a failed
    /// antecedent yields a *succeeded* derived task.
    pub fn continue_with<R>(
        &self,
        dispatcher: &Dispatcher,
        f: impl FnOnce(&Task<T>) -> Result<R, TaskError> + Send + 'static,
    ) -> Task<R>
    where
        R: Send + Sync + 'static,
    {
        continuation::continue_with(self, dispatcher, f)
    }

    /// Like [`continue_with`](Self::continue_with), but `f` returns a nested task whose
    /// eventual outcome - value, error, or cancellation - becomes the derived task's
    /// outcome (one level of flattening).
    pub fn continue_with_task<R>(
        &self,
        dispatcher: &Dispatcher,
        f: impl FnOnce(&Task<T>) -> Result<Task<R>, TaskError> + Send + 'static,
    ) -> Task<R>
    where
        R: Send + Sync + 'static,
    {
        continuation::continue_with_task(self, dispatcher, f)
    }

    /// Derives a new task by applying `f` to the value once this task succeeds.
    ///
    /// `f` runs through `dispatcher` and its returned task is flattened as in
    /// [`continue_with_task`](Self::continue_with_task). If this task fails, the
    /// derived task fails with the same error without invoking `f`; if this task is
    /// cancelled, the derived task is cancelled.
    pub fn on_success_task<R>(
        &self,
        dispatcher: &Dispatcher,
        f: impl FnOnce(&T) -> Result<Task<R>, TaskError> + Send + 'static,
    ) -> Task<R>
    where
        R: Send + Sync + 'static,
    {
        continuation::on_success_task(self, dispatcher, f)
    }

    /// Blocks the calling thread until the task settles, then returns its result.
    ///
    /// This and [`wait_timeout`](Self::wait_timeout) are the only blocking entry
    /// points in the crate. Do not call from a thread that drives a
    /// [`DispatchQueue`](hopper::DispatchQueue) the completion depends on.
    ///
    /// # Errors
    ///
    /// [`OutcomeError::Cancelled`] or [`OutcomeError::Failed`] if the task did not
    /// settle with a value.
    pub fn wait(&self) -> Result<T, OutcomeError>
    where
        T: Clone,
    {
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        self.on_complete(&Dispatcher::inline(), move |_| {
            let _ = tx.try_send(());
        });

        let _ = rx.recv();
        self.result()
    }

    /// [`wait`](Self::wait) with a deadline.
    ///
    /// # Errors
    ///
    /// [`WaitError::TimedOut`] if the task does not settle within `timeout`; otherwise
    /// as [`wait`](Self::wait).
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, WaitError>
    where
        T: Clone,
    {
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        self.on_complete(&Dispatcher::inline(), move |_| {
            let _ = tx.try_send(());
        });

        if rx.recv_timeout(timeout).is_err() && !self.is_complete() {
            return Err(WaitError::TimedOut);
        }

        self.result().map_err(WaitError::from)
    }

    fn attach(&self, dispatcher: &Dispatcher, callback: Callback<T>) {
        let listener = Listener::new(dispatcher.clone(), callback);
        let _ = self.core.attach(listener);
    }

    fn attach_scoped(
        &self,
        registry: &LifecycleRegistry,
        host: &LifecycleHost,
        dispatcher: &Dispatcher,
        callback: Callback<T>,
    ) {
        let listener = Listener::new(dispatcher.clone(), callback);

        // Registration is only meaningful while the listener is queued; one invoked
        // immediately can no longer leak into a stopped host.
        if self.core.attach(Arc::clone(&listener)) {
            let listener: Arc<dyn RevokeListener> = listener;
            let handle: Weak<dyn RevokeListener> = Arc::downgrade(&listener);
            registry.register(host, handle);
        }
    }
}
