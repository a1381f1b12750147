// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! Error types for task production and observation.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// A producer-supplied error, shared by every observer of a failed task.
///
/// Failed tasks may be observed by any number of listeners and result readers, so the
/// underlying error object is reference-counted and `TaskError` is cheap to clone. The
/// original error remains reachable: [`downcast_ref`](Self::downcast_ref) borrows it and
/// [`downcast`](Self::downcast) shares it, which is what the typed
/// [`Task::result_as`](crate::Task::result_as) accessor is built on.
pub struct TaskError {
    error: Arc<dyn StdError + Send + Sync>,
    any: Arc<dyn Any + Send + Sync>,
}

impl TaskError {
    /// Wraps a concrete error for storage in a task.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let shared = Arc::new(error);
        Self {
            error: Arc::clone(&shared) as Arc<dyn StdError + Send + Sync>,
            any: shared,
        }
    }

    /// Creates an error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Returns `true` if the underlying error is of type `E`.
    #[must_use]
    pub fn is<E>(&self) -> bool
    where
        E: StdError + Send + Sync + 'static,
    {
        self.any.is::<E>()
    }

    /// Borrows the underlying error if it is of type `E`.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.any.downcast_ref::<E>()
    }

    /// Returns a shared handle to the underlying error if it is of type `E`.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<Arc<E>>
    where
        E: StdError + Send + Sync + 'static,
    {
        Arc::clone(&self.any).downcast::<E>().ok()
    }

    /// Borrows the underlying error without assuming its type.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync) {
        self.error.as_ref()
    }
}

impl Clone for TaskError {
    fn clone(&self) -> Self {
        Self {
            error: Arc::clone(&self.error),
            any: Arc::clone(&self.any),
        }
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.error, f)
    }
}

impl Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.error, f)
    }
}

impl StdError for TaskError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.error.as_ref() as &(dyn StdError + 'static))
    }
}

/// Message-only payload behind [`TaskError::msg`].
#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

/// Why [`Task::result`](crate::Task::result) did not return a value.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum OutcomeError {
    /// The task has not settled yet. Reading a result before completion is a caller
    /// mistake; wait for a listener or use the blocking conveniences instead.
    #[error("task is not yet complete")]
    NotComplete,

    /// The task settled by cancellation.
    #[error("task was cancelled")]
    Cancelled,

    /// The task failed; the wrapped producer error is attached.
    #[error("task failed: {0}")]
    Failed(#[source] TaskError),
}

impl From<OutcomeError> for TaskError {
    fn from(error: OutcomeError) -> Self {
        Self::new(error)
    }
}

/// Result errors from the typed [`Task::result_as`](crate::Task::result_as) accessor.
#[derive(Debug, Error)]
pub enum TypedOutcomeError<E> {
    /// The task failed with an error of type `E`; this is the original producer error,
    /// unwrapped.
    #[error("task failed: {0}")]
    Original(Arc<E>),

    /// Every other terminal condition, reported as [`OutcomeError`].
    #[error(transparent)]
    Other(#[from] OutcomeError),
}

/// Why a blocking wait did not return a value.
#[derive(Debug, Clone, Error)]
pub enum WaitError {
    /// The timeout elapsed before the task settled.
    #[error("timed out waiting for task completion")]
    TimedOut,

    /// The task settled, but not with a value.
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
}

/// Failure of an aggregate produced by [`when_all`](crate::when_all).
#[derive(Debug, Clone, Error)]
#[error("{failed} of {total} tasks failed")]
pub struct AggregateError {
    /// How many member tasks failed.
    pub failed: usize,

    /// How many tasks were aggregated.
    pub total: usize,

    /// The first failure observed.
    #[source]
    pub first: TaskError,
}

/// Failure of a deadline task produced by [`with_timeout`](crate::with_timeout).
#[derive(Debug, Clone, Error)]
#[error("task did not settle within {timeout:?}")]
pub struct TimeoutElapsed {
    /// The enforced deadline.
    pub timeout: Duration,
}
