// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! [`CompletionSource`], the producer-side handle that settles a task.

use std::fmt::{self, Debug};
use std::sync::Arc;

use hopper::Dispatcher;

use crate::cancellation::CancellationToken;
use crate::state::{Outcome, TaskCore};
use crate::task::Task;
use crate::TaskError;

/// Producer-side handle that settles a [`Task`] exactly once.
///
/// The source is the sole integration point a producer (an RPC layer, a service
/// binding, a worker) needs: create one, hand out [`task`](Self::task) views, and later
/// call exactly one of the `set_*` operations. Clones share the same underlying task;
/// the exactly-once rule spans all of them.
///
/// `set_*` treats a second completion as a programming fault. Producers that race
/// legitimately - a cancellation token against a result, a timeout against a late
/// response - use the `try_set_*` variants, which report the lost race instead.
pub struct CompletionSource<T> {
    core: Arc<TaskCore<T>>,
}

impl<T> Clone for CompletionSource<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Debug for CompletionSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource")
            .field("state", &self.core.phase_name())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Default for CompletionSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> CompletionSource<T> {
    /// Creates a source with a fresh pending task.
    #[must_use]
    pub fn new() -> Self {
        Self { core: TaskCore::new() }
    }

    /// Creates a source whose task is cancelled when `token` fires.
    ///
    /// The cancellation loses gracefully to a producer that completes first; it never
    /// interrupts in-flight work.
    #[must_use]
    pub fn with_token(token: &CancellationToken) -> Self {
        let source = Self::new();

        let core = Arc::downgrade(&source.core);
        token.on_cancel_requested(&Dispatcher::inline(), move || {
            if let Some(core) = core.upgrade() {
                if !core.try_settle(Outcome::Cancelled) {
                    tracing::trace!("cancellation request arrived after completion; ignored");
                }
            }
        });

        source
    }

    /// Returns the read-only view of this source's task.
    #[must_use]
    pub fn task(&self) -> Task<T> {
        Task::from_core(Arc::clone(&self.core))
    }

    /// Settles the task with a value.
    ///
    /// # Panics
    ///
    /// Panics if the task has already settled - completing twice is a programming
    /// fault, not a runtime condition. Racing producers use
    /// [`try_set_value`](Self::try_set_value).
    pub fn set_value(&self, value: T) {
        self.settle(Outcome::Value(value));
    }

    /// Settles the task with an error.
    ///
    /// # Panics
    ///
    /// Panics if the task has already settled; see [`set_value`](Self::set_value).
    pub fn set_error(&self, error: TaskError) {
        self.settle(Outcome::Error(error));
    }

    /// Settles the task as cancelled.
    ///
    /// # Panics
    ///
    /// Panics if the task has already settled; see [`set_value`](Self::set_value).
    pub fn set_cancelled(&self) {
        self.settle(Outcome::Cancelled);
    }

    /// Settles the task with a value unless it has already settled.
    ///
    /// Returns `false` if the attempt lost the completion race.
    pub fn try_set_value(&self, value: T) -> bool {
        self.try_settle(Outcome::Value(value))
    }

    /// Settles the task with an error unless it has already settled.
    ///
    /// Returns `false` if the attempt lost the completion race.
    pub fn try_set_error(&self, error: TaskError) -> bool {
        self.try_settle(Outcome::Error(error))
    }

    /// Settles the task as cancelled unless it has already settled.
    ///
    /// Returns `false` if the attempt lost the completion race.
    pub fn try_set_cancelled(&self) -> bool {
        self.try_settle(Outcome::Cancelled)
    }

    pub(crate) fn settle_shared(&self, outcome: Arc<Outcome<T>>) {
        let settled = self.core.try_settle_shared(outcome);
        assert!(settled, "duplicate completion: task is already {}", self.core.phase_name());
    }

    pub(crate) fn try_settle_shared(&self, outcome: Arc<Outcome<T>>) -> bool {
        self.try_settle_impl(|core| core.try_settle_shared(outcome))
    }

    fn settle(&self, outcome: Outcome<T>) {
        let settled = self.core.try_settle(outcome);
        assert!(settled, "duplicate completion: task is already {}", self.core.phase_name());
    }

    fn try_settle(&self, outcome: Outcome<T>) -> bool {
        self.try_settle_impl(|core| core.try_settle(outcome))
    }

    fn try_settle_impl(&self, settle: impl FnOnce(&Arc<TaskCore<T>>) -> bool) -> bool {
        let settled = settle(&self.core);
        if !settled {
            tracing::trace!(state = self.core.phase_name(), "duplicate completion attempt suppressed");
        }

        settled
    }
}
