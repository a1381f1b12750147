// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! Listener adapters: one-shot filtered observers of a task's terminal state.

use std::sync::{Arc, Mutex};

use hopper::Dispatcher;

use crate::state::Outcome;
use crate::task::Task;
use crate::{TaskError, ERR_POISONED_LOCK};

/// Type-erased revocation handle, held weakly by the lifecycle registry.
pub(crate) trait RevokeListener: Send + Sync {
    /// Clears the armed slot; every later notification becomes a no-op.
    fn revoke(&self);
}

/// The user callback, tagged by the outcome kind it observes.
pub(crate) enum Callback<T> {
    /// Fires only if the task succeeded, with a reference to the value.
    Success(Box<dyn FnOnce(&T) + Send>),

    /// Fires only if the task failed. Cancellation is not failure.
    Failure(Box<dyn FnOnce(TaskError) + Send>),

    /// Fires on any terminal state, receiving the task handle for branching.
    Complete(Box<dyn FnOnce(Task<T>) + Send>),

    /// Fires only if the task was cancelled.
    Cancelled(Box<dyn FnOnce() + Send>),
}

/// One queued observer of a task's terminal state.
///
/// The armed slot - dispatcher plus callback - is taken exactly once, by the first
/// notification or by [`revoke`](RevokeListener::revoke), whichever comes first. A
/// listener therefore never fires twice, and a revoked listener never fires at all.
pub(crate) struct Listener<T> {
    slot: Mutex<Option<Armed<T>>>,
}

struct Armed<T> {
    dispatcher: Dispatcher,
    callback: Callback<T>,
}

impl<T: Send + Sync + 'static> Listener<T> {
    pub(crate) fn new(dispatcher: Dispatcher, callback: Callback<T>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Some(Armed { dispatcher, callback })),
        })
    }

    /// Routes a settled outcome to the user callback through the dispatcher, if the
    /// callback's filter matches the outcome kind.
    ///
    /// A filter mismatch still disarms the listener: the task has settled and this
    /// listener will never have anything to observe.
    pub(crate) fn on_task_update(&self, task: &Task<T>, outcome: &Arc<Outcome<T>>) {
        let Some(armed) = self.slot.lock().expect(ERR_POISONED_LOCK).take() else {
            return;
        };

        match (armed.callback, outcome.as_ref()) {
            (Callback::Success(callback), Outcome::Value(_)) => {
                let outcome = Arc::clone(outcome);
                armed.dispatcher.dispatch(move || {
                    if let Outcome::Value(value) = outcome.as_ref() {
                        callback(value);
                    }
                });
            }
            (Callback::Failure(callback), Outcome::Error(error)) => {
                let error = error.clone();
                armed.dispatcher.dispatch(move || callback(error));
            }
            (Callback::Complete(callback), _) => {
                let task = task.clone();
                armed.dispatcher.dispatch(move || callback(task));
            }
            (Callback::Cancelled(callback), Outcome::Cancelled) => {
                armed.dispatcher.dispatch(callback);
            }
            _ => {}
        }
    }
}

impl<T: Send + Sync + 'static> RevokeListener for Listener<T> {
    fn revoke(&self) {
        drop(self.slot.lock().expect(ERR_POISONED_LOCK).take());
    }
}
