// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! The lock-guarded completion state machine behind every task.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Mutex};

use crate::listener::Listener;
use crate::task::Task;
use crate::ERR_POISONED_LOCK;

/// The terminal state of a task, shared by every observer.
///
/// Created exactly once per task, under the core lock, and immutable afterwards.
/// Listeners, result readers, and derived tasks all hold the same allocation, which is
/// what lets flattening combinators adopt a nested task's outcome without copying it.
pub(crate) enum Outcome<T> {
    /// The producer supplied a value.
    Value(T),

    /// The producer reported a failure.
    Error(crate::TaskError),

    /// The producer abandoned the work.
    Cancelled,
}

enum Phase<T> {
    Pending,
    Settled(Arc<Outcome<T>>),
}

struct Inner<T> {
    phase: Phase<T>,
    queue: VecDeque<Arc<Listener<T>>>,
    draining: bool,
}

/// One lock guards the phase, the pending-listener queue, and the draining flag; no
/// thread can observe the task complete while its outcome is still being written.
pub(crate) struct TaskCore<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> TaskCore<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                phase: Phase::Pending,
                queue: VecDeque::new(),
                draining: false,
            }),
        })
    }

    pub(crate) fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        let inner = self.inner.lock().expect(ERR_POISONED_LOCK);

        match &inner.phase {
            Phase::Pending => None,
            Phase::Settled(outcome) => Some(Arc::clone(outcome)),
        }
    }

    /// Human-readable phase name, used in duplicate-completion faults.
    pub(crate) fn phase_name(&self) -> &'static str {
        let inner = self.inner.lock().expect(ERR_POISONED_LOCK);

        match &inner.phase {
            Phase::Pending => "pending",
            Phase::Settled(outcome) => match outcome.as_ref() {
                Outcome::Value(_) => "succeeded",
                Outcome::Error(_) => "failed",
                Outcome::Cancelled => "cancelled",
            },
        }
    }
}

impl<T: Send + Sync + 'static> TaskCore<T> {
    /// Moves the core into a terminal state and notifies the pending queue.
    ///
    /// Returns `false` without side effects if the core has already settled.
    pub(crate) fn try_settle(self: &Arc<Self>, outcome: Outcome<T>) -> bool {
        self.try_settle_shared(Arc::new(outcome))
    }

    /// [`try_settle`](Self::try_settle) with an outcome that already has other holders.
    ///
    /// Flattening combinators pass the nested task's outcome through here so the derived
    /// task shares it instead of copying it.
    pub(crate) fn try_settle_shared(self: &Arc<Self>, outcome: Arc<Outcome<T>>) -> bool {
        {
            let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

            if matches!(inner.phase, Phase::Settled(_)) {
                return false;
            }

            inner.phase = Phase::Settled(Arc::clone(&outcome));
            inner.draining = true;
        }

        self.drain(&outcome);
        true
    }

    /// Invokes queued listeners outside the lock, in FIFO attachment order.
    ///
    /// The queue is swapped out under the lock and invoked after release, so a listener
    /// that re-enters this task cannot deadlock. Listeners attached while a batch is
    /// running land in the queue (the `draining` flag forbids self-invocation) and are
    /// picked up by the re-check, preserving attachment order end to end.
    fn drain(self: &Arc<Self>, outcome: &Arc<Outcome<T>>) {
        let task = Task::from_core(Arc::clone(self));

        loop {
            let batch = {
                let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

                if inner.queue.is_empty() {
                    inner.draining = false;
                    break;
                }

                mem::take(&mut inner.queue)
            };

            for listener in batch {
                listener.on_task_update(&task, outcome);
            }
        }
    }

    /// Queues a listener, or invokes it immediately if the task has already settled and
    /// no drain is in flight.
    ///
    /// Returns `true` if the listener was queued; only a queued listener is eligible
    /// for lifecycle-scoped teardown.
    pub(crate) fn attach(self: &Arc<Self>, listener: Arc<Listener<T>>) -> bool {
        let immediate = {
            let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

            let settled = match &inner.phase {
                Phase::Settled(outcome) if !inner.draining => Some(Arc::clone(outcome)),
                _ => None,
            };

            if settled.is_none() {
                inner.queue.push_back(Arc::clone(&listener));
            }

            settled
        };

        match immediate {
            Some(outcome) => {
                let task = Task::from_core(Arc::clone(self));
                listener.on_task_update(&task, &outcome);
                false
            }
            None => true,
        }
    }
}
