// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! Task aggregation and production utilities.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hopper::Dispatcher;

use crate::error::{AggregateError, TimeoutElapsed};
use crate::source::CompletionSource;
use crate::task::Task;
use crate::{TaskError, ERR_POISONED_LOCK};

/// Runs a fallible closure on `dispatcher` and returns the task of its outcome.
///
/// ```rust
/// use hopper::Dispatcher;
///
/// let task = pledge::run(&Dispatcher::inline(), || Ok(2 + 2));
/// assert_eq!(task.result().unwrap(), 4);
/// ```
pub fn run<T, F>(dispatcher: &Dispatcher, f: F) -> Task<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Result<T, TaskError> + Send + 'static,
{
    let source = CompletionSource::new();
    let task = source.task();

    dispatcher.dispatch(move || match f() {
        Ok(value) => source.set_value(value),
        Err(error) => source.set_error(error),
    });

    task
}

struct AggregateState {
    remaining: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicBool,
    first_error: Mutex<Option<TaskError>>,
}

/// Returns a task that succeeds when every input task succeeds.
///
/// If any input fails, the aggregate fails with an [`AggregateError`] wrapping the
/// first observed failure. If none fail but at least one is cancelled, the aggregate
/// is cancelled. An empty input succeeds immediately.
pub fn when_all<T>(tasks: impl IntoIterator<Item = Task<T>>) -> Task<()>
where
    T: Send + Sync + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Task::from_value(());
    }

    let source = CompletionSource::new();
    let aggregate = source.task();

    let total = tasks.len();
    let state = Arc::new(AggregateState {
        remaining: AtomicUsize::new(total),
        failed: AtomicUsize::new(0),
        cancelled: AtomicBool::new(false),
        first_error: Mutex::new(None),
    });

    for task in &tasks {
        let state = Arc::clone(&state);
        let source = source.clone();

        task.on_complete(&Dispatcher::inline(), move |settled| {
            if let Some(error) = settled.error() {
                state.failed.fetch_add(1, Ordering::SeqCst);
                let mut first = state.first_error.lock().expect(ERR_POISONED_LOCK);
                first.get_or_insert(error);
            } else if settled.is_cancelled() {
                state.cancelled.store(true, Ordering::SeqCst);
            }

            if state.remaining.fetch_sub(1, Ordering::SeqCst) != 1 {
                return;
            }

            let failed = state.failed.load(Ordering::SeqCst);
            if failed > 0 {
                let first = state
                    .first_error
                    .lock()
                    .expect(ERR_POISONED_LOCK)
                    .take()
                    .expect("failure was counted without a stored error");
                source.set_error(TaskError::new(AggregateError { failed, total, first }));
            } else if state.cancelled.load(Ordering::SeqCst) {
                source.set_cancelled();
            } else {
                source.set_value(());
            }
        });
    }

    aggregate
}

/// Returns a task with every input task's value, in input order.
///
/// Failure and cancellation behave as in [`when_all`].
pub fn when_all_results<T>(tasks: impl IntoIterator<Item = Task<T>>) -> Task<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Task::from_value(Vec::new());
    }

    let source = CompletionSource::new();
    let derived = source.task();

    when_all(tasks.iter().cloned()).on_complete(&Dispatcher::inline(), move |settled| {
        if settled.is_successful() {
            let values = tasks
                .iter()
                .map(|task| task.result().expect("aggregate succeeded with an unsettled member"))
                .collect();
            source.set_value(values);
        } else if settled.is_cancelled() {
            source.set_cancelled();
        } else {
            source.set_error(settled.error().expect("failed aggregate without an error"));
        }
    });

    derived
}

/// Returns a task carrying every input task, succeeding once all have settled -
/// whatever their individual outcomes.
pub fn when_all_settled<T>(tasks: impl IntoIterator<Item = Task<T>>) -> Task<Vec<Task<T>>>
where
    T: Send + Sync + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Task::from_value(Vec::new());
    }

    let source = CompletionSource::new();
    let derived = source.task();

    when_all(tasks.iter().cloned()).on_complete(&Dispatcher::inline(), move |_| {
        source.set_value(tasks);
    });

    derived
}

/// Returns a task mirroring `task`, or failing with [`TimeoutElapsed`] if `task` has
/// not settled within `timeout`.
///
/// The underlying task is unaffected either way; only the returned task observes the
/// deadline.
pub fn with_timeout<T>(task: &Task<T>, timeout: Duration) -> Task<T>
where
    T: Send + Sync + 'static,
{
    let source = CompletionSource::new();
    let derived = source.task();

    let (settled_tx, settled_rx) = crossbeam_channel::bounded::<()>(1);
    {
        let source = source.clone();
        task.on_complete(&Dispatcher::inline(), move |settled| {
            let outcome = settled.outcome().expect("completion listener fired on an unsettled task");
            let _ = source.try_settle_shared(outcome);
            let _ = settled_tx.try_send(());
        });
    }

    thread::Builder::new()
        .name("pledge-timeout".into())
        .spawn(move || {
            if settled_rx.recv_timeout(timeout).is_err() {
                let _ = source.try_set_error(TaskError::new(TimeoutElapsed { timeout }));
            }
        })
        .expect("failed to spawn timeout waiter thread");

    derived
}
