// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! Continuation combinators: deriving one task from another's outcome.
//!
//! Each combinator owns a fresh [`CompletionSource`] for the derived task and wires a
//! one-shot listener onto the antecedent. User functions are fallible; an `Err` is
//! captured into the derived task and never escapes into the antecedent's
//! notification drain.

use std::sync::Arc;

use hopper::Dispatcher;

use crate::listener::{Callback, Listener};
use crate::source::CompletionSource;
use crate::state::Outcome;
use crate::task::Task;
use crate::TaskError;

pub(crate) fn continue_with<T, R>(
    antecedent: &Task<T>,
    dispatcher: &Dispatcher,
    f: impl FnOnce(&Task<T>) -> Result<R, TaskError> + Send + 'static,
) -> Task<R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    let source = CompletionSource::new();
    let derived = source.task();

    let listener = Listener::new(
        dispatcher.clone(),
        Callback::Complete(Box::new(move |settled: Task<T>| match f(&settled) {
            Ok(value) => source.set_value(value),
            Err(error) => source.set_error(error),
        })),
    );
    let _ = antecedent.core().attach(listener);

    derived
}

pub(crate) fn continue_with_task<T, R>(
    antecedent: &Task<T>,
    dispatcher: &Dispatcher,
    f: impl FnOnce(&Task<T>) -> Result<Task<R>, TaskError> + Send + 'static,
) -> Task<R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    let source = CompletionSource::new();
    let derived = source.task();

    let listener = Listener::new(
        dispatcher.clone(),
        Callback::Complete(Box::new(move |settled: Task<T>| match f(&settled) {
            Ok(nested) => adopt(&nested, source),
            Err(error) => source.set_error(error),
        })),
    );
    let _ = antecedent.core().attach(listener);

    derived
}

pub(crate) fn on_success_task<T, R>(
    antecedent: &Task<T>,
    dispatcher: &Dispatcher,
    f: impl FnOnce(&T) -> Result<Task<R>, TaskError> + Send + 'static,
) -> Task<R>
where
    T: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    let source = CompletionSource::new();
    let derived = source.task();

    // Only the success path goes through the caller's dispatcher; failure and
    // cancellation propagate on the notifying thread, without invoking `f`.
    let user_dispatcher = dispatcher.clone();
    let listener = Listener::new(
        Dispatcher::inline(),
        Callback::Complete(Box::new(move |settled: Task<T>| {
            let outcome = settled.outcome().expect("completion listener fired on an unsettled task");

            match outcome.as_ref() {
                Outcome::Value(_) => {
                    let outcome = Arc::clone(&outcome);
                    user_dispatcher.dispatch(move || {
                        if let Outcome::Value(value) = outcome.as_ref() {
                            match f(value) {
                                Ok(nested) => adopt(&nested, source),
                                Err(error) => source.set_error(error),
                            }
                        }
                    });
                }
                Outcome::Error(error) => source.set_error(error.clone()),
                Outcome::Cancelled => source.set_cancelled(),
            }
        })),
    );
    let _ = antecedent.core().attach(listener);

    derived
}

/// Flattens one level of task nesting: the derived source adopts `nested`'s eventual
/// outcome, sharing the settled allocation rather than copying it.
fn adopt<R: Send + Sync + 'static>(nested: &Task<R>, source: CompletionSource<R>) {
    let listener = Listener::new(
        Dispatcher::inline(),
        Callback::Complete(Box::new(move |settled: Task<R>| {
            let outcome = settled.outcome().expect("completion listener fired on an unsettled task");
            source.settle_shared(outcome);
        })),
    );
    let _ = nested.core().attach(listener);
}
