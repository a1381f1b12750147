// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "test code")]

//! Tests for cancellation tokens and token-bound sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hopper::Dispatcher;
use pledge::{CancellationTokenSource, CompletionSource};

#[test]
fn token_starts_unrequested_and_latches() {
    let source = CancellationTokenSource::new();
    let token = source.token();

    assert!(!token.is_cancellation_requested());

    source.cancel();
    source.cancel();

    assert!(token.is_cancellation_requested());
}

#[test]
fn on_cancel_requested_fires_once() {
    let source = CancellationTokenSource::new();
    let token = source.token();
    let fired = Arc::new(AtomicUsize::new(0));

    let f = Arc::clone(&fired);
    token.on_cancel_requested(&Dispatcher::inline(), move || {
        f.fetch_add(1, Ordering::SeqCst);
    });

    source.cancel();
    source.cancel();

    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Observers attached after the request fire immediately.
    let f = Arc::clone(&fired);
    token.on_cancel_requested(&Dispatcher::inline(), move || {
        f.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn token_bound_source_is_cancelled_by_the_token() {
    let cancellation = CancellationTokenSource::new();
    let source = CompletionSource::<i32>::with_token(&cancellation.token());
    let task = source.task();

    cancellation.cancel();

    assert!(task.is_cancelled());
}

#[test]
fn producer_completion_beats_a_late_cancellation_request() {
    let cancellation = CancellationTokenSource::new();
    let source = CompletionSource::with_token(&cancellation.token());
    let task = source.task();

    source.set_value(5);
    cancellation.cancel();

    // The cancellation request lost the race; it must not fault or change state.
    assert_eq!(task.result().expect("producer won"), 5);
}

#[test]
fn one_token_can_cancel_many_sources() {
    let cancellation = CancellationTokenSource::new();
    let token = cancellation.token();

    let first = CompletionSource::<i32>::with_token(&token);
    let second = CompletionSource::<i32>::with_token(&token);

    cancellation.cancel();

    assert!(first.task().is_cancelled());
    assert!(second.task().is_cancelled());
}
