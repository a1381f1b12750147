// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "test code")]

//! Tests for listener filtering, ordering, and dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hopper::Dispatcher;
use pledge::{CompletionSource, TaskError};

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Clone + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let bump = {
        let count = Arc::clone(&count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    };
    (count, bump)
}

#[test]
fn success_listener_fires_only_on_success() {
    let (succeeded, bump) = counter();
    {
        let source = CompletionSource::new();
        let bump = bump.clone();
        source.task().on_success(&Dispatcher::inline(), move |_: &i32| bump());
        source.set_value(1);
    }
    assert_eq!(succeeded.load(Ordering::SeqCst), 1);

    let (on_failed, bump) = counter();
    {
        let source = CompletionSource::<i32>::new();
        source.set_error(TaskError::msg("boom"));
        let bump = bump.clone();
        source.task().on_success(&Dispatcher::inline(), move |_: &i32| bump());
    }
    assert_eq!(on_failed.load(Ordering::SeqCst), 0);
}

#[test]
fn failure_listener_ignores_success_and_cancellation() {
    let (count, _) = counter();

    let succeeded = CompletionSource::new();
    succeeded.set_value(1);
    let c = Arc::clone(&count);
    succeeded.task().on_failure(&Dispatcher::inline(), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    let cancelled = CompletionSource::<i32>::new();
    cancelled.set_cancelled();
    let c = Arc::clone(&count);
    cancelled.task().on_failure(&Dispatcher::inline(), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn complete_listener_fires_on_every_terminal_state() {
    let (count, _) = counter();

    for settle in [
        Box::new(|source: &CompletionSource<i32>| source.set_value(1)) as Box<dyn Fn(&CompletionSource<i32>)>,
        Box::new(|source: &CompletionSource<i32>| source.set_error(TaskError::msg("boom"))),
        Box::new(|source: &CompletionSource<i32>| source.set_cancelled()),
    ] {
        let source = CompletionSource::<i32>::new();
        let c = Arc::clone(&count);
        source.task().on_complete(&Dispatcher::inline(), move |task| {
            assert!(task.is_complete());
            c.fetch_add(1, Ordering::SeqCst);
        });
        settle(&source);
    }

    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn cancelled_listener_fires_only_on_cancellation() {
    let (count, bump) = counter();

    let cancelled = CompletionSource::<i32>::new();
    let b = bump.clone();
    cancelled.task().on_cancelled(&Dispatcher::inline(), move || b());
    cancelled.set_cancelled();

    let failed = CompletionSource::<i32>::new();
    let b = bump.clone();
    failed.task().on_cancelled(&Dispatcher::inline(), move || b());
    failed.set_error(TaskError::msg("boom"));

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn listeners_fire_in_attachment_order() {
    let source = CompletionSource::new();
    let task = source.task();
    let order = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        task.on_success(&Dispatcher::inline(), move |_: &i32| {
            order.lock().expect("order lock").push(label);
        });
    }

    source.set_value(1);

    assert_eq!(*order.lock().expect("order lock"), vec!["first", "second", "third"]);
}

#[test]
fn each_listener_fires_exactly_once_before_or_after_completion() {
    let source = CompletionSource::new();
    let task = source.task();
    let (count, bump) = counter();

    let b = bump.clone();
    task.on_complete(&Dispatcher::inline(), move |_| b());
    source.set_value(1);
    let b = bump.clone();
    task.on_complete(&Dispatcher::inline(), move |_| b());

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn listener_attached_from_inside_a_callback_still_fires() {
    let source = CompletionSource::new();
    let task = source.task();
    let order = Arc::new(Mutex::new(Vec::new()));

    let outer_order = Arc::clone(&order);
    task.on_complete(&Dispatcher::inline(), move |settled| {
        outer_order.lock().expect("order lock").push("outer");

        // Attaches while the drain is in flight; must be queued, not interleaved.
        let inner_order = Arc::clone(&outer_order);
        settled.on_complete(&Dispatcher::inline(), move |_| {
            inner_order.lock().expect("order lock").push("inner");
        });
    });

    source.set_value(1);

    assert_eq!(*order.lock().expect("order lock"), vec!["outer", "inner"]);
}

#[test]
fn queue_dispatcher_defers_listener_invocation() {
    let (dispatcher, queue) = Dispatcher::queue();
    let source = CompletionSource::new();
    let task = source.task();
    let (count, bump) = counter();

    let b = bump.clone();
    task.on_success(&dispatcher, move |_: &i32| b());

    source.set_value(1);
    assert_eq!(count.load(Ordering::SeqCst), 0, "callback must wait for the queue");

    assert_eq!(queue.run_until_idle(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn success_value_is_borrowed_not_cloned() {
    // The listener observes the stored value; no `Clone` bound is needed on `T`.
    struct NotClone(i32);

    let source = CompletionSource::new();
    let task = source.task();
    let (count, _) = counter();

    let c = Arc::clone(&count);
    task.on_success(&Dispatcher::inline(), move |value: &NotClone| {
        assert_eq!(value.0, 9);
        c.fetch_add(1, Ordering::SeqCst);
    });

    source.set_value(NotClone(9));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
