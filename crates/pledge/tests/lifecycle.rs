// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "test code")]

//! Tests for lifecycle-scoped listener teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hopper::Dispatcher;
use pledge::{CompletionSource, LifecycleHost, LifecycleRegistry};

fn counting_listener() -> (Arc<AtomicUsize>, impl FnOnce(&i32) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let callback = {
        let count = Arc::clone(&count);
        move |_: &i32| {
            count.fetch_add(1, Ordering::SeqCst);
        }
    };
    (count, callback)
}

#[test]
fn stopped_host_revokes_scoped_listeners_only() {
    let registry = LifecycleRegistry::new();
    let host = LifecycleHost::new();
    let source = CompletionSource::new();
    let task = source.task();

    let (scoped_count, scoped) = counting_listener();
    task.on_success_scoped(&registry, &host, &Dispatcher::inline(), scoped);

    let (unscoped_count, unscoped) = counting_listener();
    task.on_success(&Dispatcher::inline(), unscoped);

    host.notify_stopped();
    source.set_value(1);

    assert_eq!(scoped_count.load(Ordering::SeqCst), 0, "scoped listener must not fire");
    assert_eq!(unscoped_count.load(Ordering::SeqCst), 1, "unscoped listener is unaffected");
}

#[test]
fn scoped_listener_fires_normally_while_the_host_lives() {
    let registry = LifecycleRegistry::new();
    let host = LifecycleHost::new();
    let source = CompletionSource::new();

    let (count, callback) = counting_listener();
    source.task().on_success_scoped(&registry, &host, &Dispatcher::inline(), callback);

    source.set_value(1);

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn scoped_attach_to_a_settled_task_fires_immediately() {
    let registry = LifecycleRegistry::new();
    let host = LifecycleHost::new();
    let source = CompletionSource::new();
    source.set_value(1);

    let (count, callback) = counting_listener();
    source.task().on_success_scoped(&registry, &host, &Dispatcher::inline(), callback);

    assert_eq!(count.load(Ordering::SeqCst), 1);

    // The listener already fired; a later stop signal changes nothing.
    host.notify_stopped();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_signal_is_repeatable_and_scope_is_reusable() {
    let registry = LifecycleRegistry::new();
    let host = LifecycleHost::new();

    let first = CompletionSource::new();
    let (first_count, callback) = counting_listener();
    first.task().on_success_scoped(&registry, &host, &Dispatcher::inline(), callback);

    host.notify_stopped();
    host.notify_stopped();
    first.set_value(1);
    assert_eq!(first_count.load(Ordering::SeqCst), 0);

    // The host "restarts": listeners registered afterwards behave normally.
    let second = CompletionSource::new();
    let (second_count, callback) = counting_listener();
    second.task().on_success_scoped(&registry, &host, &Dispatcher::inline(), callback);

    second.set_value(2);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_host_without_a_stop_signal_leaves_listeners_armed() {
    let registry = LifecycleRegistry::new();
    let host = LifecycleHost::new();
    let source = CompletionSource::new();

    let (count, callback) = counting_listener();
    source.task().on_success_scoped(&registry, &host, &Dispatcher::inline(), callback);

    // The registry only holds the host weakly; dropping it is not a stop signal.
    drop(host);
    source.set_value(1);

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn scoping_is_per_host() {
    let registry = LifecycleRegistry::new();
    let stopped_host = LifecycleHost::new();
    let live_host = LifecycleHost::new();
    let source = CompletionSource::new();
    let task = source.task();

    let (stopped_count, callback) = counting_listener();
    task.on_success_scoped(&registry, &stopped_host, &Dispatcher::inline(), callback);

    let (live_count, callback) = counting_listener();
    task.on_success_scoped(&registry, &live_host, &Dispatcher::inline(), callback);

    stopped_host.notify_stopped();
    source.set_value(1);

    assert_eq!(stopped_count.load(Ordering::SeqCst), 0);
    assert_eq!(live_count.load(Ordering::SeqCst), 1);
}

#[test]
fn every_listener_kind_supports_scoping() {
    let registry = LifecycleRegistry::new();
    let host = LifecycleHost::new();
    let source = CompletionSource::<i32>::new();
    let task = source.task();
    let fired = Arc::new(AtomicUsize::new(0));

    let f = Arc::clone(&fired);
    task.on_failure_scoped(&registry, &host, &Dispatcher::inline(), move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    let f = Arc::clone(&fired);
    task.on_complete_scoped(&registry, &host, &Dispatcher::inline(), move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    let f = Arc::clone(&fired);
    task.on_cancelled_scoped(&registry, &host, &Dispatcher::inline(), move || {
        f.fetch_add(1, Ordering::SeqCst);
    });

    host.notify_stopped();
    source.set_cancelled();

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
