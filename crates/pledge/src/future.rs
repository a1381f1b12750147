// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! `await` support: a [`Task`] can be observed as a [`Future`].

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use hopper::Dispatcher;

use crate::error::OutcomeError;
use crate::task::Task;
use crate::ERR_POISONED_LOCK;

/// Future adapter returned by awaiting a [`Task`].
///
/// Completion from any thread wakes the most recently polled waker; re-polls replace
/// the stored waker, per the `Future` contract.
pub struct TaskFuture<T> {
    task: Task<T>,
    waker: Arc<Mutex<Option<Waker>>>,
    listening: bool,
}

impl<T> std::fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFuture").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Future for TaskFuture<T> {
    type Output = Result<T, OutcomeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.task.is_complete() {
            return Poll::Ready(this.task.result());
        }

        // Store the waker before attaching the completion listener so a completion
        // racing this poll always finds something to wake.
        *this.waker.lock().expect(ERR_POISONED_LOCK) = Some(cx.waker().clone());

        if !this.listening {
            this.listening = true;
            let waker = Arc::clone(&this.waker);
            this.task.on_complete(&Dispatcher::inline(), move |_| {
                if let Some(waker) = waker.lock().expect(ERR_POISONED_LOCK).take() {
                    waker.wake();
                }
            });
        }

        // The task may have settled between the fast path and the waker store; the
        // already-fired listener would have taken an older waker (or none), so
        // re-check rather than sleep forever.
        if this.task.is_complete() {
            return Poll::Ready(this.task.result());
        }

        Poll::Pending
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Task<T> {
    type Output = Result<T, OutcomeError>;
    type IntoFuture = TaskFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        TaskFuture {
            task: self,
            waker: Arc::new(Mutex::new(None)),
            listening: false,
        }
    }
}
