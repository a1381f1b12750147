// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! [`DispatchQueue`] for driving queue-backed dispatchers.

use std::fmt::Debug;

use crossbeam_channel::Receiver;

use crate::dispatcher::Job;

/// The draining end of a queue dispatcher.
///
/// Obtained from [`Dispatcher::queue`](crate::Dispatcher::queue). Jobs handed to the
/// paired dispatcher accumulate here until one of the `run_*` methods executes them
/// on the calling thread.
pub struct DispatchQueue {
    receiver: Receiver<Job>,
}

pub(crate) fn new(receiver: Receiver<Job>) -> DispatchQueue {
    DispatchQueue { receiver }
}

impl DispatchQueue {
    /// Runs every job currently in the queue and returns how many were executed.
    ///
    /// Does not wait for further jobs; an empty queue returns zero immediately.
    pub fn run_until_idle(&self) -> usize {
        let mut executed = 0;

        while let Ok(job) = self.receiver.try_recv() {
            job();
            executed += 1;
        }

        executed
    }

    /// Runs jobs as they arrive until every paired [`Dispatcher`](crate::Dispatcher)
    /// clone has been dropped.
    ///
    /// This blocks the calling thread and is intended for a dedicated drive loop.
    pub fn run(&self) {
        while let Ok(job) = self.receiver.recv() {
            job();
        }
    }

    /// Returns `true` if no jobs are waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("pending", &self.receiver.len())
            .finish()
    }
}
