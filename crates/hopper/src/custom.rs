// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

use crate::dispatcher::Job;

type DispatchFn = dyn Fn(Job) + Send + Sync;

/// Internal wrapper for custom dispatch strategies.
#[derive(Clone)]
pub(crate) struct CustomDispatcher(pub(crate) Arc<DispatchFn>);

impl CustomDispatcher {
    pub(crate) fn call(&self, job: Job) {
        (self.0)(job);
    }
}

impl Debug for CustomDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomDispatcher").finish_non_exhaustive()
    }
}
