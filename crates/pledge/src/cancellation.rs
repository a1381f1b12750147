// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! Cancellation requests, modeled as a dedicated marker sub-task.
//!
//! Cancellation here is a request, not an interruption: firing a token cancels the
//! tasks bound to it through [`CompletionSource::with_token`] and notifies observers,
//! but in-flight producer work is never torn down.

use std::fmt::{self, Debug};

use hopper::Dispatcher;

use crate::source::CompletionSource;
use crate::task::Task;

/// Producer of cancellation requests, paired with any number of [`CancellationToken`]s.
pub struct CancellationTokenSource {
    marker: CompletionSource<()>,
}

impl CancellationTokenSource {
    /// Creates a source with no cancellation requested.
    #[must_use]
    pub fn new() -> Self {
        Self {
            marker: CompletionSource::new(),
        }
    }

    /// Returns a token observing this source.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            marker: self.marker.task(),
        }
    }

    /// Requests cancellation. Idempotent; later calls have no effect.
    pub fn cancel(&self) {
        let _ = self.marker.try_set_value(());
    }
}

impl Default for CancellationTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for CancellationTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationTokenSource")
            .field("cancellation_requested", &self.marker.task().is_complete())
            .finish()
    }
}

/// Observer half of a [`CancellationTokenSource`].
///
/// Backed by a dedicated marker task that settles when cancellation is requested;
/// observation is therefore ordinary listener attachment.
#[derive(Clone)]
pub struct CancellationToken {
    marker: Task<()>,
}

impl CancellationToken {
    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancellation_requested(&self) -> bool {
        self.marker.is_complete()
    }

    /// Invokes `callback` through `dispatcher` when cancellation is requested.
    ///
    /// Fires immediately if cancellation was already requested; never fires otherwise.
    pub fn on_cancel_requested(&self, dispatcher: &Dispatcher, callback: impl FnOnce() + Send + 'static) {
        self.marker.on_success(dispatcher, move |_: &()| callback());
    }
}

impl Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancellation_requested", &self.is_cancellation_requested())
            .finish()
    }
}
