// Copyright (c) The Pledge Project Authors.
// Licensed under the MIT License.

//! Lifecycle-scoped listener teardown.
//!
//! A listener registered "scoped to a host" must stop firing once that host reports it
//! has stopped - a screen going to background, a session ending - without the caller
//! unregistering anything by hand. The registry records weak host-to-listener
//! associations and revokes the survivors when the stop signal arrives; it owns
//! neither side's lifetime.

use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, Weak};

use crate::listener::RevokeListener;
use crate::ERR_POISONED_LOCK;

type StopObserver = Arc<dyn Fn() + Send + Sync>;

/// A lifecycle-bearing entity whose stop signal detaches scoped listeners.
///
/// The embedder creates one handle per lifecycle scope, keeps it alive while the scope
/// is active, and calls [`notify_stopped`](Self::notify_stopped) when the scope ends.
/// Dropping the handle without a stop signal is fine: registries hold it weakly and
/// prune the entry on their own.
pub struct LifecycleHost {
    core: Arc<HostCore>,
}

pub(crate) struct HostCore {
    observers: Mutex<Vec<StopObserver>>,
}

impl LifecycleHost {
    /// Creates an independent host handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Arc::new(HostCore {
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Signals that this host has stopped.
    ///
    /// Every registry that observed this host revokes the listeners scoped to it.
    /// Listeners already invoked (or revoked) are unaffected; the signal may be
    /// repeated without effect on an already-drained scope.
    pub fn notify_stopped(&self) {
        let observers: Vec<StopObserver> = {
            let observers = self.core.observers.lock().expect(ERR_POISONED_LOCK);
            observers.clone()
        };

        for observer in observers {
            observer();
        }
    }

    pub(crate) fn attach_observer(&self, observer: StopObserver) {
        self.core.observers.lock().expect(ERR_POISONED_LOCK).push(observer);
    }

    pub(crate) fn key(&self) -> Weak<HostCore> {
        Arc::downgrade(&self.core)
    }
}

impl Default for LifecycleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for LifecycleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHost").finish_non_exhaustive()
    }
}

struct HostEntry {
    host: Weak<HostCore>,
    listeners: Vec<Weak<dyn RevokeListener>>,
}

/// Registry of host-scoped listeners.
///
/// One registry is constructed per process (or per subsystem) and passed by reference
/// to wherever scoped listeners are attached; there is no ambient global instance.
/// Entries are created lazily on first registration per host, at which point the
/// host's stop signal is routed to this registry. All references are weak: the
/// registry never keeps a host or a listener alive.
pub struct LifecycleRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    hosts: Mutex<Vec<HostEntry>>,
}

impl LifecycleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                hosts: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Records `listener` for revocation when `host` stops.
    ///
    /// Dead hosts are pruned opportunistically on every registration.
    pub(crate) fn register(&self, host: &LifecycleHost, listener: Weak<dyn RevokeListener>) {
        let key = host.key();

        let newly_tracked = {
            let mut hosts = self.inner.hosts.lock().expect(ERR_POISONED_LOCK);
            hosts.retain(|entry| entry.host.strong_count() > 0);

            if let Some(entry) = hosts.iter_mut().find(|entry| entry.host.ptr_eq(&key)) {
                entry.listeners.push(listener);
                false
            } else {
                hosts.push(HostEntry {
                    host: Weak::clone(&key),
                    listeners: vec![listener],
                });
                true
            }
        };

        // First listener under this host: route its stop signal here. The observer
        // holds the registry weakly, so an abandoned registry dies normally.
        if newly_tracked {
            let registry = Arc::downgrade(&self.inner);
            host.attach_observer(Arc::new(move || {
                if let Some(registry) = registry.upgrade() {
                    host_stopped(&registry, &key);
                }
            }));
        }
    }
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hosts = self.inner.hosts.lock().expect(ERR_POISONED_LOCK);
        f.debug_struct("LifecycleRegistry").field("hosts", &hosts.len()).finish()
    }
}

/// Revokes every still-live listener scoped to the stopped host and drains its entry.
///
/// The entry itself survives for re-registration; it is pruned once the host is gone.
fn host_stopped(registry: &RegistryInner, host: &Weak<HostCore>) {
    let drained: Vec<Weak<dyn RevokeListener>> = {
        let mut hosts = registry.hosts.lock().expect(ERR_POISONED_LOCK);

        match hosts.iter_mut().find(|entry| entry.host.ptr_eq(host)) {
            Some(entry) => std::mem::take(&mut entry.listeners),
            None => return,
        }
    };

    let mut revoked = 0_usize;
    for listener in drained {
        if let Some(listener) = listener.upgrade() {
            listener.revoke();
            revoked += 1;
        }
    }

    tracing::debug!(revoked, "host stopped; scoped listeners detached");
}
