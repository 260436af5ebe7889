//! Change notification callbacks.
//!
//! Callbacks are snapshotted under the lock and invoked after it is
//! released, so a callback may call back into the manager.

use crate::error::Error;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub type ChangeCallback = Arc<dyn Fn(bool) + Send + Sync>;
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;
pub type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// A callback to register with [`MapManager::subscribe`](super::MapManager::subscribe)
#[derive(Clone)]
pub enum Listener {
    /// New map data; the flag is true when saved maps changed
    Change(ChangeCallback),
    /// Local edits settled (debounced)
    Update(UpdateCallback),
    /// Map updates failed past the retry budget
    Error(ErrorCallback),
    /// Cloud reachability changed
    Availability(AvailabilityCallback),
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Registered callbacks plus a mute switch used after teardown
#[derive(Default)]
pub struct ListenerSet {
    registry: Mutex<Registry>,
    muted: AtomicBool,
}

impl ListenerSet {
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, listener));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(lid, _)| *lid != id.0);
        registry.listeners.len() != before
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Vec<Listener> {
        if self.muted.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.registry
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect()
    }

    pub fn notify_change(&self, saved: bool) {
        for listener in self.snapshot() {
            if let Listener::Change(f) = listener {
                f(saved);
            }
        }
    }

    pub fn notify_update(&self) {
        for listener in self.snapshot() {
            if let Listener::Update(f) = listener {
                f();
            }
        }
    }

    pub fn notify_error(&self, error: &Error) {
        for listener in self.snapshot() {
            if let Listener::Error(f) = listener {
                f(error);
            }
        }
    }

    pub fn notify_availability(&self, available: bool) {
        for listener in self.snapshot() {
            if let Listener::Availability(f) = listener {
                f(available);
            }
        }
    }
}
