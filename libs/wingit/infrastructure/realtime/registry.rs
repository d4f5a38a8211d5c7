//! Subscription registry
//!
//! A flat, ordered list of `(id, kind, callback)` entries. Dispatch is a
//! multicast to every entry of the event's kind, in registration order.
//!
//! Dispatch runs over a snapshot taken before the first callback, and no
//! lock is held while callbacks run, so a callback may subscribe or
//! unsubscribe (itself or others) without deadlocking or causing a double
//! invocation for the event being dispatched.

use crate::domain::{Event, EventKind};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Subscriber callback
///
/// An `Err` or a panic is logged and does not stop delivery to the other
/// subscribers of the same event.
pub type Callback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Opaque subscription handle, never reused within a registry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, callback: Callback) -> SubscriptionId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = SubscriptionId(format!("sub-{}-{}", kind, n));
        self.entries.write().push(Subscription {
            id: id.clone(),
            kind,
            callback,
        });
        debug!(subscription = %id, "Subscribed");
        id
    }

    /// Remove one subscription; unknown ids are ignored
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|s| &s.id != id);
        let removed = entries.len() != before;
        if removed {
            debug!(subscription = %id, "Unsubscribed");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            debug!(count = entries.len(), "Clearing all subscriptions");
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether `id` is still registered
    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.entries.read().iter().any(|s| &s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of subscriptions registered for `kind`
    pub fn count_for(&self, kind: EventKind) -> usize {
        self.entries.read().iter().filter(|s| s.kind == kind).count()
    }

    /// Deliver `event` to every subscriber of its kind
    ///
    /// Returns how many callbacks completed without error or panic.
    pub fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Callback)> = self
            .entries
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| (s.id.clone(), Arc::clone(&s.callback)))
            .collect();

        if snapshot.is_empty() {
            debug!(%kind, "No subscribers");
            return 0;
        }

        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(subscription = %id, %kind, error = %e, "Subscriber failed");
                }
                Err(_) => {
                    warn!(subscription = %id, %kind, "Subscriber panicked");
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.len())
            .finish()
    }
}
