//! Presence tracking
//!
//! Keeps the set of online user ids from two event streams: incremental
//! `user_status` updates and `status_response` snapshots, which replace the
//! set wholesale. Nothing else writes the set. Entries have no expiry; a
//! missed offline event is corrected by the next snapshot.

use crate::domain::{OnlineUser, UserId, UserStatusUpdate};
use crate::infrastructure::realtime::{RealtimeSession, SubscriptionId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PresenceTracker {
    session: Arc<RealtimeSession>,
    online: RwLock<HashSet<UserId>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl PresenceTracker {
    pub fn new(session: Arc<RealtimeSession>) -> Arc<Self> {
        Arc::new(Self {
            session,
            online: RwLock::new(HashSet::new()),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to presence events; no-op when already attached
    ///
    /// Subscriptions dropped by a session `disconnect` are registered again.
    pub fn attach(self: &Arc<Self>) {
        let mut subscriptions = self.subscriptions.lock();
        if self.all_registered(&subscriptions) {
            return;
        }
        for id in subscriptions.drain(..) {
            self.session.unsubscribe(&id);
        }

        let weak = Arc::downgrade(self);
        subscriptions.push(self.session.subscribe_to_user_status(move |update| {
            if let Some(tracker) = weak.upgrade() {
                tracker.apply_status(update);
            }
            Ok(())
        }));

        let weak = Arc::downgrade(self);
        subscriptions.push(self.session.subscribe_to_status_response(move |users| {
            if let Some(tracker) = weak.upgrade() {
                tracker.apply_snapshot(users);
            }
            Ok(())
        }));
    }

    pub fn detach(&self) {
        for id in self.subscriptions.lock().drain(..) {
            self.session.unsubscribe(&id);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.all_registered(&self.subscriptions.lock())
    }

    fn all_registered(&self, subscriptions: &[SubscriptionId]) -> bool {
        !subscriptions.is_empty() && subscriptions.iter().all(|id| self.session.is_subscribed(id))
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.online.read().contains(&user_id)
    }

    pub fn online_users(&self) -> HashSet<UserId> {
        self.online.read().clone()
    }

    pub fn online_count(&self) -> usize {
        self.online.read().len()
    }

    /// Ask for a fresh snapshot; does nothing while disconnected
    pub fn request_online_users(&self) {
        if self.session.is_connected() {
            debug!("[Presence] Requesting online users");
            self.session.request_online_users();
        } else {
            debug!("[Presence] Not connected, skipping online users request");
        }
    }

    fn apply_status(&self, update: &UserStatusUpdate) {
        let mut online = self.online.write();
        let changed = if update.is_online {
            online.insert(update.user_id)
        } else {
            online.remove(&update.user_id)
        };
        if changed {
            debug!(
                user_id = %update.user_id,
                online = update.is_online,
                total = online.len(),
                "[Presence] Status changed"
            );
        }
    }

    fn apply_snapshot(&self, users: &[OnlineUser]) {
        let snapshot: HashSet<UserId> = users.iter().map(|u| u.user_id).collect();
        let mut online = self.online.write();
        if *online != snapshot {
            info!(online = snapshot.len(), "[Presence] Snapshot received");
        }
        *online = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::RealtimeConfig;
    use crate::infrastructure::identity::StaticToken;
    use crate::infrastructure::realtime::decode_frame;

    fn tracker() -> (Arc<RealtimeSession>, Arc<PresenceTracker>) {
        let session = Arc::new(
            RealtimeSession::new(&RealtimeConfig::default(), Arc::new(StaticToken(None))).unwrap(),
        );
        let tracker = PresenceTracker::new(Arc::clone(&session));
        tracker.attach();
        (session, tracker)
    }

    #[test]
    fn test_incremental_updates() {
        let (session, tracker) = tracker();
        session.inject(decode_frame(r#"{"type":"userStatus","data":{"userId":7,"isOnline":true}}"#).unwrap());
        session.inject(decode_frame(r#"{"type":"user_status","data":{"userId":"8","isOnline":true}}"#).unwrap());
        assert!(tracker.is_online(UserId(7)));
        assert!(tracker.is_online(UserId(8)));

        session.inject(decode_frame(r#"{"type":"userStatus","data":{"userId":7,"isOnline":false}}"#).unwrap());
        assert!(!tracker.is_online(UserId(7)));
        assert_eq!(tracker.online_count(), 1);
    }

    #[test]
    fn test_snapshot_replaces_and_is_idempotent() {
        let (session, tracker) = tracker();
        session.inject(decode_frame(r#"{"type":"userStatus","data":{"userId":99,"isOnline":true}}"#).unwrap());

        let snapshot = r#"{"type":"status_response","data":[{"userId":1},{"id":2},{"userId":1}]}"#;
        session.inject(decode_frame(snapshot).unwrap());
        let first = tracker.online_users();
        session.inject(decode_frame(snapshot).unwrap());

        assert_eq!(tracker.online_users(), first);
        assert_eq!(first, HashSet::from([UserId(1), UserId(2)]));
        assert!(!tracker.is_online(UserId(99)));
    }

    #[test]
    fn test_attach_twice_subscribes_once() {
        let (session, tracker) = tracker();
        tracker.attach();
        assert_eq!(session.subscription_count(), 2);

        tracker.detach();
        assert!(!tracker.is_attached());
        assert_eq!(session.subscription_count(), 0);
    }

    #[test]
    fn test_attach_after_session_disconnect_resubscribes() {
        let (session, tracker) = tracker();
        session.disconnect();
        assert_eq!(session.subscription_count(), 0);
        assert!(!tracker.is_attached());

        tracker.attach();
        assert!(tracker.is_attached());
        assert_eq!(session.subscription_count(), 2);

        session.inject(decode_frame(r#"{"type":"userStatus","data":{"userId":5,"isOnline":true}}"#).unwrap());
        assert!(tracker.is_online(UserId(5)));
    }

    #[test]
    fn test_request_while_offline_is_a_no_op() {
        let (session, tracker) = tracker();
        tracker.request_online_users();
        assert_eq!(session.metrics().messages_dropped, 0);
    }
}
