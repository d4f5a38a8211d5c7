//! Application-wide session provider
//!
//! Composition root: owns the realtime session, the presence tracker and
//! the audio gate for the lifetime of the app, and wires them together on
//! [`SessionProvider::mount`].

use super::presence::PresenceTracker;
use crate::domain::UserId;
use crate::infrastructure::audio::{AudioGate, PlayOutcome};
use crate::infrastructure::config::RealtimeConfig;
use crate::infrastructure::identity::{IdentitySource, TokenSource};
use crate::infrastructure::realtime::session::{ObserverId, RealtimeError, RealtimeSession};
use crate::infrastructure::realtime::SubscriptionId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Play only for messages whose author is known and is not the current user
pub fn should_play_for(current_user: Option<UserId>, author: Option<UserId>) -> bool {
    matches!((current_user, author), (Some(me), Some(author)) if me != author)
}

struct Wiring {
    message_subscription: SubscriptionId,
    observer: ObserverId,
}

/// Resolves the current user id at most once at a time
struct IdentityResolver {
    identity: Arc<dyn IdentitySource>,
    current_user: Arc<RwLock<Option<UserId>>>,
    in_flight: tokio::sync::Mutex<()>,
}

impl IdentityResolver {
    /// Look the current user up unless it is already known
    ///
    /// Failure only disables self-filtering of message sounds.
    async fn resolve(&self) {
        let _guard = self.in_flight.lock().await;
        if self.current_user.read().is_some() {
            return;
        }
        match self.identity.current_user().await {
            Ok(identity) => {
                info!(user_id = %identity.id, "[Provider] Current user resolved");
                *self.current_user.write() = Some(identity.id);
            }
            Err(e) => {
                warn!(error = %e, "[Provider] Could not resolve current user, message sounds play for nobody");
            }
        }
    }
}

pub struct SessionProvider {
    session: Arc<RealtimeSession>,
    presence: Arc<PresenceTracker>,
    audio: Arc<AudioGate>,
    resolver: Arc<IdentityResolver>,
    presence_request_delay: Duration,
    wiring: Mutex<Option<Wiring>>,
}

impl SessionProvider {
    pub fn new(
        config: &RealtimeConfig,
        tokens: Arc<dyn TokenSource>,
        identity: Arc<dyn IdentitySource>,
        audio: AudioGate,
    ) -> Result<Self, RealtimeError> {
        let session = Arc::new(RealtimeSession::new(config, tokens)?);
        let presence = PresenceTracker::new(Arc::clone(&session));

        Ok(Self {
            session,
            presence,
            audio: Arc::new(audio),
            resolver: Arc::new(IdentityResolver {
                identity,
                current_user: Arc::new(RwLock::new(None)),
                in_flight: tokio::sync::Mutex::new(()),
            }),
            presence_request_delay: config.presence_request_delay(),
            wiring: Mutex::new(None),
        })
    }

    /// Wire subscriptions, connect and resolve the current user
    ///
    /// A failed connect is returned while the session keeps retrying in the
    /// background; the current user is then resolved on the first open.
    pub async fn mount(&self) -> Result<(), RealtimeError> {
        self.wire();

        self.session.connect().await?;
        self.resolver.resolve().await;
        Ok(())
    }

    /// Disconnect (dropping every subscription) and unwire
    pub fn unmount(&self) {
        if let Some(wiring) = self.wiring.lock().take() {
            self.session.remove_connection_observer(wiring.observer);
            self.session.unsubscribe(&wiring.message_subscription);
        }
        self.presence.detach();
        self.session.disconnect();
        debug!("[Provider] Unmounted");
    }

    /// Idempotent; subscriptions removed by a session `disconnect` are
    /// registered again
    fn wire(&self) {
        self.presence.attach();

        let mut wiring = self.wiring.lock();
        if let Some(current) = wiring.as_ref() {
            if self.session.is_subscribed(&current.message_subscription) {
                return;
            }
        }
        if let Some(stale) = wiring.take() {
            self.session.remove_connection_observer(stale.observer);
        }

        let current_user = Arc::clone(&self.resolver.current_user);
        let audio = Arc::clone(&self.audio);
        let message_subscription = self.session.subscribe_to_messages(move |message| {
            let me = *current_user.read();
            if should_play_for(me, message.author_id()) {
                let outcome = audio.play_message_notification();
                debug!(?outcome, "[Provider] Message sound");
            }
            Ok(())
        });

        let session = Arc::downgrade(&self.session);
        let resolver = Arc::clone(&self.resolver);
        let delay = self.presence_request_delay;
        let observer = self.session.on_connection_change(move |connected| {
            if !connected {
                return;
            }

            if resolver.current_user.read().is_none() {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.resolve().await });
            }

            let session = session.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(session) = session.upgrade() {
                    if session.is_connected() {
                        debug!("[Provider] Requesting presence snapshot");
                        session.request_online_users();
                    }
                }
            });
        });

        *wiring = Some(Wiring {
            message_subscription,
            observer,
        });
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn online_users(&self) -> HashSet<UserId> {
        self.presence.online_users()
    }

    pub fn request_online_users(&self) {
        self.presence.request_online_users();
    }

    pub fn set_current_user_id(&self, user_id: Option<UserId>) {
        *self.resolver.current_user.write() = user_id;
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        *self.resolver.current_user.read()
    }

    pub fn update_notification_settings(&self, enabled: bool) {
        self.audio.set_enabled(enabled);
    }

    pub fn test_notification(&self) -> PlayOutcome {
        self.audio.test_notification()
    }

    pub fn session(&self) -> &Arc<RealtimeSession> {
        &self.session
    }

    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    pub fn audio(&self) -> &Arc<AudioGate> {
        &self.audio
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.unmount();
    }
}
