//! Realtime session
//!
//! One logical connection to the realtime endpoint plus the subscription
//! registry it dispatches into. The session authenticates on every open,
//! handles the control frames itself and fans routed events out to
//! subscribers in the order they arrive.

use super::frame::{ControlFrame, FrameRouter, Inbound};
use super::outbound::{OutboundFrame, RoomAction};
use super::registry::{Callback, SubscriptionId, SubscriptionRegistry};
use crate::domain::*;
use crate::infrastructure::config::RealtimeConfig;
use crate::infrastructure::identity::TokenSource;
use async_trait::async_trait;
use livesockets::*;
use parking_lot::RwLock;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Transport error: {0}")]
    Transport(#[from] SocketError),
}

pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Called with `true` on every open and `false` on every close
pub type ConnectionObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle for removing a connection observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// State shared between the session handle and the connection task
#[derive(Default)]
struct SessionShared {
    registry: SubscriptionRegistry,
    authenticated: AtomicBool,
    observers: RwLock<Vec<(ObserverId, ConnectionObserver)>>,
    next_observer: AtomicU64,
}

impl SessionShared {
    fn on_control(&self, control: ControlFrame) {
        match control {
            ControlFrame::Auth { success: true, detail } => {
                self.authenticated.store(true, Ordering::Release);
                info!(detail = detail.as_deref().unwrap_or(""), "[Realtime] Authenticated");
            }
            ControlFrame::Auth { success: false, detail } => {
                self.authenticated.store(false, Ordering::Release);
                warn!(
                    detail = detail.as_deref().unwrap_or(""),
                    "[Realtime] Authentication failed, staying connected"
                );
            }
            ControlFrame::Connection(payload) => {
                debug!(%payload, "[Realtime] Connection acknowledged");
            }
            ControlFrame::Error(payload) => {
                warn!(%payload, "[Realtime] Server reported an error");
            }
            ControlFrame::Pong => debug!("[Realtime] Pong"),
        }
    }

    fn notify_observers(&self, connected: bool) {
        let observers: Vec<ConnectionObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(connected))).is_err() {
                warn!("[Realtime] Connection observer panicked");
            }
        }
    }
}

// =============================================================================
// Handler - Routes decoded frames
// =============================================================================

struct SessionHandler {
    shared: Arc<SessionShared>,
}

impl MessageHandler<Inbound> for SessionHandler {
    fn handle(&self, message: Inbound) -> livesockets::Result<()> {
        match message {
            Inbound::Control(control) => self.shared.on_control(control),
            Inbound::Event(event) => {
                let delivered = self.shared.registry.dispatch(&event);
                debug!(kind = %event.kind(), delivered, "[Realtime] Dispatched");
            }
            Inbound::Unknown(kind) => {
                debug!(%kind, "[Realtime] Ignoring unknown frame type");
            }
        }
        Ok(())
    }

    fn on_connection_change(&self, connected: bool) {
        self.shared.authenticated.store(false, Ordering::Release);
        if connected {
            info!("[Realtime] Connected");
        } else {
            info!("[Realtime] Disconnected");
        }
        self.shared.notify_observers(connected);
    }
}

// =============================================================================
// Auth - Sends the stored token on every open
// =============================================================================

struct TokenAuth {
    tokens: Arc<dyn TokenSource>,
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn auth_message(&self) -> livesockets::Result<Option<WsMessage>> {
        Ok(self
            .tokens
            .token()
            .map(|token| OutboundFrame::Authenticate { token }.to_ws_message()))
    }
}

// =============================================================================
// Session
// =============================================================================

pub struct RealtimeSession {
    client: WebSocketClient<FrameRouter>,
    shared: Arc<SessionShared>,
}

impl RealtimeSession {
    pub fn new(config: &RealtimeConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let shared = Arc::new(SessionShared::default());
        let handler: Arc<dyn MessageHandler<Inbound>> = Arc::new(SessionHandler {
            shared: Arc::clone(&shared),
        });

        let client = livesockets::builder()
            .url(config.ws_url.clone())
            .router(FrameRouter::new(), handler)
            .auth(TokenAuth { tokens })
            .reconnect_strategy(FixedDelay::new(
                config.reconnect_interval(),
                Some(config.max_reconnect_attempts),
            ))
            .build()?;

        Ok(Self { client, shared })
    }

    /// Open the connection
    ///
    /// Resolves once the socket is open, not when authentication is answered.
    /// Succeeds immediately when already open.
    pub async fn connect(&self) -> Result<()> {
        info!(url = %self.client.url(), "[Realtime] Connecting");
        self.client.connect().await.map_err(|e| {
            warn!(error = %e, "[Realtime] Connect failed");
            RealtimeError::Transport(e)
        })
    }

    /// Close the connection and drop every subscription
    pub fn disconnect(&self) {
        self.client.disconnect();
        self.shared.registry.clear();
        self.shared.authenticated.store(false, Ordering::Release);
    }

    /// Write a frame if the socket is open; otherwise log and drop it
    ///
    /// Returns whether the frame was handed to the socket.
    pub fn send(&self, frame: &OutboundFrame) -> bool {
        match self.client.send(frame.to_ws_message()) {
            Ok(()) => true,
            Err(e) => {
                warn!(frame = frame.kind(), error = %e, "[Realtime] Dropping frame");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Whether the server accepted the auth frame on the current connection
    pub fn is_authenticated(&self) -> bool {
        self.shared.authenticated.load(Ordering::Acquire)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.connection_state()
    }

    pub fn metrics(&self) -> Metrics {
        self.client.metrics()
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.registry.len()
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    pub fn subscribe(&self, kind: EventKind, callback: Callback) -> SubscriptionId {
        self.shared.registry.subscribe(kind, callback)
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) {
        self.shared.registry.unsubscribe(id);
    }

    /// False once the subscription was removed, including by `disconnect`
    pub fn is_subscribed(&self, id: &SubscriptionId) -> bool {
        self.shared.registry.contains(id)
    }

    pub fn subscribe_to_notifications<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&NotificationEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::Notification,
            Arc::new(move |event| match event {
                Event::Notification(n) => f(n),
                _ => Ok(()),
            }),
        )
    }

    pub fn subscribe_to_messages<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&ChatMessageEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::Message,
            Arc::new(move |event| match event {
                Event::Message(m) => f(m),
                _ => Ok(()),
            }),
        )
    }

    pub fn subscribe_to_user_status<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&UserStatusUpdate) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::UserStatus,
            Arc::new(move |event| match event {
                Event::UserStatus(u) => f(u),
                _ => Ok(()),
            }),
        )
    }

    pub fn subscribe_to_status_response<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&[OnlineUser]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::StatusResponse,
            Arc::new(move |event| match event {
                Event::StatusResponse(users) => f(users),
                _ => Ok(()),
            }),
        )
    }

    pub fn subscribe_to_typing<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&TypingEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::Typing,
            Arc::new(move |event| match event {
                Event::Typing(t) => f(t),
                _ => Ok(()),
            }),
        )
    }

    pub fn subscribe_to_message_status<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&MessageStatusEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            EventKind::MessageStatus,
            Arc::new(move |event| match event {
                Event::MessageStatus(s) => f(s),
                _ => Ok(()),
            }),
        )
    }

    pub fn subscribe_to_post_updates<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_raw(EventKind::PostUpdate, f)
    }

    pub fn subscribe_to_reactions<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_raw(EventKind::Reaction, f)
    }

    pub fn subscribe_to_comments<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_raw(EventKind::Comment, f)
    }

    /// Kinds whose payload is passed through untyped
    fn subscribe_raw<F>(&self, kind: EventKind, f: F) -> SubscriptionId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            kind,
            Arc::new(move |event| match event {
                Event::PostUpdate(v)
                | Event::Reaction(v)
                | Event::Comment(v)
                | Event::StatusRequest(v) => f(v),
                _ => Ok(()),
            }),
        )
    }

    /// Observe every open (`true`) and close (`false`)
    ///
    /// Observers survive [`disconnect`](Self::disconnect); remove them with
    /// [`remove_connection_observer`](Self::remove_connection_observer).
    pub fn on_connection_change<F>(&self, f: F) -> ObserverId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = ObserverId(self.shared.next_observer.fetch_add(1, Ordering::Relaxed));
        self.shared.observers.write().push((id, Arc::new(f)));
        id
    }

    pub fn remove_connection_observer(&self, id: ObserverId) {
        self.shared.observers.write().retain(|(oid, _)| *oid != id);
    }

    // -------------------------------------------------------------------------
    // Convenience senders
    // -------------------------------------------------------------------------

    pub fn send_typing_indicator(&self, room_id: RoomId, is_typing: bool, recipient: Option<String>) {
        self.send(&OutboundFrame::Typing {
            room_id,
            is_typing,
            recipient,
        });
    }

    pub fn send_chat_message(&self, room_id: RoomId, content: impl Into<String>, recipient: Option<String>) {
        self.send(&OutboundFrame::ChatMessage {
            room_id,
            content: content.into(),
            recipient,
        });
    }

    pub fn send_notification(
        &self,
        notification_type: impl Into<String>,
        content: impl Into<String>,
        target_user: Option<String>,
    ) {
        self.send(&OutboundFrame::Notification {
            notification_type: notification_type.into(),
            content: content.into(),
            target_user,
        });
    }

    /// Ask the server for the presence snapshot
    pub fn request_online_users(&self) {
        self.send(&OutboundFrame::StatusRequest);
    }

    pub fn send_message_read_receipt(&self, message_id: MessageId, room_id: RoomId) {
        self.send(&OutboundFrame::room(RoomAction::MessageRead, room_id, Some(message_id)));
    }

    pub fn send_message_delivered(&self, message_id: MessageId, room_id: RoomId) {
        self.send(&OutboundFrame::room(
            RoomAction::MessageDelivered,
            room_id,
            Some(message_id),
        ));
    }

    pub fn join_room(&self, room_id: RoomId) {
        self.send(&OutboundFrame::room(RoomAction::JoinRoom, room_id, None));
    }

    pub fn leave_room(&self, room_id: RoomId) {
        self.send(&OutboundFrame::room(RoomAction::LeaveRoom, room_id, None));
    }

    pub fn update_presence(&self, status: Presence) {
        self.send(&OutboundFrame::presence_update(status));
    }

    /// Feed a decoded frame through the handler as if it had been read from
    /// the socket
    #[cfg(test)]
    pub(crate) fn inject(&self, inbound: Inbound) {
        let handler = SessionHandler {
            shared: Arc::clone(&self.shared),
        };
        let _ = handler.handle(inbound);
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}
