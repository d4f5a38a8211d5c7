//! Inbound frame decoding
//!
//! Every text frame is a JSON object with a `type` tag. Four control types
//! are consumed by the session itself; the routed types become an
//! [`Event`]. The payload handed to subscribers is `data` when present and
//! non-null, otherwise the whole frame.

use crate::domain::{Event, EventKind, OnlineUser};
use async_trait::async_trait;
use livesockets::{MessageRouter, SocketError, WsMessage};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("{kind} payload does not match: {source}")]
    Payload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("binary frames are not part of the protocol")]
    Binary,
}

impl From<FrameError> for SocketError {
    fn from(e: FrameError) -> Self {
        SocketError::ParseError(e.to_string())
    }
}

/// Control frames handled by the session, never forwarded to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFrame {
    /// Answer to `authenticate`; `detail` carries the server's message
    Auth {
        success: bool,
        detail: Option<String>,
    },
    Connection(Value),
    Error(Value),
    Pong,
}

/// Result of decoding one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event(Event),
    Control(ControlFrame),
    /// A well-formed frame with a type outside the protocol
    Unknown(String),
}

/// Decode one text frame
pub fn decode_frame(text: &str) -> Result<Inbound, FrameError> {
    let frame: Value = serde_json::from_str(text)?;
    let kind = frame
        .get("type")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingType)?;

    let control = match kind {
        "auth" => Some(ControlFrame::Auth {
            success: frame.get("status").and_then(Value::as_str) == Some("success"),
            detail: text_field(&frame, "data").or_else(|| text_field(&frame, "message")),
        }),
        "connection" => Some(ControlFrame::Connection(payload_of(&frame).clone())),
        "error" => Some(ControlFrame::Error(payload_of(&frame).clone())),
        "pong" => Some(ControlFrame::Pong),
        _ => None,
    };
    if let Some(control) = control {
        return Ok(Inbound::Control(control));
    }

    let Some(kind) = EventKind::from_wire(kind) else {
        return Ok(Inbound::Unknown(kind.to_string()));
    };
    decode_event(kind, payload_of(&frame)).map(Inbound::Event)
}

fn decode_event(kind: EventKind, payload: &Value) -> Result<Event, FrameError> {
    let event = match kind {
        EventKind::Notification => Event::Notification(typed(kind, payload)?),
        EventKind::Message => Event::Message(typed(kind, payload)?),
        EventKind::UserStatus => Event::UserStatus(typed(kind, payload)?),
        EventKind::PostUpdate => Event::PostUpdate(payload.clone()),
        EventKind::Reaction => Event::Reaction(payload.clone()),
        EventKind::Comment => Event::Comment(payload.clone()),
        EventKind::StatusRequest => Event::StatusRequest(payload.clone()),
        EventKind::StatusResponse => Event::StatusResponse(online_users(payload)),
        EventKind::Typing => Event::Typing(typed(kind, payload)?),
        EventKind::MessageStatus => Event::MessageStatus(typed(kind, payload)?),
    };
    Ok(event)
}

fn payload_of(frame: &Value) -> &Value {
    match frame.get("data") {
        Some(data) if !data.is_null() => data,
        _ => frame,
    }
}

fn typed<T: DeserializeOwned>(kind: EventKind, payload: &Value) -> Result<T, FrameError> {
    T::deserialize(payload).map_err(|source| FrameError::Payload { kind, source })
}

fn text_field(frame: &Value, key: &str) -> Option<String> {
    frame.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Snapshot entries that cannot be read are skipped, not fatal
fn online_users(payload: &Value) -> Vec<OnlineUser> {
    let Some(entries) = payload.as_array() else {
        debug!("status_response payload is not a list, treating as empty");
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match OnlineUser::deserialize(entry) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable online user entry");
                None
            }
        })
        .collect()
}

// =============================================================================
// Router - Parses WebSocket messages
// =============================================================================

/// Router for the realtime protocol
#[derive(Debug, Default)]
pub struct FrameRouter;

impl FrameRouter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageRouter for FrameRouter {
    type Message = Inbound;

    async fn parse(&self, message: WsMessage) -> livesockets::Result<Self::Message> {
        let text = message.as_text().ok_or(FrameError::Binary)?;
        Ok(decode_frame(text)?)
    }
}
