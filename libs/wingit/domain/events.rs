//! Typed realtime events
//!
//! Every routed frame type has exactly one [`Event`] variant. Payload
//! structs are lenient: missing optional fields decode to `None` and
//! unrecognized fields are kept in `extra` rather than rejected.

use super::ids::{MessageId, RoomId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Routed frame types, the keys subscriptions are registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Notification,
    Message,
    UserStatus,
    PostUpdate,
    Reaction,
    Comment,
    StatusRequest,
    StatusResponse,
    Typing,
    MessageStatus,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Notification,
        EventKind::Message,
        EventKind::UserStatus,
        EventKind::PostUpdate,
        EventKind::Reaction,
        EventKind::Comment,
        EventKind::StatusRequest,
        EventKind::StatusResponse,
        EventKind::Typing,
        EventKind::MessageStatus,
    ];

    /// Registry name of this kind
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Notification => "notification",
            EventKind::Message => "message",
            EventKind::UserStatus => "user_status",
            EventKind::PostUpdate => "post_update",
            EventKind::Reaction => "reaction",
            EventKind::Comment => "comment",
            EventKind::StatusRequest => "status_request",
            EventKind::StatusResponse => "status_response",
            EventKind::Typing => "typing",
            EventKind::MessageStatus => "message_status",
        }
    }

    /// Map a wire `type` to its kind
    ///
    /// The server announces presence changes as `userStatus`; they are
    /// delivered to `user_status` subscribers.
    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "userStatus" => Some(EventKind::UserStatus),
            other => Self::ALL.into_iter().find(|k| k.as_str() == other),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence of a user as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Away,
    Busy,
    Offline,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Away => "away",
            Presence::Busy => "busy",
            Presence::Offline => "offline",
        }
    }
}

impl std::str::FromStr for Presence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" => Ok(Presence::Online),
            "away" => Ok(Presence::Away),
            "busy" => Ok(Presence::Busy),
            "offline" => Ok(Presence::Offline),
            other => Err(format!("unknown presence: {}", other)),
        }
    }
}

/// Generic notification (likes, friend requests, mentions...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Username of the originating user, when the server includes it
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Author block embedded in chat messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Chat message delivered to a room or a direct conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub sender: Option<MessageSender>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessageEvent {
    /// Author id: the top-level `senderId`, else the embedded sender's id
    pub fn author_id(&self) -> Option<UserId> {
        self.sender_id
            .or_else(|| self.sender.as_ref().and_then(|s| s.id))
    }
}

/// Incremental presence change for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusUpdate {
    pub user_id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub presence: Option<Presence>,
}

/// One entry of a `status_response` snapshot
///
/// The server keys entries by `userId`; older payloads used `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOnlineUser")]
pub struct OnlineUser {
    pub user_id: UserId,
    pub username: Option<String>,
    pub presence: Option<Presence>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOnlineUser {
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    presence: Option<Presence>,
}

impl TryFrom<RawOnlineUser> for OnlineUser {
    type Error = String;

    fn try_from(raw: RawOnlineUser) -> Result<Self, Self::Error> {
        let user_id = raw
            .user_id
            .or(raw.id)
            .ok_or_else(|| "online user entry has neither userId nor id".to_string())?;
        Ok(OnlineUser {
            user_id,
            username: raw.username,
            presence: raw.presence,
        })
    }
}

/// Typing indicator from another participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    /// Username of the typist
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Delivery/read state change for a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusEvent {
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded, routed realtime event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Notification(NotificationEvent),
    Message(ChatMessageEvent),
    UserStatus(UserStatusUpdate),
    PostUpdate(Value),
    Reaction(Value),
    Comment(Value),
    StatusRequest(Value),
    StatusResponse(Vec<OnlineUser>),
    Typing(TypingEvent),
    MessageStatus(MessageStatusEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Notification(_) => EventKind::Notification,
            Event::Message(_) => EventKind::Message,
            Event::UserStatus(_) => EventKind::UserStatus,
            Event::PostUpdate(_) => EventKind::PostUpdate,
            Event::Reaction(_) => EventKind::Reaction,
            Event::Comment(_) => EventKind::Comment,
            Event::StatusRequest(_) => EventKind::StatusRequest,
            Event::StatusResponse(_) => EventKind::StatusResponse,
            Event::Typing(_) => EventKind::Typing,
            Event::MessageStatus(_) => EventKind::MessageStatus,
        }
    }
}
