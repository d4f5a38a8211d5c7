//! Domain Layer
//!
//! Identifiers and the typed payloads carried by realtime frames.
//! No I/O lives here.

pub mod events;
pub mod ids;

pub use events::{
    ChatMessageEvent, Event, EventKind, MessageSender, MessageStatusEvent, NotificationEvent,
    OnlineUser, Presence, TypingEvent, UserStatusUpdate,
};
pub use ids::{MessageId, RoomId, UserId};
