//! Outbound frame shapes
//!
//! Chat and typing frames carry `roomId` as a string; receipts and room
//! actions carry numeric ids inside `data` plus an ISO-8601 timestamp.

use crate::domain::{MessageId, Presence, RoomId};
use chrono::{DateTime, SecondsFormat, Utc};
use livesockets::WsMessage;
use serde_json::{json, Map, Value};

/// Room-scoped actions sent as `message` frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    JoinRoom,
    LeaveRoom,
    MessageRead,
    MessageDelivered,
}

impl RoomAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomAction::JoinRoom => "join_room",
            RoomAction::LeaveRoom => "leave_room",
            RoomAction::MessageRead => "message_read",
            RoomAction::MessageDelivered => "message_delivered",
        }
    }
}

/// A frame the client can send
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Authenticate {
        token: String,
    },
    ChatMessage {
        room_id: RoomId,
        content: String,
        recipient: Option<String>,
    },
    Typing {
        room_id: RoomId,
        is_typing: bool,
        recipient: Option<String>,
    },
    Notification {
        notification_type: String,
        content: String,
        target_user: Option<String>,
    },
    StatusRequest,
    PresenceUpdate {
        status: Presence,
        timestamp: DateTime<Utc>,
    },
    Room {
        action: RoomAction,
        room_id: RoomId,
        message_id: Option<MessageId>,
        timestamp: DateTime<Utc>,
    },
}

impl OutboundFrame {
    pub fn presence_update(status: Presence) -> Self {
        OutboundFrame::PresenceUpdate {
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn room(action: RoomAction, room_id: RoomId, message_id: Option<MessageId>) -> Self {
        OutboundFrame::Room {
            action,
            room_id,
            message_id,
            timestamp: Utc::now(),
        }
    }

    /// Wire `type` of this frame
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundFrame::Authenticate { .. } => "authenticate",
            OutboundFrame::ChatMessage { .. } | OutboundFrame::Room { .. } => "message",
            OutboundFrame::Typing { .. } => "typing",
            OutboundFrame::Notification { .. } => "notification",
            OutboundFrame::StatusRequest => "status_request",
            OutboundFrame::PresenceUpdate { .. } => "user_status",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            OutboundFrame::Authenticate { token } => json!({
                "type": "authenticate",
                "token": token,
            }),
            OutboundFrame::ChatMessage {
                room_id,
                content,
                recipient,
            } => with_optional(
                json!({
                    "type": "message",
                    "content": content,
                    "roomId": room_id.to_string(),
                }),
                "recipient",
                recipient,
            ),
            OutboundFrame::Typing {
                room_id,
                is_typing,
                recipient,
            } => with_optional(
                json!({
                    "type": "typing",
                    "isTyping": is_typing,
                    "roomId": room_id.to_string(),
                }),
                "recipient",
                recipient,
            ),
            OutboundFrame::Notification {
                notification_type,
                content,
                target_user,
            } => with_optional(
                json!({
                    "type": "notification",
                    "notificationType": notification_type,
                    "content": content,
                }),
                "targetUser",
                target_user,
            ),
            OutboundFrame::StatusRequest => json!({ "type": "status_request" }),
            OutboundFrame::PresenceUpdate { status, timestamp } => json!({
                "type": "user_status",
                "data": {
                    "action": "presence_update",
                    "status": status.as_str(),
                },
                "timestamp": iso8601(timestamp),
            }),
            OutboundFrame::Room {
                action,
                room_id,
                message_id,
                timestamp,
            } => {
                let mut data = Map::new();
                data.insert("action".into(), json!(action.as_str()));
                if let Some(message_id) = message_id {
                    data.insert("messageId".into(), json!(message_id));
                }
                data.insert("roomId".into(), json!(room_id));
                json!({
                    "type": "message",
                    "data": data,
                    "timestamp": iso8601(timestamp),
                })
            }
        }
    }

    pub fn to_ws_message(&self) -> WsMessage {
        WsMessage::Text(self.to_json().to_string())
    }
}

fn with_optional(mut frame: Value, key: &str, value: &Option<String>) -> Value {
    if let (Some(value), Some(obj)) = (value, frame.as_object_mut()) {
        obj.insert(key.to_string(), json!(value));
    }
    frame
}

/// Millisecond precision with a `Z` suffix
fn iso8601(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_chat_message_room_id_is_a_string() {
        let frame = OutboundFrame::ChatMessage {
            room_id: RoomId(12),
            content: "hello".into(),
            recipient: None,
        };
        assert_eq!(
            frame.to_json(),
            json!({"type": "message", "content": "hello", "roomId": "12"})
        );
    }

    #[test]
    fn test_typing_with_recipient() {
        let frame = OutboundFrame::Typing {
            room_id: RoomId(3),
            is_typing: true,
            recipient: Some("bob".into()),
        };
        assert_eq!(
            frame.to_json(),
            json!({"type": "typing", "isTyping": true, "roomId": "3", "recipient": "bob"})
        );
    }

    #[test]
    fn test_notification_shape() {
        let frame = OutboundFrame::Notification {
            notification_type: "like".into(),
            content: "liked your post".into(),
            target_user: Some("ana".into()),
        };
        assert_eq!(
            frame.to_json(),
            json!({
                "type": "notification",
                "notificationType": "like",
                "content": "liked your post",
                "targetUser": "ana"
            })
        );
    }

    #[test]
    fn test_presence_update_shape() {
        let frame = OutboundFrame::PresenceUpdate {
            status: Presence::Away,
            timestamp: fixed_time(),
        };
        assert_eq!(
            frame.to_json(),
            json!({
                "type": "user_status",
                "data": {"action": "presence_update", "status": "away"},
                "timestamp": "2024-05-01T12:30:00.000Z"
            })
        );
    }

    #[test]
    fn test_read_receipt_uses_numeric_ids() {
        let frame = OutboundFrame::Room {
            action: RoomAction::MessageRead,
            room_id: RoomId(4),
            message_id: Some(MessageId(99)),
            timestamp: fixed_time(),
        };
        assert_eq!(
            frame.to_json(),
            json!({
                "type": "message",
                "data": {"action": "message_read", "messageId": 99, "roomId": 4},
                "timestamp": "2024-05-01T12:30:00.000Z"
            })
        );
    }

    #[test]
    fn test_join_room_has_no_message_id() {
        let json = OutboundFrame::room(RoomAction::JoinRoom, RoomId(4), None).to_json();
        assert_eq!(json["data"], json!({"action": "join_room", "roomId": 4}));
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_status_request() {
        assert_eq!(
            OutboundFrame::StatusRequest.to_ws_message(),
            WsMessage::Text(r#"{"type":"status_request"}"#.into())
        );
    }
}
