//! Wingit realtime client
//!
//! One persistent socket carrying notifications, chat, typing, presence and
//! reaction/comment events, with bounded reconnection, post-connect
//! authentication, typed publish/subscribe fan-out, presence tracking and
//! gesture-gated notification sound.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used items
pub use application::{PresenceTracker, SessionProvider};
pub use domain::{Event, EventKind, MessageId, Presence, RoomId, UserId};
pub use infrastructure::{
    init_tracing, AudioGate, AudioPlatform, ConfigError, HttpIdentity, KeyValueStore,
    OutboundFrame, PlayOutcome, RealtimeConfig, RealtimeError, RealtimeSession, StaticIdentity,
    StaticToken, SubscriptionId, TokenSource, UnlockPolicy,
};
