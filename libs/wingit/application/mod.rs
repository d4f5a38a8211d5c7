//! Application Layer
//!
//! Composes the session, presence tracking and notification sound.

pub mod presence;
pub mod provider;

pub use presence::PresenceTracker;
pub use provider::{should_play_for, SessionProvider};
