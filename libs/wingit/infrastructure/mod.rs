//! Infrastructure Layer
//!
//! Socket session, audio platform, configuration, logging and the
//! token/identity collaborators. Depends on the domain layer but not on the
//! application layer.

pub mod audio;
pub mod config;
pub mod identity;
pub mod logging;
pub mod realtime;

pub use audio::{AudioGate, AudioPlatform, PlayOutcome, UnlockPolicy};
pub use config::{ConfigError, RealtimeConfig};
pub use identity::{
    HttpIdentity, Identity, IdentityError, IdentitySource, KeyValueStore, StaticIdentity,
    StaticToken, TokenSource, AUTH_TOKEN_KEY,
};
pub use logging::init_tracing;
pub use realtime::{OutboundFrame, RealtimeError, RealtimeSession, SubscriptionId};
