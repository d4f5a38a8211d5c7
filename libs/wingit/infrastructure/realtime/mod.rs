//! Realtime connection: frame codec, subscriptions and the session

pub mod frame;
pub mod outbound;
pub mod registry;
pub mod session;

pub use frame::{decode_frame, ControlFrame, FrameError, FrameRouter, Inbound};
pub use outbound::{OutboundFrame, RoomAction};
pub use registry::{Callback, SubscriptionId, SubscriptionRegistry};
pub use session::{ConnectionObserver, ObserverId, RealtimeError, RealtimeSession};
