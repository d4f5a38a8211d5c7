//! Lock-free connection state and counters
//!
//! ```text
//!  Idle ──connect──> Connecting ──open──> Open ──drop──> Reconnecting ──open──> Open
//!                        │                  │                 │
//!                        └──fail──> Reconnecting         budget spent
//!                                           │                 ▼
//!                                           └────────────> GaveUp
//!  Open ──disconnect──> Closing ──> Closed
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Never connected
    Idle = 0,
    /// First dial in flight
    Connecting = 1,
    /// Socket open
    Open = 2,
    /// Waiting on the backoff timer or dialing a retry
    Reconnecting = 3,
    /// Explicit close in progress
    Closing = 4,
    /// Explicitly closed
    Closed = 5,
    /// Reconnect budget spent, waiting for a manual connect
    GaveUp = 6,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::Closing,
            5 => ConnectionState::Closed,
            _ => ConnectionState::GaveUp,
        }
    }

    /// States from which a fresh `connect` may start a connection task
    pub fn accepts_connect(self) -> bool {
        matches!(
            self,
            ConnectionState::Idle | ConnectionState::Closed | ConnectionState::GaveUp
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::GaveUp => "gave-up",
        };
        f.write_str(name)
    }
}

/// Atomic wrapper around [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Move to `to` only if the current state satisfies `allowed`.
    ///
    /// Returns the previous state on success, the observed state on refusal.
    pub fn transition_if(
        &self,
        allowed: impl Fn(ConnectionState) -> bool,
        to: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        let mut current = self.inner.load(Ordering::Acquire);
        loop {
            let state = ConnectionState::from_u8(current);
            if !allowed(state) {
                return Err(state);
            }
            match self.inner.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(state),
                Err(observed) => current = observed,
            }
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Open
    }

    /// Dialing, either the first time or as a retry
    #[inline]
    pub fn is_connecting(&self) -> bool {
        matches!(
            self.get(),
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    #[inline]
    pub fn is_closing(&self) -> bool {
        matches!(self.get(), ConnectionState::Closing | ConnectionState::Closed)
    }

    #[inline]
    pub fn has_given_up(&self) -> bool {
        self.get() == ConnectionState::GaveUp
    }
}

/// Counters shared between the client handle and its connection task
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    messages_dropped: AtomicU64,
    reconnect_attempts: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }
}
