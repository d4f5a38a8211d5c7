//! Platform seams for audio output
//!
//! Browsers, desktops and terminals differ in how a tone is produced and in
//! whether a user gesture must come first. The gate only talks to these
//! traits.

use super::tone::ToneEnvelope;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Failed to resume audio context: {0}")]
    ResumeFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("System notification failed: {0}")]
    NotificationFailed(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but blocked until a user gesture resumes it
    Suspended,
    Running,
    Closed,
}

/// A synthesis context able to play a [`ToneEnvelope`]
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;
    fn resume(&self) -> Result<()>;
    fn play(&self, tone: &ToneEnvelope) -> Result<()>;
}

/// Creates synthesis contexts
pub trait AudioBackend: Send + Sync {
    fn create_context(&self) -> Result<Box<dyn AudioContext>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet
    Default,
}

/// OS or browser notifications
pub trait SystemNotifier: Send + Sync {
    fn permission(&self) -> Permission;
    fn show(&self, title: &str, tag: &str) -> Result<()>;
    /// Ask for permission without waiting for the answer
    fn request_permission(&self);
}

pub trait Vibrator: Send + Sync {
    /// Returns whether the device accepted the pattern
    fn vibrate(&self, pattern: &[Duration]) -> bool;
}

/// User gestures that may unlock audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Click,
    KeyDown,
    TouchStart,
}

impl GestureKind {
    pub const ALL: [GestureKind; 3] = [GestureKind::Click, GestureKind::KeyDown, GestureKind::TouchStart];
}

/// Installs and removes gesture listeners
///
/// The platform forwards each armed gesture to
/// [`AudioGate::handle_gesture`](super::AudioGate::handle_gesture).
pub trait GestureSource: Send + Sync {
    fn arm(&self, kind: GestureKind);
    fn disarm(&self, kind: GestureKind);
}

// =============================================================================
// Headless implementations
// =============================================================================

/// Rings the terminal bell instead of synthesizing the tone
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

struct BellContext;

impl AudioContext for BellContext {
    fn state(&self) -> ContextState {
        ContextState::Running
    }

    fn resume(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self, _tone: &ToneEnvelope) -> Result<()> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| AudioError::PlaybackFailed(e.to_string()))
    }
}

impl AudioBackend for TerminalBell {
    fn create_context(&self) -> Result<Box<dyn AudioContext>> {
        Ok(Box::new(BellContext))
    }
}

/// No audio device at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudio;

impl AudioBackend for NoAudio {
    fn create_context(&self) -> Result<Box<dyn AudioContext>> {
        Err(AudioError::ContextUnavailable("no audio device".into()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotifier;

impl SystemNotifier for NoNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn show(&self, _title: &str, _tag: &str) -> Result<()> {
        Err(AudioError::NotificationFailed("notifications unsupported".into()))
    }

    fn request_permission(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoVibration;

impl Vibrator for NoVibration {
    fn vibrate(&self, _pattern: &[Duration]) -> bool {
        false
    }
}

/// A platform without gesture events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGestures;

impl GestureSource for NoGestures {
    fn arm(&self, kind: GestureKind) {
        debug!(?kind, "No gesture events on this platform");
    }

    fn disarm(&self, _kind: GestureKind) {}
}
