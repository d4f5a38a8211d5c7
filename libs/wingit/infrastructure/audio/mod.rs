//! Notification sound: gesture gate, tone and platform seams

pub mod gate;
pub mod platform;
pub mod tone;
pub mod wav;

#[cfg(test)]
pub(crate) mod testing;

pub use gate::{AudioGate, AudioPlatform, PlayOutcome, UnlockPolicy};
pub use platform::{
    AudioBackend, AudioContext, AudioError, ContextState, GestureKind, GestureSource, NoAudio,
    NoGestures, NoNotifier, NoVibration, Permission, SystemNotifier, TerminalBell, Vibrator,
};
pub use tone::ToneEnvelope;
pub use wav::WavFileBackend;
