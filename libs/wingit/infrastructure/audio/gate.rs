//! Gesture-gated notification sound
//!
//! Sound is produced only when the user preference is on *and* the audio
//! context is ready. Under [`UnlockPolicy::RequireGesture`] the context
//! only becomes ready inside [`AudioGate::handle_gesture`]; the first
//! successful gesture removes all three listeners and they are never
//! re-armed.
//!
//! When synthesis fails the gate degrades: system notification (if already
//! permitted) → vibration → silence. Nothing here returns an error.

use super::platform::*;
use super::tone::ToneEnvelope;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const NOTIFICATION_TITLE: &str = "New message";
const NOTIFICATION_TAG: &str = "wingit-message";
const VIBRATION_PATTERN: [Duration; 3] = [
    Duration::from_millis(200),
    Duration::from_millis(100),
    Duration::from_millis(200),
];

/// Whether a user gesture must unlock audio first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockPolicy {
    /// Browser autoplay rules: wait for click, keydown or touchstart
    RequireGesture,
    /// Non-browser targets: ready from construction
    AlwaysUnlocked,
}

/// What a play request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Disabled,
    NotReady,
    Played,
    SystemNotification,
    Vibrated,
    Silent,
}

/// The platform pieces the gate drives
#[derive(Clone)]
pub struct AudioPlatform {
    pub backend: Arc<dyn AudioBackend>,
    pub notifier: Arc<dyn SystemNotifier>,
    pub vibrator: Arc<dyn Vibrator>,
    pub gestures: Arc<dyn GestureSource>,
}

impl AudioPlatform {
    /// Terminal bell, no notifications, no vibration, no gestures
    pub fn headless() -> Self {
        Self {
            backend: Arc::new(TerminalBell),
            notifier: Arc::new(NoNotifier),
            vibrator: Arc::new(NoVibration),
            gestures: Arc::new(NoGestures),
        }
    }

    /// Nothing audible at all
    pub fn silent() -> Self {
        Self {
            backend: Arc::new(NoAudio),
            ..Self::headless()
        }
    }
}

struct GateState {
    context: Option<Box<dyn AudioContext>>,
    ready: bool,
    enabled: bool,
    listeners_armed: bool,
    hint_shown: bool,
}

pub struct AudioGate {
    platform: AudioPlatform,
    policy: UnlockPolicy,
    tone: ToneEnvelope,
    state: Mutex<GateState>,
}

impl AudioGate {
    pub fn new(platform: AudioPlatform, policy: UnlockPolicy, enabled: bool) -> Self {
        let require_gesture = policy == UnlockPolicy::RequireGesture;
        if require_gesture {
            for kind in GestureKind::ALL {
                platform.gestures.arm(kind);
            }
            debug!("[Audio] Waiting for a user gesture to unlock sound");
        }

        Self {
            platform,
            policy,
            tone: ToneEnvelope::default(),
            state: Mutex::new(GateState {
                context: None,
                ready: !require_gesture,
                enabled,
                listeners_armed: require_gesture,
                hint_shown: false,
            }),
        }
    }

    pub fn policy(&self) -> UnlockPolicy {
        self.policy
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn is_context_created(&self) -> bool {
        self.state.lock().context.is_some()
    }

    pub fn listeners_armed(&self) -> bool {
        self.state.lock().listeners_armed
    }

    /// Forwarded from the platform's gesture listeners
    ///
    /// Returns whether this gesture unlocked audio. Ignored once the
    /// listeners have been removed.
    pub fn handle_gesture(&self, kind: GestureKind) -> bool {
        let mut state = self.state.lock();
        if !state.listeners_armed {
            return false;
        }

        match self.wake_context(&mut state) {
            Ok(ContextState::Running) => {
                state.ready = true;
                state.listeners_armed = false;
                for k in GestureKind::ALL {
                    self.platform.gestures.disarm(k);
                }
                info!(?kind, "[Audio] Sound unlocked");
                true
            }
            Ok(other) => {
                debug!(?kind, state = ?other, "[Audio] Context not running after gesture");
                false
            }
            Err(e) => {
                warn!(?kind, error = %e, "[Audio] Could not unlock sound");
                false
            }
        }
    }

    /// Set the user preference
    ///
    /// Enabling before a gesture makes a best-effort attempt to create and
    /// resume the context; strict platforms refuse and that is fine.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.enabled = enabled;
        debug!(enabled, "[Audio] Notification sound preference");

        if enabled && !state.ready {
            if let Err(e) = self.wake_context(&mut state) {
                debug!(error = %e, "[Audio] Early unlock refused, waiting for a gesture");
            }
        }
    }

    pub fn play_notification(&self) -> PlayOutcome {
        let mut state = self.state.lock();
        if !state.enabled {
            debug!("[Audio] Notification sound disabled");
            return PlayOutcome::Disabled;
        }
        if !state.ready {
            if !state.hint_shown {
                state.hint_shown = true;
                info!("[Audio] Interact with the page (click, key or touch) to enable notification sounds");
            } else {
                debug!("[Audio] Sound not unlocked yet");
            }
            return PlayOutcome::NotReady;
        }

        match self.synthesize(&mut state) {
            Ok(()) => PlayOutcome::Played,
            Err(e) => {
                warn!(error = %e, "[Audio] Tone synthesis failed, falling back");
                drop(state);
                self.fallback()
            }
        }
    }

    pub fn play_message_notification(&self) -> PlayOutcome {
        debug!("[Audio] Message notification");
        self.play_notification()
    }

    /// Play regardless of the preference, still respecting readiness
    pub fn test_notification(&self) -> PlayOutcome {
        let was_enabled = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.enabled, true)
        };
        let outcome = self.play_notification();
        self.state.lock().enabled = was_enabled;
        outcome
    }

    /// Diagnostics only: plays through a throwaway context, ignoring both
    /// the preference and the readiness gate
    pub fn debug_play_raw(&self) -> Result<()> {
        let context = self.platform.backend.create_context()?;
        if context.state() == ContextState::Suspended {
            context.resume()?;
        }
        context.play(&self.tone)
    }

    /// Create the context if needed and resume it when suspended
    fn wake_context(&self, state: &mut GateState) -> Result<ContextState> {
        if state.context.is_none() {
            state.context = Some(self.platform.backend.create_context()?);
        }
        let Some(context) = state.context.as_ref() else {
            return Err(AudioError::ContextUnavailable("context missing".into()));
        };

        match context.state() {
            ContextState::Suspended => {
                context.resume()?;
                Ok(context.state())
            }
            ContextState::Closed => {
                state.context = None;
                Err(AudioError::ContextUnavailable("context closed".into()))
            }
            ContextState::Running => Ok(ContextState::Running),
        }
    }

    fn synthesize(&self, state: &mut GateState) -> Result<()> {
        self.wake_context(state)?;
        match state.context.as_ref() {
            Some(context) => context.play(&self.tone),
            None => Err(AudioError::ContextUnavailable("context missing".into())),
        }
    }

    fn fallback(&self) -> PlayOutcome {
        let notifier = &self.platform.notifier;
        match notifier.permission() {
            Permission::Granted => match notifier.show(NOTIFICATION_TITLE, NOTIFICATION_TAG) {
                Ok(()) => return PlayOutcome::SystemNotification,
                Err(e) => warn!(error = %e, "[Audio] System notification failed"),
            },
            Permission::Default => {
                debug!("[Audio] Requesting notification permission for next time");
                notifier.request_permission();
            }
            Permission::Denied => {}
        }

        if self.platform.vibrator.vibrate(&VIBRATION_PATTERN) {
            return PlayOutcome::Vibrated;
        }

        debug!("[Audio] No notification method available");
        PlayOutcome::Silent
    }
}
