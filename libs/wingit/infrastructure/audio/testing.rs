//! Recording test doubles for the audio platform

use super::platform::*;
use super::tone::ToneEnvelope;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Browser-like backend: contexts start suspended unless configured otherwise
#[derive(Default)]
pub struct RecordingBackend {
    pub contexts_created: AtomicUsize,
    pub plays: Arc<AtomicUsize>,
    pub resumes: Arc<AtomicUsize>,
    pub start_running: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_resume: Arc<AtomicBool>,
    pub fail_play: Arc<AtomicBool>,
    /// Samples of every tone played, rendered at [`RECORDING_SAMPLE_RATE`]
    pub rendered: Arc<Mutex<Vec<Vec<f32>>>>,
}

pub const RECORDING_SAMPLE_RATE: u32 = 8_000;

impl RecordingBackend {
    pub fn rendered(&self) -> Vec<Vec<f32>> {
        self.rendered.lock().clone()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> usize {
        self.contexts_created.load(Ordering::SeqCst)
    }
}

struct RecordingContext {
    running: AtomicBool,
    plays: Arc<AtomicUsize>,
    resumes: Arc<AtomicUsize>,
    fail_resume: Arc<AtomicBool>,
    fail_play: Arc<AtomicBool>,
    rendered: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl AudioContext for RecordingContext {
    fn state(&self) -> ContextState {
        if self.running.load(Ordering::SeqCst) {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&self) -> Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(AudioError::ResumeFailed("autoplay policy".into()));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn play(&self, tone: &ToneEnvelope) -> Result<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(AudioError::PlaybackFailed("oscillator failed".into()));
        }
        self.rendered.lock().push(tone.render(RECORDING_SAMPLE_RATE));
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl AudioBackend for RecordingBackend {
    fn create_context(&self) -> Result<Box<dyn AudioContext>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AudioError::ContextUnavailable("no AudioContext".into()));
        }
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingContext {
            running: AtomicBool::new(self.start_running.load(Ordering::SeqCst)),
            plays: Arc::clone(&self.plays),
            resumes: Arc::clone(&self.resumes),
            fail_resume: Arc::clone(&self.fail_resume),
            fail_play: Arc::clone(&self.fail_play),
            rendered: Arc::clone(&self.rendered),
        }))
    }
}

pub struct RecordingNotifier {
    pub permission: Mutex<Permission>,
    pub shown: AtomicUsize,
    pub requested: AtomicUsize,
}

impl RecordingNotifier {
    pub fn with(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            shown: AtomicUsize::new(0),
            requested: AtomicUsize::new(0),
        }
    }
}

impl SystemNotifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock()
    }

    fn show(&self, _title: &str, _tag: &str) -> Result<()> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn request_permission(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingVibrator {
    pub supported: AtomicBool,
    pub calls: AtomicUsize,
}

impl Vibrator for RecordingVibrator {
    fn vibrate(&self, _pattern: &[Duration]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.supported.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingGestures {
    pub armed: Mutex<Vec<GestureKind>>,
    pub arm_calls: AtomicUsize,
}

impl RecordingGestures {
    pub fn armed(&self) -> Vec<GestureKind> {
        self.armed.lock().clone()
    }
}

impl GestureSource for RecordingGestures {
    fn arm(&self, kind: GestureKind) {
        self.arm_calls.fetch_add(1, Ordering::SeqCst);
        self.armed.lock().push(kind);
    }

    fn disarm(&self, kind: GestureKind) {
        self.armed.lock().retain(|k| *k != kind);
    }
}
