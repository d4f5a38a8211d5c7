//! Tone rendered to a WAV file
//!
//! For hosts without a live audio device: every play overwrites the file
//! with the freshly rendered chirp, ready for an external player or a
//! file-watching notifier.

use super::platform::{AudioBackend, AudioContext, AudioError, ContextState, Result};
use super::tone::ToneEnvelope;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WavFileBackend {
    path: PathBuf,
    sample_rate: u32,
}

impl WavFileBackend {
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioBackend for WavFileBackend {
    fn create_context(&self) -> Result<Box<dyn AudioContext>> {
        if self.sample_rate == 0 {
            return Err(AudioError::ContextUnavailable("sample rate is zero".into()));
        }
        Ok(Box::new(self.clone()))
    }
}

impl AudioContext for WavFileBackend {
    fn state(&self) -> ContextState {
        ContextState::Running
    }

    fn resume(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self, tone: &ToneEnvelope) -> Result<()> {
        let samples = tone.render(self.sample_rate);
        write_wav(&self.path, &samples, self.sample_rate)?;
        debug!(path = %self.path.display(), samples = samples.len(), "[Audio] Tone written");
        Ok(())
    }
}

/// Write mono `[-1, 1]` samples as 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let failed = |e: hound::Error| AudioError::PlaybackFailed(e.to_string());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(failed)?;
    for sample in samples {
        let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(pcm).map_err(failed)?;
    }
    writer.finalize().map_err(failed)
}
