//! Notification tone
//!
//! A short chirp: the pitch glides exponentially from 800 Hz to 600 Hz over
//! the first 100 ms, the gain ramps linearly to 0.2 in 10 ms, then decays
//! exponentially to 0.01 at 300 ms where the tone stops.

use std::f32::consts::TAU;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ToneEnvelope {
    pub start_hz: f32,
    pub end_hz: f32,
    pub glide: Duration,
    pub peak_gain: f32,
    pub attack: Duration,
    pub floor_gain: f32,
    pub duration: Duration,
}

impl Default for ToneEnvelope {
    fn default() -> Self {
        Self {
            start_hz: 800.0,
            end_hz: 600.0,
            glide: Duration::from_millis(100),
            peak_gain: 0.2,
            attack: Duration::from_millis(10),
            floor_gain: 0.01,
            duration: Duration::from_millis(300),
        }
    }
}

impl ToneEnvelope {
    /// Instantaneous frequency at `t` seconds
    pub fn frequency_at(&self, t: f32) -> f32 {
        let glide = self.glide.as_secs_f32();
        if t <= 0.0 {
            self.start_hz
        } else if t >= glide {
            self.end_hz
        } else {
            self.start_hz * (self.end_hz / self.start_hz).powf(t / glide)
        }
    }

    /// Gain at `t` seconds; zero outside the tone
    pub fn gain_at(&self, t: f32) -> f32 {
        let attack = self.attack.as_secs_f32();
        let total = self.duration.as_secs_f32();
        if t < 0.0 || t > total {
            0.0
        } else if t < attack {
            self.peak_gain * t / attack
        } else {
            let progress = (t - attack) / (total - attack);
            self.peak_gain * (self.floor_gain / self.peak_gain).powf(progress)
        }
    }

    /// Mono PCM samples in `[-1, 1]`
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let count = (self.duration.as_secs_f32() * sample_rate as f32).round() as usize;
        let dt = 1.0 / sample_rate as f32;
        let mut phase = 0.0f32;
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let t = i as f32 * dt;
            samples.push(phase.sin() * self.gain_at(t));
            phase = (phase + TAU * self.frequency_at(t) * dt) % TAU;
        }
        samples
    }
}
