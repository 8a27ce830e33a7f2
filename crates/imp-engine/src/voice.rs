//! Voice: resampling playback of one sound buffer.

use std::sync::Arc;

use imp_core::{spatial, SoundBuffer};

use crate::device::{VoiceParams, VoiceStatus};

/// A single voice producing audio from a sound buffer.
#[derive(Clone, Debug, Default)]
pub struct Voice {
    /// Buffer being played, if any.
    pub buffer: Option<Arc<SoundBuffer>>,
    /// Current position in the buffer (16.16 fixed-point).
    pub position: u64,
    /// Playback increment (16.16 fixed-point).
    pub increment: u32,
    pub status: VoiceStatus,
    /// Volume, 0..=100.
    pub volume: f32,
    /// Stereo balance, -1 (left) to +1 (right).
    pub balance: f32,
}

impl Voice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `buffer` and start from the top.
    pub fn start(&mut self, buffer: &Arc<SoundBuffer>, params: VoiceParams, pitch: f32, output_rate: u32) {
        self.increment = pitch_to_increment(buffer.sample_rate, pitch, output_rate);
        self.buffer = Some(Arc::clone(buffer));
        self.position = 0;
        self.status = VoiceStatus::Playing;
        self.set_params(params);
    }

    pub fn set_params(&mut self, params: VoiceParams) {
        self.volume = params.volume.clamp(0.0, 100.0);
        self.balance = params.pan.map(spatial::balance).unwrap_or(0.0);
    }

    /// Stop and release the buffer.
    pub fn stop(&mut self) {
        self.status = VoiceStatus::Stopped;
        self.buffer = None;
        self.position = 0;
    }

    /// Seconds played so far.
    pub fn offset(&self) -> f32 {
        match &self.buffer {
            Some(buffer) if buffer.sample_rate > 0 => {
                (self.position >> 16) as f32 / buffer.sample_rate as f32
            }
            _ => 0.0,
        }
    }

    /// Seconds left in the buffer.
    pub fn remaining(&self) -> f32 {
        match &self.buffer {
            Some(buffer) => (buffer.duration() - self.offset()).max(0.0),
            None => 0.0,
        }
    }

    /// Render one frame, returning (left, right) in f32.
    pub fn render(&mut self) -> (f32, f32) {
        if self.status != VoiceStatus::Playing {
            return (0.0, 0.0);
        }
        let Some(buffer) = self.buffer.as_ref() else {
            self.status = VoiceStatus::Stopped;
            return (0.0, 0.0);
        };

        let index = (self.position >> 16) as usize;
        if index >= buffer.samples.len() {
            self.stop();
            return (0.0, 0.0);
        }

        let value = interpolate(&buffer.samples, index, (self.position & 0xFFFF) as u32);
        let (left, right) = apply_volume_and_balance(value, self.volume, self.balance);

        self.position += self.increment as u64;
        if (self.position >> 16) as usize >= buffer.samples.len() {
            self.stop();
        }
        (left, right)
    }
}

/// Compute the 16.16 step for playing `sample_rate` audio at `pitch` on an `output_rate` stream.
pub fn pitch_to_increment(sample_rate: u32, pitch: f32, output_rate: u32) -> u32 {
    if output_rate == 0 {
        return 0;
    }
    let ratio = sample_rate as f64 * pitch.max(0.0) as f64 / output_rate as f64;
    (ratio * 65536.0) as u32
}

/// Linear interpolation between `index` and the next sample.
fn interpolate(samples: &[i16], index: usize, frac: u32) -> f32 {
    let a = samples[index] as f32;
    let b = samples.get(index + 1).copied().map_or(a, |s| s as f32);
    let t = frac as f32 / 65536.0;
    (a + (b - a) * t) / 32768.0
}

fn apply_volume_and_balance(value: f32, volume: f32, balance: f32) -> (f32, f32) {
    let gain = value * volume / 100.0;
    let left = gain * (1.0 - balance).min(1.0);
    let right = gain * (1.0 + balance).min(1.0);
    (left, right)
}
