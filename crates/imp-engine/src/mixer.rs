//! Software channel device: mixes the sound-effect voices into stereo.

use std::sync::Arc;

use imp_core::{Frame, SoundBuffer};

use crate::device::{ChannelDevice, VoiceParams, VoiceStatus, VOICE_COUNT};
use crate::voice::Voice;

/// Fixed bank of [`VOICE_COUNT`] voices rendering at one output rate.
pub struct Mixer {
    voices: [Voice; VOICE_COUNT],
    sample_rate: u32,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: core::array::from_fn(|_| Voice::new()),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Seconds played on a voice.
    pub fn offset(&self, index: usize) -> f32 {
        self.voices.get(index).map_or(0.0, Voice::offset)
    }

    /// Count of voices currently producing audio.
    pub fn active_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.status == VoiceStatus::Playing)
            .count()
    }

    /// Add all voices into an interleaved stereo buffer.
    pub fn mix_into(&mut self, out: &mut [f32]) {
        for pair in out.chunks_exact_mut(2) {
            let (left, right) = self.render_sum();
            pair[0] += left;
            pair[1] += right;
        }
    }

    /// Render a single stereo frame.
    pub fn render_frame(&mut self) -> Frame {
        let (left, right) = self.render_sum();
        Frame::from_f32(left, right)
    }

    fn render_sum(&mut self) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for voice in &mut self.voices {
            let (l, r) = voice.render();
            left += l;
            right += r;
        }
        (left, right)
    }
}

impl ChannelDevice for Mixer {
    fn status(&self, voice: usize) -> VoiceStatus {
        self.voices.get(voice).map_or(VoiceStatus::Stopped, |v| v.status)
    }

    fn play(&mut self, voice: usize, buffer: &Arc<SoundBuffer>, params: VoiceParams, pitch: f32) {
        let rate = self.sample_rate;
        if let Some(v) = self.voices.get_mut(voice) {
            v.start(buffer, params, pitch, rate);
        }
    }

    fn set_params(&mut self, voice: usize, params: VoiceParams) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_params(params);
        }
    }

    fn stop(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.stop();
        }
    }

    fn pause(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            if v.status == VoiceStatus::Playing {
                v.status = VoiceStatus::Paused;
            }
        }
    }

    fn resume(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            if v.status == VoiceStatus::Paused {
                v.status = VoiceStatus::Playing;
            }
        }
    }

    fn remaining(&self, voice: usize) -> f32 {
        self.voices.get(voice).map_or(0.0, Voice::remaining)
    }
}
