//! Sound effect buffers.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Effects that always play at their recorded pitch.
pub const FIXED_PITCH_SFX: [&str; 3] = ["itemup", "tink", "radio"];

/// How an effect is heard relative to the listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SfxKind {
    /// Ambient; constant volume, never panned.
    #[default]
    Diffuse,
    /// Attenuated and panned by distance and angle.
    Positional,
    /// Positional, with wider pitch jitter.
    Voice,
}

/// An immutable mono sample buffer ready for playback.
#[derive(Clone, Debug)]
pub struct SoundBuffer {
    /// Effect name (lump name without the `DS` prefix, lowercase)
    pub name: ArrayString<8>,
    /// 16-bit mono samples
    pub samples: Vec<i16>,
    /// Playback rate in Hz
    pub sample_rate: u32,
    /// Normalized peak loudness of the attack, in [0, 1]
    pub amplitude: f32,
    /// Excluded from random pitch jitter
    pub fixed_pitch: bool,
}

impl SoundBuffer {
    /// Create a buffer, analyzing its attack amplitude.
    pub fn new(name: &str, samples: Vec<i16>, sample_rate: u32) -> Self {
        let mut buffer_name = ArrayString::new();
        for c in name.chars().take(8) {
            let _ = buffer_name.try_push(c.to_ascii_lowercase());
        }
        let amplitude = peak_amplitude(&samples, sample_rate);
        let fixed_pitch = FIXED_PITCH_SFX.contains(&buffer_name.as_str());
        Self {
            name: buffer_name,
            samples,
            sample_rate,
            amplitude,
            fixed_pitch,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Peak absolute value over the first fifth of a second, normalized to [0, 1].
pub fn peak_amplitude(samples: &[i16], sample_rate: u32) -> f32 {
    let count = (sample_rate as usize / 5).min(samples.len());
    let max = samples[..count]
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap_or(0);
    max as f32 / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn amplitude_of_silence_is_zero() {
        assert_eq!(peak_amplitude(&[0; 100], 11025), 0.0);
        assert_eq!(peak_amplitude(&[], 11025), 0.0);
    }

    #[test]
    fn amplitude_uses_absolute_peak() {
        let samples = [100, -16384, 200];
        assert_eq!(peak_amplitude(&samples, 11025), 0.5);
        assert_eq!(peak_amplitude(&[i16::MIN], 11025), 1.0);
    }

    #[test]
    fn amplitude_only_scans_first_fifth_second() {
        // 100 Hz: only the first 20 samples count.
        let mut samples = vec![1000i16; 40];
        samples[30] = 32000;
        let amp = peak_amplitude(&samples, 100);
        assert_eq!(amp, 1000.0 / 32768.0);
    }

    #[test]
    fn buffer_name_is_lowercased_and_truncated() {
        let buf = SoundBuffer::new("PISTOLSHOT", vec![0; 10], 11025);
        assert_eq!(buf.name.as_str(), "pistolsh");
        assert!(!buf.fixed_pitch);
    }

    #[test]
    fn fixed_pitch_effects_are_flagged() {
        for name in FIXED_PITCH_SFX {
            assert!(SoundBuffer::new(name, vec![0; 4], 11025).fixed_pitch);
        }
    }

    #[test]
    fn duration_in_seconds() {
        let buf = SoundBuffer::new("pistol", vec![0; 11025], 11025);
        assert_eq!(buf.duration(), 1.0);
    }
}
