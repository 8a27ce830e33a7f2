//! The playback device seam between the channel allocator and the output.

use std::sync::Arc;

use imp_core::SoundBuffer;

/// Channels contended for by world sounds.
pub const CHANNEL_COUNT: usize = 8;

/// Index of the dedicated menu/HUD channel.
pub const UI_CHANNEL: usize = CHANNEL_COUNT;

/// Voices a device must provide: the world channels plus the UI channel.
pub const VOICE_COUNT: usize = CHANNEL_COUNT + 1;

/// Playback state of one device voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl VoiceStatus {
    pub fn as_u8(self) -> u8 {
        match self {
            VoiceStatus::Stopped => 0,
            VoiceStatus::Playing => 1,
            VoiceStatus::Paused => 2,
        }
    }

    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => VoiceStatus::Playing,
            2 => VoiceStatus::Paused,
            _ => VoiceStatus::Stopped,
        }
    }
}

/// Volume and placement for a voice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoiceParams {
    /// Output volume, 0..=100
    pub volume: f32,
    /// Placement angle in radians (π/2 = straight ahead); `None` = centered
    pub pan: Option<f32>,
}

impl VoiceParams {
    pub fn centered(volume: f32) -> Self {
        Self { volume, pan: None }
    }

    pub fn placed(volume: f32, angle: f32) -> Self {
        Self {
            volume,
            pan: Some(angle),
        }
    }
}

/// A fixed bank of voices that can play sound buffers.
///
/// Voice indices run from `0` to [`VOICE_COUNT`]; out-of-range indices are
/// ignored by `play`/`stop`/etc. and report [`VoiceStatus::Stopped`].
pub trait ChannelDevice {
    fn status(&self, voice: usize) -> VoiceStatus;

    /// Start `buffer` from its beginning, replacing whatever the voice held.
    fn play(&mut self, voice: usize, buffer: &Arc<SoundBuffer>, params: VoiceParams, pitch: f32);

    fn set_params(&mut self, voice: usize, params: VoiceParams);

    fn stop(&mut self, voice: usize);

    fn pause(&mut self, voice: usize);

    fn resume(&mut self, voice: usize);

    /// Seconds left before the voice's buffer runs out.
    fn remaining(&self, voice: usize) -> f32;
}
