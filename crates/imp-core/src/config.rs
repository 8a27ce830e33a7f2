//! Audio settings shared by sound and music.

use serde::{Deserialize, Serialize};

/// Upper bound of the sfx and music volume scales.
pub const MAX_VOLUME: u8 = 15;

/// User-adjustable audio settings.
///
/// Passed into construction of the sound and music systems and updated in
/// place through their volume setters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sound effect volume (0-15)
    #[serde(default = "default_volume")]
    pub sfx_volume: u8,
    /// Music volume (0-15)
    #[serde(default = "default_volume")]
    pub music_volume: u8,
    /// Apply random pitch jitter to effects
    #[serde(default = "default_true")]
    pub random_pitch: bool,
    /// Let the synthesizer render reverb and chorus
    #[serde(default = "default_true")]
    pub music_effects: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sfx_volume: default_volume(),
            music_volume: default_volume(),
            random_pitch: true,
            music_effects: true,
        }
    }
}

impl AudioConfig {
    /// Clamp both volume levels into range.
    pub fn clamped(mut self) -> Self {
        self.sfx_volume = self.sfx_volume.min(MAX_VOLUME);
        self.music_volume = self.music_volume.min(MAX_VOLUME);
        self
    }
}

fn default_volume() -> u8 {
    8
}

fn default_true() -> bool {
    true
}
