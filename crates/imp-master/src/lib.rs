//! Headless controller for the imp audio subsystem.
//!
//! Loads effects and scores from a WAD and ties the sound system and the
//! music handle together, either on a live cpal stream or offline.

mod bank;
mod config;
mod sfx_names;

use imp_audio::{AudioError, CpalDevice, CpalOutput};
use imp_engine::music::{DecodeError, MidiSequencer};
use imp_engine::{
    music_channel, ChannelDevice, Mixer, Music, MusicError, MusicStream, SoundSystem, Synthesizer,
};

// Re-export common types so callers don't need the lower crates directly.
pub use imp_core::{AudioConfig, EmitterId, EmitterPositions, Frame, Listener, Position, SfxId, SfxKind};
pub use imp_engine::{MusicState, ToneSynth};
pub use imp_formats::{frames_to_wav, write_wav, FormatError, Wad};

pub use bank::load_sound_bank;
pub use config::{load_config, parse_config, save_config, ConfigError};
pub use sfx_names::SFX_NAMES;

/// Output rate for offline rendering; matches the MUS tick clock.
pub const RENDER_RATE: u32 = imp_engine::music::mus::SAMPLE_RATE;

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Music(#[from] MusicError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("lump {0} not found")]
    MissingLump(String),
}

/// Sound effects plus music over one WAD.
pub struct AudioSystem<D: ChannelDevice, S: Synthesizer> {
    sound: SoundSystem<D>,
    music: Music<S>,
    wad: Wad,
    config: AudioConfig,
}

impl<D: ChannelDevice, S: Synthesizer> AudioSystem<D, S> {
    /// Load the standard effect table and wire up `device` and `music`.
    pub fn new(config: AudioConfig, wad: Wad, device: D, music: Music<S>) -> Self {
        Self::with_effects(config, wad, SFX_NAMES, device, music)
    }

    pub fn with_effects(config: AudioConfig, wad: Wad, names: &[&str], device: D, music: Music<S>) -> Self {
        let config = config.clamped();
        let bank = load_sound_bank(&wad, names);
        music.set_volume(config.music_volume);
        Self {
            sound: SoundSystem::new(&config, bank, device),
            music,
            wad,
            config,
        }
    }

    pub fn sound(&self) -> &SoundSystem<D> {
        &self.sound
    }

    pub fn sound_mut(&mut self) -> &mut SoundSystem<D> {
        &mut self.sound
    }

    pub fn music(&self) -> &Music<S> {
        &self.music
    }

    pub fn wad(&self) -> &Wad {
        &self.wad
    }

    /// Current settings, including volume changes made since construction.
    pub fn config(&self) -> AudioConfig {
        AudioConfig {
            sfx_volume: self.sound.volume(),
            music_volume: self.music.volume(),
            ..self.config
        }
    }

    pub fn set_sfx_volume(&mut self, volume: u8) {
        self.sound.set_volume(volume);
    }

    pub fn set_music_volume(&mut self, volume: u8) {
        self.music.set_volume(volume);
    }

    /// Play the score stored as `D_<TRACK>`.
    pub fn start_music(&mut self, track: &str, looping: bool) -> Result<(), SystemError> {
        let lump = format!("D_{}", track.to_ascii_uppercase());
        let data = self
            .wad
            .lump(&lump)
            .ok_or_else(|| SystemError::MissingLump(lump.clone()))?;
        self.music.start_music(track, data, looping)?;
        Ok(())
    }

    pub fn stop_music(&mut self) {
        self.music.stop();
    }

    pub fn music_state(&self) -> MusicState {
        self.music.state()
    }

    /// Decode failure reported by the render side since the last call.
    pub fn take_music_error(&mut self) -> Option<DecodeError> {
        self.music.take_error()
    }

    /// Stop every effect and the music.
    pub fn shutdown(&mut self) {
        self.sound.stop_all();
        if self.music.current_track().is_some() {
            self.music.stop();
        }
    }
}

impl<D: ChannelDevice, S: Synthesizer> Drop for AudioSystem<D, S> {
    fn drop(&mut self) {
        self.shutdown();
        log::info!("audio: shut down");
    }
}

/// An [`AudioSystem`] playing through the default output device.
///
/// Field order matters: the system stops everything before the stream
/// is closed.
pub struct LiveAudio<S: Synthesizer> {
    pub system: AudioSystem<CpalDevice, S>,
    output: CpalOutput,
}

impl<S: Synthesizer + 'static> LiveAudio<S> {
    /// Open the output device and start the stream.
    ///
    /// On failure everything built so far is dropped before returning.
    pub fn open(
        config: AudioConfig,
        wad: Wad,
        synth: S,
        midi: Option<Box<dyn MidiSequencer<S>>>,
    ) -> Result<Self, SystemError> {
        let mut output = CpalOutput::new()?;
        let (music, stream) = music_channel(synth, midi, config.music_volume);
        let device = output.build_stream(stream)?;
        Ok(Self {
            system: AudioSystem::new(config, wad, device, music),
            output,
        })
    }

    pub fn output(&self) -> &CpalOutput {
        &self.output
    }
}

/// An [`AudioSystem`] rendered on the caller's thread into memory.
pub struct OfflineAudio<S: Synthesizer> {
    pub system: AudioSystem<Mixer, S>,
    stream: MusicStream<S>,
    scratch: Vec<f32>,
}

impl<S: Synthesizer> OfflineAudio<S> {
    pub fn new(config: AudioConfig, wad: Wad, synth: S) -> Self {
        let (music, stream) = music_channel(synth, None, config.music_volume);
        Self {
            system: AudioSystem::new(config, wad, Mixer::new(RENDER_RATE), music),
            stream,
            scratch: Vec::new(),
        }
    }

    pub fn stream(&self) -> &MusicStream<S> {
        &self.stream
    }

    /// Render `count` frames of music and effects.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        self.scratch.resize(count * 2, 0.0);
        let out = &mut self.scratch[..];
        self.stream.render(out);
        let mixer = self.system.sound.device_mut();
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| mixer.mix_into(out));
        #[cfg(not(feature = "alloc_check"))]
        mixer.mix_into(out);

        out.chunks_exact(2)
            .map(|lr| Frame::from_f32(lr[0], lr[1]))
            .collect()
    }

    /// Render up to `max_seconds`, stopping early once a non-looping
    /// score has ended and every effect has finished.
    pub fn render_seconds(&mut self, max_seconds: f32) -> Vec<Frame> {
        const CHUNK: usize = 4096;
        let total = (max_seconds.max(0.0) * RENDER_RATE as f32) as usize;
        let mut frames = Vec::with_capacity(total);
        while frames.len() < total {
            let n = CHUNK.min(total - frames.len());
            frames.extend(self.render_frames(n));
            let idle = self.system.sound.device().active_count() == 0;
            if idle && self.stream.state() == MusicState::EndReached {
                break;
            }
        }
        frames
    }
}

/// Render a track from `wad` to WAV bytes.
pub fn render_track_to_wav<S: Synthesizer>(
    wad: Wad,
    track: &str,
    synth: S,
    config: AudioConfig,
    seconds: f32,
    looping: bool,
) -> Result<Vec<u8>, SystemError> {
    let mut offline = OfflineAudio::new(config, wad, synth);
    offline.system.start_music(track, looping)?;
    let frames = offline.render_seconds(seconds);
    if let Some(err) = offline.system.take_music_error() {
        return Err(MusicError::from(err).into());
    }
    log::info!("render: {track}, {} frames", frames.len());
    Ok(frames_to_wav(&frames, RENDER_RATE))
}
