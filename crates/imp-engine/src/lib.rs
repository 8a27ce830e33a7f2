//! Sound effect channel allocation, software mixing and MUS music
//! sequencing for imp.
//!
//! [`SoundSystem`] runs on the simulation tick and drives any
//! [`ChannelDevice`]. Music is split into a control-side [`music::Music`]
//! handle and a real-time [`music::MusicStream`].

mod channel;
mod device;
mod mixer;
pub mod music;
mod sound;
mod voice;

pub use channel::{Channel, ChannelState};
pub use device::{ChannelDevice, VoiceParams, VoiceStatus, CHANNEL_COUNT, UI_CHANNEL, VOICE_COUNT};
pub use mixer::Mixer;
pub use music::{music_channel, Music, MusicError, MusicState, MusicStream, Synthesizer, ToneSynth};
pub use sound::{SoundSystem, DEFAULT_VOLUME, FAST_DECAY, SLOW_DECAY, UPDATE_INTERVAL};
pub use voice::{pitch_to_increment, Voice};
