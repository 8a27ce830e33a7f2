//! Music playback: score decoding, the synthesizer seam and the
//! control/audio handoff.

mod decoder;
pub mod mus;
mod stream;
pub mod synth;
mod tone_synth;

use imp_formats::FormatError;

pub use decoder::Decoder;
pub use mus::{DecodeError, MusDecoder, MusEvent};
pub use stream::{music_channel, Music, MusicState, MusicStream};
pub use synth::{MidiPlayer, MidiSequencer, Synthesizer};
pub use tone_synth::ToneSynth;

/// Errors raised while starting or decoding music.
#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    #[error("score format: {0}")]
    Format(#[from] FormatError),

    #[error("score decode: {0}")]
    Decode(#[from] DecodeError),

    #[error("MIDI score given but no MIDI sequencer is available")]
    NoMidiSequencer,
}
