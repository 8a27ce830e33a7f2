//! Score format selection.

use imp_formats::{detect_score, ScoreFormat};

use crate::music::mus::{DecodeError, MusDecoder};
use crate::music::synth::{MidiPlayer, MidiSequencer, Synthesizer};
use crate::music::MusicError;

/// A score ready to play, chosen once by its header.
pub enum Decoder<S> {
    Mus(MusDecoder),
    /// Standard MIDI file handed to an external sequencer.
    Midi(Box<dyn MidiPlayer<S>>),
}

impl<S: Synthesizer> Decoder<S> {
    /// Detect the score format and build the matching decoder.
    pub fn from_score(
        data: &[u8],
        looping: bool,
        midi: Option<&dyn MidiSequencer<S>>,
    ) -> Result<Self, MusicError> {
        match detect_score(data)? {
            ScoreFormat::Mus => Ok(Decoder::Mus(MusDecoder::new(data.to_vec(), looping)?)),
            ScoreFormat::Midi => {
                let sequencer = midi.ok_or(MusicError::NoMidiSequencer)?;
                Ok(Decoder::Midi(sequencer.load(data, looping)?))
            }
        }
    }

    pub fn format(&self) -> ScoreFormat {
        match self {
            Decoder::Mus(_) => ScoreFormat::Mus,
            Decoder::Midi(_) => ScoreFormat::Midi,
        }
    }

    /// True once the score has stopped for good.
    pub fn is_finished(&self) -> bool {
        match self {
            Decoder::Mus(mus) => mus.is_finished(),
            Decoder::Midi(_) => false,
        }
    }

    pub fn render(&mut self, synth: &mut S, left: &mut [f32], right: &mut [f32]) -> Result<(), DecodeError> {
        match self {
            Decoder::Mus(mus) => mus.render(synth, left, right),
            Decoder::Midi(player) => {
                player.render(synth, left, right);
                Ok(())
            }
        }
    }
}
