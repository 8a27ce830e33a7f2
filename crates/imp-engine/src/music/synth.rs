//! Synthesizer and MIDI sequencer seams.

use crate::music::MusicError;

/// MIDI status byte for a controller change.
pub const CONTROL_CHANGE: u8 = 0xB0;
/// MIDI status byte for a program change.
pub const PROGRAM_CHANGE: u8 = 0xC0;
/// MIDI status byte for a pitch-bend change.
pub const PITCH_BEND: u8 = 0xE0;

/// A software synthesizer driven by MIDI-style messages.
///
/// Implementations render in fixed-size blocks but must accept `render`
/// calls of any length up to [`block_size`](Self::block_size). Calls
/// happen on the audio thread and must not block or allocate.
pub trait Synthesizer: Send {
    /// Samples per block; the score advances one tick per block.
    fn block_size(&self) -> usize;

    fn note_on(&mut self, channel: u8, key: u8, velocity: u8);

    fn note_off(&mut self, channel: u8, key: u8);

    /// Release (or, if `immediate`, cut) every note on every channel.
    fn note_off_all(&mut self, immediate: bool);

    fn note_off_all_channel(&mut self, channel: u8, immediate: bool);

    fn reset_all_controllers(&mut self, channel: u8);

    /// Raw channel message: `command` is the status nibble (`0x80`..`0xE0`).
    fn process_midi_message(&mut self, channel: u8, command: u8, data1: u8, data2: u8);

    /// Silence everything and restore power-on channel state.
    fn reset(&mut self);

    /// Render the next `left.len()` samples of each plane.
    fn render(&mut self, left: &mut [f32], right: &mut [f32]);
}

/// A loaded standard MIDI file ready to drive a synthesizer.
pub trait MidiPlayer<S>: Send {
    fn render(&mut self, synth: &mut S, left: &mut [f32], right: &mut [f32]);
}

/// Loads standard MIDI files; supplied by the host.
pub trait MidiSequencer<S>: Send {
    fn load(&self, data: &[u8], looping: bool) -> Result<Box<dyn MidiPlayer<S>>, MusicError>;
}
