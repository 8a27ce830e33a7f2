//! MUS score decoding.
//!
//! A MUS score is a stream of event groups. Each group is a run of events
//! sharing one timestamp; the last event of a group carries the high bit
//! of its descriptor and is followed by a base-128 delay in ticks. One tick
//! is one synthesizer block (1/140 s).
//!
//! Descriptor byte: `last:1 | type:3 | channel:4`.

use heapless::Vec;
use imp_formats::{FormatError, MusHeader};

use crate::music::synth::{Synthesizer, CONTROL_CHANGE, PITCH_BEND, PROGRAM_CHANGE};

/// Output rate MUS playback is timed against.
pub const SAMPLE_RATE: u32 = 44100;

/// Samples per tick at [`SAMPLE_RATE`].
pub const BLOCK_LENGTH: usize = SAMPLE_RATE as usize / 140;

/// Delay value marking the end of the score.
pub const END_OF_STREAM: i32 = -1;

/// Most events one group may hold.
pub const MAX_GROUP_EVENTS: usize = 128;

const MIDI_CHANNELS: usize = 16;
const DRUM_CHANNEL: u8 = 9;

/// MUS controller numbers, in order, mapped to MIDI controllers.
/// Index 0 is the program change and has no controller number.
const CONTROLLER_MAP: [u8; 9] = [0x00, 0x00, 0x01, 0x07, 0x0A, 0x0B, 0x5B, 0x5D, 0x40];

/// Errors raised while walking the event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown MUS event type {kind} at offset {offset}")]
    UnknownEvent { kind: u8, offset: usize },
    #[error("score ended in the middle of an event")]
    UnexpectedEof,
    #[error("event group longer than 128 events")]
    GroupOverflow,
}

/// One decoded score event, channels already remapped to MIDI numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MusEvent {
    ReleaseNote { channel: u8, note: u8 },
    PlayNote { channel: u8, note: u8, velocity: u8 },
    /// 14-bit bend split into MIDI data bytes.
    PitchBend { channel: u8, lsb: u8, msb: u8 },
    System { channel: u8, code: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
}

enum ReadResult {
    Ongoing,
    EndOfGroup,
    EndOfStream,
}

/// Map a raw MUS channel to MIDI: 15 is percussion, the rest skip 9.
pub fn remap_channel(raw: u8) -> u8 {
    match raw & 0x0F {
        15 => DRUM_CHANNEL,
        ch if ch >= DRUM_CHANNEL => ch + 1,
        ch => ch,
    }
}

/// Read a big-endian base-128 number; the high bit of each byte means
/// another byte follows.
pub fn read_varint(data: &[u8], pos: &mut usize) -> Result<i32, DecodeError> {
    let mut time: i32 = 0;
    loop {
        let value = *data.get(*pos).ok_or(DecodeError::UnexpectedEof)?;
        *pos += 1;
        time = time.saturating_mul(128).saturating_add((value & 0x7F) as i32);
        if value & 0x80 == 0 {
            return Ok(time);
        }
    }
}

/// Decoder state for one MUS score.
#[derive(Debug)]
pub struct MusDecoder {
    data: std::vec::Vec<u8>,
    header: MusHeader,
    looping: bool,
    group: Vec<MusEvent, MAX_GROUP_EVENTS>,
    last_velocity: [u8; MIDI_CHANNELS],
    pos: usize,
    delay: i32,
    block_wrote: usize,
    finished: bool,
}

impl MusDecoder {
    pub fn new(data: std::vec::Vec<u8>, looping: bool) -> Result<Self, FormatError> {
        let header = MusHeader::parse(&data)?;
        let pos = header.score_start as usize;
        Ok(Self {
            data,
            header,
            looping,
            group: Vec::new(),
            last_velocity: [0; MIDI_CHANNELS],
            pos,
            delay: 0,
            block_wrote: BLOCK_LENGTH,
            finished: false,
        })
    }

    pub fn header(&self) -> &MusHeader {
        &self.header
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// True once a non-looping score has played out (or failed).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Events of the most recently read group.
    pub fn group(&self) -> &[MusEvent] {
        &self.group
    }

    /// Ticks left before the next group is read.
    pub fn delay(&self) -> i32 {
        self.delay
    }

    /// Rewind to the first event and clear the velocity cache.
    pub fn reset(&mut self) {
        self.last_velocity = [0; MIDI_CHANNELS];
        self.pos = self.header.score_start as usize;
        self.delay = 0;
    }

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        let b = *self.data.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_event(&mut self) -> Result<ReadResult, DecodeError> {
        let offset = self.pos;
        let descriptor = self.next_byte()?;
        let channel = remap_channel(descriptor);
        let kind = (descriptor & 0x70) >> 4;
        let last = descriptor & 0x80 != 0;

        let event = match kind {
            0 => MusEvent::ReleaseNote {
                channel,
                note: self.next_byte()? & 0x7F,
            },
            1 => {
                let b = self.next_byte()?;
                let velocity = if b & 0x80 != 0 {
                    let v = self.next_byte()? & 0x7F;
                    self.last_velocity[channel as usize] = v;
                    v
                } else {
                    self.last_velocity[channel as usize]
                };
                MusEvent::PlayNote {
                    channel,
                    note: b & 0x7F,
                    velocity,
                }
            }
            2 => {
                let bend = ((self.next_byte()? as u16) << 7) / 2;
                MusEvent::PitchBend {
                    channel,
                    lsb: (bend & 0x7F) as u8,
                    msb: (bend >> 7) as u8,
                }
            }
            3 => MusEvent::System {
                channel,
                code: self.next_byte()?,
            },
            4 => MusEvent::Controller {
                channel,
                controller: self.next_byte()?,
                value: self.next_byte()? & 0x7F,
            },
            6 => return Ok(ReadResult::EndOfStream),
            _ => return Err(DecodeError::UnknownEvent { kind, offset }),
        };

        self.group
            .push(event)
            .map_err(|_| DecodeError::GroupOverflow)?;

        Ok(if last {
            ReadResult::EndOfGroup
        } else {
            ReadResult::Ongoing
        })
    }

    /// Read the next group and the delay after it. Returns
    /// [`END_OF_STREAM`] if the score ended inside the group.
    pub fn read_event_group(&mut self) -> Result<i32, DecodeError> {
        self.group.clear();
        loop {
            match self.read_event()? {
                ReadResult::Ongoing => {}
                ReadResult::EndOfGroup => break,
                ReadResult::EndOfStream => return Ok(END_OF_STREAM),
            }
        }
        read_varint(&self.data, &mut self.pos)
    }

    /// Send the current group to the synthesizer.
    pub fn send_events<S: Synthesizer + ?Sized>(&self, synth: &mut S) {
        for event in &self.group {
            match *event {
                MusEvent::ReleaseNote { channel, note } => synth.note_off(channel, note),
                MusEvent::PlayNote { channel, note, velocity } => {
                    synth.note_on(channel, note, velocity)
                }
                MusEvent::PitchBend { channel, lsb, msb } => {
                    synth.process_midi_message(channel, PITCH_BEND, lsb, msb)
                }
                MusEvent::System { channel, code } => match code {
                    11 => synth.note_off_all_channel(channel, false),
                    14 => synth.reset_all_controllers(channel),
                    _ => {}
                },
                MusEvent::Controller { channel, controller, value } => match controller {
                    0 => synth.process_midi_message(channel, PROGRAM_CHANGE, value, 0),
                    1..=8 => synth.process_midi_message(
                        channel,
                        CONTROL_CHANGE,
                        CONTROLLER_MAP[controller as usize],
                        value,
                    ),
                    _ => {}
                },
            }
        }
    }

    /// Advance the score by one tick.
    pub fn process_tick<S: Synthesizer + ?Sized>(&mut self, synth: &mut S) -> Result<(), DecodeError> {
        if self.finished {
            return Ok(());
        }
        if self.delay > 0 {
            self.delay -= 1;
        }
        if self.delay == 0 {
            self.delay = self.read_event_group()?;
            self.send_events(synth);

            if self.delay == END_OF_STREAM {
                synth.note_off_all(false);
                if self.looping {
                    self.reset();
                } else {
                    self.finished = true;
                }
            }
        }
        Ok(())
    }

    /// Fill both planes, advancing the score once per synthesizer block.
    ///
    /// On error the decoder stops, every note is released and the planes
    /// are left partly filled.
    pub fn render<S: Synthesizer + ?Sized>(
        &mut self,
        synth: &mut S,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<(), DecodeError> {
        let block = synth.block_size().max(1);
        let len = left.len().min(right.len());
        let mut wrote = 0;
        while wrote < len {
            if self.block_wrote >= block {
                if let Err(err) = self.process_tick(synth) {
                    self.finished = true;
                    synth.note_off_all(false);
                    return Err(err);
                }
                self.block_wrote = 0;
            }

            let rem = (block - self.block_wrote).min(len - wrote);
            synth.render(&mut left[wrote..wrote + rem], &mut right[wrote..wrote + rem]);

            self.block_wrote += rem;
            wrote += rem;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imp_formats::MUS_MAGIC;

    /// Records every call for inspection.
    #[derive(Default)]
    pub(crate) struct RecordingSynth {
        pub calls: std::vec::Vec<Call>,
        pub rendered: usize,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum Call {
        NoteOn(u8, u8, u8),
        NoteOff(u8, u8),
        AllOff,
        ChannelOff(u8),
        ResetControllers(u8),
        Midi(u8, u8, u8, u8),
        Reset,
    }

    impl Synthesizer for RecordingSynth {
        fn block_size(&self) -> usize {
            BLOCK_LENGTH
        }
        fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
            self.calls.push(Call::NoteOn(channel, key, velocity));
        }
        fn note_off(&mut self, channel: u8, key: u8) {
            self.calls.push(Call::NoteOff(channel, key));
        }
        fn note_off_all(&mut self, _immediate: bool) {
            self.calls.push(Call::AllOff);
        }
        fn note_off_all_channel(&mut self, channel: u8, _immediate: bool) {
            self.calls.push(Call::ChannelOff(channel));
        }
        fn reset_all_controllers(&mut self, channel: u8) {
            self.calls.push(Call::ResetControllers(channel));
        }
        fn process_midi_message(&mut self, channel: u8, command: u8, data1: u8, data2: u8) {
            self.calls.push(Call::Midi(channel, command, data1, data2));
        }
        fn reset(&mut self) {
            self.calls.push(Call::Reset);
        }
        fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
            left.fill(0.0);
            right.fill(0.0);
            self.rendered += left.len();
        }
    }

    fn mus(events: &[u8]) -> std::vec::Vec<u8> {
        let mut buf = std::vec::Vec::new();
        buf.extend(MUS_MAGIC);
        buf.extend((events.len() as u16).to_le_bytes());
        buf.extend(18u16.to_le_bytes());
        buf.extend(1u16.to_le_bytes());
        buf.extend(0u16.to_le_bytes());
        buf.extend(1u16.to_le_bytes());
        buf.extend(0u16.to_le_bytes());
        buf.extend(48u16.to_le_bytes());
        buf.extend(events);
        buf
    }

    fn decoder(events: &[u8], looping: bool) -> MusDecoder {
        MusDecoder::new(mus(events), looping).unwrap()
    }

    #[test]
    fn varint_single_byte() {
        let mut pos = 0;
        assert_eq!(read_varint(&[0x05], &mut pos), Ok(5));
        assert_eq!(pos, 1);
    }

    #[test]
    fn varint_two_bytes() {
        let mut pos = 0;
        assert_eq!(read_varint(&[0x81, 0x02], &mut pos), Ok(130));
        assert_eq!(pos, 2);
    }

    #[test]
    fn varint_truncated() {
        let mut pos = 0;
        assert_eq!(read_varint(&[0x81], &mut pos), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn channel_remap() {
        assert_eq!(remap_channel(0), 0);
        assert_eq!(remap_channel(8), 8);
        assert_eq!(remap_channel(9), 10);
        assert_eq!(remap_channel(14), 15);
        assert_eq!(remap_channel(15), 9);
    }

    #[test]
    fn decodes_group_and_delay() {
        // play ch0 note 60 vel 100, last: release ch1 note 60; delay 7
        let mut dec = decoder(&[0x10, 0xBC, 100, 0x81, 60, 0x07], false);
        assert_eq!(dec.read_event_group(), Ok(7));
        assert_eq!(
            dec.group(),
            &[
                MusEvent::PlayNote { channel: 0, note: 60, velocity: 100 },
                MusEvent::ReleaseNote { channel: 1, note: 60 },
            ]
        );
    }

    #[test]
    fn omitted_velocity_reuses_cache() {
        let mut dec = decoder(&[0x90, 0xBC, 100, 0x00, 0x90, 0x3E, 0x00], false);
        dec.read_event_group().unwrap();
        dec.read_event_group().unwrap();
        assert_eq!(
            dec.group(),
            &[MusEvent::PlayNote { channel: 0, note: 62, velocity: 100 }]
        );
    }

    #[test]
    fn velocity_cache_is_per_channel() {
        let mut dec = decoder(&[0x10, 0xBC, 90, 0x91, 0x3C, 0x00], false);
        dec.read_event_group().unwrap();
        assert_eq!(
            dec.group()[1],
            MusEvent::PlayNote { channel: 1, note: 60, velocity: 0 }
        );
    }

    #[test]
    fn pitch_bend_scales_to_fourteen_bits() {
        let mut dec = decoder(&[0xA0, 0x80, 0x00, 0xA0, 0xFF, 0x00], false);
        dec.read_event_group().unwrap();
        // 128 << 7 / 2 = 8192: centered
        assert_eq!(dec.group(), &[MusEvent::PitchBend { channel: 0, lsb: 0, msb: 64 }]);
        dec.read_event_group().unwrap();
        // 255 << 7 / 2 = 16320
        assert_eq!(dec.group(), &[MusEvent::PitchBend { channel: 0, lsb: 64, msb: 127 }]);
    }

    #[test]
    fn end_of_stream_returns_sentinel() {
        let mut dec = decoder(&[0x10, 0x3C, 0x60], false);
        assert_eq!(dec.read_event_group(), Ok(END_OF_STREAM));
        assert_eq!(dec.group().len(), 1);
    }

    #[test]
    fn unknown_event_is_an_error() {
        let mut dec = decoder(&[0xD0, 0x00], false);
        assert_eq!(
            dec.read_event_group(),
            Err(DecodeError::UnknownEvent { kind: 5, offset: 18 })
        );
    }

    #[test]
    fn truncated_event_is_an_error() {
        let mut dec = decoder(&[0x90], false);
        assert_eq!(dec.read_event_group(), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn oversized_group_is_an_error() {
        let mut events = std::vec::Vec::new();
        for _ in 0..=MAX_GROUP_EVENTS {
            events.extend([0x00, 0x3C]);
        }
        let mut dec = decoder(&events, false);
        assert_eq!(dec.read_event_group(), Err(DecodeError::GroupOverflow));
    }

    #[test]
    fn dispatches_controllers_and_system_events() {
        let mut dec = decoder(
            &[
                0x40, 0x00, 30, // program 30
                0x41, 0x03, 100, // ch1 volume
                0x4F, 0x04, 0, // drums pan
                0x40, 0x08, 127, // sustain
                0x40, 0x09, 5, // unknown controller: dropped
                0x32, 11, // ch2 all notes off
                0xB2, 14, // ch2 reset controllers, last
                0x00,
            ],
            false,
        );
        dec.read_event_group().unwrap();
        let mut synth = RecordingSynth::default();
        dec.send_events(&mut synth);
        assert_eq!(
            synth.calls,
            vec![
                Call::Midi(0, PROGRAM_CHANGE, 30, 0),
                Call::Midi(1, CONTROL_CHANGE, 0x07, 100),
                Call::Midi(9, CONTROL_CHANGE, 0x0A, 0),
                Call::Midi(0, CONTROL_CHANGE, 0x40, 127),
                Call::ChannelOff(2),
                Call::ResetControllers(2),
            ]
        );
    }

    #[test]
    fn first_render_reads_first_group() {
        let mut dec = decoder(&[0x90, 0xBC, 100, 0x02, 0x60], false);
        let mut synth = RecordingSynth::default();
        let mut l = [0.0; 10];
        let mut r = [0.0; 10];
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.calls, vec![Call::NoteOn(0, 60, 100)]);
        assert_eq!(dec.delay(), 2);
        assert_eq!(synth.rendered, 10);
    }

    #[test]
    fn delay_counts_whole_blocks() {
        // note, wait 2 ticks, release, end
        let mut dec = decoder(&[0x90, 0xBC, 100, 0x02, 0x80, 0x3C, 0x00, 0x60], false);
        let mut synth = RecordingSynth::default();
        let mut l = vec![0.0; BLOCK_LENGTH];
        let mut r = vec![0.0; BLOCK_LENGTH];

        dec.render(&mut synth, &mut l, &mut r).unwrap();
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.calls.len(), 1);
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.calls[1], Call::NoteOff(0, 60));
    }

    #[test]
    fn non_looping_score_finishes() {
        let mut dec = decoder(&[0x90, 0xBC, 100, 0x01, 0x60], false);
        let mut synth = RecordingSynth::default();
        let mut l = vec![0.0; BLOCK_LENGTH * 4];
        let mut r = vec![0.0; BLOCK_LENGTH * 4];
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert!(dec.is_finished());
        assert_eq!(synth.calls, vec![Call::NoteOn(0, 60, 100), Call::AllOff]);
        assert_eq!(synth.rendered, BLOCK_LENGTH * 4);
    }

    #[test]
    fn looping_score_restarts_with_clean_cache() {
        // Group 1 sets the velocity; group 2 plays a cached note, then ends.
        let mut dec = decoder(&[0x90, 0xBC, 100, 0x01, 0x10, 0x3E, 0x60], true);
        let mut synth = RecordingSynth::default();
        let mut l = vec![0.0; BLOCK_LENGTH];
        let mut r = vec![0.0; BLOCK_LENGTH];

        dec.render(&mut synth, &mut l, &mut r).unwrap();
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(
            synth.calls,
            vec![Call::NoteOn(0, 60, 100), Call::NoteOn(0, 62, 100), Call::AllOff]
        );
        assert_eq!(dec.delay(), 0);
        assert!(!dec.is_finished());

        // Back at the start: the first group plays again.
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.calls[3], Call::NoteOn(0, 60, 100));
        assert_eq!(dec.delay(), 1);
    }

    #[test]
    fn loop_reset_zeroes_velocity_cache() {
        let mut dec = decoder(&[0x10, 0x3E, 0x60], true);
        dec.last_velocity[0] = 77;
        let mut synth = RecordingSynth::default();
        let mut l = vec![0.0; BLOCK_LENGTH];
        let mut r = vec![0.0; BLOCK_LENGTH];
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.calls, vec![Call::NoteOn(0, 62, 77), Call::AllOff]);
        assert_eq!(dec.last_velocity, [0; MIDI_CHANNELS]);
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.calls[2], Call::NoteOn(0, 62, 0));
    }

    #[test]
    fn render_error_stops_decoder() {
        let mut dec = decoder(&[0xD0, 0x00], true);
        let mut synth = RecordingSynth::default();
        let mut l = [0.0; 4];
        let mut r = [0.0; 4];
        assert!(dec.render(&mut synth, &mut l, &mut r).is_err());
        assert!(dec.is_finished());
        assert_eq!(synth.calls, vec![Call::AllOff]);
        // Later renders keep the synthesizer running without reading.
        dec.render(&mut synth, &mut l, &mut r).unwrap();
        assert_eq!(synth.rendered, 4);
    }

    #[test]
    fn rejects_non_mus_data() {
        assert!(MusDecoder::new(b"MThd\0\0\0\x06".to_vec(), false).is_err());
    }
}
