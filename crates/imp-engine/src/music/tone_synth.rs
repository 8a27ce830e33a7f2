//! Small oscillator synthesizer for headless playback and tests.
//!
//! Programs pick one of four waveforms (`program / 32`); the percussion
//! channel plays short noise bursts. Volume, expression, pan, sustain and
//! a ±2 semitone pitch bend are honored. With effects enabled, the reverb
//! send feeds a single feedback delay.

use core::f32::consts::{FRAC_PI_2, TAU};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::music::mus::{BLOCK_LENGTH, SAMPLE_RATE};
use crate::music::synth::{Synthesizer, CONTROL_CHANGE, PITCH_BEND, PROGRAM_CHANGE};

/// Most notes sounding at once.
pub const MAX_NOTES: usize = 32;

const CHANNELS: usize = 16;
const DRUM_CHANNEL: u8 = 9;
const BEND_CENTER: u16 = 8192;
const BEND_RANGE: f32 = 2.0;
const MASTER_GAIN: f32 = 0.15;
const ATTACK_SECONDS: f32 = 0.005;
const RELEASE_SECONDS: f32 = 0.12;
const DRUM_SECONDS: f32 = 0.15;
const DELAY_SECONDS: f32 = 0.09;
const DELAY_FEEDBACK: f32 = 0.35;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
    Noise,
}

#[derive(Clone, Copy, Debug)]
struct ChannelState {
    program: u8,
    volume: u8,
    expression: u8,
    pan: u8,
    reverb: u8,
    sustain: bool,
    bend: u16,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            program: 0,
            volume: 100,
            expression: 127,
            pan: 64,
            reverb: 40,
            sustain: false,
            bend: BEND_CENTER,
        }
    }
}

impl ChannelState {
    fn reset_controllers(&mut self) {
        self.expression = 127;
        self.sustain = false;
        self.bend = BEND_CENTER;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Stage {
    #[default]
    Off,
    Attack,
    Hold,
    /// Key released while the sustain pedal is down.
    Sustained,
    Release,
}

#[derive(Clone, Copy, Debug, Default)]
struct Note {
    channel: u8,
    key: u8,
    velocity: f32,
    phase: f32,
    level: f32,
    stage: Stage,
    age: u32,
    /// Samples left for a percussion burst.
    drum_left: u32,
}

/// Reference [`Synthesizer`] built from plain oscillators.
pub struct ToneSynth {
    sample_rate: u32,
    block_size: usize,
    channels: [ChannelState; CHANNELS],
    notes: [Note; MAX_NOTES],
    clock: u32,
    noise: Pcg32,
    effects: bool,
    delay_line: Vec<(f32, f32)>,
    delay_pos: usize,
}

impl ToneSynth {
    pub fn new(sample_rate: u32, block_size: usize, effects: bool) -> Self {
        let delay_len = ((sample_rate as f32 * DELAY_SECONDS) as usize).max(1);
        Self {
            sample_rate: sample_rate.max(1),
            block_size: block_size.max(1),
            channels: [ChannelState::default(); CHANNELS],
            notes: [Note::default(); MAX_NOTES],
            clock: 0,
            noise: Pcg32::seed_from_u64(0x5EED),
            effects,
            delay_line: vec![(0.0, 0.0); delay_len],
            delay_pos: 0,
        }
    }

    /// Synthesizer timed for MUS playback.
    pub fn for_mus(effects: bool) -> Self {
        Self::new(SAMPLE_RATE, BLOCK_LENGTH, effects)
    }

    /// Notes still producing sound.
    pub fn active_notes(&self) -> usize {
        self.notes.iter().filter(|n| n.stage != Stage::Off).count()
    }

    fn release(note: &mut Note, sustain: bool) {
        match note.stage {
            Stage::Attack | Stage::Hold if sustain => note.stage = Stage::Sustained,
            Stage::Attack | Stage::Hold | Stage::Sustained => note.stage = Stage::Release,
            Stage::Off | Stage::Release => {}
        }
    }

    /// Free slot, else the oldest releasing note, else the oldest note.
    fn allocate(&mut self) -> usize {
        if let Some(i) = self.notes.iter().position(|n| n.stage == Stage::Off) {
            return i;
        }
        let oldest = |stage_filter: &dyn Fn(Stage) -> bool| {
            self.notes
                .iter()
                .enumerate()
                .filter(|(_, n)| stage_filter(n.stage))
                .min_by_key(|(_, n)| n.age)
                .map(|(i, _)| i)
        };
        oldest(&|s| s == Stage::Release)
            .or_else(|| oldest(&|_| true))
            .unwrap_or(0)
    }

    fn control_change(&mut self, channel: usize, controller: u8, value: u8) {
        let state = &mut self.channels[channel];
        match controller {
            0x07 => state.volume = value,
            0x0A => state.pan = value,
            0x0B => state.expression = value,
            0x5B => state.reverb = value,
            0x40 => {
                state.sustain = value >= 64;
                if !state.sustain {
                    for note in self.notes.iter_mut() {
                        if note.channel as usize == channel && note.stage == Stage::Sustained {
                            note.stage = Stage::Release;
                        }
                    }
                }
            }
            0x79 => self.reset_all_controllers(channel as u8),
            0x7B => self.note_off_all_channel(channel as u8, false),
            _ => {}
        }
    }

    fn frequency(&self, note: &Note) -> f32 {
        let bend = self.channels[note.channel as usize].bend as f32 - BEND_CENTER as f32;
        let semitones = note.key as f32 - 69.0 + bend / BEND_CENTER as f32 * BEND_RANGE;
        440.0 * libm::powf(2.0, semitones / 12.0)
    }

    fn render_frame(&mut self) -> (f32, f32, f32, f32) {
        let rate = self.sample_rate as f32;
        let attack_step = 1.0 / (ATTACK_SECONDS * rate);
        let release_mul = libm::expf(-1.0 / (RELEASE_SECONDS * rate * 0.25));

        let mut dry = (0.0, 0.0);
        let mut send = (0.0, 0.0);

        for i in 0..MAX_NOTES {
            if self.notes[i].stage == Stage::Off {
                continue;
            }
            let freq = self.frequency(&self.notes[i]);
            let noise = self.noise.random_range(-1.0f32..1.0);
            let note = &mut self.notes[i];
            let ch = &self.channels[note.channel as usize];

            let wave = if note.channel == DRUM_CHANNEL {
                Waveform::Noise
            } else {
                match ch.program / 32 {
                    0 => Waveform::Sine,
                    1 => Waveform::Square,
                    2 => Waveform::Saw,
                    _ => Waveform::Triangle,
                }
            };

            let sample = match wave {
                Waveform::Sine => libm::sinf(note.phase * TAU),
                Waveform::Square => if note.phase < 0.5 { 1.0 } else { -1.0 },
                Waveform::Saw => 2.0 * note.phase - 1.0,
                Waveform::Triangle => 1.0 - 4.0 * libm::fabsf(note.phase - 0.5),
                Waveform::Noise => noise,
            };
            note.phase = (note.phase + freq / rate).fract();

            match note.stage {
                Stage::Attack => {
                    note.level += attack_step;
                    if note.level >= 1.0 {
                        note.level = 1.0;
                        note.stage = Stage::Hold;
                    }
                }
                Stage::Release => {
                    note.level *= release_mul;
                    if note.level < 1e-4 {
                        note.stage = Stage::Off;
                    }
                }
                _ => {}
            }
            if wave == Waveform::Noise {
                note.drum_left = note.drum_left.saturating_sub(1);
                if note.drum_left == 0 && note.stage != Stage::Off {
                    note.stage = Stage::Release;
                }
            }

            let gain = MASTER_GAIN
                * note.velocity
                * note.level
                * (ch.volume as f32 / 127.0)
                * (ch.expression as f32 / 127.0);
            let pan = ch.pan as f32 / 127.0 * FRAC_PI_2;
            let left = sample * gain * libm::cosf(pan);
            let right = sample * gain * libm::sinf(pan);
            dry.0 += left;
            dry.1 += right;
            let wet = ch.reverb as f32 / 127.0;
            send.0 += left * wet;
            send.1 += right * wet;
        }

        (dry.0, dry.1, send.0, send.1)
    }
}

impl Synthesizer for ToneSynth {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(channel, key);
            return;
        }
        let channel = channel as usize % CHANNELS;
        let slot = self.allocate();
        self.clock = self.clock.wrapping_add(1);
        let drum_samples = (DRUM_SECONDS * self.sample_rate as f32) as u32;
        self.notes[slot] = Note {
            channel: channel as u8,
            key: key & 0x7F,
            velocity: velocity.min(127) as f32 / 127.0,
            phase: 0.0,
            level: 0.0,
            stage: Stage::Attack,
            age: self.clock,
            drum_left: drum_samples,
        };
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        let sustain = self.channels[channel as usize % CHANNELS].sustain;
        for note in self.notes.iter_mut() {
            if note.channel == channel && note.key == key {
                Self::release(note, sustain);
            }
        }
    }

    fn note_off_all(&mut self, immediate: bool) {
        for note in self.notes.iter_mut() {
            if immediate {
                note.stage = Stage::Off;
            } else {
                Self::release(note, false);
            }
        }
    }

    fn note_off_all_channel(&mut self, channel: u8, immediate: bool) {
        for note in self.notes.iter_mut().filter(|n| n.channel == channel) {
            if immediate {
                note.stage = Stage::Off;
            } else {
                Self::release(note, false);
            }
        }
    }

    fn reset_all_controllers(&mut self, channel: u8) {
        let channel = channel as usize % CHANNELS;
        self.channels[channel].reset_controllers();
        for note in self.notes.iter_mut() {
            if note.channel as usize == channel && note.stage == Stage::Sustained {
                note.stage = Stage::Release;
            }
        }
    }

    fn process_midi_message(&mut self, channel: u8, command: u8, data1: u8, data2: u8) {
        let ch = channel as usize % CHANNELS;
        match command & 0xF0 {
            0x80 => self.note_off(channel, data1),
            0x90 => self.note_on(channel, data1, data2),
            CONTROL_CHANGE => self.control_change(ch, data1, data2 & 0x7F),
            PROGRAM_CHANGE => self.channels[ch].program = data1 & 0x7F,
            PITCH_BEND => {
                self.channels[ch].bend = ((data2 as u16 & 0x7F) << 7) | (data1 as u16 & 0x7F);
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.notes = [Note::default(); MAX_NOTES];
        self.channels = [ChannelState::default(); CHANNELS];
        self.delay_line.fill((0.0, 0.0));
        self.delay_pos = 0;
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (dl, dr, sl, sr) = self.render_frame();
            if self.effects {
                let (el, er) = self.delay_line[self.delay_pos];
                self.delay_line[self.delay_pos] = (sl + el * DELAY_FEEDBACK, sr + er * DELAY_FEEDBACK);
                self.delay_pos = (self.delay_pos + 1) % self.delay_line.len();
                *l = dl + el * 0.5;
                *r = dr + er * 0.5;
            } else {
                *l = dl;
                *r = dr;
            }
        }
    }
}
