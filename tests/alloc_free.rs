//! Allocation-free render path tests.
//!
//! These tests verify that `MusicStream::render` and `Mixer::mix_into` do
//! not allocate once playback is set up. They render synthetic scores for
//! several seconds to catch allocations from decoder swaps, loop restarts
//! or voice stealing in the synthesizer.
//!
//! Just run `cargo test`; no feature flags needed.

use std::sync::Arc;

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use imp_core::SoundBuffer;
use imp_engine::{music_channel, ChannelDevice, Mixer, ToneSynth, VoiceParams, VOICE_COUNT};

/// MUS score from raw event bytes.
fn mus(events: &[u8]) -> Vec<u8> {
    let mut data = b"MUS\x1a".to_vec();
    for field in [events.len() as u16, 18, 16, 0, 1, 0, 0] {
        data.extend(field.to_le_bytes());
    }
    data.extend_from_slice(events);
    data
}

/// A busy looping score: chords on every channel, bends, controllers
/// and percussion, short delays.
fn busy_score() -> Vec<u8> {
    let mut events = Vec::new();
    for ch in 0..16u8 {
        events.extend([0x40 | ch, 0, ch * 8]); // program
        events.extend([0x40 | ch, 4, ch * 8]); // pan
        events.extend([0x10 | ch, 0x80 | (36 + ch * 3), 100]);
        events.extend([0x10 | ch, 40 + ch * 3]);
        events.extend([0x20 | ch, 200]);
    }
    events.extend([0x8F, 60, 3]); // release on percussion, delay 3
    for ch in 0..16u8 {
        events.extend([0x00 | ch, 36 + ch * 3]);
    }
    events.extend([0x30, 11, 0xB0, 14, 2]);
    events.push(0x60);
    mus(&events)
}

fn assert_music_alloc_free(score: Vec<u8>, looping: bool, frames: usize) {
    let (mut music, mut stream) = music_channel(ToneSynth::for_mus(true), None, 15);
    music.start_music("test", &score, looping).unwrap();
    let mut out = vec![0.0f32; 1024];

    assert_no_alloc(|| {
        let mut done = 0;
        while done < frames {
            stream.render(&mut out);
            done += out.len() / 2;
        }
    });
}

#[test]
fn looping_score_alloc_free() {
    assert_music_alloc_free(busy_score(), true, 44100 * 5);
}

#[test]
fn ending_score_alloc_free() {
    assert_music_alloc_free(busy_score(), false, 44100 * 2);
}

#[test]
fn decode_error_alloc_free() {
    // Undefined event type 7 after one note.
    assert_music_alloc_free(mus(&[0x90, 0xBC, 0x7F, 4, 0x70]), false, 44100);
}

#[test]
fn track_changes_alloc_free() {
    let (mut music, mut stream) = music_channel(ToneSynth::for_mus(true), None, 15);
    let mut out = vec![0.0f32; 1024];
    for round in 0..20 {
        // Replaced before any render: only the last selection reaches the stream.
        music.start_music(&format!("a{round}"), &busy_score(), true).unwrap();
        music.start_music(&format!("b{round}"), &busy_score(), round % 2 == 0).unwrap();
        if round % 5 == 4 {
            music.stop();
        }
        assert_no_alloc(|| {
            for _ in 0..8 {
                stream.render(&mut out);
            }
        });
    }
}

#[test]
fn mixer_alloc_free() {
    let samples: Vec<i16> = (0..4000).map(|i| ((i % 50) as i16 - 25) * 1000).collect();
    let buffer = Arc::new(SoundBuffer::new("dspistol", samples, 11025));
    let mut mixer = Mixer::new(44100);
    let mut out = vec![0.0f32; 1024];

    assert_no_alloc(|| {
        for round in 0..400 {
            let voice = round % VOICE_COUNT;
            mixer.play(voice, &buffer, VoiceParams::placed(80.0, round as f32 * 0.1), 1.0);
            mixer.set_params((voice + 1) % VOICE_COUNT, VoiceParams::centered(40.0));
            if round % 7 == 0 {
                mixer.pause(voice);
            }
            out.fill(0.0);
            mixer.mix_into(&mut out);
        }
    });
}
