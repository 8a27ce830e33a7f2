//! Offline rendering of effects and music from a synthetic WAD.

use imp_master::{
    render_track_to_wav, AudioConfig, EmitterId, MusicState, OfflineAudio, Position, SfxKind,
    SystemError, ToneSynth,
};
use imp_formats::Wad;
use slotmap::SlotMap;

fn make_wad(lumps: &[(&str, Vec<u8>)]) -> Wad {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"PWAD");
    buf.extend((lumps.len() as i32).to_le_bytes());
    buf.extend(0i32.to_le_bytes());
    let mut dir = Vec::new();
    for (name, data) in lumps {
        let pos = buf.len() as i32;
        buf.extend_from_slice(data);
        let mut raw = [0u8; 8];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        dir.extend(pos.to_le_bytes());
        dir.extend((data.len() as i32).to_le_bytes());
        dir.extend(raw);
    }
    let dir_offset = buf.len() as i32;
    buf[8..12].copy_from_slice(&dir_offset.to_le_bytes());
    buf.extend(dir);
    Wad::from_bytes(buf).unwrap()
}

fn dmx(samples: usize) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(3u16.to_le_bytes());
    data.extend(11025u16.to_le_bytes());
    data.extend((samples as u32).to_le_bytes());
    data.extend((0..samples).map(|i| (i * 37 % 256) as u8));
    data
}

/// One note held for `ticks`, then end of score.
fn score(ticks: u8) -> Vec<u8> {
    let events = [0x90, 0xBC, 0x7F, ticks, 0x60];
    let mut data = b"MUS\x1a".to_vec();
    for field in [events.len() as u16, 18, 1, 0, 1, 0, 0] {
        data.extend(field.to_le_bytes());
    }
    data.extend(events);
    data
}

fn wad() -> Wad {
    make_wad(&[
        ("DSPISTOL", dmx(2048)),
        ("DSOOF", vec![3, 0, 0x11]),
        ("D_E1M1", score(40)),
        ("D_E1M2", score(1)),
    ])
}

fn quiet_config() -> AudioConfig {
    AudioConfig {
        random_pitch: false,
        music_effects: false,
        ..AudioConfig::default()
    }
}

fn energy(frames: &[imp_master::Frame]) -> u64 {
    frames
        .iter()
        .map(|f| (f.left as i64).unsigned_abs() + (f.right as i64).unsigned_abs())
        .sum()
}

#[test]
fn bank_marks_short_and_missing_lumps_unplayable() {
    let offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    let bank = offline.system.sound().bank();
    assert_eq!(bank.playable_count(), 1);
    assert!(bank.get(bank.id("pistol").unwrap()).is_some());
    assert!(bank.get(bank.id("oof").unwrap()).is_none());
    assert!(bank.get(bank.id("shotgn").unwrap()).is_none());
}

#[test]
fn music_renders_and_ends() {
    let mut offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    offline.system.start_music("e1m1", false).unwrap();
    let frames = offline.render_seconds(5.0);
    assert!(energy(&frames) > 0);
    // 40 ticks at 140 Hz plus the release tail, well under five seconds.
    assert!(frames.len() < 44100 * 5);
}

#[test]
fn quick_level_change_plays_the_newest_track() {
    let mut offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    offline.system.start_music("e1m1", true).unwrap();
    offline.system.start_music("e1m2", false).unwrap();
    assert_eq!(offline.system.music().current_track(), Some("e1m2"));

    // e1m1 loops forever; only e1m2 can end.
    offline.render_frames(4096);
    assert_eq!(offline.system.music_state(), MusicState::EndReached);
}

#[test]
fn stop_before_render_leaves_music_idle() {
    let mut offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    offline.system.start_music("e1m1", true).unwrap();
    offline.system.stop_music();
    let frames = offline.render_frames(2048);
    assert_eq!(energy(&frames), 0);
    assert_eq!(offline.system.music_state(), MusicState::Idle);
}

#[test]
fn missing_track_is_reported() {
    let mut offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    let result = offline.system.start_music("e9m9", false);
    assert!(matches!(result, Err(SystemError::MissingLump(name)) if name == "D_E9M9"));
}

#[test]
fn effects_mix_with_music() {
    let mut offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    let mut emitters: SlotMap<EmitterId, Position> = SlotMap::with_key();
    let id = emitters.insert(Position::from_units(64, 0));
    let pistol = offline.system.sound().bank().id("pistol").unwrap();

    let sound = offline.system.sound_mut();
    sound.start_sound(&emitters, Some(id), pistol, SfxKind::Positional, 100);
    assert!(sound.update(&emitters));

    let frames = offline.render_frames(1024);
    assert!(energy(&frames) > 0);
    assert_eq!(offline.system.sound().device().active_count(), 1);
}

#[test]
fn volume_changes_show_in_config() {
    let mut offline = OfflineAudio::new(quiet_config(), wad(), ToneSynth::for_mus(false));
    offline.system.set_sfx_volume(3);
    offline.system.set_music_volume(40);
    let config = offline.system.config();
    assert_eq!(config.sfx_volume, 3);
    assert_eq!(config.music_volume, 15);
    assert!(!config.random_pitch);
}

#[test]
fn track_renders_to_wav() {
    let bytes = render_track_to_wav(wad(), "e1m1", ToneSynth::for_mus(false), quiet_config(), 1.0, true)
        .unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(bytes.len(), 44 + 44100 * 4);
}

#[test]
fn bad_score_fails_to_start() {
    let wad = make_wad(&[("D_RUNNIN", b"OggS\0\0\0\0".to_vec())]);
    let mut offline = OfflineAudio::new(quiet_config(), wad, ToneSynth::for_mus(false));
    let result = offline.system.start_music("runnin", true);
    assert!(matches!(result, Err(SystemError::Music(_))));
}
