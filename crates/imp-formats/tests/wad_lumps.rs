//! Reading every lump kind the audio subsystem uses out of one archive.

use imp_core::Frame;
use imp_formats::{
    detect_score, frames_to_wav, load_dmx_sound, load_wav, FormatError, MusHeader, ScoreFormat,
    Wad, WadKind,
};

fn make_wad(lumps: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut buf = b"PWAD".to_vec();
    buf.extend((lumps.len() as i32).to_le_bytes());
    buf.extend(0i32.to_le_bytes());
    let mut dir = Vec::new();
    for (name, data) in lumps {
        dir.extend((buf.len() as i32).to_le_bytes());
        dir.extend((data.len() as i32).to_le_bytes());
        let mut raw = [0u8; 8];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        dir.extend(raw);
        buf.extend_from_slice(data);
    }
    let offset = buf.len() as i32;
    buf[8..12].copy_from_slice(&offset.to_le_bytes());
    buf.extend(dir);
    buf
}

fn dmx(bytes: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(3u16.to_le_bytes());
    data.extend(22050u16.to_le_bytes());
    data.extend((bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
    data
}

fn mus_score() -> Vec<u8> {
    let mut data = b"MUS\x1a".to_vec();
    for field in [1u16, 20, 3, 0, 2, 0, 30, 45] {
        data.extend(field.to_le_bytes());
    }
    data.push(0x60);
    data
}

fn archive() -> Wad {
    let wav = frames_to_wav(&[Frame::from_f32(0.5, 0.5), Frame::from_f32(-0.5, -0.5)], 11025);
    Wad::from_bytes(make_wad(&[
        ("DSPISTOL", dmx(&[0x80, 0xFF, 0x00, 0x80])),
        ("DSEMPTY", dmx(&[])),
        ("DSRIFF", wav),
        ("D_E1M1", mus_score()),
        ("D_RUNNIN", b"MThd\0\0\0\x06\0\x01".to_vec()),
    ]))
    .unwrap()
}

#[test]
fn dmx_effect_loads() {
    let wad = archive();
    assert_eq!(wad.kind(), WadKind::Pwad);
    let sound = load_dmx_sound(wad.lump("dspistol").unwrap(), "pistol")
        .unwrap()
        .unwrap();
    assert_eq!(sound.sample_rate, 22050);
    assert_eq!(sound.samples, vec![0, 127 << 8, -128 << 8, 0]);
}

#[test]
fn empty_dmx_effect_is_unplayable() {
    let wad = archive();
    assert!(load_dmx_sound(wad.lump("DSEMPTY").unwrap(), "empty").unwrap().is_none());
}

#[test]
fn wav_effect_is_downmixed() {
    let wad = archive();
    let sound = load_wav(wad.lump("DSRIFF").unwrap(), "riff").unwrap();
    assert_eq!(sound.sample_rate, 11025);
    assert_eq!(sound.samples.len(), 2);
    assert!(sound.samples[0] > 16000);
    assert!(sound.samples[1] < -16000);
}

#[test]
fn scores_are_told_apart() {
    let wad = archive();
    let mus = wad.lump("D_E1M1").unwrap();
    assert_eq!(detect_score(mus).unwrap(), ScoreFormat::Mus);
    assert_eq!(detect_score(wad.lump("D_RUNNIN").unwrap()).unwrap(), ScoreFormat::Midi);

    let header = MusHeader::parse(mus).unwrap();
    assert_eq!(header.score_start, 20);
    assert_eq!(header.primary_channels, 3);
    assert_eq!(header.instruments, vec![30, 45]);
}

#[test]
fn missing_lump_is_none() {
    let wad = archive();
    assert!(wad.lump("D_E9M9").is_none());
    assert!(wad.read_lump("DSPISTOL").is_some());
}

#[test]
fn non_score_is_rejected() {
    assert!(matches!(detect_score(b"RIFF"), Err(FormatError::UnknownScoreFormat)));
    assert!(matches!(detect_score(b"MU"), Err(FormatError::UnknownScoreFormat)));
}
