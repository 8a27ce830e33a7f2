//! RIFF/WAVE effects in, 16-bit stereo renders out.
//!
//! Only uncompressed PCM at 8 or 16 bits is accepted, mono or stereo.
//! Stereo effects are folded to mono by averaging.

use std::io::{Cursor, Write};

use binrw::{BinRead, BinWrite};
use imp_core::{Frame, SoundBuffer};

use crate::FormatError;

const PCM: u16 = 1;
/// RIFF header, `fmt ` chunk and `data` chunk header.
const HEADER_LEN: usize = 44;

#[derive(BinRead, BinWrite)]
#[brw(little)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[derive(BinRead, BinWrite, Clone, Copy, Debug)]
#[brw(little)]
struct FmtChunk {
    format: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl FmtChunk {
    fn stereo16(sample_rate: u32) -> Self {
        Self {
            format: PCM,
            channels: 2,
            sample_rate,
            byte_rate: sample_rate * 4,
            block_align: 4,
            bits_per_sample: 16,
        }
    }
}

/// Write `frames` as a 16-bit stereo WAV file.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    let data_size = (frames.len() * 4) as u32;
    let mut header = Cursor::new(Vec::with_capacity(HEADER_LEN));
    write_header(&mut header, data_size, sample_rate).map_err(std::io::Error::other)?;
    w.write_all(header.get_ref())?;

    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        w.write_all(&frame.right.to_le_bytes())?;
    }
    Ok(())
}

fn write_header(out: &mut Cursor<Vec<u8>>, data_size: u32, sample_rate: u32) -> binrw::BinResult<()> {
    ChunkHeader { id: *b"RIFF", size: HEADER_LEN as u32 - 8 + data_size }.write_le(out)?;
    b"WAVE".write_le(out)?;
    ChunkHeader { id: *b"fmt ", size: 16 }.write_le(out)?;
    FmtChunk::stereo16(sample_rate).write_le(out)?;
    ChunkHeader { id: *b"data", size: data_size }.write_le(out)
}

/// [`write_wav`] into a fresh buffer.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + frames.len() * 4);
    // Writes into a Vec only fail on allocation failure, which aborts.
    let _ = write_wav(&mut buf, frames, sample_rate);
    buf
}

/// Decode a RIFF effect lump into a mono sound buffer.
pub fn load_wav(data: &[u8], name: &str) -> Result<SoundBuffer, FormatError> {
    let mut cursor = Cursor::new(data);
    let riff = ChunkHeader::read(&mut cursor)?;
    let form = <[u8; 4]>::read_le(&mut cursor)?;
    if &riff.id != b"RIFF" || &form != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut fmt = None;
    let mut pcm = None;
    while (cursor.position() as usize) + 8 <= data.len() {
        let chunk = ChunkHeader::read(&mut cursor)?;
        let start = cursor.position() as usize;
        match &chunk.id {
            b"fmt " => fmt = Some(FmtChunk::read(&mut cursor)?),
            b"data" => {
                let end = start.saturating_add(chunk.size as usize).min(data.len());
                pcm = Some(&data[start..end]);
            }
            _ => {}
        }
        // Chunks are word aligned.
        let next = start as u64 + chunk.size as u64 + (chunk.size & 1) as u64;
        cursor.set_position(next);
    }

    let fmt = fmt.ok_or(FormatError::InvalidHeader)?;
    let pcm = pcm.ok_or(FormatError::InvalidHeader)?;
    let supported = fmt.format == PCM
        && matches!(fmt.bits_per_sample, 8 | 16)
        && matches!(fmt.channels, 1 | 2);
    if !supported {
        return Err(FormatError::UnsupportedVersion);
    }

    Ok(SoundBuffer::new(name, fold_to_mono(pcm, fmt), fmt.sample_rate))
}

fn fold_to_mono(pcm: &[u8], fmt: FmtChunk) -> Vec<i16> {
    let width = fmt.bits_per_sample as usize / 8;
    let channels = fmt.channels as usize;
    pcm.chunks_exact(width * channels)
        .map(|frame| {
            let sum: i32 = frame.chunks_exact(width).map(|s| pcm_sample(s) as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// 8-bit PCM is unsigned around 128; 16-bit is signed little-endian.
fn pcm_sample(bytes: &[u8]) -> i16 {
    match bytes {
        &[b] => (b as i16 - 128) << 8,
        &[lo, hi] => i16::from_le_bytes([lo, hi]),
        _ => 0,
    }
}
