//! DMX digital sound lumps (`DS*`).
//!
//! Layout: u16 format, u16 sample rate, u32 sample count, then unsigned
//! 8-bit PCM. Most lumps pad the waveform with 16 repeated bytes at each
//! end; see <https://doomwiki.org/wiki/Sound>.

use imp_core::SoundBuffer;

use crate::FormatError;

const HEADER_LEN: usize = 8;
const PAD_LEN: usize = 16;

/// Load a DMX sound lump.
///
/// Returns `Ok(None)` for a lump that holds no playable samples.
pub fn load_dmx_sound(data: &[u8], name: &str) -> Result<Option<SoundBuffer>, FormatError> {
    if data.len() < HEADER_LEN {
        return Ok(None);
    }

    let sample_rate = u16::from_le_bytes([data[2], data[3]]) as u32;
    let declared = i32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if declared <= 0 {
        return Ok(None);
    }
    let declared = declared as usize;
    if HEADER_LEN + declared > data.len() {
        return Err(FormatError::UnexpectedEof);
    }

    let mut offset = HEADER_LEN;
    let mut count = declared;
    if has_dmx_padding(&data[HEADER_LEN..HEADER_LEN + declared]) {
        offset += PAD_LEN;
        count -= 2 * PAD_LEN;
    }
    if count == 0 {
        return Ok(None);
    }

    let samples = data[offset..offset + count]
        .iter()
        .map(|&b| ((b as i16) - 128) << 8)
        .collect();

    Ok(Some(SoundBuffer::new(name, samples, sample_rate)))
}

/// True when the first and last 16 bytes are each a single repeated value.
fn has_dmx_padding(pcm: &[u8]) -> bool {
    if pcm.len() < 2 * PAD_LEN {
        return false;
    }
    let head = &pcm[..PAD_LEN];
    let tail = &pcm[pcm.len() - PAD_LEN..];
    head.iter().all(|&b| b == head[0]) && tail.iter().all(|&b| b == tail[PAD_LEN - 1])
}
