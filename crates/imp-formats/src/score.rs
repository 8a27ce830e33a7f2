//! Music score header detection and the MUS header.

use std::io::Cursor;

use binrw::BinRead;

use crate::FormatError;

/// Signature of a MUS bytecode score.
pub const MUS_MAGIC: [u8; 4] = *b"MUS\x1a";

/// Signature of a standard MIDI file.
pub const MIDI_MAGIC: [u8; 4] = *b"MThd";

/// The two score containers a music lump can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreFormat {
    Mus,
    Midi,
}

/// Identify a score by its first four bytes.
pub fn detect_score(data: &[u8]) -> Result<ScoreFormat, FormatError> {
    match data.get(..4) {
        Some(magic) if magic == MUS_MAGIC => Ok(ScoreFormat::Mus),
        Some(magic) if magic == MIDI_MAGIC => Ok(ScoreFormat::Midi),
        _ => Err(FormatError::UnknownScoreFormat),
    }
}

/// Fixed header at the start of every MUS lump.
#[derive(BinRead, Clone, Debug, PartialEq, Eq)]
#[br(little, magic = b"MUS\x1a")]
pub struct MusHeader {
    /// Length of the event stream in bytes
    pub score_length: u16,
    /// Offset of the first event from the start of the lump
    pub score_start: u16,
    /// Number of primary channels
    pub primary_channels: u16,
    /// Number of secondary channels
    pub secondary_channels: u16,
    pub instrument_count: u16,
    /// Patch numbers used by the score
    #[br(pad_before = 2, count = instrument_count)]
    pub instruments: Vec<u16>,
}

impl MusHeader {
    /// Parse the header, checking that the event stream starts inside `data`.
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        let header = Self::read(&mut Cursor::new(data))?;
        if header.score_start as usize >= data.len() {
            return Err(FormatError::UnexpectedEof);
        }
        Ok(header)
    }
}
