//! Format parsers for imp.
//!
//! Reads WAD archives, DMX sound lumps, MUS/MIDI score headers and WAV
//! files into the core types.

mod dmx;
mod score;
mod wad;
mod wav_format;

pub use dmx::load_dmx_sound;
pub use score::{detect_score, MusHeader, ScoreFormat, MIDI_MAGIC, MUS_MAGIC};
pub use wad::{Lump, Wad, WadKind};
pub use wav_format::{frames_to_wav, load_wav, write_wav};

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("invalid header")]
    InvalidHeader,
    /// Score matches neither the MUS nor the MIDI signature
    #[error("unknown score format")]
    UnknownScoreFormat,
    /// Unexpected end of file
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// Unsupported format version
    #[error("unsupported format version")]
    UnsupportedVersion,
    /// Structural parse failure
    #[error("parse error: {0}")]
    Parse(String),
    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::BadMagic { .. } => FormatError::InvalidHeader,
            e if e.is_eof() => FormatError::UnexpectedEof,
            binrw::Error::Io(e) => FormatError::Io(e),
            other => FormatError::Parse(other.to_string()),
        }
    }
}
