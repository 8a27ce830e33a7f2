//! WAD archive reader.
//!
//! Header: 4-byte magic (`IWAD`/`PWAD`), i32 lump count, i32 directory
//! offset. The directory is a table of `{ i32 filepos, i32 size, [u8; 8] name }`.

use std::io::Cursor;
use std::path::Path;

use arrayvec::ArrayString;
use binrw::BinRead;

use crate::FormatError;

#[derive(BinRead)]
#[br(little)]
struct WadHeader {
    magic: [u8; 4],
    lump_count: i32,
    directory_offset: i32,
}

#[derive(BinRead)]
#[br(little)]
struct DirectoryEntry {
    file_pos: i32,
    size: i32,
    name: [u8; 8],
}

/// Whether the archive is a full game or a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WadKind {
    Iwad,
    Pwad,
}

/// A directory entry pointing into the archive data.
#[derive(Clone, Debug)]
pub struct Lump {
    pub name: ArrayString<8>,
    pub offset: usize,
    pub size: usize,
}

/// An in-memory WAD archive.
pub struct Wad {
    kind: WadKind,
    data: Vec<u8>,
    lumps: Vec<Lump>,
}

impl Wad {
    /// Parse a WAD from its raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FormatError> {
        let mut cursor = Cursor::new(&data[..]);
        let header = WadHeader::read(&mut cursor)?;

        let kind = match &header.magic {
            b"IWAD" => WadKind::Iwad,
            b"PWAD" => WadKind::Pwad,
            _ => return Err(FormatError::InvalidHeader),
        };
        if header.lump_count < 0 || header.directory_offset < 0 {
            return Err(FormatError::InvalidHeader);
        }

        cursor.set_position(header.directory_offset as u64);
        let mut lumps = Vec::with_capacity(header.lump_count as usize);
        for _ in 0..header.lump_count {
            let entry = DirectoryEntry::read(&mut cursor)?;
            if entry.file_pos < 0 || entry.size < 0 {
                return Err(FormatError::InvalidHeader);
            }
            let offset = entry.file_pos as usize;
            let size = entry.size as usize;
            if offset + size > data.len() {
                return Err(FormatError::UnexpectedEof);
            }
            lumps.push(Lump {
                name: lump_name(&entry.name),
                offset,
                size,
            });
        }

        Ok(Self { kind, data, lumps })
    }

    /// Read and parse a WAD file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn kind(&self) -> WadKind {
        self.kind
    }

    pub fn lumps(&self) -> &[Lump] {
        &self.lumps
    }

    /// Data of the last lump named `name` (case-insensitive).
    pub fn lump(&self, name: &str) -> Option<&[u8]> {
        self.lumps
            .iter()
            .rev()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| &self.data[l.offset..l.offset + l.size])
    }

    /// Read a lump into an owned buffer.
    pub fn read_lump(&self, name: &str) -> Option<Vec<u8>> {
        self.lump(name).map(<[u8]>::to_vec)
    }
}

/// Uppercase, NUL-trimmed lump name.
fn lump_name(raw: &[u8; 8]) -> ArrayString<8> {
    let mut name = ArrayString::new();
    for &b in raw.iter().take_while(|&&b| b != 0) {
        let _ = name.try_push(b.to_ascii_uppercase() as char);
    }
    name
}
