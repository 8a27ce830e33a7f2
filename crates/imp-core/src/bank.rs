//! Loaded sound effects indexed by id.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::sound::SoundBuffer;

/// Index of an effect in a [`SoundBank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SfxId(pub u16);

struct Entry {
    name: ArrayString<8>,
    buffer: Option<Arc<SoundBuffer>>,
}

/// Every effect the game references, playable or not.
///
/// An effect whose lump was missing or empty keeps its id but has no
/// buffer; starting it is a silent no-op.
#[derive(Default)]
pub struct SoundBank {
    entries: Vec<Entry>,
}

impl SoundBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect under `name`, returning its id.
    pub fn insert(&mut self, name: &str, buffer: Option<SoundBuffer>) -> SfxId {
        let id = SfxId(self.entries.len() as u16);
        let mut key = ArrayString::new();
        for c in name.chars().take(8) {
            let _ = key.try_push(c.to_ascii_lowercase());
        }
        self.entries.push(Entry {
            name: key,
            buffer: buffer.map(Arc::new),
        });
        id
    }

    /// Look up an effect id by name (case-insensitive).
    pub fn id(&self, name: &str) -> Option<SfxId> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
            .map(|i| SfxId(i as u16))
    }

    /// The playable buffer for `id`, if any.
    pub fn get(&self, id: SfxId) -> Option<&Arc<SoundBuffer>> {
        self.entries.get(id.0 as usize)?.buffer.as_ref()
    }

    pub fn name(&self, id: SfxId) -> Option<&str> {
        self.entries.get(id.0 as usize).map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of effects with a playable buffer.
    pub fn playable_count(&self) -> usize {
        self.entries.iter().filter(|e| e.buffer.is_some()).count()
    }

    /// Drop every buffer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
