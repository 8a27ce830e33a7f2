//! Per-channel allocation state.

use imp_core::{EmitterId, Position, SfxId, SfxKind};

/// Where a channel is in its reservation/playback cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    /// A sound is waiting for the next update to start.
    Reserved,
    Playing,
    /// Playing, with a replacement reserved for the next update.
    Replacing,
}

/// Bookkeeping for one of the contended playback channels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Channel {
    pub reserved: Option<SfxId>,
    pub playing: Option<SfxId>,
    pub priority: f32,
    /// Emitter the sound is attached to; not owned.
    pub source: Option<EmitterId>,
    pub kind: SfxKind,
    /// Base volume, 0..=100.
    pub volume: i32,
    /// Last resolved emitter position, used once the emitter is gone.
    /// `None` for a sound that was never attached to an emitter.
    pub last_position: Option<Position>,
}

impl Channel {
    pub fn state(&self) -> ChannelState {
        match (self.reserved, self.playing) {
            (None, None) => ChannelState::Idle,
            (Some(_), None) => ChannelState::Reserved,
            (None, Some(_)) => ChannelState::Playing,
            (Some(_), Some(_)) => ChannelState::Replacing,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == ChannelState::Idle
    }

    /// Take over the channel for a new sound.
    pub(crate) fn reserve(
        &mut self,
        sfx: SfxId,
        priority: f32,
        source: Option<EmitterId>,
        kind: SfxKind,
        volume: i32,
        position: Option<Position>,
    ) {
        self.reserved = Some(sfx);
        self.priority = priority;
        self.source = source;
        self.kind = kind;
        self.volume = volume;
        self.last_position = position;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
