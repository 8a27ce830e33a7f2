//! Emitter handles and the listener.
//!
//! Emitters are owned by the simulation. The audio side only keeps a
//! generational [`EmitterId`] and asks an [`EmitterPositions`] lookup for
//! the current position each time it needs one; a removed emitter simply
//! stops resolving.

use slotmap::SlotMap;

use crate::fixed::{Angle, Fixed};

slotmap::new_key_type! {
    /// Non-owning handle to a sound-emitting entity.
    pub struct EmitterId;
}

/// A point on the 2D map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: Fixed,
    pub y: Fixed,
}

impl Position {
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Position from whole map units.
    pub const fn from_units(x: i32, y: i32) -> Self {
        Self {
            x: Fixed::from_int(x),
            y: Fixed::from_int(y),
        }
    }
}

/// Liveness-checked position lookup for emitters.
pub trait EmitterPositions {
    /// Current position of `emitter`, or `None` once it no longer exists.
    fn position(&self, emitter: EmitterId) -> Option<Position>;
}

impl EmitterPositions for SlotMap<EmitterId, Position> {
    fn position(&self, emitter: EmitterId) -> Option<Position> {
        self.get(emitter).copied()
    }
}

/// The single point of audition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Listener {
    pub position: Position,
    pub angle: Angle,
}

impl Listener {
    pub const fn new(position: Position, angle: Angle) -> Self {
        Self { position, angle }
    }
}
