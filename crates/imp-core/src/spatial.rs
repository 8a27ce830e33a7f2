//! Distance attenuation and stereo placement.

use crate::emitter::{Listener, Position};

/// Below this distance a sound is heard at full volume.
pub const CLOSE_DIST: f32 = 160.0;

/// At or beyond this distance a sound is inaudible.
pub const CLIP_DIST: f32 = 1200.0;

/// Offsets smaller than this on both axes are treated as centered.
pub const CENTER_RADIUS: f32 = 16.0;

const ATTENUATOR: f32 = CLIP_DIST - CLOSE_DIST;

/// Linear distance falloff: 1 below [`CLOSE_DIST`], 0 from [`CLIP_DIST`] on.
pub fn distance_decay(dist: f32) -> f32 {
    if dist < CLOSE_DIST {
        1.0
    } else {
        ((CLIP_DIST - dist) / ATTENUATOR).max(0.0)
    }
}

/// Euclidean distance between two map positions, in map units.
pub fn distance(a: Position, b: Position) -> f32 {
    let dx = (a.x - b.x).to_f32();
    let dy = (a.y - b.y).to_f32();
    libm::sqrtf(dx * dx + dy * dy)
}

/// Where a positional sound sits relative to the listener.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Too close to place; play centered at full volume.
    Centered,
    /// Attenuated by `decay`, at `angle` radians (π/2 = straight ahead).
    Placed { decay: f32, angle: f32 },
}

/// Place `source` relative to `listener`.
pub fn place(source: Position, listener: &Listener) -> Placement {
    let dx = (source.x - listener.position.x).to_f32();
    let dy = (source.y - listener.position.y).to_f32();

    if libm::fabsf(dx) < CENTER_RADIUS && libm::fabsf(dy) < CENTER_RADIUS {
        return Placement::Centered;
    }

    let dist = libm::sqrtf(dx * dx + dy * dy);
    let angle = libm::atan2f(dy, dx) - listener.angle.to_radians() as f32
        + core::f32::consts::FRAC_PI_2;
    Placement::Placed {
        decay: distance_decay(dist),
        angle,
    }
}

/// Stereo balance in [-1, 1] for a placement angle (-1 = hard left).
pub fn balance(angle: f32) -> f32 {
    libm::cosf(angle)
}
