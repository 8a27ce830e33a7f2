//! Audio frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Convert a pair of float samples in [-1, 1], clamping out-of-range values.
    pub fn from_f32(left: f32, right: f32) -> Self {
        Self {
            left: (left.clamp(-1.0, 1.0) * 32767.0) as i16,
            right: (right.clamp(-1.0, 1.0) * 32767.0) as i16,
        }
    }

    /// Mix another frame into this one.
    pub fn mix(&mut self, other: Frame) {
        // Use i32 to avoid overflow, then clamp
        let left = (self.left as i32 + other.left as i32).clamp(-32768, 32767);
        let right = (self.right as i32 + other.right as i32).clamp(-32768, 32767);
        self.left = left as i16;
        self.right = right as i16;
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}
