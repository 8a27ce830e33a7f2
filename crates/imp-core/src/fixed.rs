//! Fixed-point world units and binary angles.

use core::ops::{Add, Sub};

/// 16.16 fixed-point value, the unit of world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(pub i32);

impl Fixed {
    pub const FRAC_BITS: u32 = 16;
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(1 << 16);

    /// Build from a whole number of map units.
    pub const fn from_int(value: i32) -> Self {
        Self(value << Self::FRAC_BITS)
    }

    /// Build from a float, truncating toward zero.
    pub fn from_f32(value: f32) -> Self {
        Self((value * 65536.0) as i32)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 65536.0
    }
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

/// Binary angle: the full circle maps onto the whole `u32` range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Angle(pub u32);

impl Angle {
    pub const ANG0: Angle = Angle(0);
    pub const ANG90: Angle = Angle(0x4000_0000);
    pub const ANG180: Angle = Angle(0x8000_0000);
    pub const ANG270: Angle = Angle(0xC000_0000);

    pub fn from_degrees(degrees: f64) -> Self {
        let turns = degrees / 360.0;
        let frac = turns - libm::floor(turns);
        Self((frac * 4_294_967_296.0) as u64 as u32)
    }

    pub fn from_radians(radians: f64) -> Self {
        Self::from_degrees(radians * 180.0 / core::f64::consts::PI)
    }

    pub fn to_radians(self) -> f64 {
        2.0 * core::f64::consts::PI * self.0 as f64 / 4_294_967_296.0
    }

    pub fn to_degrees(self) -> f64 {
        360.0 * self.0 as f64 / 4_294_967_296.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fixed_int_round_trips_through_float() {
        assert_eq!(Fixed::from_int(160).to_f32(), 160.0);
        assert_eq!(Fixed::from_int(-3).to_f32(), -3.0);
        assert_eq!(Fixed::from_f32(0.5), Fixed(32768));
    }

    #[test]
    fn fixed_subtraction() {
        let d = Fixed::from_int(10) - Fixed::from_int(25);
        assert_eq!(d, Fixed::from_int(-15));
    }

    #[test]
    fn cardinal_angles() {
        assert_relative_eq!(Angle::ANG90.to_radians(), core::f64::consts::FRAC_PI_2);
        assert_relative_eq!(Angle::ANG180.to_degrees(), 180.0);
        assert_eq!(Angle::from_degrees(270.0), Angle::ANG270);
        assert_eq!(Angle::from_degrees(-90.0), Angle::ANG270);
    }
}
