//! Unit newtypes for power system quantities.
//!
//! Device descriptions carry engineering units (MW, Mvar, MVA, kV, degrees)
//! while the compiled numerical model is in per-unit on the system base. These
//! wrappers keep the two apart: converting to per-unit always goes through an
//! explicit `to_pu` call with the base.
//!
//! ```
//! use grid_core::units::{Megawatts, MegavoltAmperes, Degrees};
//!
//! let sbase = MegavoltAmperes(100.0);
//! assert_eq!(Megawatts(50.0).to_pu(sbase).value(), 0.5);
//! assert!((Degrees(180.0).to_radians().value() - std::f64::consts::PI).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! unit_type {
    ($(#[$meta:meta])* $name:ident, $unit:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl From<f64> for $name {
            fn from(value: f64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit)
            }
        }
    };
}

unit_type!(
    /// Active power (MW)
    Megawatts,
    "MW"
);
unit_type!(
    /// Reactive power (Mvar)
    Megavars,
    "Mvar"
);
unit_type!(
    /// Apparent power (MVA); also used for the system base
    MegavoltAmperes,
    "MVA"
);
unit_type!(PerUnit, "pu");
unit_type!(Kilovolts, "kV");
unit_type!(Radians, "rad");
unit_type!(Degrees, "deg");

impl Megawatts {
    #[inline]
    pub fn to_pu(self, sbase: MegavoltAmperes) -> PerUnit {
        PerUnit(self.0 / sbase.0)
    }
}

impl Megavars {
    #[inline]
    pub fn to_pu(self, sbase: MegavoltAmperes) -> PerUnit {
        PerUnit(self.0 / sbase.0)
    }
}

impl MegavoltAmperes {
    /// Typical system base
    pub const DEFAULT_BASE: MegavoltAmperes = MegavoltAmperes(100.0);

    #[inline]
    pub fn to_pu(self, sbase: MegavoltAmperes) -> PerUnit {
        PerUnit(self.0 / sbase.0)
    }
}

impl PerUnit {
    /// Back to MW on the given base
    #[inline]
    pub fn to_megawatts(self, sbase: MegavoltAmperes) -> Megawatts {
        Megawatts(self.0 * sbase.0)
    }
}

impl Degrees {
    #[inline]
    pub fn to_radians(self) -> Radians {
        Radians(self.0.to_radians())
    }
}

impl Radians {
    #[inline]
    pub fn to_degrees(self) -> Degrees {
        Degrees(self.0.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_unit_conversion() {
        let sbase = MegavoltAmperes::DEFAULT_BASE;
        assert_eq!(Megawatts(25.0).to_pu(sbase), PerUnit(0.25));
        assert_eq!(Megavars(-10.0).to_pu(sbase), PerUnit(-0.1));
        assert_eq!(PerUnit(1.5).to_megawatts(sbase), Megawatts(150.0));
    }

    #[test]
    fn test_arithmetic_stays_in_unit() {
        let p = Megawatts(10.0) + Megawatts(5.0) - Megawatts(3.0);
        assert_eq!(p, Megawatts(12.0));
        assert_eq!(-p * 2.0, Megawatts(-24.0));
        assert_eq!((p / 4.0).value(), 3.0);
    }

    #[test]
    fn test_angle_round_trip() {
        let rad = Degrees(30.0).to_radians();
        assert!((rad.to_degrees().value() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Kilovolts(138.0)), "138.0000 kV");
    }
}
