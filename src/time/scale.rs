use std::fmt::{Display, Formatter, Result};
use std::ops::{Add, Sub};

/// Exponent selecting a base-1000 time unit: a scale `n` stands for `1000^n`
/// base units. Scales are totally ordered by their exponent; a *finer* scale
/// has a smaller exponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scale(i8);

impl Scale {
    pub const FEMTO: Scale = Scale(-5);
    pub const PICO: Scale = Scale(-4);
    pub const NANO: Scale = Scale(-3);
    pub const MICRO: Scale = Scale(-2);
    pub const MILLI: Scale = Scale(-1);
    pub const BASE: Scale = Scale(0);
    pub const KILO: Scale = Scale(1);
    pub const MEGA: Scale = Scale(2);
    pub const GIGA: Scale = Scale(3);
    pub const TERA: Scale = Scale(4);

    /// Creates a scale with the given base-1000 exponent.
    pub const fn new(exponent: i8) -> Self {
        Self(exponent)
    }

    /// Returns the base-1000 exponent of the scale.
    pub const fn exponent(&self) -> i8 {
        self.0
    }

    /// Returns the finer of the two scales.
    pub fn refined(a: Scale, b: Scale) -> Scale {
        a.min(b)
    }

    /// Returns the coarser of the two scales.
    pub fn coarsened(a: Scale, b: Scale) -> Scale {
        a.max(b)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::BASE
    }
}

/// Shifts the scale towards coarser units by `rhs` base-1000 steps.
impl Add<i8> for Scale {
    type Output = Scale;

    fn add(self, rhs: i8) -> Scale {
        Scale(self.0.saturating_add(rhs))
    }
}

/// Shifts the scale towards finer units by `rhs` base-1000 steps.
impl Sub<i8> for Scale {
    type Output = Scale;

    fn sub(self, rhs: i8) -> Scale {
        Scale(self.0.saturating_sub(rhs))
    }
}

/// Distance between two scales, in base-1000 steps.
impl Sub for Scale {
    type Output = i32;

    fn sub(self, rhs: Scale) -> i32 {
        i32::from(self.0) - i32::from(rhs.0)
    }
}

impl Display for Scale {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let exponent = i32::from(self.0) * 3;
        match exponent {
            0 => write!(f, "e0"),
            e => write!(f, "e{:+}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Scale::FEMTO < Scale::PICO);
        assert!(Scale::MILLI < Scale::BASE);
        assert!(Scale::TERA > Scale::GIGA);
        assert_eq!(Scale::refined(Scale::MICRO, Scale::KILO), Scale::MICRO);
        assert_eq!(Scale::coarsened(Scale::MICRO, Scale::KILO), Scale::KILO);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(Scale::BASE + 1, Scale::KILO);
        assert_eq!(Scale::BASE - 2, Scale::MICRO);
        assert_eq!(Scale::KILO - Scale::MICRO, 3);
        assert_eq!(Scale::FEMTO - Scale::BASE, -5);
    }

    #[test]
    fn test_display() {
        assert_eq!("e0", Scale::BASE.to_string());
        assert_eq!("e+3", Scale::KILO.to_string());
        assert_eq!("e-6", Scale::MICRO.to_string());
    }
}
