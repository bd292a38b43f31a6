use super::Scale;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result};
use std::ops::{Add, Neg, Sub};

/// Largest magnitude a duration multiplier may hold.
pub const MULTIPLIER_MAX: i64 = 999_999_999_999_999;

/// Size of one epoch window: `10^15` quanta at any given scale.
pub const MULTIPLIER_LIMIT: i64 = 1_000_000_000_000_000;

/// A time interval: a signed multiplier of the base-1000 unit selected by its
/// precision scale. Durations at different precisions compare by normalizing
/// to the finer scale whenever the refined multiplier is representable.
#[derive(Clone, Copy, Debug)]
pub struct Duration {
    multiplier: i64,
    precision: Scale,
    fixed: bool,
}

impl Duration {
    /// An interval that never elapses. Passive models plan at `INFINITY`.
    pub const INFINITY: Duration = Duration {
        multiplier: i64::MAX,
        precision: Scale::BASE,
        fixed: false,
    };

    /// The zero interval at the base scale.
    pub const ZERO: Duration = Duration {
        multiplier: 0,
        precision: Scale::BASE,
        fixed: false,
    };

    /// Creates a duration of `multiplier` quanta at the given scale.
    /// Multipliers beyond [`MULTIPLIER_MAX`] clamp to the infinite duration.
    pub fn new(multiplier: i64, precision: Scale) -> Self {
        if multiplier > MULTIPLIER_MAX {
            return Self::INFINITY;
        }
        if multiplier < -MULTIPLIER_MAX {
            return -Self::INFINITY;
        }
        Self {
            multiplier,
            precision,
            fixed: false,
        }
    }

    pub fn multiplier(&self) -> i64 {
        self.multiplier
    }

    pub fn precision(&self) -> Scale {
        self.precision
    }

    /// A fixed duration refuses to lose its scale: overflow while re-expressing
    /// it is reported instead of silently coarsened.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn is_zero(&self) -> bool {
        !self.is_infinite() && self.multiplier == 0
    }

    pub fn is_infinite(&self) -> bool {
        self.multiplier == i64::MAX || self.multiplier == i64::MIN
    }

    pub fn is_negative(&self) -> bool {
        self.multiplier < 0
    }

    /// Re-expresses the duration at `to`. Coarsening divides the multiplier
    /// (truncating toward zero); refining multiplies and clamps to the
    /// infinite duration on overflow.
    pub fn rescale(&self, to: Scale) -> Self {
        if self.is_infinite() || self.precision == to {
            return Self {
                precision: to,
                ..*self
            };
        }
        let steps = self.precision - to;
        if steps > 0 {
            match self.refined_multiplier(to) {
                Some(m) => Self {
                    multiplier: m,
                    precision: to,
                    fixed: self.fixed,
                },
                None if self.multiplier >= 0 => Self {
                    fixed: self.fixed,
                    ..Self::INFINITY
                },
                None => Self {
                    fixed: self.fixed,
                    ..-Self::INFINITY
                },
            }
        } else {
            let multiplier = match 1000i128.checked_pow(steps.unsigned_abs()) {
                Some(factor) => (i128::from(self.multiplier) / factor) as i64,
                None => 0,
            };
            Self {
                multiplier,
                precision: to,
                fixed: self.fixed,
            }
        }
    }

    /// Pins the duration at exactly `scale`. The result is marked as fixed;
    /// if the multiplier cannot be represented at that scale, the infinite
    /// duration is returned (still marked as fixed).
    pub fn fixed_at(&self, scale: Scale) -> Self {
        if self.is_infinite() {
            return Self {
                precision: scale,
                fixed: true,
                ..*self
            };
        }
        Self {
            fixed: true,
            ..self.rescale(scale)
        }
    }

    /// Floating-point approximation of the interval in base units.
    pub fn to_f64(&self) -> f64 {
        if self.is_infinite() {
            return if self.multiplier > 0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        self.multiplier as f64 * 1000f64.powi(i32::from(self.precision.exponent()))
    }

    /// Multiplier re-expressed at a finer scale, or `None` if it would exceed
    /// [`MULTIPLIER_MAX`].
    fn refined_multiplier(&self, to: Scale) -> Option<i64> {
        let steps = self.precision - to;
        debug_assert!(steps >= 0);
        if self.multiplier == 0 {
            return Some(0);
        }
        let factor = 1000i128.checked_pow(u32::try_from(steps).ok()?)?;
        let refined = i128::from(self.multiplier).checked_mul(factor)?;
        if refined.unsigned_abs() > MULTIPLIER_MAX as u128 {
            None
        } else {
            Some(refined as i64)
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Duration {
    type Output = Duration;

    /// Normalizes both operands to the finer scale when the refined values
    /// fit; otherwise coarsens the finer operand to the coarser scale.
    fn add(self, rhs: Duration) -> Duration {
        if self.is_infinite() {
            return self;
        }
        if rhs.is_infinite() {
            return rhs;
        }
        let fine = Scale::refined(self.precision, rhs.precision);
        if let (Some(a), Some(b)) = (self.refined_multiplier(fine), rhs.refined_multiplier(fine)) {
            return Duration::new(a + b, fine);
        }
        let coarse = Scale::coarsened(self.precision, rhs.precision);
        let a = self.rescale(coarse);
        let b = rhs.rescale(coarse);
        Duration::new(a.multiplier + b.multiplier, coarse)
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        self + (-rhs)
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        let multiplier = match self.multiplier {
            i64::MAX => i64::MIN,
            i64::MIN => i64::MAX,
            m => -m,
        };
        Duration {
            multiplier,
            ..self
        }
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Duration {}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_infinite(), other.is_infinite()) {
            (true, true) => self.multiplier.cmp(&other.multiplier),
            (true, false) => sign_ordering(self.multiplier),
            (false, true) => sign_ordering(other.multiplier).reverse(),
            (false, false) => {
                let fine = Scale::refined(self.precision, other.precision);
                match (self.refined_multiplier(fine), other.refined_multiplier(fine)) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    // A multiplier beyond the representable window at the
                    // finer scale outweighs any representable one.
                    (None, Some(_)) => sign_ordering(self.multiplier),
                    (Some(_), None) => sign_ordering(other.multiplier).reverse(),
                    (None, None) => match (self.multiplier > 0, other.multiplier > 0) {
                        (true, false) => Ordering::Greater,
                        (false, true) => Ordering::Less,
                        _ => self
                            .to_f64()
                            .partial_cmp(&other.to_f64())
                            .unwrap_or(Ordering::Equal),
                    },
                }
            }
        }
    }
}

fn sign_ordering(multiplier: i64) -> Ordering {
    if multiplier > 0 {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_infinite() {
            if self.multiplier < 0 {
                write!(f, "-")?;
            }
            return write!(f, "inf");
        }
        write!(f, "{}", self.multiplier)?;
        if self.precision != Scale::BASE {
            write!(f, "{}", self.precision)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_clamps() {
        assert!(Duration::new(MULTIPLIER_MAX + 1, Scale::BASE).is_infinite());
        assert!(Duration::new(-(MULTIPLIER_MAX + 1), Scale::BASE).is_infinite());
        assert!(!Duration::new(MULTIPLIER_MAX, Scale::BASE).is_infinite());
    }

    #[test]
    fn test_zero_compares_equal_across_scales() {
        assert_eq!(
            Duration::new(0, Scale::FEMTO),
            Duration::new(0, Scale::TERA)
        );
        assert!(Duration::new(0, Scale::TERA) < Duration::new(1, Scale::FEMTO));
    }

    #[test]
    fn test_cross_scale_comparison() {
        assert_eq!(
            Duration::new(1, Scale::KILO),
            Duration::new(1000, Scale::BASE)
        );
        assert!(Duration::new(999, Scale::BASE) < Duration::new(1, Scale::KILO));
        assert!(Duration::new(1, Scale::TERA) > Duration::new(MULTIPLIER_MAX, Scale::FEMTO));
        assert!(Duration::new(-3, Scale::KILO) < Duration::new(5, Scale::BASE));
    }

    #[test]
    fn test_infinity_orders_greatest() {
        assert!(Duration::INFINITY > Duration::new(MULTIPLIER_MAX, Scale::TERA));
        assert!(-Duration::INFINITY < Duration::new(-MULTIPLIER_MAX, Scale::TERA));
        assert_eq!(Duration::INFINITY, Duration::INFINITY);
    }

    #[test]
    fn test_rescale() {
        let d = Duration::new(5_000_000, Scale::MILLI);
        assert_eq!(d.rescale(Scale::BASE).multiplier(), 5_000);
        assert_eq!(d.rescale(Scale::KILO).multiplier(), 5);
        assert_eq!(d.rescale(Scale::MICRO).multiplier(), 5_000_000_000);
        // truncation toward zero
        let d = Duration::new(-1500, Scale::BASE);
        assert_eq!(d.rescale(Scale::KILO).multiplier(), -1);
    }

    #[test]
    fn test_rescale_overflow() {
        let d = Duration::new(MULTIPLIER_MAX, Scale::BASE);
        assert!(d.rescale(Scale::MILLI).is_infinite());
        assert!(d.rescale(Scale::KILO).multiplier() == MULTIPLIER_MAX / 1000);
    }

    #[test]
    fn test_fixed_at() {
        let d = Duration::new(25, Scale::BASE).fixed_at(Scale::BASE);
        assert!(d.is_fixed());
        assert_eq!(d.multiplier(), 25);

        let coarse = Duration::new(2, Scale::TERA).fixed_at(Scale::FEMTO);
        assert!(coarse.is_fixed());
        assert!(coarse.is_infinite());

        let inf = Duration::INFINITY.fixed_at(Scale::FEMTO);
        assert!(inf.is_infinite());
        assert!(inf.is_fixed());
    }

    #[test]
    fn test_addition_normalizes_to_finer() {
        let sum = Duration::new(1, Scale::KILO) + Duration::new(500, Scale::BASE);
        assert_eq!(sum, Duration::new(1500, Scale::BASE));
        assert_eq!(sum.precision(), Scale::BASE);
    }

    #[test]
    fn test_addition_coarsens_on_overflow() {
        // 1 tera-unit cannot be expressed at femto precision, so the femto
        // operand coarsens to tera and vanishes in the division.
        let sum = Duration::new(1, Scale::TERA) + Duration::new(5, Scale::FEMTO);
        assert_eq!(sum.precision(), Scale::TERA);
        assert_eq!(sum.multiplier(), 1);
    }

    #[test]
    fn test_subtraction_and_negation() {
        let d = Duration::new(25, Scale::BASE) - Duration::new(25, Scale::BASE);
        assert!(d.is_zero());
        assert_eq!(-Duration::new(7, Scale::MILLI), Duration::new(-7, Scale::MILLI));
        assert!((Duration::INFINITY - Duration::new(5, Scale::BASE)).is_infinite());
    }

    #[test]
    fn test_display() {
        assert_eq!("500", Duration::new(500, Scale::BASE).to_string());
        assert_eq!("25e+3", Duration::new(25, Scale::KILO).to_string());
        assert_eq!("-7e-3", Duration::new(-7, Scale::MILLI).to_string());
        assert_eq!("inf", Duration::INFINITY.to_string());
    }
}
