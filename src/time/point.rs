use super::{Duration, Scale, MULTIPLIER_LIMIT};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result};
use std::ops::{Index, Sub};

/// An absolute, non-negative epoch time: a little-endian base-1000 digit
/// sequence whose least significant digit sits at the precision scale.
///
/// The representation is kept canonical at all times: trailing (high-order)
/// zero digits are stripped, and leading (low-order) zero digits are absorbed
/// by coarsening the precision, so that equality and ordering are total over
/// the represented magnitudes.
#[derive(Clone, Debug)]
pub struct TimePoint {
    /// Base-1000 digits, least significant first. Never empty.
    digits: Vec<u16>,
    /// Scale of `digits[0]`.
    precision: Scale,
}

impl TimePoint {
    /// The origin of the timeline, at the base scale.
    pub fn origin() -> Self {
        Self {
            digits: vec![0],
            precision: Scale::BASE,
        }
    }

    /// Creates a time point worth `value` quanta at the given scale. The
    /// digit sequence is canonicalized on the way in, so e.g. 5000 base units
    /// become a single digit at the kilo scale.
    pub fn new(value: u64, precision: Scale) -> Self {
        let mut digits = Vec::new();
        let mut rest = value;
        loop {
            digits.push((rest % 1000) as u16);
            rest /= 1000;
            if rest == 0 {
                break;
            }
        }
        let mut point = Self { digits, precision };
        point.canonicalize();
        point
    }

    pub fn is_zero(&self) -> bool {
        self.digits == [0]
    }

    pub fn precision(&self) -> Scale {
        self.precision
    }

    /// Number of stored base-1000 digits.
    pub fn size(&self) -> usize {
        self.digits.len()
    }

    /// Digits of the magnitude, least significant first.
    pub fn digits(&self) -> &[u16] {
        &self.digits
    }

    /// Returns the digit at the given scale, or 0 outside the stored range.
    pub fn digit_at(&self, scale: Scale) -> u16 {
        self.digit_at_exponent(i32::from(scale.exponent()))
    }

    /// Advances the point in place, truncating it to the duration's precision
    /// whenever the duration is the coarser of the two.
    pub fn advance(&mut self, duration: Duration) {
        self.advance_by(duration, true);
    }

    /// Advances the point in place without ever dropping digits: a coarser
    /// duration is applied at its own digit position and the point keeps its
    /// finer precision.
    pub fn advance_untruncated(&mut self, duration: Duration) {
        self.advance_by(duration, false);
    }

    fn advance_by(&mut self, duration: Duration, truncate: bool) {
        if duration.is_infinite() || duration.is_zero() {
            return;
        }
        let offset = self.align(duration.precision(), truncate);
        let mut idx = offset;
        let mut carry = i128::from(duration.multiplier());
        while carry != 0 {
            if idx >= self.digits.len() {
                if carry < 0 {
                    // Borrowed past the most significant digit: the advance
                    // went below the origin. Clamp there.
                    self.digits.clear();
                    self.digits.push(0);
                    return;
                }
                self.digits.resize(idx + 1, 0);
            }
            let sum = i128::from(self.digits[idx]) + carry;
            let digit = sum.rem_euclid(1000);
            carry = (sum - digit) / 1000;
            self.digits[idx] = digit as u16;
            idx += 1;
        }
        self.canonicalize();
    }

    /// Aligns the digit sequence with a duration precision and returns the
    /// index at which its multiplier must be propagated.
    fn align(&mut self, precision: Scale, truncate: bool) -> usize {
        if precision > self.precision {
            let steps = (precision - self.precision) as usize;
            if !truncate {
                return steps;
            }
            if steps >= self.digits.len() {
                self.digits.clear();
                self.digits.push(0);
            } else {
                self.digits.drain(..steps);
            }
            self.precision = precision;
        } else if precision < self.precision {
            let steps = (self.precision - precision) as usize;
            self.digits.splice(0..0, std::iter::repeat(0).take(steps));
            self.precision = precision;
        }
        0
    }

    /// Exact difference `self − other`, expressed at the finest scale (no
    /// coarser than necessary, no finer than the operands) whose multiplier
    /// window can hold the magnitude. When digits must be dropped, the
    /// truncation error stays strictly below one quantum of the returned
    /// scale.
    pub fn gap(&self, other: &TimePoint) -> Duration {
        let (big, small, negative) = match self.cmp(other) {
            Ordering::Equal => return Duration::ZERO,
            Ordering::Less => (other, self, true),
            Ordering::Greater => (self, other, false),
        };
        let lo = i32::from(Scale::refined(self.precision, other.precision).exponent());
        let hi = big.top_exponent().max(small.top_exponent());
        let span = (hi - lo + 1) as usize;
        let mut diff = vec![0u16; span];
        let mut borrow = 0i32;
        for (i, d) in diff.iter_mut().enumerate() {
            let e = lo + i as i32;
            let mut v =
                i32::from(big.digit_at_exponent(e)) - i32::from(small.digit_at_exponent(e)) - borrow;
            if v < 0 {
                v += 1000;
                borrow = 1;
            } else {
                borrow = 0;
            }
            *d = v as u16;
        }
        debug_assert_eq!(borrow, 0);
        let mut len = span;
        while len > 1 && diff[len - 1] == 0 {
            len -= 1;
        }
        // Five base-1000 digits are exactly one multiplier window, so keep the
        // top five and absorb everything below into the scale.
        let dropped = len.saturating_sub(5);
        let exponent = lo + dropped as i32;
        if exponent > i32::from(i8::MAX) {
            return Duration::INFINITY;
        }
        let mut multiplier = 0i64;
        for &d in diff[dropped..len].iter().rev() {
            multiplier = multiplier * 1000 + i64::from(d);
        }
        let gap = Duration::new(multiplier, Scale::new(exponent as i8));
        if negative {
            -gap
        } else {
            gap
        }
    }

    /// Time modulo one epoch window (`10^15` quanta) at the given scale.
    /// Always in `[0, MULTIPLIER_LIMIT)`.
    pub fn epoch_phase(&self, scale: Scale) -> i64 {
        let base = i32::from(scale.exponent());
        let mut phase = 0i64;
        for e in (base..base + 5).rev() {
            phase = phase * 1000 + i64::from(self.digit_at_exponent(e));
        }
        phase
    }

    /// Phase, relative to the epoch boundary at or before now, at which
    /// `now + duration` lands. A result smaller than the input means the
    /// planned instant falls in the next epoch.
    pub fn phase_from_duration(&self, duration: Duration) -> Duration {
        if duration.is_infinite() {
            return Duration::INFINITY;
        }
        debug_assert!(!duration.is_negative());
        if self.is_zero() {
            return Duration::new(duration.multiplier(), duration.precision());
        }
        if duration.is_zero() {
            return Duration::new(self.epoch_phase(self.precision), self.precision);
        }
        let sum = self.epoch_phase(duration.precision()) + duration.multiplier();
        let mut multiplier = if sum < MULTIPLIER_LIMIT {
            sum
        } else {
            sum - MULTIPLIER_LIMIT
        };
        let mut scale = duration.precision();
        while multiplier != 0 && multiplier % 1000 == 0 {
            multiplier /= 1000;
            scale = scale + 1;
        }
        Duration::new(multiplier, scale)
    }

    /// Inverse of [`TimePoint::phase_from_duration`]: how far past the current
    /// epoch phase the given phase lies. Negative when the phase already
    /// wrapped into the next epoch.
    pub fn duration_from_phase(&self, phase: Duration) -> Duration {
        if phase.is_infinite() {
            return Duration::INFINITY;
        }
        Duration::new(
            phase.multiplier() - self.epoch_phase(phase.precision()),
            phase.precision(),
        )
    }

    /// Re-expresses a planned duration at `target`, reporting the interval
    /// that would actually elapse once the plan is truncated into this time
    /// point's digit sequence.
    pub fn refined_duration(&self, duration: Duration, target: Scale) -> Duration {
        if duration.is_infinite() {
            return Duration::INFINITY;
        }
        let mut planned = self.clone();
        planned.advance(duration);
        planned.gap(self).fixed_at(target)
    }

    /// Truncates to an integer number of quanta at the point's precision.
    pub fn to_i64(&self) -> i64 {
        let mut value = 0i128;
        for &d in self.digits.iter().rev() {
            value = value * 1000 + i128::from(d);
            if value > i128::from(i64::MAX) {
                return i64::MAX;
            }
        }
        value as i64
    }

    /// Floating-point approximation in base units.
    pub fn to_f64(&self) -> f64 {
        let mut value = 0f64;
        for (i, &d) in self.digits.iter().enumerate() {
            value += f64::from(d) * 1000f64.powi(i32::from(self.precision.exponent()) + i as i32);
        }
        value
    }

    fn digit_at_exponent(&self, exponent: i32) -> u16 {
        let idx = exponent - i32::from(self.precision.exponent());
        if idx < 0 || idx >= self.digits.len() as i32 {
            0
        } else {
            self.digits[idx as usize]
        }
    }

    /// Exponent of the most significant stored digit.
    fn top_exponent(&self) -> i32 {
        i32::from(self.precision.exponent()) + self.digits.len() as i32 - 1
    }

    fn canonicalize(&mut self) {
        while self.digits.len() > 1 && *self.digits.last().unwrap() == 0 {
            self.digits.pop();
        }
        while self.digits.len() > 1 && self.digits[0] == 0 {
            self.digits.remove(0);
            self.precision = self.precision + 1;
        }
    }
}

impl Default for TimePoint {
    fn default() -> Self {
        Self::origin()
    }
}

impl Index<Scale> for TimePoint {
    type Output = u16;

    fn index(&self, scale: Scale) -> &u16 {
        static ZERO: u16 = 0;
        let idx = i32::from(scale.exponent()) - i32::from(self.precision.exponent());
        if idx < 0 || idx >= self.digits.len() as i32 {
            &ZERO
        } else {
            &self.digits[idx as usize]
        }
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimePoint {}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let hi = self.top_exponent().max(other.top_exponent());
        let lo = i32::from(self.precision.exponent()).min(i32::from(other.precision.exponent()));
        for e in (lo..=hi).rev() {
            match self.digit_at_exponent(e).cmp(&other.digit_at_exponent(e)) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        Ordering::Equal
    }
}

impl Sub for &TimePoint {
    type Output = Duration;

    fn sub(self, rhs: &TimePoint) -> Duration {
        self.gap(rhs)
    }
}

impl Display for TimePoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut digits = self.digits.iter().rev();
        write!(f, "{}", digits.next().unwrap())?;
        for d in digits {
            write!(f, "{:03}", d)?;
        }
        if self.precision != Scale::BASE {
            write!(f, "{}", self.precision)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::MULTIPLIER_MAX;

    #[test]
    fn test_display() {
        assert_eq!("0", TimePoint::origin().to_string());
        assert_eq!("845249e-6", TimePoint::new(845_249, Scale::MICRO).to_string());
        assert_eq!("845249e+6", TimePoint::new(845_249, Scale::MEGA).to_string());
        assert_eq!("5000388", TimePoint::new(5_000_388, Scale::BASE).to_string());
    }

    #[test]
    fn test_canonical_form() {
        let coarse = TimePoint::new(5_000, Scale::BASE);
        assert_eq!(coarse.digits(), [5]);
        assert_eq!(coarse.precision(), Scale::KILO);
        assert_eq!(coarse.size(), 1);

        let mixed = TimePoint::new(5_000_388, Scale::BASE);
        assert_eq!(mixed.digits(), [388, 0, 5]);
        assert_eq!(mixed.precision(), Scale::BASE);
    }

    #[test]
    fn test_indexing() {
        let t = TimePoint::new(5_000_388, Scale::BASE);
        assert_eq!(t[Scale::BASE], 388);
        assert_eq!(t[Scale::KILO], 0);
        assert_eq!(t[Scale::MEGA], 5);
        assert_eq!(t[Scale::GIGA], 0);
        assert_eq!(t[Scale::FEMTO], 0);
    }

    #[test]
    fn test_comparison_across_precisions() {
        assert_eq!(
            TimePoint::new(5, Scale::KILO),
            TimePoint::new(5_000, Scale::BASE)
        );
        assert!(TimePoint::new(5, Scale::KILO) < TimePoint::new(5_001, Scale::BASE));
        assert!(TimePoint::new(1, Scale::BASE) > TimePoint::new(999, Scale::MILLI));
        assert!(TimePoint::origin() < TimePoint::new(1, Scale::FEMTO));
    }

    #[test]
    fn test_advance_with_coarser_duration_truncates() {
        let mut t = TimePoint::new(5_010_388, Scale::BASE);
        t.advance(Duration::new(-2, Scale::KILO));
        assert_eq!(t.digits(), [8, 5]);
        assert_eq!(t.precision(), Scale::KILO);
    }

    #[test]
    fn test_advance_same_precision() {
        let mut t = TimePoint::new(72_800_444_321, Scale::NANO);
        t.advance(Duration::new(1_150_000_000, Scale::NANO));
        assert_eq!(t.digits(), [321, 444, 950, 73]);
        assert_eq!(t.precision(), Scale::NANO);
    }

    #[test]
    fn test_advance_coarser_variant() {
        let mut t = TimePoint::new(72_800_444_321, Scale::NANO);
        t.advance(Duration::new(1_150_000, Scale::MICRO));
        assert_eq!(t.digits(), [444, 950, 73]);
        assert_eq!(t.precision(), Scale::MICRO);
    }

    #[test]
    fn test_advance_untruncated_keeps_precision() {
        let mut t = TimePoint::new(5_010_388, Scale::BASE);
        t.advance_untruncated(Duration::new(-2, Scale::KILO));
        assert_eq!(t.digits(), [388, 8, 5]);
        assert_eq!(t.precision(), Scale::BASE);
    }

    #[test]
    fn test_advance_roundtrip() {
        let original = TimePoint::new(72_800_444_321, Scale::NANO);
        let d = Duration::new(1_150_000_000, Scale::NANO);
        let mut t = original.clone();
        t.advance(d);
        t.advance(-d);
        assert_eq!(t, original);
    }

    #[test]
    fn test_advance_below_origin_clamps() {
        let mut t = TimePoint::new(5, Scale::BASE);
        t.advance(Duration::new(-10, Scale::BASE));
        assert!(t.is_zero());
    }

    #[test]
    fn test_gap_exact() {
        let a = TimePoint::new(31_775_100, Scale::MICRO);
        let b = TimePoint::new(1_170, Scale::MILLI);
        assert_eq!(a.gap(&b), Duration::new(30_605_100, Scale::MICRO));
        assert_eq!(b.gap(&a), Duration::new(-30_605_100, Scale::MICRO));
        assert_eq!(&a - &b, a.gap(&b));
    }

    #[test]
    fn test_gap_prefers_finest_representable_scale() {
        // One second minus one femtosecond still fits the multiplier window
        // at the femto scale, so nothing is dropped.
        let a = TimePoint::new(1, Scale::BASE);
        let b = TimePoint::new(1, Scale::FEMTO);
        assert_eq!(a.gap(&b), Duration::new(MULTIPLIER_MAX, Scale::FEMTO));
    }

    #[test]
    fn test_gap_coarsens_when_window_overflows() {
        // Two seconds minus one femtosecond spans sixteen decimal digits:
        // the femto scale cannot hold it, so the result coarsens one step and
        // the sub-pico remainder is dropped (staying below one pico quantum).
        let a = TimePoint::new(2, Scale::BASE);
        let b = TimePoint::new(1, Scale::FEMTO);
        assert_eq!(a.gap(&b), Duration::new(1_999_999_999_999, Scale::PICO));
    }

    #[test]
    fn test_gap_antisymmetry() {
        let a = TimePoint::new(7_250, Scale::MILLI);
        let b = TimePoint::new(1, Scale::KILO);
        assert_eq!(a.gap(&b), -(b.gap(&a)));
        assert!(a.gap(&a).is_zero());
    }

    #[test]
    fn test_epoch_phase() {
        assert_eq!(TimePoint::origin().epoch_phase(Scale::BASE), 0);
        assert_eq!(TimePoint::new(2_000, Scale::BASE).epoch_phase(Scale::MILLI), 2_000_000);
        assert_eq!(
            TimePoint::new(u64::try_from(MULTIPLIER_LIMIT).unwrap() - 1_500, Scale::BASE)
                .epoch_phase(Scale::BASE),
            MULTIPLIER_LIMIT - 1_500
        );
    }

    #[test]
    fn test_phase_from_duration_same_epoch() {
        assert_eq!(
            TimePoint::origin().phase_from_duration(Duration::new(500, Scale::BASE)),
            Duration::new(500, Scale::BASE)
        );
    }

    #[test]
    fn test_phase_from_duration_wraps_into_next_epoch() {
        let t = TimePoint::new(u64::try_from(MULTIPLIER_LIMIT).unwrap() - 1_500, Scale::BASE);
        let phase = t.phase_from_duration(Duration::new(5_000, Scale::BASE));
        assert_eq!(phase, Duration::new(3_500, Scale::BASE));
        assert!(phase < Duration::new(5_000, Scale::BASE));
    }

    #[test]
    fn test_phase_from_duration_coarsens() {
        let phase =
            TimePoint::new(2_000, Scale::BASE).phase_from_duration(Duration::new(5_000_000, Scale::MILLI));
        assert_eq!(phase.multiplier(), 7);
        assert_eq!(phase.precision(), Scale::KILO);
    }

    #[test]
    fn test_phase_from_duration_at_origin() {
        let phase = TimePoint::new(0, Scale::MILLI).phase_from_duration(Duration::new(134, Scale::BASE));
        assert_eq!(phase.precision(), Scale::BASE);
        assert_eq!(phase.multiplier(), 134);
    }

    #[test]
    fn test_phase_from_zero_duration() {
        let phase =
            TimePoint::new(23_457, Scale::MICRO).phase_from_duration(Duration::new(0, Scale::TERA));
        assert_eq!(phase.precision(), Scale::MICRO);
    }

    #[test]
    fn test_duration_from_phase() {
        let t = TimePoint::new(2_000, Scale::BASE);
        let phase = t.phase_from_duration(Duration::new(500, Scale::BASE));
        assert_eq!(t.duration_from_phase(phase), Duration::new(500, Scale::BASE));
    }

    #[test]
    fn test_refined_duration_reports_truncation() {
        // Planning 2 kilo-units from 5010388 truncates the low digits away:
        // the clock lands on 5012000, so only 1612 base units actually pass.
        let t = TimePoint::new(5_010_388, Scale::BASE);
        let refined = t.refined_duration(Duration::new(2, Scale::KILO), Scale::BASE);
        assert_eq!(refined, Duration::new(1_612, Scale::BASE));
    }

    #[test]
    fn test_conversions() {
        let t = TimePoint::new(845_249, Scale::MICRO);
        assert_eq!(t.to_i64(), 845_249);
        assert!((t.to_f64() - 0.845_249).abs() < 1e-12);
        assert_eq!(TimePoint::origin().to_i64(), 0);
    }
}
