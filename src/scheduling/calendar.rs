use super::{fire_point, imminent_of, EventSet, LiveEvent};
use crate::errors::PlanningError;
use crate::time::{Duration, Scale, TimePoint};
use std::collections::HashMap;

const DEFAULT_BUCKETS: usize = 256;
const DEFAULT_WIDTH: i64 = 1;

/// Calendar-queue event set: a ring of buckets covering one "year" of
/// simulated time at a reference scale, plus an overflow list for events
/// planned beyond the current year. The ring rotates as the shared clock
/// advances; overflow entries are promoted into buckets when their year
/// comes up.
#[derive(Debug)]
pub struct CalendarQueue {
    /// Bucket ring; each bucket holds `(item, seq)` pairs in insertion order.
    buckets: Vec<Vec<(usize, u64)>>,
    /// Events whose firing instant lies beyond the current year.
    overflow: Vec<(usize, u64)>,
    entries: HashMap<usize, LiveEvent>,
    bucket_scale: Scale,
    bucket_width: i64,
    /// Ring-span index currently mapped onto the buckets.
    year: i128,
    next_seq: u64,
}

impl CalendarQueue {
    /// Creates a calendar queue with a custom ring geometry: `buckets` slots
    /// of `width` quanta each, at the given reference scale.
    pub fn new(buckets: usize, width: i64, scale: Scale) -> Self {
        assert!(buckets > 0 && width > 0, "calendar geometry must be positive");
        Self {
            buckets: (0..buckets).map(|_| Vec::new()).collect(),
            overflow: Vec::new(),
            entries: HashMap::new(),
            bucket_scale: scale,
            bucket_width: width,
            year: 0,
            next_seq: 0,
        }
    }

    fn span(&self) -> i128 {
        i128::from(self.bucket_width) * self.buckets.len() as i128
    }

    /// Time point value truncated to whole quanta of the reference scale.
    fn units_of(&self, point: &TimePoint) -> i128 {
        let shift = i32::from(point.precision().exponent()) - i32::from(self.bucket_scale.exponent());
        let digits = point.digits();
        let mut units = 0i128;
        for i in (0..digits.len()).rev() {
            if shift + (i as i32) < 0 {
                break;
            }
            units = units
                .saturating_mul(1000)
                .saturating_add(i128::from(digits[i]));
        }
        // digits strictly below the reference scale are truncated away, but
        // the fold above has already scaled the kept ones correctly only if
        // the lowest kept digit sits exactly at the reference scale
        let pad = shift.max(0);
        for _ in 0..pad {
            units = units.saturating_mul(1000);
        }
        units
    }

    fn place(&mut self, item: usize, seq: u64, fire_units: i128) {
        if fire_units.div_euclid(self.span()) == self.year {
            let idx =
                (fire_units.div_euclid(i128::from(self.bucket_width)) % self.buckets.len() as i128)
                    as usize;
            self.buckets[idx].push((item, seq));
        } else {
            self.overflow.push((item, seq));
        }
    }

    /// Rotates the ring forward when the clock has entered a new year and
    /// promotes the overflow entries whose year came up.
    fn promote(&mut self, now: &TimePoint) {
        let year = self.units_of(now).div_euclid(self.span());
        if year == self.year {
            return;
        }
        self.year = year;
        let pending = std::mem::take(&mut self.overflow);
        for (item, seq) in pending {
            let fire = match self.entries.get(&item) {
                Some(live) if live.seq == seq => live.fire.clone(),
                _ => continue,
            };
            let units = self.units_of(&fire);
            self.place(item, seq, units);
        }
    }

    fn is_live(&self, item: usize, seq: u64) -> bool {
        matches!(self.entries.get(&item), Some(live) if live.seq == seq)
    }

    /// Fires the minimal batch found in `pool`, visiting in insertion order.
    fn fire_pool(&mut self, pool: Vec<(usize, u64)>, visit: &mut dyn FnMut(usize)) {
        let min = pool
            .iter()
            .filter_map(|(item, _)| self.entries.get(item))
            .min_by(|a, b| a.key().cmp(&b.key()))
            .map(|live| (live.fire.clone(), live.planned.precision()));
        let (fire, precision) = match min {
            Some(key) => key,
            None => return,
        };
        for (item, _) in pool {
            let matches_batch = self
                .entries
                .get(&item)
                .map(|live| live.fire == fire && live.planned.precision() == precision)
                .unwrap_or(false);
            if matches_batch {
                self.entries.remove(&item);
                visit(item);
            }
        }
    }
}

impl Default for CalendarQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS, DEFAULT_WIDTH, Scale::BASE)
    }
}

impl EventSet for CalendarQueue {
    fn plan_event(
        &mut self,
        item: usize,
        planned: Duration,
        now: &TimePoint,
    ) -> Result<(), PlanningError> {
        if planned.is_infinite() {
            if planned.is_fixed() {
                return Err(PlanningError {
                    precision: planned.precision(),
                });
            }
            self.entries.remove(&item);
            return Ok(());
        }
        self.promote(now);
        self.next_seq += 1;
        let seq = self.next_seq;
        let fire = fire_point(planned, now);
        let units = self.units_of(&fire);
        self.entries.insert(item, LiveEvent { seq, fire, planned });
        self.place(item, seq, units);
        Ok(())
    }

    fn cancel_event(&mut self, item: usize) -> Option<Duration> {
        self.entries.remove(&item).map(|event| event.planned)
    }

    fn duration_of(&self, item: usize, now: &TimePoint) -> Duration {
        self.entries
            .get(&item)
            .map(|event| event.fire.gap(now))
            .unwrap_or(Duration::INFINITY)
    }

    fn imminent_duration(&self, now: &TimePoint) -> Duration {
        imminent_of(self.entries.values(), now)
    }

    fn pop_imminent_events(&mut self, now: &TimePoint, visit: &mut dyn FnMut(usize)) {
        if self.entries.is_empty() {
            return;
        }
        self.promote(now);
        let start = (self.units_of(now).div_euclid(i128::from(self.bucket_width))
            % self.buckets.len() as i128) as usize;
        for k in 0..self.buckets.len() {
            let idx = (start + k) % self.buckets.len();
            let mut bucket = std::mem::take(&mut self.buckets[idx]);
            bucket.retain(|&(item, seq)| self.is_live(item, seq));
            if bucket.is_empty() {
                continue;
            }
            self.fire_pool(bucket.clone(), visit);
            bucket.retain(|&(item, seq)| self.is_live(item, seq));
            self.buckets[idx] = bucket;
            return;
        }
        // the ring is empty: the earliest events live beyond the year span
        let mut overflow = std::mem::take(&mut self.overflow);
        overflow.retain(|&(item, seq)| self.is_live(item, seq));
        self.fire_pool(overflow.clone(), visit);
        overflow.retain(|&(item, seq)| self.is_live(item, seq));
        self.overflow = overflow;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps_across_years() {
        // a tiny ring so events routinely land beyond the current year
        let mut queue = CalendarQueue::new(4, 1, Scale::BASE);
        let mut now = TimePoint::origin();
        queue.plan_event(0, Duration::new(2, Scale::BASE), &now).unwrap();
        queue.plan_event(1, Duration::new(9, Scale::BASE), &now).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.imminent_duration(&now), Duration::new(2, Scale::BASE));

        now.advance(Duration::new(2, Scale::BASE));
        let mut fired = Vec::new();
        queue.pop_imminent_events(&now, &mut |item| fired.push(item));
        assert_eq!(fired, [0]);

        now.advance(Duration::new(7, Scale::BASE));
        fired.clear();
        queue.pop_imminent_events(&now, &mut |item| fired.push(item));
        assert_eq!(fired, [1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fine_scale_events() {
        let mut queue = CalendarQueue::default();
        let now = TimePoint::origin();
        queue.plan_event(0, Duration::new(300, Scale::MICRO), &now).unwrap();
        queue.plan_event(1, Duration::new(200, Scale::MICRO), &now).unwrap();
        assert_eq!(
            queue.imminent_duration(&now),
            Duration::new(200, Scale::MICRO)
        );
        let mut at_fire = TimePoint::origin();
        at_fire.advance(Duration::new(200, Scale::MICRO));
        let mut fired = Vec::new();
        queue.pop_imminent_events(&at_fire, &mut |item| fired.push(item));
        assert_eq!(fired, [1]);
    }
}
