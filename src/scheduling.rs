//! Event scheduling for coordinators.
//!
//! An [`EventSet`] is a priority queue of child processors keyed by planned
//! [`Duration`]s measured from a shared current [`TimePoint`]. The current
//! time is passed by reference on every call, so advancing the shared clock
//! implicitly shifts the queue's reference point. The [`TimeCache`] keeps the
//! per-child reset points from which elapsed durations are recomputed on
//! demand.

pub mod calendar;
pub mod heap;

pub use calendar::CalendarQueue;
pub use heap::HeapQueue;

use crate::errors::PlanningError;
use crate::time::{Duration, Scale, TimePoint};
use std::collections::HashMap;
use std::fmt::Debug;

/// Event-set backend selected at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SchedulerKind {
    /// Binary heap with lazy deletion. The default.
    #[default]
    BinaryHeap,
    /// Calendar queue: a bucket ring over epoch phases with an overflow list
    /// for events beyond the ring span.
    CalendarQueue,
}

impl SchedulerKind {
    pub(crate) fn create(&self) -> Box<dyn EventSet> {
        match self {
            SchedulerKind::BinaryHeap => Box::<HeapQueue>::default(),
            SchedulerKind::CalendarQueue => Box::<CalendarQueue>::default(),
        }
    }
}

/// A scheduled item as the backends track it.
#[derive(Clone, Debug)]
pub(crate) struct LiveEvent {
    /// Insertion order, for FIFO tie-breaking and lazy deletion.
    pub(crate) seq: u64,
    /// Absolute instant at which the item fires, already truncated by the
    /// planned duration's precision.
    pub(crate) fire: TimePoint,
    /// The duration as it was planned.
    pub(crate) planned: Duration,
}

impl LiveEvent {
    /// Ordering key: magnitude first, then precision (a numeric tie at a
    /// finer precision fires an infinitesimal earlier), then insertion order.
    pub(crate) fn key(&self) -> (&TimePoint, Scale, u64) {
        (&self.fire, self.planned.precision(), self.seq)
    }
}

/// Priority scheduler contract shared by all backends.
pub trait EventSet: Debug {
    /// Inserts the item, or replaces its plan, with a duration measured from
    /// `now`. Planning at an unfixed infinite duration removes the item; a
    /// fixed duration that overflowed its precision window is rejected.
    fn plan_event(
        &mut self,
        item: usize,
        planned: Duration,
        now: &TimePoint,
    ) -> Result<(), PlanningError>;

    /// Removes the item, returning its prior planned duration.
    fn cancel_event(&mut self, item: usize) -> Option<Duration>;

    /// Remaining duration until the item fires, or infinity if unscheduled.
    fn duration_of(&self, item: usize, now: &TimePoint) -> Duration;

    /// Minimum remaining duration over all items, or infinity when empty.
    /// Does not mutate the set.
    fn imminent_duration(&self, now: &TimePoint) -> Duration;

    /// Visits and removes every item tied for the minimum remaining duration.
    /// Ties fire in insertion order; a numeric tie at a coarser precision is
    /// not part of the batch.
    fn pop_imminent_events(&mut self, now: &TimePoint, visit: &mut dyn FnMut(usize));

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn fire_point(planned: Duration, now: &TimePoint) -> TimePoint {
    let mut fire = now.clone();
    fire.advance(planned);
    fire
}

/// Minimum over a backend's live entries, as a remaining duration from `now`.
pub(crate) fn imminent_of<'a, I>(entries: I, now: &TimePoint) -> Duration
where
    I: Iterator<Item = &'a LiveEvent>,
{
    entries
        .min_by(|a, b| a.key().cmp(&b.key()))
        .map(|event| event.fire.gap(now))
        .unwrap_or(Duration::INFINITY)
}

/// Tracks the time point at which each item's elapsed counter was last reset,
/// so elapsed durations can be recomputed on demand.
#[derive(Debug, Default)]
pub struct TimeCache {
    points: HashMap<usize, TimePoint>,
}

impl TimeCache {
    /// Stores the reset point `now − elapsed`. The subtraction truncates the
    /// stored point at the elapsed duration's precision.
    pub fn retain_event(&mut self, item: usize, now: &TimePoint, elapsed: Duration) {
        let mut point = now.clone();
        point.advance(-elapsed);
        self.points.insert(item, point);
    }

    /// Elapsed duration since the item's reset point. Never negative.
    pub fn elapsed_duration_of(&self, item: usize, now: &TimePoint) -> Duration {
        match self.points.get(&item) {
            Some(point) => {
                let elapsed = now.gap(point);
                if elapsed.is_negative() {
                    Duration::ZERO
                } else {
                    elapsed
                }
            }
            None => Duration::ZERO,
        }
    }

}
