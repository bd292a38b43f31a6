use super::{fire_point, imminent_of, EventSet, LiveEvent};
use crate::errors::PlanningError;
use crate::time::{Duration, Scale, TimePoint};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Binary-heap event set with lazy deletion: cancelled or replanned items
/// leave stale heap entries behind that are skipped on pop.
#[derive(Debug, Default)]
pub struct HeapQueue {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    entries: HashMap<usize, LiveEvent>,
    next_seq: u64,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    fire: TimePoint,
    precision: Scale,
    seq: u64,
    item: usize,
}

impl EventSet for HeapQueue {
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
        self.next_seq += 1;
        let fire = fire_point(planned, now);
        self.heap.push(Reverse(HeapEntry {
            fire: fire.clone(),
            precision: planned.precision(),
            seq: self.next_seq,
            item,
        }));
        self.entries.insert(
            item,
            LiveEvent {
                seq: self.next_seq,
                fire,
                planned,
            },
        );
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

    fn pop_imminent_events(&mut self, _now: &TimePoint, visit: &mut dyn FnMut(usize)) {
        let mut batch: Option<(TimePoint, Scale)> = None;
        loop {
            let (item, seq, fire, precision) = match self.heap.peek() {
                Some(Reverse(top)) => (top.item, top.seq, top.fire.clone(), top.precision),
                None => return,
            };
            if !matches!(self.entries.get(&item), Some(live) if live.seq == seq) {
                self.heap.pop();
                continue;
            }
            match &batch {
                None => batch = Some((fire, precision)),
                Some((batch_fire, batch_precision)) => {
                    if fire != *batch_fire || precision != *batch_precision {
                        return;
                    }
                }
            }
            self.heap.pop();
            self.entries.remove(&item);
            visit(item);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
