use crate::time::{Duration, TimePoint};
use log::warn;
use std::fmt::{Debug, Formatter};
use thiserror::Error;

/// Maximum number of observers attachable to a single observable.
pub const MAX_OBSERVERS: usize = 16;

/// What an observer is being told about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverEventKind {
    Initialization,
    InternalTransition,
    ExternalTransition,
    ConfluentTransition,
    Output,
}

/// Structured notification delivered after the relevant action completes.
#[derive(Clone, Debug)]
pub struct ObserverEvent {
    pub kind: ObserverEventKind,
    pub time: TimePoint,
    pub elapsed: Duration,
    /// Rendered port values for [`ObserverEventKind::Output`] events.
    pub payload: Option<String>,
}

/// Failure reported by an observer. The failing observer is detached and the
/// simulation continues.
#[derive(Debug, Error)]
#[error("observer failure: {0}")]
pub struct ObserverError(pub String);

/// Callback contract for observers. Closures of the matching signature
/// implement it directly.
pub trait Observer {
    fn notify(&mut self, event: &ObserverEvent) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: FnMut(&ObserverEvent) -> Result<(), ObserverError>,
{
    fn notify(&mut self, event: &ObserverEvent) -> Result<(), ObserverError> {
        self(event)
    }
}

/// Bounded per-observable observer list. Observers that fail are detached in
/// place; their slots are not reused.
#[derive(Default)]
pub struct ObserverTable {
    slots: Vec<Option<Box<dyn Observer>>>,
}

impl ObserverTable {
    /// Attaches an observer. Panics if the table is full.
    pub fn attach(&mut self, observer: Box<dyn Observer>) {
        if self.slots.len() >= MAX_OBSERVERS {
            panic!("observable already has {} observers attached", MAX_OBSERVERS);
        }
        self.slots.push(Some(observer));
    }

    /// Number of observers still attached.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifies every attached observer, detaching the ones that fail.
    pub fn notify_all(&mut self, event: &ObserverEvent) {
        for slot in &mut self.slots {
            if let Some(observer) = slot {
                if let Err(failure) = observer.notify(event) {
                    warn!("detaching observer after {}", failure);
                    *slot = None;
                }
            }
        }
    }
}

impl Debug for ObserverTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverTable")
            .field("attached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Scale;
    use std::cell::Cell;
    use std::rc::Rc;

    fn event() -> ObserverEvent {
        ObserverEvent {
            kind: ObserverEventKind::InternalTransition,
            time: TimePoint::origin(),
            elapsed: Duration::new(0, Scale::BASE),
            payload: None,
        }
    }

    #[test]
    fn test_failing_observer_is_detached() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut table = ObserverTable::default();
        table.attach(Box::new(
            move |_: &ObserverEvent| -> Result<(), ObserverError> {
                seen.set(seen.get() + 1);
                Err(ObserverError("broken".to_string()))
            },
        ));
        let survivors = Rc::new(Cell::new(0));
        let seen = survivors.clone();
        table.attach(Box::new(
            move |_: &ObserverEvent| -> Result<(), ObserverError> {
                seen.set(seen.get() + 1);
                Ok(())
            },
        ));

        table.notify_all(&event());
        table.notify_all(&event());

        assert_eq!(calls.get(), 1);
        assert_eq!(survivors.get(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    #[should_panic(expected = "observers attached")]
    fn test_bounded_table() {
        let mut table = ObserverTable::default();
        for _ in 0..=MAX_OBSERVERS {
            table.attach(Box::new(|_: &ObserverEvent| -> Result<(), ObserverError> {
                Ok(())
            }));
        }
    }
}
