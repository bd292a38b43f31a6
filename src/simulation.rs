pub mod driver;

pub use driver::{AbortHandle, Simulation, SimulationOptions};

use crate::errors::SimulationError;
use crate::modeling::{Atomic, Component, Coupled};
use crate::observation::ObserverEventKind;
use crate::scheduling::SchedulerKind;
use crate::time::{Duration, Scale, TimePoint};
use log::trace;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

/// Transition counts accumulated over a run. The reaction counter is reserved
/// for the multi-component variant and stays at zero in this kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionStats {
    pub internal: u64,
    pub external: u64,
    pub confluent: u64,
    pub reaction: u64,
}

impl TransitionStats {
    pub(crate) fn merge(&mut self, other: TransitionStats) {
        self.internal += other.internal;
        self.external += other.external;
        self.confluent += other.confluent;
        self.reaction += other.reaction;
    }

    pub fn total(&self) -> u64 {
        self.internal + self.external + self.confluent + self.reaction
    }
}

/// Interface for simulating DEVS models. All DEVS models must implement this
/// trait. A processor reports its elapsed and planned durations upward; its
/// parent owns the event set that decides when it is driven again.
pub trait Simulator: Debug {
    /// Returns reference to inner [`Component`].
    fn get_component(&self) -> &Component;

    /// Returns mutable reference to inner [`Component`].
    fn get_component_mut(&mut self) -> &mut Component;

    /// Returns the name of the inner DEVS [`Component`].
    #[inline]
    fn get_name(&self) -> &str {
        self.get_component().get_name()
    }

    /// Returns the time of the last state transition of the inner DEVS [`Component`].
    #[inline]
    fn get_t_last(&self) -> &TimePoint {
        self.get_component().get_t_last()
    }

    /// Returns the planned duration until the next state transition.
    #[inline]
    fn get_planned(&self) -> Duration {
        self.get_component().get_planned()
    }

    /// Removes all the messages from all the ports.
    #[inline]
    fn clear_ports(&mut self) {
        let component = self.get_component_mut();
        component.clear_input();
        component.clear_output()
    }

    /// Selects the event-set backend, recursively. Atomic models have no
    /// event set, so by default this does nothing.
    fn set_scheduler(&mut self, _kind: SchedulerKind) {}

    /// Structural validation before a run. By default there is nothing to check.
    fn validate(&self) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Transition counters of this processor and everything below it.
    fn transition_stats(&self) -> TransitionStats;

    /// Initializes the processor at the given time, once per run. Returns the
    /// initial elapsed duration and the first planned duration.
    fn initialize(&mut self, time: &TimePoint) -> Result<(Duration, Duration), SimulationError>;

    /// Executes output functions and propagates messages according to ICs and
    /// EOCs. Only invoked when the processor is imminent, with `elapsed` equal
    /// to its planned duration.
    fn collect_outputs(&mut self, time: &TimePoint, elapsed: Duration)
        -> Result<(), SimulationError>;

    /// Propagates messages according to EICs and executes model transition
    /// functions. Returns the next planned duration.
    fn perform_transitions(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
    ) -> Result<Duration, SimulationError>;

    /// It stops the simulation, leaving the processor passive.
    fn stop_simulation(&mut self, time: &TimePoint);
}

/// Pins a time advance at the model's precision level. A finite duration that
/// cannot be expressed there is a modelling error.
fn fix_planned(
    planned: Duration,
    precision: Scale,
    model: &str,
) -> Result<Duration, SimulationError> {
    let fixed = planned.fixed_at(precision);
    if !planned.is_infinite() && fixed.is_infinite() {
        return Err(SimulationError::InvalidDuration {
            model: model.to_string(),
            planned,
            precision,
        });
    }
    Ok(fixed)
}

impl<T: Atomic + Debug> Simulator for T {
    #[inline]
    fn get_component(&self) -> &Component {
        Atomic::get_component(self)
    }

    #[inline]
    fn get_component_mut(&mut self) -> &mut Component {
        Atomic::get_component_mut(self)
    }

    fn transition_stats(&self) -> TransitionStats {
        Atomic::get_component(self).stats()
    }

    fn initialize(&mut self, time: &TimePoint) -> Result<(Duration, Duration), SimulationError> {
        Atomic::get_component_mut(self).mark_initialized()?;
        Atomic::start(self);
        let elapsed = self.initial_elapsed();
        let planned = fix_planned(self.ta(), self.precision(), self.get_name())?;
        let mut t_last = time.clone();
        t_last.advance(-elapsed);
        Atomic::get_component_mut(self).set_sim_t(t_last, planned);
        Atomic::get_component_mut(self)
            .record_transition(ObserverEventKind::Initialization, time, elapsed);
        Ok((elapsed, planned))
    }

    fn collect_outputs(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
    ) -> Result<(), SimulationError> {
        let planned = self.get_planned();
        if planned != elapsed {
            return Err(SimulationError::BadSynchronisation {
                model: self.get_name().to_string(),
                elapsed,
                planned,
            });
        }
        Atomic::lambda(self);
        Atomic::get_component(self).notify_output_observers(time, elapsed);
        Ok(())
    }

    fn perform_transitions(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
    ) -> Result<Duration, SimulationError> {
        let planned = self.get_planned();
        let remaining = planned - elapsed;
        if remaining.is_negative() {
            return Err(SimulationError::BadSynchronisation {
                model: self.get_name().to_string(),
                elapsed,
                planned,
            });
        }
        let has_input = !Atomic::get_component(self).is_input_empty();
        let kind = if remaining.is_zero() {
            if has_input {
                ObserverEventKind::ConfluentTransition
            } else {
                ObserverEventKind::InternalTransition
            }
        } else if has_input {
            ObserverEventKind::ExternalTransition
        } else {
            // nothing fired and nothing arrived; the processor was not due
            return Ok(remaining);
        };
        match kind {
            ObserverEventKind::InternalTransition => Atomic::delta_int(self),
            ObserverEventKind::ExternalTransition => Atomic::delta_ext(self, elapsed),
            _ => Atomic::delta_conf(self),
        }
        let planned = fix_planned(self.ta(), self.precision(), self.get_name())?;
        Atomic::get_component_mut(self).set_sim_t(time.clone(), planned);
        Atomic::get_component_mut(self).record_transition(kind, time, elapsed);
        Ok(planned)
    }

    fn stop_simulation(&mut self, time: &TimePoint) {
        Atomic::get_component_mut(self).set_sim_t(time.clone(), Duration::INFINITY);
        Atomic::stop(self);
    }
}

impl Simulator for Coupled {
    #[inline]
    fn get_component(&self) -> &Component {
        &self.component
    }

    #[inline]
    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn set_scheduler(&mut self, kind: SchedulerKind) {
        self.select_scheduler(kind);
    }

    fn validate(&self) -> Result<(), SimulationError> {
        self.validate_structure()
    }

    fn transition_stats(&self) -> TransitionStats {
        let mut stats = self.component.stats();
        for comp in &self.comps {
            stats.merge(comp.transition_stats());
        }
        stats
    }

    /// Initializes every child, planning the ones with a finite first duration
    /// in the event set. Reports the maximum child elapsed duration and the
    /// event set's imminent duration upward.
    fn initialize(&mut self, time: &TimePoint) -> Result<(Duration, Duration), SimulationError> {
        self.component.mark_initialized()?;
        let mut max_elapsed = Duration::ZERO;
        for i in 0..self.comps.len() {
            let (elapsed, planned) = self.comps[i].initialize(time)?;
            if !planned.is_infinite() {
                self.scheduler.plan_event(i, planned, time)?;
            }
            self.cache.retain_event(i, time, elapsed);
            if elapsed > max_elapsed {
                max_elapsed = elapsed;
            }
        }
        let planned = self.scheduler.imminent_duration(time);
        self.component.set_sim_t(time.clone(), planned);
        Ok((max_elapsed, planned))
    }

    /// Pops the imminent children, collects their outputs, and routes them:
    /// internal couplings feed sibling inputs (the targets join the
    /// synchronization set), external output couplings feed the coupled
    /// model's own output ports.
    fn collect_outputs(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
    ) -> Result<(), SimulationError> {
        let planned = self.component.get_planned();
        if planned != elapsed {
            return Err(SimulationError::BadSynchronisation {
                model: self.component.get_name().to_string(),
                elapsed,
                planned,
            });
        }
        let mut imminent = Vec::new();
        self.scheduler
            .pop_imminent_events(time, &mut |item| imminent.push(item));
        trace!(
            "{}: {} imminent children at {}",
            self.component.get_name(),
            imminent.len(),
            time
        );
        for &i in &imminent {
            let child_elapsed = self.comps[i].get_planned();
            self.comps[i].collect_outputs(time, child_elapsed)?;
            self.synchronize.insert(i, true);
        }
        for coupling in &self.ics {
            if !coupling.from.is_empty() {
                coupling.from.propagate(&*coupling.to);
                if let Some(target) = coupling.target {
                    self.synchronize.entry(target).or_insert(false);
                }
            }
        }
        for coupling in &self.eocs {
            if !coupling.from.is_empty() {
                coupling.from.propagate(&*coupling.to);
            }
        }
        Ok(())
    }

    /// Routes the inputs delivered by the parent through the external input
    /// couplings, then transitions every synchronized child exactly once,
    /// rescheduling each according to its next planned duration.
    fn perform_transitions(
        &mut self,
        time: &TimePoint,
        _elapsed: Duration,
    ) -> Result<Duration, SimulationError> {
        for coupling in &self.eics {
            if !coupling.from.is_empty() {
                coupling.from.propagate(&*coupling.to);
                if let Some(target) = coupling.target {
                    self.synchronize.entry(target).or_insert(false);
                }
            }
        }
        let synchronize = std::mem::take(&mut self.synchronize);
        for (i, imminent) in synchronize {
            let child_elapsed = if imminent {
                self.comps[i].get_planned()
            } else {
                let _ = self.scheduler.cancel_event(i);
                self.cache.elapsed_duration_of(i, time)
            };
            let next = self.comps[i].perform_transitions(time, child_elapsed)?;
            if next.is_infinite() {
                let _ = self.scheduler.cancel_event(i);
            } else {
                self.scheduler.plan_event(i, next, time)?;
            }
            self.cache.retain_event(i, time, Duration::ZERO);
            self.comps[i].clear_ports();
        }
        self.component.clear_input();
        let planned = self.scheduler.imminent_duration(time);
        self.component.set_sim_t(time.clone(), planned);
        Ok(planned)
    }

    fn stop_simulation(&mut self, time: &TimePoint) {
        for comp in &mut self.comps {
            comp.stop_simulation(time);
        }
        self.component
            .set_sim_t(time.clone(), Duration::INFINITY);
    }
}

/// Root coordinator for sequential simulations of DEVS models. It owns the
/// global time point and drives the peek / advance / collect / transition
/// cycle over its single child processor.
#[derive(Debug)]
pub struct RootCoordinator<T> {
    model: T,
    time: TimePoint,
}

impl<T: Simulator> RootCoordinator<T> {
    /// Creates a new root coordinator from a DEVS-compliant model, starting
    /// at the origin of the timeline.
    pub fn new(model: T) -> Self {
        Self::starting_at(model, TimePoint::origin())
    }

    /// Creates a new root coordinator starting at the given virtual time.
    pub fn starting_at(model: T, time: TimePoint) -> Self {
        Self { model, time }
    }

    /// Current global time.
    pub fn time(&self) -> &TimePoint {
        &self.time
    }

    /// Initializes the processor hierarchy at the current time and returns
    /// the first planned duration.
    pub fn initialize(&mut self) -> Result<Duration, SimulationError> {
        let time = self.time.clone();
        let (_, planned) = self.model.initialize(&time)?;
        Ok(planned)
    }

    /// Advances the simulation by one cycle: peeks the imminent duration,
    /// advances the clock, collects outputs, and performs transitions.
    /// Returns the consumed duration, or `None` when the model is passive.
    /// On failure, the mutable port bags are cleared before reporting.
    pub fn step(&mut self) -> Result<Option<Duration>, SimulationError> {
        let planned = self.model.get_planned();
        if planned.is_infinite() {
            return Ok(None);
        }
        self.time.advance(planned);
        trace!("advancing {} to {}", planned, self.time);
        let time = self.time.clone();
        let outcome = self
            .model
            .collect_outputs(&time, planned)
            .and_then(|_| self.model.perform_transitions(&time, planned));
        self.model.clear_ports();
        outcome.map(|_| Some(planned))
    }
}

impl<T> Deref for RootCoordinator<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}

impl<T> DerefMut for RootCoordinator<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.model
    }
}
