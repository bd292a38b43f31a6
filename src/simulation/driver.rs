use super::{RootCoordinator, Simulator, TransitionStats};
use crate::errors::SimulationError;
use crate::scheduling::SchedulerKind;
use crate::time::{Duration, TimePoint};
use log::{debug, info};
use std::cell::Cell;
use std::rc::Rc;

/// Configuration of a simulation run.
#[derive(Clone, Debug)]
pub struct SimulationOptions {
    /// Maximum simulated duration of the run. Events landing exactly on the
    /// bound still fire; the first event beyond it ends the run.
    pub duration: Duration,
    /// Event-set backend installed in every coordinator.
    pub default_scheduler: SchedulerKind,
    /// Validate the coupling structure before the first cycle.
    pub run_validations: bool,
    /// Virtual time at which the run starts.
    pub virtual_time: TimePoint,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            duration: Duration::INFINITY,
            default_scheduler: SchedulerKind::default(),
            run_validations: true,
            virtual_time: TimePoint::origin(),
        }
    }
}

/// Cooperative cancellation flag. Cloned out of a [`Simulation`] and polled
/// between cycles; mid-cycle cancellation is not supported.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Rc<Cell<bool>>);

impl AbortHandle {
    /// Requests the simulation to stop before its next cycle.
    pub fn abort(&self) {
        self.0.set(true);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.get()
    }
}

/// Drives a model to completion: initialization, then one peek / advance /
/// collect / transition cycle at a time until the scheduler runs dry, the
/// duration bound is reached, or an abort is requested.
#[derive(Debug)]
pub struct Simulation<T: Simulator> {
    root: RootCoordinator<T>,
    start: TimePoint,
    duration: Duration,
    abort: AbortHandle,
    done: bool,
}

impl<T: Simulator> Simulation<T> {
    /// Prepares a simulation of the given model. The scheduler backend is
    /// installed throughout the hierarchy and, unless disabled, the coupling
    /// structure is validated.
    pub fn new(mut model: T, options: SimulationOptions) -> Result<Self, SimulationError> {
        model.set_scheduler(options.default_scheduler);
        if options.run_validations {
            model.validate()?;
        }
        let start = options.virtual_time.clone();
        Ok(Self {
            root: RootCoordinator::starting_at(model, options.virtual_time),
            start,
            duration: options.duration,
            abort: AbortHandle::default(),
            done: false,
        })
    }

    /// Current global time.
    pub fn time(&self) -> &TimePoint {
        self.root.time()
    }

    /// Transition counters over the whole hierarchy.
    pub fn transition_stats(&self) -> TransitionStats {
        self.root.transition_stats()
    }

    /// Handle through which a caller (or an observer) can request cooperative
    /// cancellation.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// True once the run has terminated, successfully or not.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Advances the simulation by one cycle. Returns false when no further
    /// cycle can run: the model is passive, the bound is reached, the run was
    /// aborted, or a previous cycle failed.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        if self.done {
            return Ok(false);
        }
        if self.abort.is_aborted() {
            debug!("abort requested, stopping at {}", self.root.time());
            self.finish();
            return Ok(false);
        }
        if !self.root.get_component().is_initialized() {
            if let Err(error) = self.root.initialize() {
                self.done = true;
                return Err(error);
            }
        }
        let planned = self.root.get_planned();
        if planned.is_infinite() || self.exceeds_bound(planned) {
            self.finish();
            return Ok(false);
        }
        match self.root.step() {
            Ok(Some(_)) => Ok(true),
            Ok(None) => {
                self.finish();
                Ok(false)
            }
            Err(error) => {
                // the root has already cleared the port bags; record the
                // failure and refuse to advance any further
                self.done = true;
                Err(error)
            }
        }
    }

    /// Runs the simulation to completion.
    pub fn simulate(&mut self) -> Result<(), SimulationError> {
        info!("simulating {} for {}", self.root.get_name(), self.duration);
        while self.step()? {}
        info!(
            "simulation of {} ended at {}",
            self.root.get_name(),
            self.root.time()
        );
        Ok(())
    }

    fn exceeds_bound(&self, planned: Duration) -> bool {
        if self.duration.is_infinite() {
            return false;
        }
        self.root.time().gap(&self.start) + planned > self.duration
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let time = self.root.time().clone();
        self.root.stop_simulation(&time);
    }
}
