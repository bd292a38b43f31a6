use super::Component;
use crate::time::{Duration, Scale};

/// Interface for atomic DEVS models.
pub trait Atomic {
    /// Returns reference to inner component.
    fn get_component(&self) -> &Component;

    /// Returns mutable reference to inner component.
    fn get_component_mut(&mut self) -> &mut Component;

    /// Precision level at which the model schedules its events. Planned
    /// durations are pinned to this scale; a time advance that cannot be
    /// expressed here aborts the simulation.
    #[inline]
    fn precision(&self) -> Scale {
        Scale::BASE
    }

    /// Elapsed duration the model starts its life with. By default, zero.
    #[inline]
    fn initial_elapsed(&self) -> Duration {
        Duration::ZERO
    }

    /// Method for performing any operation before simulating. By default, it does nothing.
    #[inline]
    fn start(&mut self) {}

    /// Method for performing any operation after simulating. By default, it does nothing.
    #[inline]
    fn stop(&mut self) {}

    /// Output function of the atomic DEVS model. This is the only method where
    /// implementers can safely manipulate their output [`super::Port`] structs.
    fn lambda(&self);

    /// Internal transition function of the atomic DEVS model.
    fn delta_int(&mut self);

    /// External transition function of the atomic DEVS model.
    /// `elapsed` corresponds to the duration since the last state transition of the model.
    /// This is the only method where implementers can safely manipulate their input [`super::Port`] structs.
    fn delta_ext(&mut self, elapsed: Duration);

    /// Time advance function of the atomic DEVS model.
    fn ta(&self) -> Duration;

    /// Confluent transition function of the atomic DEVS model.
    /// By default, it first triggers [`Atomic::delta_int`].
    /// Then, it triggers [`Atomic::delta_ext`] with the elapsed duration set to zero.
    #[inline]
    fn delta_conf(&mut self) {
        self.delta_int();
        self.delta_ext(Duration::ZERO);
    }
}
