use crate::time::{Duration, Scale};
use thiserror::Error;

/// Fatal simulation failures. Any of these aborts the current run: the driver
/// clears the mutable port bags, records the error, and stops the loop.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A value was posted to a port that the posting model does not own.
    #[error("port {port} is not owned by model {model}")]
    InvalidPortHost { model: String, port: String },

    /// A port was looked up under a name the model does not declare.
    #[error("model {model} has no port named {port}")]
    NoSuchPort { model: String, port: String },

    /// A finite time advance could not be expressed at the model's precision.
    #[error("time advance {planned} of model {model} cannot be expressed at precision {precision}")]
    InvalidDuration {
        model: String,
        planned: Duration,
        precision: Scale,
    },

    /// A processor was driven outside its lifecycle, e.g. initialized twice
    /// or transitioned before initialization.
    #[error("processor {model} was driven outside its lifecycle: {reason}")]
    InvalidProcessor { model: String, reason: &'static str },

    /// Internal invariant violation: a processor observed an elapsed time
    /// beyond its planned duration. Indicates a scheduler bug.
    #[error("model {model} desynchronized: elapsed {elapsed} exceeds planned {planned}")]
    BadSynchronisation {
        model: String,
        elapsed: Duration,
        planned: Duration,
    },

    #[error(transparent)]
    Planning(#[from] PlanningError),
}

/// The event set cannot represent a planned duration at the precision it was
/// pinned to.
#[derive(Debug, Error)]
#[error("planned duration overflows the multiplier window at precision {precision}")]
pub struct PlanningError {
    pub precision: Scale,
}

/// Raised when attaching an observer to a port whose class is never
/// externally visible (input ports of atomic models, any port of a coupled
/// model). A configuration mistake, reported at setup time.
#[derive(Debug, Error)]
#[error("port {port} is not externally observable")]
pub struct UnobservablePortError {
    pub port: String,
}
