//! Multiscale simulation time.
//!
//! Time is represented in base 1000 at a variable precision so that events
//! separated by many orders of magnitude still compare exactly: [`Scale`]
//! selects a unit, [`Duration`] is a signed interval at a scale, and
//! [`TimePoint`] is an absolute epoch time with arbitrarily many digits.
//! Arithmetic coarsens precision only when an exact result is not
//! representable.

mod duration;
mod point;
mod scale;

pub use duration::{Duration, MULTIPLIER_LIMIT, MULTIPLIER_MAX};
pub use point::TimePoint;
pub use scale::Scale;
