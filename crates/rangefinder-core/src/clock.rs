//! Time source abstraction
//!
//! The cycle controller and the polled echo timer never read a global timer
//! directly; they ask an injected [`Clock`]. Firmware backs it with the
//! platform timer, the simulator with `std::time`, and tests with a clock
//! they advance by hand.

use embassy_time::{Duration, Instant};

/// Monotonic time source with at least microsecond resolution.
pub trait Clock {
    /// Current instant. Must never go backwards.
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Time elapsed between `earlier` and `now`, saturating at zero.
#[inline]
pub fn elapsed_between(earlier: Instant, now: Instant) -> Duration {
    Duration::from_ticks(now.as_ticks().saturating_sub(earlier.as_ticks()))
}
