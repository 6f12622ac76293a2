//! Busy-polled echo timing over a plain GPIO input
//!
//! Portable fallback for boards without a pulse-capture peripheral. The
//! pin is sampled in a tight loop against an injected [`Clock`], so the
//! achievable resolution is that of the clock plus the loop overhead.

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{InputPin, PinState};

use super::{EchoError, EchoTimer};
use crate::clock::{Clock, elapsed_between};

pub struct PolledEcho<P, C> {
    pin: P,
    clock: C,
}

impl<P, C> PolledEcho<P, C>
where
    P: InputPin,
    C: Clock,
{
    pub fn new(pin: P, clock: C) -> Self {
        Self { pin, clock }
    }

    pub fn release(self) -> (P, C) {
        (self.pin, self.clock)
    }

    fn is_at(&mut self, level: PinState) -> Result<bool, EchoError> {
        let high = self.pin.is_high().map_err(|_| EchoError::Pin)?;
        Ok(high == (level == PinState::High))
    }

    /// Spin while "pin is at `level`" equals `at`, failing once more than
    /// `timeout` has passed since `start`.
    fn wait_while(
        &mut self,
        level: PinState,
        at: bool,
        start: Instant,
        timeout: Duration,
    ) -> Result<(), EchoError> {
        while self.is_at(level)? == at {
            if elapsed_between(start, self.clock.now()) > timeout {
                return Err(EchoError::Timeout);
            }
        }
        Ok(())
    }
}

impl<P, C> EchoTimer for PolledEcho<P, C>
where
    P: InputPin,
    C: Clock,
{
    /// The wait for the leading edge and the pulse itself each get the full
    /// `timeout`, so a late rise does not eat into the measurable width.
    fn pulse_width(&mut self, level: PinState, timeout: Duration) -> Result<Duration, EchoError> {
        let start = self.clock.now();

        // A pulse already in progress cannot be timed from its leading edge
        self.wait_while(level, true, start, timeout)?;
        self.wait_while(level, false, start, timeout)?;

        let rise = self.clock.now();
        self.wait_while(level, true, rise, timeout)?;

        Ok(elapsed_between(rise, self.clock.now()))
    }
}
