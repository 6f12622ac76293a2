//! HC-SR04 ultrasonic rangefinder
//!
//! Measurement sequence:
//! 1. Drive TRIG low for a couple of microseconds so the pulse starts from a
//!    clean edge.
//! 2. Drive TRIG high for 10 us. The sensor answers with an 8-cycle 40 kHz
//!    burst.
//! 3. Time how long ECHO stays high. That is the round-trip time of flight.
//!
//! Step 3 is the only blocking wait in the whole cycle and is capped at the
//! time of flight for the configured maximum range.

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, warn};
use thiserror_no_std::Error;

use super::{DistanceSample, DistanceSensor, EchoError, EchoTimer, RangeStatus};
use crate::config::SensorConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Trigger pin could not be driven")]
    Trigger,
    #[error("Echo measurement failed: {0}")]
    Echo(#[from] EchoError),
}

pub struct RangeFinder<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
    config: SensorConfig,
}

impl<T, E, D> RangeFinder<T, E, D>
where
    T: OutputPin,
    E: EchoTimer,
    D: DelayNs,
{
    pub fn new(trigger: T, echo: E, delay: D, config: SensorConfig) -> Self {
        Self {
            trigger,
            echo,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Give the pins and delay back, e.g. to reconfigure them.
    pub fn release(self) -> (T, E, D) {
        (self.trigger, self.echo, self.delay)
    }

    /// Emit the trigger pulse.
    ///
    /// Runs inside a critical section: nothing else may touch the pins or
    /// stretch the pulse while it is on the wire.
    fn fire(&mut self) -> Result<(), AcquisitionError> {
        let settle_us = self.config.settle_us;
        let pulse_us = self.config.pulse_us;
        let trigger = &mut self.trigger;
        let delay = &mut self.delay;

        critical_section::with(|_| {
            trigger.set_low().map_err(|_| AcquisitionError::Trigger)?;
            delay.delay_us(settle_us);
            trigger.set_high().map_err(|_| AcquisitionError::Trigger)?;
            delay.delay_us(pulse_us);
            trigger.set_low().map_err(|_| AcquisitionError::Trigger)
        })
    }

    /// Trigger the sensor and return the raw echo width.
    pub fn ping(&mut self) -> Result<Duration, AcquisitionError> {
        self.fire()?;
        let width = self
            .echo
            .pulse_width(PinState::High, self.config.echo_timeout())?;
        Ok(width)
    }
}

impl<T, E, D> DistanceSensor for RangeFinder<T, E, D>
where
    T: OutputPin,
    E: EchoTimer,
    D: DelayNs,
{
    fn measure(&mut self) -> DistanceSample {
        match self.ping() {
            Ok(width) => {
                let sample = DistanceSample::from_echo(width, &self.config);
                match sample.status {
                    RangeStatus::InRange => {}
                    status => debug!(
                        "HC-SR04: {} us echo clamped to {} mm ({:?})",
                        width.as_micros(),
                        sample.distance_mm,
                        status
                    ),
                }
                sample
            }
            Err(e) => {
                let sample = DistanceSample::no_echo(&self.config);
                warn!(
                    "HC-SR04: {} - reporting {} mm ({:?})",
                    e, sample.distance_mm, self.config.timeout_policy
                );
                sample
            }
        }
    }
}
