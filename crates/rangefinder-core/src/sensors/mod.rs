//! Distance acquisition
//!
//! A [`DistanceSensor`] produces one [`DistanceSample`] per call. The
//! HC-SR04 implementation lives in [`hc_sr04`]; the echo pulse is timed
//! through the [`EchoTimer`] capability so hardware capture units, polled
//! GPIO ([`echo::PolledEcho`]) and test doubles are interchangeable.

pub mod echo;
pub mod hc_sr04;

use embassy_time::Duration;
use embedded_hal::digital::PinState;
use thiserror_no_std::Error;

use crate::config::{SensorConfig, TimeoutPolicy};

pub use echo::PolledEcho;
pub use hc_sr04::RangeFinder;

/// How a sample relates to the sensor's usable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// Reading fell within `[min_reliable, max_range]` and is reported as-is.
    InRange,
    /// Reading was below the reliable minimum and was clamped to zero.
    TooClose,
    /// Reading exceeded the rated range and was clamped to the maximum.
    OutOfRange,
    /// No usable echo; the distance comes from the [`TimeoutPolicy`].
    NoEcho,
}

/// One acquisition result. Distance is in millimetres and always within
/// `[0, max_range]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    /// Measured echo high-time (zero when no echo was captured).
    pub echo: Duration,
    pub distance_mm: f32,
    pub status: RangeStatus,
}

impl DistanceSample {
    /// Convert an echo pulse width and apply the clamping policy.
    pub fn from_echo(echo: Duration, config: &SensorConfig) -> Self {
        let raw_mm = echo_to_mm(echo, config.speed_of_sound_mm_per_us);
        let (distance_mm, status) = clamp_distance(raw_mm, config);
        Self {
            echo,
            distance_mm,
            status,
        }
    }

    /// Sample reported when the echo never arrived.
    pub fn no_echo(config: &SensorConfig) -> Self {
        let distance_mm = match config.timeout_policy {
            TimeoutPolicy::ReportMax => config.max_range_mm,
            TimeoutPolicy::ReportZero => 0.0,
        };
        Self {
            echo: Duration::from_ticks(0),
            distance_mm,
            status: RangeStatus::NoEcho,
        }
    }

    /// Whether the reported distance differs from what the echo implied.
    pub fn is_clamped(&self) -> bool {
        self.status != RangeStatus::InRange
    }
}

/// One-way travel distance for a round-trip echo: `(duration / 2) * speed`.
pub fn echo_to_mm(echo: Duration, speed_of_sound_mm_per_us: f32) -> f32 {
    (echo.as_micros() as f32 / 2.0) * speed_of_sound_mm_per_us
}

/// Clamp a raw reading into `[0, max_range]`.
///
/// Readings above the rated range report the maximum. Readings below the
/// reliable minimum report zero, not the minimum: near-field echoes are
/// dominated by transducer ringing and carry no trustworthy magnitude.
pub fn clamp_distance(raw_mm: f32, config: &SensorConfig) -> (f32, RangeStatus) {
    if raw_mm > config.max_range_mm {
        (config.max_range_mm, RangeStatus::OutOfRange)
    } else if raw_mm < config.min_reliable_mm || raw_mm.is_nan() {
        (0.0, RangeStatus::TooClose)
    } else {
        (raw_mm, RangeStatus::InRange)
    }
}

/// Anything that can produce a distance sample on demand.
pub trait DistanceSensor {
    /// Take one measurement. Never fails: problems are folded into the
    /// sample's [`RangeStatus`].
    fn measure(&mut self) -> DistanceSample;
}

impl<S: DistanceSensor + ?Sized> DistanceSensor for &mut S {
    fn measure(&mut self) -> DistanceSample {
        (**self).measure()
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoError {
    #[error("Echo pulse did not complete before the timeout")]
    Timeout,
    #[error("Echo pin could not be read")]
    Pin,
}

/// Capability that times a single pulse on the echo line.
pub trait EchoTimer {
    /// Wait for a pulse at `level` and return how long it lasted.
    ///
    /// The whole wait, including any still-running previous pulse and the
    /// wait for the leading edge, must give up after `timeout`.
    fn pulse_width(&mut self, level: PinState, timeout: Duration) -> Result<Duration, EchoError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SPEED_OF_SOUND_MM_PER_US as SPEED;

    #[test]
    fn test_echo_to_mm_is_half_round_trip() {
        // 1000 us round trip -> 500 us one way -> 171.5 mm
        let mm = echo_to_mm(Duration::from_micros(1000), SPEED);
        assert!(mm > 171.49 && mm < 171.51, "got {}", mm);
    }

    #[test]
    fn test_echo_to_mm_is_monotonic() {
        let mut last = 0.0f32;
        for us in (0..30_000u64).step_by(7) {
            let mm = echo_to_mm(Duration::from_micros(us), SPEED);
            assert!(mm >= last, "distance decreased at {} us", us);
            last = mm;
        }
    }

    #[test]
    fn test_clamp_above_range_reports_max() {
        let config = SensorConfig::default();
        assert_eq!(
            clamp_distance(4000.1, &config),
            (4000.0, RangeStatus::OutOfRange)
        );
        assert_eq!(
            clamp_distance(9000.0, &config),
            (4000.0, RangeStatus::OutOfRange)
        );
    }

    #[test]
    fn test_clamp_below_minimum_reports_zero() {
        let config = SensorConfig::default();
        assert_eq!(clamp_distance(19.9, &config), (0.0, RangeStatus::TooClose));
        assert_eq!(clamp_distance(0.0, &config), (0.0, RangeStatus::TooClose));
    }

    #[test]
    fn test_clamp_within_range_is_unchanged() {
        let config = SensorConfig::default();
        for mm in [20.0, 123.4, 1000.0, 4000.0] {
            assert_eq!(clamp_distance(mm, &config), (mm, RangeStatus::InRange));
        }
    }

    #[test]
    fn test_zero_duration_is_too_close() {
        let sample = DistanceSample::from_echo(Duration::from_ticks(0), &SensorConfig::default());
        assert_eq!(sample.distance_mm, 0.0);
        assert_eq!(sample.status, RangeStatus::TooClose);
        assert!(sample.is_clamped());
    }

    #[test]
    fn test_no_echo_follows_policy() {
        let max = DistanceSample::no_echo(&SensorConfig::default());
        assert_eq!(max.distance_mm, 4000.0);
        assert_eq!(max.status, RangeStatus::NoEcho);

        let zero_config = SensorConfig::default().with_timeout_policy(TimeoutPolicy::ReportZero);
        let zero = DistanceSample::no_echo(&zero_config);
        assert_eq!(zero.distance_mm, 0.0);
        assert_eq!(zero.status, RangeStatus::NoEcho);
    }
}
