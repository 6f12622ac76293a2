//! Rangefinder configuration
//!
//! Defaults describe an HC-SR04 on a 170x320 panel refreshed at 4 Hz.

use embassy_time::Duration;
use thiserror_no_std::Error;

/// Speed of sound in air at roughly 20 °C (343 m/s), in millimetres per microsecond.
pub const SPEED_OF_SOUND_MM_PER_US: f32 = 0.343;

/// Closest distance the HC-SR04 reports reliably. Anything nearer is ringing.
pub const SENSOR_MIN_RELIABLE_MM: f32 = 20.0;

/// Rated maximum range of the HC-SR04.
pub const SENSOR_MAX_RANGE_MM: f32 = 4000.0;

/// Trigger held low before the pulse to start from a clean edge.
pub const TRIGGER_SETTLE_US: u32 = 2;

/// Width of the trigger pulse.
pub const TRIGGER_PULSE_US: u32 = 10;

/// Bottom of the visual meter scale.
pub const METER_MIN_MM: f32 = 0.0;

/// Top of the visual meter scale (100 cm).
pub const METER_MAX_MM: f32 = 1000.0;

/// Minimum change before the meter is repainted (1 cm).
pub const METER_HYSTERESIS_MM: f32 = 10.0;

/// Spacing of the tick marks beside the meter (10 cm).
pub const METER_TICK_STEP_MM: f32 = 100.0;

/// Measurement cadence (4 Hz).
pub const UPDATE_PERIOD_MS: u64 = 250;

/// What a missing echo is reported as.
///
/// A timed-out echo carries no distance information, so the reported value
/// is a policy decision rather than something computed from the (absent)
/// pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Nothing reflected the burst within range: report the maximum range.
    #[default]
    ReportMax,
    /// Treat the missing echo like a near-field reading: report zero.
    ReportZero,
}

/// Acquisition parameters for the trigger/echo sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub speed_of_sound_mm_per_us: f32,
    pub min_reliable_mm: f32,
    pub max_range_mm: f32,
    pub settle_us: u32,
    pub pulse_us: u32,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            speed_of_sound_mm_per_us: SPEED_OF_SOUND_MM_PER_US,
            min_reliable_mm: SENSOR_MIN_RELIABLE_MM,
            max_range_mm: SENSOR_MAX_RANGE_MM,
            settle_us: TRIGGER_SETTLE_US,
            pulse_us: TRIGGER_PULSE_US,
            timeout_policy: TimeoutPolicy::ReportMax,
        }
    }
}

impl SensorConfig {
    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    pub fn with_range(mut self, min_reliable_mm: f32, max_range_mm: f32) -> Self {
        self.min_reliable_mm = min_reliable_mm;
        self.max_range_mm = max_range_mm;
        self
    }

    /// Upper bound on the echo wait: the round-trip time of flight for the
    /// maximum range, rounded up to the next microsecond.
    pub fn echo_timeout(&self) -> Duration {
        let round_trip_us = 2.0 * self.max_range_mm / self.speed_of_sound_mm_per_us;
        let whole = round_trip_us as u64;
        let us = if (whole as f32) < round_trip_us {
            whole + 1
        } else {
            whole
        };
        Duration::from_micros(us)
    }
}

/// Scale and redraw threshold of the level meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterConfig {
    pub min_mm: f32,
    pub max_mm: f32,
    pub hysteresis_mm: f32,
    pub tick_step_mm: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            min_mm: METER_MIN_MM,
            max_mm: METER_MAX_MM,
            hysteresis_mm: METER_HYSTERESIS_MM,
            tick_step_mm: METER_TICK_STEP_MM,
        }
    }
}

impl MeterConfig {
    pub fn with_range(mut self, min_mm: f32, max_mm: f32) -> Self {
        self.min_mm = min_mm;
        self.max_mm = max_mm;
        self
    }

    pub fn with_hysteresis(mut self, hysteresis_mm: f32) -> Self {
        self.hysteresis_mm = hysteresis_mm;
        self
    }

    /// Width of the meter scale.
    pub fn span_mm(&self) -> f32 {
        self.max_mm - self.min_mm
    }
}

/// Cadence of the acquisition/render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    pub period: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(UPDATE_PERIOD_MS),
        }
    }
}

impl CycleConfig {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangefinderConfig {
    pub sensor: SensorConfig,
    pub meter: MeterConfig,
    pub cycle: CycleConfig,
}

impl RangefinderConfig {
    /// Reject configurations that would divide by zero or invert a range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sensor = &self.sensor;
        if !(sensor.speed_of_sound_mm_per_us > 0.0) {
            return Err(ConfigError::NonPositiveSpeed);
        }
        if !(sensor.min_reliable_mm >= 0.0 && sensor.min_reliable_mm < sensor.max_range_mm) {
            return Err(ConfigError::EmptySensorRange {
                min: sensor.min_reliable_mm,
                max: sensor.max_range_mm,
            });
        }

        let meter = &self.meter;
        if !(meter.min_mm < meter.max_mm) {
            return Err(ConfigError::EmptyMeterRange {
                min: meter.min_mm,
                max: meter.max_mm,
            });
        }
        if !(meter.hysteresis_mm >= 0.0) {
            return Err(ConfigError::NegativeHysteresis);
        }
        if !(meter.tick_step_mm > 0.0) {
            return Err(ConfigError::NonPositiveTickStep);
        }

        if self.cycle.period.as_ticks() == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("Speed of sound must be positive")]
    NonPositiveSpeed,
    #[error("Sensor range is empty (min: {min} mm, max: {max} mm)")]
    EmptySensorRange { min: f32, max: f32 },
    #[error("Meter range is empty (min: {min} mm, max: {max} mm)")]
    EmptyMeterRange { min: f32, max: f32 },
    #[error("Meter hysteresis must not be negative")]
    NegativeHysteresis,
    #[error("Meter tick step must be positive")]
    NonPositiveTickStep,
    #[error("Update period must be non-zero")]
    ZeroPeriod,
}
