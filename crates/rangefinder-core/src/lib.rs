//! Hardware-independent core library for the rangefinder
//!
//! This crate contains the platform-agnostic logic of the ultrasonic
//! distance display: HC-SR04 acquisition over `embedded-hal` pins, range
//! clamping, the numeric readout and gradient level meter drawn through
//! `embedded-graphics`, and the cooperative cycle controller that ties them
//! together on a single timeline.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod cycle;
pub mod framebuffer;
pub mod sensors;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use clock::Clock;
pub use config::{CycleConfig, MeterConfig, RangefinderConfig, SensorConfig, TimeoutPolicy};
pub use cycle::{CycleController, CycleState, Tick};
pub use sensors::{DistanceSample, DistanceSensor, RangeStatus};
