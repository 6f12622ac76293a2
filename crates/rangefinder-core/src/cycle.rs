//! Cooperative acquisition/render cycle
//!
//! One call to [`CycleController::tick`] does at most one step of work:
//!
//! ```text
//!   Acquiring ──measure──▶ Rendering ──draw──▶ Idle ──period elapsed──▶ Acquiring
//!                                                │
//!                                                └─ otherwise: return at once
//! ```
//!
//! The caller owns the loop. Apart from the bounded echo wait inside
//! `Acquiring`, a tick never blocks, so the loop is free to service other
//! work between ticks.

use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use log::{debug, error};

use crate::clock::{Clock, elapsed_between};
use crate::config::{CycleConfig, MeterConfig};
use crate::sensors::{DistanceSample, DistanceSensor};
use crate::ui::Dashboard;

/// Where the controller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleState {
    /// Next tick takes a measurement.
    Acquiring,
    /// Next tick draws this sample.
    Rendering(DistanceSample),
    /// Waiting for the period that started at `since` to run out.
    Idle { since: Instant },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Acquired(DistanceSample),
    Rendered { meter_redrawn: bool },
    /// Period elapsed; the next tick measures.
    PeriodElapsed,
    /// Still inside the period; no work was done.
    Waiting,
}

pub struct CycleController<S, C> {
    sensor: S,
    clock: C,
    dashboard: Dashboard,
    period: Duration,
    state: CycleState,
}

impl<S, C> CycleController<S, C>
where
    S: DistanceSensor,
    C: Clock,
{
    pub fn new(sensor: S, clock: C, meter: MeterConfig, cycle: CycleConfig) -> Self {
        Self {
            sensor,
            clock,
            dashboard: Dashboard::new(meter),
            period: cycle.period,
            state: CycleState::Acquiring,
        }
    }

    /// Use a dashboard with a custom layout.
    pub fn with_dashboard(mut self, dashboard: Dashboard) -> Self {
        self.dashboard = dashboard;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Paint the static screen. Call once before the first tick.
    pub fn draw_static<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.dashboard.draw_static(display)
    }

    /// Advance the cycle by one step.
    ///
    /// Display errors are logged and swallowed: the cycle still moves to
    /// `Idle`, and the next period draws again.
    pub fn tick<D>(&mut self, display: &mut D) -> Tick
    where
        D: DrawTarget<Color = Rgb565>,
        D::Error: core::fmt::Debug,
    {
        match self.state {
            CycleState::Acquiring => {
                let sample = self.sensor.measure();
                debug!(
                    "Cycle: acquired {} mm ({:?})",
                    sample.distance_mm, sample.status
                );
                self.state = CycleState::Rendering(sample);
                Tick::Acquired(sample)
            }
            CycleState::Rendering(sample) => {
                let meter_redrawn = match self.dashboard.render(&sample, display) {
                    Ok(redrawn) => redrawn,
                    Err(e) => {
                        error!("Cycle: display render error: {:?}", e);
                        false
                    }
                };
                self.state = CycleState::Idle {
                    since: self.clock.now(),
                };
                Tick::Rendered { meter_redrawn }
            }
            CycleState::Idle { since } => {
                if elapsed_between(since, self.clock.now()) >= self.period {
                    self.state = CycleState::Acquiring;
                    Tick::PeriodElapsed
                } else {
                    Tick::Waiting
                }
            }
        }
    }
}
