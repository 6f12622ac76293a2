//! Desktop simulator for the rangefinder display.
//!
//! Runs the real `CycleController` and `RangeFinder` from rangefinder-core
//! against a synthetic target whose distance sweeps up and down, dips below
//! the sensor minimum, jumps past its maximum and now and then loses the
//! echo entirely.
//!
//! By default the run is headless: a simulated clock is stepped for
//! `RANGEFINDER_SIM_SECONDS` (default 10) and the final screen is saved to
//! `RANGEFINDER_SNAPSHOT` (default `rangefinder.png`).
//!
//! Built with `--features window`, the simulator opens an SDL2 window and runs
//! against the wall clock instead.
//!
//! | Key        | Action |
//! |------------|--------|
//! | Q / Escape | Quit   |

use std::cell::Cell;
use std::convert::Infallible;
use std::process::ExitCode;

use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use log::{error, info};

use rangefinder_core::sensors::{EchoError, EchoTimer, RangeFinder};
use rangefinder_core::ui::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use rangefinder_core::{Clock, CycleController, RangefinderConfig, Tick};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the window and the PNG snapshot.
const WINDOW_SCALE: u32 = 2;

/// Simulated time between controller ticks in headless mode.
const SIM_STEP: Duration = Duration::from_millis(5);

/// Target frame duration in window mode (~30 FPS).
#[cfg(feature = "window")]
const FRAME_DURATION: std::time::Duration = std::time::Duration::from_millis(33);

const DEFAULT_SIM_SECONDS: u64 = 10;
const DEFAULT_SNAPSHOT: &str = "rangefinder.png";

/// Length of one full pass of the synthetic target.
const SWEEP_PERIOD_SECS: f32 = 16.0;

// ---------------------------------------------------------------------------
// Synthetic target
// ---------------------------------------------------------------------------

/// What the sensor "sees" at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    At(f32),
    /// Nothing reflects the burst.
    Lost,
}

/// Target position `secs` into the simulation.
///
/// One sweep: a slow approach from 0 to 1200 mm (through the too-close band
/// and past the top of the meter), a faster retreat to 300 mm, a second
/// beyond the sensor's range, a second with no echo, then back down to 0.
/// A few millimetres of wobble keep the meter's hysteresis busy.
fn target_at(secs: f32) -> Target {
    let phase = secs % SWEEP_PERIOD_SECS;
    let wobble = 4.0 * (secs * 9.0).sin();

    let mm = if phase < 8.0 {
        phase / 8.0 * 1200.0
    } else if phase < 10.0 {
        1200.0 - (phase - 8.0) / 2.0 * 900.0
    } else if phase < 11.0 {
        4500.0
    } else if phase < 12.0 {
        return Target::Lost;
    } else {
        300.0 - (phase - 12.0) / 4.0 * 300.0
    };

    Target::At((mm + wobble).max(0.0))
}

/// Echo line driven by [`target_at`] on the simulation clock.
struct SweepEcho<C> {
    clock: C,
    speed_mm_per_us: f32,
}

impl<C: Clock> SweepEcho<C> {
    fn new(clock: C, speed_mm_per_us: f32) -> Self {
        Self {
            clock,
            speed_mm_per_us,
        }
    }
}

impl<C: Clock> EchoTimer for SweepEcho<C> {
    fn pulse_width(&mut self, _level: PinState, timeout: Duration) -> Result<Duration, EchoError> {
        let secs = self.clock.now().as_micros() as f32 / 1_000_000.0;
        match target_at(secs) {
            Target::Lost => Err(EchoError::Timeout),
            Target::At(mm) => {
                let width = Duration::from_micros((mm * 2.0 / self.speed_mm_per_us) as u64);
                if width > timeout {
                    Err(EchoError::Timeout)
                } else {
                    Ok(width)
                }
            }
        }
    }
}

/// Trigger line with nothing attached.
struct SimTrigger;

impl ErrorType for SimTrigger {
    type Error = Infallible;
}

impl OutputPin for SimTrigger {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Busy-free delay backed by the host scheduler.
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns.into()));
    }
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Clock that only moves when told to.
struct SimClock {
    micros: Cell<u64>,
}

impl SimClock {
    fn new() -> Self {
        Self {
            micros: Cell::new(0),
        }
    }

    fn advance(&self, by: Duration) {
        self.micros.set(self.micros.get() + by.as_micros());
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }
}

/// Wall clock measured from simulator start.
#[cfg(feature = "window")]
struct WallClock {
    start: std::time::Instant,
}

#[cfg(feature = "window")]
impl WallClock {
    fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "window")]
impl Clock for WallClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.start.elapsed().as_micros() as u64)
    }
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

fn new_display() -> SimulatorDisplay<Rgb565> {
    SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg_attr(feature = "window", allow(dead_code))]
fn run_headless(config: &RangefinderConfig) -> ExitCode {
    let seconds: u64 = env_or("RANGEFINDER_SIM_SECONDS", DEFAULT_SIM_SECONDS);
    let snapshot: String = env_or("RANGEFINDER_SNAPSHOT", DEFAULT_SNAPSHOT.to_string());
    info!("Headless run: {} simulated seconds", seconds);

    let clock = SimClock::new();
    let finder = RangeFinder::new(
        SimTrigger,
        SweepEcho::new(&clock, config.sensor.speed_of_sound_mm_per_us),
        StdDelay,
        config.sensor,
    );
    let mut controller = CycleController::new(finder, &clock, config.meter, config.cycle);
    let mut display = new_display();

    if let Err(e) = controller.draw_static(&mut display) {
        error!("Static screen draw failed: {:?}", e);
        return ExitCode::FAILURE;
    }

    let end = Instant::from_secs(seconds);
    let mut acquisitions = 0u32;
    let mut redraws = 0u32;
    while clock.now() < end {
        match controller.tick(&mut display) {
            Tick::Acquired(_) => acquisitions += 1,
            Tick::Rendered {
                meter_redrawn: true,
            } => redraws += 1,
            _ => {}
        }
        clock.advance(SIM_STEP);
    }
    info!(
        "{} acquisitions, {} meter repaints, last reading {}",
        acquisitions,
        redraws,
        controller.dashboard().readout().text()
    );

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    match display
        .to_rgb_output_image(&output_settings)
        .save_png(&snapshot)
    {
        Ok(()) => {
            info!("Snapshot saved to {}", snapshot);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to save snapshot to {}: {}", snapshot, e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "window")]
fn run_window(config: &RangefinderConfig) -> ExitCode {
    use embedded_graphics_simulator::{SimulatorEvent, Window, sdl2::Keycode};

    info!("Keys: Q/Escape=Quit");

    let clock = WallClock::new();
    let finder = RangeFinder::new(
        SimTrigger,
        SweepEcho::new(&clock, config.sensor.speed_of_sound_mm_per_us),
        StdDelay,
        config.sensor,
    );
    let mut controller = CycleController::new(finder, &clock, config.meter, config.cycle);
    let mut display = new_display();

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Rangefinder Simulator", &output_settings);

    if let Err(e) = controller.draw_static(&mut display) {
        error!("Static screen draw failed: {:?}", e);
        return ExitCode::FAILURE;
    }
    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    window.update(&display);

    'running: loop {
        let frame_start = std::time::Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. }
                    if keycode == Keycode::Q || keycode == Keycode::Escape =>
                {
                    break 'running;
                }
                _ => {}
            }
        }

        // Drive the cycle until it has nothing left to do this frame
        while controller.tick(&mut display) != Tick::Waiting {}

        window.update(&display);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting");
    ExitCode::SUCCESS
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting rangefinder simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );

    let config = RangefinderConfig::default();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    #[cfg(feature = "window")]
    {
        run_window(&config)
    }
    #[cfg(not(feature = "window"))]
    {
        run_headless(&config)
    }
}
