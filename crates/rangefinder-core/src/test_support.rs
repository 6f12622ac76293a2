//! Test doubles shared by the unit tests.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;
use core::convert::Infallible;

use embassy_time::{Duration, Instant};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::digital::{ErrorType, InputPin, PinState};

use crate::clock::Clock;
use crate::sensors::{DistanceSample, DistanceSensor, EchoError, EchoTimer, RangeStatus};

/// Clock moved by hand. Optionally advances by a fixed step on every read,
/// which models the cost of a polling loop.
pub struct ManualClock {
    micros: Cell<u64>,
    step_us: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            micros: Cell::new(0),
            step_us: 0,
        }
    }

    pub fn auto_advancing(step_us: u64) -> Self {
        Self {
            micros: Cell::new(0),
            step_us,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.micros.set(self.micros.get() + by.as_micros());
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Current time without advancing.
    pub fn peek_micros(&self) -> u64 {
        self.micros.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let now = self.micros.get();
        self.micros.set(now + self.step_us);
        Instant::from_micros(now)
    }
}

/// Echo line that is high during `[rise, fall)` microseconds of a
/// [`ManualClock`], or never if `window` is `None`.
pub struct ScriptedEchoPin<'a> {
    clock: &'a ManualClock,
    window: Option<(u64, u64)>,
}

impl<'a> ScriptedEchoPin<'a> {
    pub fn new(clock: &'a ManualClock, window: Option<(u64, u64)>) -> Self {
        Self { clock, window }
    }
}

impl ErrorType for ScriptedEchoPin<'_> {
    type Error = Infallible;
}

impl InputPin for ScriptedEchoPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let t = self.clock.peek_micros();
        Ok(matches!(self.window, Some((rise, fall)) if t >= rise && t < fall))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Echo timer that returns a canned result and remembers what it was asked.
pub struct FixedEcho {
    result: Result<Duration, EchoError>,
    level: Option<PinState>,
    timeout: Option<Duration>,
}

impl FixedEcho {
    pub fn width_us(us: u64) -> Self {
        Self {
            result: Ok(Duration::from_micros(us)),
            level: None,
            timeout: None,
        }
    }

    pub fn failing(error: EchoError) -> Self {
        Self {
            result: Err(error),
            level: None,
            timeout: None,
        }
    }

    pub fn requested_level(&self) -> Option<PinState> {
        self.level
    }

    pub fn requested_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl EchoTimer for FixedEcho {
    fn pulse_width(&mut self, level: PinState, timeout: Duration) -> Result<Duration, EchoError> {
        self.level = Some(level);
        self.timeout = Some(timeout);
        self.result
    }
}

/// Sensor that replays a list of samples, repeating the last one forever.
pub struct ScriptedSensor {
    samples: VecDeque<DistanceSample>,
    last: DistanceSample,
    calls: usize,
}

impl ScriptedSensor {
    pub fn new(samples: &[DistanceSample]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            last: in_range_mm(0.0),
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DistanceSensor for ScriptedSensor {
    fn measure(&mut self) -> DistanceSample {
        self.calls += 1;
        if let Some(next) = self.samples.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// In-range sample at `mm`, with a matching echo width.
pub fn in_range_mm(mm: f32) -> DistanceSample {
    DistanceSample {
        echo: Duration::from_micros((mm * 2.0 / crate::config::SPEED_OF_SOUND_MM_PER_US) as u64),
        distance_mm: mm,
        status: RangeStatus::InRange,
    }
}

/// Error reported by [`RecordingDisplay`] when told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFault;

/// Draw target that keeps every pixel and counts bulk operations.
pub struct RecordingDisplay {
    size: Size,
    pixels: Vec<Rgb565>,
    pub contiguous_fills: usize,
    pub solid_fills: usize,
    pub fail_contiguous: bool,
}

impl RecordingDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            pixels: vec![Rgb565::BLACK; (width * height) as usize],
            contiguous_fills: 0,
            solid_fills: 0,
            fail_contiguous: false,
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Rgb565 {
        self.pixels[y as usize * self.size.width as usize + x as usize]
    }

    /// Whether every pixel of `area` has `color`.
    pub fn region_is(&self, area: &Rectangle, color: Rgb565) -> bool {
        area.points().all(|p| self.pixel(p.x, p.y) == color)
    }

    pub fn reset_counters(&mut self) {
        self.contiguous_fills = 0;
        self.solid_fills = 0;
    }

    fn put(&mut self, point: Point, color: Rgb565) {
        if point.x >= 0
            && point.y >= 0
            && (point.x as u32) < self.size.width
            && (point.y as u32) < self.size.height
        {
            let idx = point.y as usize * self.size.width as usize + point.x as usize;
            self.pixels[idx] = color;
        }
    }
}

impl OriginDimensions for RecordingDisplay {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for RecordingDisplay {
    type Color = Rgb565;
    type Error = DisplayFault;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point, color);
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        if self.fail_contiguous {
            return Err(DisplayFault);
        }
        self.contiguous_fills += 1;
        for (point, color) in area.points().zip(colors) {
            self.put(point, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.solid_fills += 1;
        for point in area.points() {
            self.put(point, color);
        }
        Ok(())
    }
}
