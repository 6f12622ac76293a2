//! Full-screen layout: title block, numeric readout and level meter

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_7X13};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};
use log::debug;

use super::colors;
use super::meter::LevelMeter;
use super::readout::NumericReadout;
use super::{
    LINE_HEIGHT_PX, METER_HEIGHT_PX, METER_WIDTH_PX, METER_X_PX, METER_Y_PX, READOUT_HEIGHT_PX,
    READOUT_WIDTH_PX, READOUT_X_PX, READOUT_Y_PX,
};
use crate::config::MeterConfig;
use crate::sensors::DistanceSample;

const TITLE_LINES: [&str; 3] = [
    "------------------------",
    " HC-SR04 Distance Sensor",
    "------------------------",
];

const DISTANCE_LABEL: &str = "Distance:";

pub struct Dashboard {
    readout: NumericReadout,
    meter: LevelMeter,
}

impl Dashboard {
    /// Dashboard laid out for the 170x320 portrait panel.
    pub fn new(config: MeterConfig) -> Self {
        Self::with_layout(
            Rectangle::new(
                Point::new(READOUT_X_PX, READOUT_Y_PX),
                Size::new(READOUT_WIDTH_PX, READOUT_HEIGHT_PX),
            ),
            Rectangle::new(
                Point::new(METER_X_PX, METER_Y_PX),
                Size::new(METER_WIDTH_PX, METER_HEIGHT_PX),
            ),
            config,
        )
    }

    pub fn with_layout(readout: Rectangle, meter: Rectangle, config: MeterConfig) -> Self {
        Self {
            readout: NumericReadout::new(readout),
            meter: LevelMeter::new(meter, config),
        }
    }

    pub fn readout(&self) -> &NumericReadout {
        &self.readout
    }

    pub fn meter(&self) -> &LevelMeter {
        &self.meter
    }

    /// Paint everything that never changes. Call once after the panel is
    /// initialised, before the first cycle.
    pub fn draw_static<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        display.clear(colors::BACKGROUND)?;

        let style = MonoTextStyle::new(&FONT_7X13, colors::TEXT);
        let mut y = 0;
        for line in TITLE_LINES.iter().chain(core::iter::once(&DISTANCE_LABEL)) {
            Text::with_baseline(line, Point::new(0, y), style, Baseline::Top).draw(display)?;
            y += LINE_HEIGHT_PX;
        }

        self.meter.draw_frame(display)?;
        debug!("Dashboard: static screen drawn");
        Ok(())
    }

    /// Show a fresh sample. The readout is always redrawn; the meter only
    /// when the change clears its hysteresis. Returns whether the meter was
    /// repainted.
    pub fn render<D>(&mut self, sample: &DistanceSample, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.readout.update(sample.distance_mm, display)?;
        self.meter.update(sample.distance_mm, display)
    }
}
