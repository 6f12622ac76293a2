//! Numeric distance readout

use core::fmt::Write;

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_7X13};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};

use super::colors;

/// Fixed-size text area showing the latest distance in whole millimetres.
///
/// The area is small, so it is simply wiped and reprinted on every cycle
/// rather than diffed.
pub struct NumericReadout {
    bounds: Rectangle,
    text: heapless::String<16>,
}

impl NumericReadout {
    pub fn new(bounds: Rectangle) -> Self {
        Self {
            bounds,
            text: heapless::String::new(),
        }
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    /// Text shown by the last update.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Reformat `distance_mm` with zero decimals and redraw the area.
    pub fn update<D>(&mut self, distance_mm: f32, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.text.clear();
        // 16 bytes fits "4294967295 mm"; anything longer is truncated
        write!(self.text, "{:.0} mm", distance_mm).ok();

        display.fill_solid(&self.bounds, colors::BACKGROUND)?;

        let style = MonoTextStyle::new(&FONT_7X13, colors::TEXT);
        Text::with_baseline(&self.text, self.bounds.top_left, style, Baseline::Top)
            .draw(display)?;
        Ok(())
    }
}
