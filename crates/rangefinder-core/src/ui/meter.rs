//! Vertical level meter with a red-to-green gradient fill
//!
//! The meter is the expensive part of the screen, so it is only repainted
//! when the clamped distance moves by more than the configured hysteresis.
//! Repaints go through an off-screen [`MeterSprite`] and reach the panel as
//! one contiguous transfer.

use core::fmt::Write;

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use log::{debug, trace};

use super::colors::{self, gradient_color};
use crate::config::MeterConfig;
use crate::framebuffer::MeterSprite;

/// Length of each tick mark to the right of the meter.
const TICK_LENGTH_PX: i32 = 10;

/// Gap between the meter's right edge and the tick labels.
const LABEL_OFFSET_PX: i32 = 15;

/// Last value the meter was actually painted for.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterState {
    rendered_mm: Option<f32>,
}

impl MeterState {
    /// Sentinel state: the next update always paints.
    pub const fn never_rendered() -> Self {
        Self { rendered_mm: None }
    }

    pub fn last_rendered(&self) -> Option<f32> {
        self.rendered_mm
    }

    /// Whether `value_mm` differs enough from the last painted value.
    pub fn needs_redraw(&self, value_mm: f32, hysteresis_mm: f32) -> bool {
        match self.rendered_mm {
            None => true,
            Some(previous) => {
                let delta = if value_mm > previous {
                    value_mm - previous
                } else {
                    previous - value_mm
                };
                delta > hysteresis_mm
            }
        }
    }

    fn commit(&mut self, value_mm: f32) {
        self.rendered_mm = Some(value_mm);
    }
}

pub struct LevelMeter {
    /// Inner border rectangle; the fill sits 1 px inside it.
    bounds: Rectangle,
    config: MeterConfig,
    sprite: MeterSprite,
    state: MeterState,
}

impl LevelMeter {
    pub fn new(bounds: Rectangle, config: MeterConfig) -> Self {
        let fill_size = Size::new(
            bounds.size.width.saturating_sub(2),
            bounds.size.height.saturating_sub(2),
        );
        Self {
            bounds,
            config,
            sprite: MeterSprite::new(fill_size, colors::BACKGROUND),
            state: MeterState::never_rendered(),
        }
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    pub fn state(&self) -> &MeterState {
        &self.state
    }

    /// Screen area covered by the fill (inside the border).
    pub fn fill_area(&self) -> Rectangle {
        Rectangle::new(self.bounds.top_left + Point::new(1, 1), self.sprite.size())
    }

    fn fill_rows(&self) -> u32 {
        self.sprite.size().height
    }

    /// Clamp into the meter scale. NaN maps to the bottom of the scale.
    pub fn clamp(&self, distance_mm: f32) -> f32 {
        if distance_mm.is_nan() {
            self.config.min_mm
        } else {
            distance_mm.clamp(self.config.min_mm, self.config.max_mm)
        }
    }

    /// Number of filled rows for a distance, counted from the bottom.
    pub fn fill_height(&self, distance_mm: f32) -> u32 {
        let ratio = (self.clamp(distance_mm) - self.config.min_mm) / self.config.span_mm();
        let rows = self.fill_rows();
        ((ratio * rows as f32) as u32).min(rows)
    }

    /// Distance represented by a fill row (row 0 is the bottom, `min_mm`).
    pub fn row_distance(&self, row: u32) -> f32 {
        let rows = self.fill_rows().max(1);
        self.config.min_mm + (row as f32 / rows as f32) * self.config.span_mm()
    }

    pub fn row_color(&self, row: u32) -> Rgb565 {
        let ratio = (self.row_distance(row) - self.config.min_mm) / self.config.span_mm();
        gradient_color(ratio)
    }

    /// Screen y of a scale value on the border (min at the bottom edge).
    fn scale_y(&self, mm: f32) -> i32 {
        let ratio = (mm - self.config.min_mm) / self.config.span_mm();
        let bottom = self.bounds.top_left.y + self.bounds.size.height as i32;
        bottom - (ratio * self.bounds.size.height as f32) as i32
    }

    /// Draw the double border, tick marks with centimetre labels and an empty
    /// fill. Resets the meter state, so the next update always paints.
    pub fn draw_frame<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let border = PrimitiveStyle::with_stroke(colors::FRAME, 1);
        self.bounds.into_styled(border).draw(display)?;
        Rectangle::new(
            self.bounds.top_left - Point::new(1, 1),
            self.bounds.size + Size::new(2, 2),
        )
        .into_styled(border)
        .draw(display)?;

        let right = self.bounds.top_left.x + self.bounds.size.width as i32;
        let label_style = MonoTextStyle::new(&FONT_6X10, colors::TEXT);
        // More ticks than pixel rows cannot be told apart
        let ticks = if self.config.tick_step_mm > 0.0 {
            let steps = (self.config.span_mm() / self.config.tick_step_mm) as u32;
            steps.min(self.bounds.size.height)
        } else {
            0
        };

        for i in 0..=ticks {
            let mm = self.config.min_mm + i as f32 * self.config.tick_step_mm;
            let y = self.scale_y(mm);

            Line::new(Point::new(right, y), Point::new(right + TICK_LENGTH_PX - 1, y))
                .into_styled(border)
                .draw(display)?;

            // Labels are in centimetres; only the ends carry the unit
            let mut label = heapless::String::<12>::new();
            write!(label, "{}", (mm / 10.0) as i32).ok();
            if i == 0 || i == ticks {
                label.push_str("cm").ok();
            }
            Text::with_baseline(
                &label,
                Point::new(right + LABEL_OFFSET_PX, y),
                label_style,
                Baseline::Middle,
            )
            .draw(display)?;
        }

        for row in 0..self.fill_rows() as usize {
            self.sprite.fill_row(row, colors::BACKGROUND);
        }
        self.sprite.invalidate();
        self.sprite.present(display, self.fill_area().top_left)?;
        self.state = MeterState::never_rendered();
        Ok(())
    }

    /// Repaint the fill for `distance_mm` if it moved past the hysteresis.
    ///
    /// Returns whether a repaint happened. The remembered value only changes
    /// once the new fill has reached the display; if presenting fails the
    /// next call tries again.
    pub fn update<D>(&mut self, distance_mm: f32, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let value = self.clamp(distance_mm);
        // A dirty sprite means the last present failed and the panel may
        // show a partial fill
        let pending = self.sprite.is_dirty();
        if !pending && !self.state.needs_redraw(value, self.config.hysteresis_mm) {
            trace!(
                "Meter: {} mm within hysteresis of {:?}, skipping",
                value,
                self.state.last_rendered()
            );
            return Ok(false);
        }

        let fill = self.fill_height(value);
        let rows = self.fill_rows();

        // Sprite row 0 is the top; fill grows up from the bottom. Rows above
        // the fill are cleared to the background.
        for row in 0..rows {
            let color = if row < fill {
                self.row_color(row)
            } else {
                colors::BACKGROUND
            };
            self.sprite.fill_row((rows - 1 - row) as usize, color);
        }

        self.sprite.present(display, self.fill_area().top_left)?;
        self.state.commit(value);

        debug!("Meter: repainted at {} mm ({} of {} rows)", value, fill, rows);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingDisplay;
    use embedded_graphics::pixelcolor::RgbColor;

    fn meter() -> LevelMeter {
        LevelMeter::new(
            Rectangle::new(Point::new(50, 75), Size::new(40, 220)),
            MeterConfig::default(),
        )
    }

    fn display() -> RecordingDisplay {
        RecordingDisplay::new(170, 320)
    }

    #[test]
    fn test_state_starts_never_rendered() {
        let state = MeterState::never_rendered();
        assert_eq!(state.last_rendered(), None);
        assert!(state.needs_redraw(0.0, 10.0));
        assert!(state.needs_redraw(500.0, f32::INFINITY));
    }

    #[test]
    fn test_needs_redraw_only_beyond_hysteresis() {
        let mut state = MeterState::never_rendered();
        state.commit(500.0);
        assert!(!state.needs_redraw(500.0, 10.0));
        assert!(!state.needs_redraw(510.0, 10.0));
        assert!(!state.needs_redraw(490.0, 10.0));
        assert!(state.needs_redraw(510.5, 10.0));
        assert!(state.needs_redraw(489.5, 10.0));
    }

    #[test]
    fn test_fill_height_is_proportional() {
        let meter = meter();
        assert_eq!(meter.fill_height(0.0), 0);
        assert_eq!(meter.fill_height(500.0), 109);
        assert_eq!(meter.fill_height(1000.0), 218);
        assert_eq!(meter.fill_height(3000.0), 218);
        assert_eq!(meter.fill_height(-5.0), 0);
    }

    #[test]
    fn test_row_distance_inverts_fill_height() {
        let meter = meter();
        assert_eq!(meter.row_distance(0), 0.0);
        assert_eq!(meter.row_distance(109), 500.0);
    }

    #[test]
    fn test_first_update_always_paints() {
        let mut meter = meter();
        let mut display = display();

        assert!(meter.update(0.0, &mut display).unwrap());
        assert_eq!(meter.state().last_rendered(), Some(0.0));
    }

    #[test]
    fn test_repeated_value_paints_once() {
        let mut meter = meter();
        let mut display = display();

        assert!(meter.update(700.0, &mut display).unwrap());
        display.reset_counters();
        for _ in 0..5 {
            assert!(!meter.update(700.0, &mut display).unwrap());
        }
        assert_eq!(display.contiguous_fills, 0);
    }

    #[test]
    fn test_small_change_is_suppressed() {
        let mut meter = meter();
        let mut display = display();

        meter.update(500.0, &mut display).unwrap();
        display.reset_counters();

        assert!(!meter.update(504.0, &mut display).unwrap());
        assert_eq!(meter.state().last_rendered(), Some(500.0));
        assert_eq!(display.contiguous_fills, 0);

        assert!(meter.update(520.0, &mut display).unwrap());
        assert_eq!(meter.state().last_rendered(), Some(520.0));
        assert_eq!(display.contiguous_fills, 1);
    }

    #[test]
    fn test_remembered_value_is_clamped_to_scale() {
        let mut meter = meter();
        let mut display = display();

        meter.update(3500.0, &mut display).unwrap();
        assert_eq!(meter.state().last_rendered(), Some(1000.0));

        // Still beyond the top of the scale: nothing to repaint
        assert!(!meter.update(4000.0, &mut display).unwrap());
    }

    #[test]
    fn test_full_scale_gradient() {
        let mut meter = meter();
        let mut display = display();
        meter.update(1000.0, &mut display).unwrap();

        let area = meter.fill_area();
        let left = area.top_left.x;
        let top = area.top_left.y;
        let bottom = top + area.size.height as i32 - 1;

        let bottom_color = display.pixel(left, bottom);
        assert_eq!(bottom_color, gradient_color(0.0));
        assert_eq!(bottom_color.r(), Rgb565::MAX_R);
        assert_eq!(bottom_color.g(), 0);

        let top_color = display.pixel(left, top);
        assert_eq!(top_color.r(), 0);
        assert_eq!(top_color.g(), Rgb565::MAX_G);
    }

    #[test]
    fn test_half_scale_leaves_top_empty() {
        let mut meter = meter();
        let mut display = display();
        meter.update(500.0, &mut display).unwrap();

        let area = meter.fill_area();
        let bottom = area.top_left.y + area.size.height as i32 - 1;
        // 109 rows filled from the bottom
        let first_filled = bottom - 108;
        assert_ne!(display.pixel(area.top_left.x, first_filled), colors::BACKGROUND);
        assert_eq!(
            display.pixel(area.top_left.x, first_filled - 1),
            colors::BACKGROUND
        );
        assert_eq!(display.pixel(area.top_left.x, area.top_left.y), colors::BACKGROUND);
    }

    #[test]
    fn test_shrinking_fill_clears_old_rows() {
        let mut meter = meter();
        let mut display = display();
        meter.update(1000.0, &mut display).unwrap();
        meter.update(0.0, &mut display).unwrap();

        assert!(display.region_is(&meter.fill_area(), colors::BACKGROUND));
    }

    #[test]
    fn test_failed_present_keeps_previous_state() {
        let mut meter = meter();
        let mut display = display();
        meter.update(200.0, &mut display).unwrap();

        display.fail_contiguous = true;
        assert!(meter.update(800.0, &mut display).is_err());
        assert_eq!(meter.state().last_rendered(), Some(200.0));

        display.fail_contiguous = false;
        assert!(meter.update(800.0, &mut display).unwrap());
        assert_eq!(meter.state().last_rendered(), Some(800.0));
    }

    #[test]
    fn test_failed_present_is_retried_within_hysteresis() {
        let mut meter = meter();
        let mut display = display();
        meter.update(200.0, &mut display).unwrap();

        display.fail_contiguous = true;
        assert!(meter.update(800.0, &mut display).is_err());

        // Back near the committed value, but the panel still holds a torn fill
        display.fail_contiguous = false;
        display.reset_counters();
        assert!(meter.update(205.0, &mut display).unwrap());
        assert_eq!(display.contiguous_fills, 1);
        assert_eq!(meter.state().last_rendered(), Some(205.0));

        let area = meter.fill_area();
        let bottom = area.top_left.y + area.size.height as i32 - 1;
        let fill = meter.fill_height(205.0) as i32;
        assert_ne!(display.pixel(area.top_left.x, bottom - fill + 1), colors::BACKGROUND);
        assert_eq!(display.pixel(area.top_left.x, bottom - fill), colors::BACKGROUND);

        // Nothing pending any more: small moves are suppressed again
        display.reset_counters();
        assert!(!meter.update(210.0, &mut display).unwrap());
        assert_eq!(display.contiguous_fills, 0);
    }

    #[test]
    fn test_draw_frame_with_degenerate_tick_step() {
        let zero_step = MeterConfig {
            tick_step_mm: 0.0,
            ..MeterConfig::default()
        };
        let mut meter = LevelMeter::new(
            Rectangle::new(Point::new(50, 75), Size::new(40, 220)),
            zero_step,
        );
        let mut display = display();
        meter.draw_frame(&mut display).unwrap();
        // Only the bottom tick is drawn
        assert_eq!(display.pixel(90, 295), colors::FRAME);
        assert_eq!(display.pixel(99, 75), colors::BACKGROUND);

        let tiny_step = MeterConfig {
            tick_step_mm: 1e-6,
            ..MeterConfig::default()
        };
        let mut meter = LevelMeter::new(
            Rectangle::new(Point::new(50, 75), Size::new(40, 220)),
            tiny_step,
        );
        // Tick count is capped by the meter height, so this returns promptly
        meter.draw_frame(&mut display).unwrap();
        assert_eq!(display.pixel(90, 295), colors::FRAME);
    }

    #[test]
    fn test_draw_frame_resets_state_and_draws_border() {
        let mut meter = meter();
        let mut display = display();
        meter.update(600.0, &mut display).unwrap();

        meter.draw_frame(&mut display).unwrap();
        assert_eq!(meter.state().last_rendered(), None);
        assert!(display.region_is(&meter.fill_area(), colors::BACKGROUND));
        // Inner and outer border corners
        assert_eq!(display.pixel(50, 75), colors::FRAME);
        assert_eq!(display.pixel(49, 74), colors::FRAME);
        // Tick at the bottom (0 cm) and the top (100 cm) of the scale
        assert_eq!(display.pixel(90, 295), colors::FRAME);
        assert_eq!(display.pixel(99, 75), colors::FRAME);
    }
}
