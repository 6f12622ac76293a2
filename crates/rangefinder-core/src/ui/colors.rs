//! Colour definitions and the meter gradient
//!
//! All colours are RGB565. Channels are computed in 8-bit space and then
//! narrowed: R>>3, G>>2, B>>3.

use embedded_graphics::pixelcolor::Rgb565;

/// Full-scale value of an 8-bit colour channel.
pub const MAX_CHANNEL: u8 = 255;

/// Screen background.
pub const BACKGROUND: Rgb565 = Rgb565::new(0, 0, 0);

/// Text foreground - pure white.
pub const TEXT: Rgb565 = Rgb565::new(31, 63, 31);

/// Meter border and tick marks - medium dark grey.
pub const FRAME: Rgb565 = Rgb565::new(128 >> 3, 128 >> 2, 128 >> 3);

/// Meter colour for a position on the scale.
///
/// `ratio` 0.0 is the near end (pure red), 1.0 the far end (pure green);
/// red and green cross-fade linearly in between and blue stays off. Values
/// outside `[0, 1]` are clamped first and NaN counts as 0.
pub fn gradient_color(ratio: f32) -> Rgb565 {
    let ratio = if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    };

    let red = (MAX_CHANNEL as f32 * (1.0 - ratio)) as u8;
    let green = (MAX_CHANNEL as f32 * ratio) as u8;
    let blue = 0u8;

    Rgb565::new(red >> 3, green >> 2, blue >> 3)
}
