//! Rangefinder display
//!
//! - [`colors`]: palette and the red-to-green meter gradient
//! - [`readout`]: numeric distance text, redrawn every cycle
//! - [`meter`]: vertical level meter, redrawn only on significant change
//! - [`dashboard`]: static screen plus both widgets in one place
//!
//! Everything draws through `DrawTarget<Color = Rgb565>`, so the same code
//! runs against the panel driver, the simulator and test doubles.

pub mod colors;
pub mod dashboard;
pub mod meter;
pub mod readout;

pub use colors::gradient_color;
pub use dashboard::Dashboard;
pub use meter::{LevelMeter, MeterState};
pub use readout::NumericReadout;

/// Panel width in portrait orientation (LilyGO T-Display-S3).
pub const DISPLAY_WIDTH_PX: u32 = 170;

/// Panel height in portrait orientation.
pub const DISPLAY_HEIGHT_PX: u32 = 320;

/// Left edge of the meter's inner border.
pub const METER_X_PX: i32 = 50;

/// Top edge of the meter's inner border.
pub const METER_Y_PX: i32 = 75;

/// Meter width including the 1 px inner border.
pub const METER_WIDTH_PX: u32 = 40;

/// Meter height including the 1 px inner border.
pub const METER_HEIGHT_PX: u32 = 220;

/// Top-left of the numeric readout, right of the "Distance:" label.
pub const READOUT_X_PX: i32 = 70;
pub const READOUT_Y_PX: i32 = 48;

/// Area cleared before each readout redraw.
pub const READOUT_WIDTH_PX: u32 = 90;
pub const READOUT_HEIGHT_PX: u32 = 15;

/// Vertical pitch of the title lines.
pub const LINE_HEIGHT_PX: i32 = 16;
