//! One rendered instant of a light's state.

use serde::{Deserialize, Serialize};

/// Target color and brightness for a device at one instant.
///
/// Every constructor clamps its inputs, so a `Frame` is always in range:
/// channels in `0..=255`, brightness in `1..=100`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub brightness: u8,
}

fn clamp(num: f64, min: f64, max: f64) -> f64 {
    if num > max {
        max
    } else if num < min {
        min
    } else {
        num
    }
}

/// Scale a 0..1 channel to a byte, rounding to nearest.
fn channel_u8(num: f64) -> u8 {
    // NaN falls through the comparisons and saturates to 0 in the cast.
    clamp((num * 255.0).round(), 0.0, 255.0) as u8
}

fn clamp_channel(num: i64) -> u8 {
    num.clamp(0, 255) as u8
}

fn clamp_brightness(num: i64) -> u8 {
    num.clamp(1, 100) as u8
}

/// Convert hue (degrees, wrapped), saturation and value (0..1) to RGB bytes.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (channel_u8(r + m), channel_u8(g + m), channel_u8(b + m))
}

impl Frame {
    /// Full white at full brightness, sent when a pattern run stops.
    pub const RESET: Frame = Frame {
        red: 255,
        green: 255,
        blue: 255,
        brightness: 100,
    };

    pub fn from_rgb(red: i64, green: i64, blue: i64, brightness: i64) -> Frame {
        Frame {
            red: clamp_channel(red),
            green: clamp_channel(green),
            blue: clamp_channel(blue),
            brightness: clamp_brightness(brightness),
        }
    }

    /// Build a frame from HSV color space.
    ///
    /// Saturation and value are expected in 0..1 but are not validated;
    /// the result is clamped either way.
    pub fn from_hsv(h: f64, s: f64, v: f64, brightness: i64) -> Frame {
        let (red, green, blue) = hsv_to_rgb(h, s, v);
        Frame {
            red,
            green,
            blue,
            brightness: clamp_brightness(brightness),
        }
    }

    /// Color packed as `0xRRGGBB`, the cloud API's `colorRgb` value.
    pub fn rgb_value(&self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
    }

    pub fn is_black(&self) -> bool {
        self.red == 0 && self.green == 0 && self.blue == 0
    }
}
