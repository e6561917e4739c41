//! The classic demo effects as functions of elapsed time.

use rand::{Rng, RngCore};

use super::{Params, PatternResult};
use crate::frame::Frame;

/// Fixed color used by `pulse`.
pub const PULSE_COLOR: (u8, u8, u8) = (138, 43, 226);

/// Colors `strobe` cycles through, in order.
pub const STROBE_PALETTE: [(u8, u8, u8); 5] = [
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 255, 0),
    (255, 0, 255),
];

/// Hue advances `hue_step` degrees every `tick` seconds (20°/s by default).
pub fn rainbow(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let hue_step = params.f64_or("hue_step", 2.0)?;
    let tick = params.positive_f64_or("tick", 0.1)?;
    let hue = (t / tick * hue_step).rem_euclid(360.0);
    Ok(Frame::from_hsv(hue, 1.0, 1.0, 100))
}

/// Deep blue drifting towards cyan on two unrelated oscillators.
pub fn ocean(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let step = t * params.positive_f64_or("rate", 0.8)?;
    let blue = 200.0 + 55.0 * step.sin();
    let green = 100.0 + 100.0 * (step * 0.7).sin();
    Ok(Frame::from_rgb(0, green as i64, blue as i64, 100))
}

/// Orange to red flicker, independent every frame.
pub fn fire(_t: f64, _params: &Params, rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let red = rng.gen_range(200..=255);
    let green = rng.gen_range(40..=120);
    let brightness = rng.gen_range(60..=100);
    Ok(Frame::from_rgb(red, green, 0, brightness))
}

/// Purple with brightness on a sine; the phase advances 0.1 every 50 ms.
pub fn pulse(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let step = t * params.positive_f64_or("rate", 2.0)?;
    // Truncation keeps the range at 1..=99.
    let brightness = (50.0 + 49.0 * step.sin()) as i64;
    let (r, g, b) = PULSE_COLOR;
    Ok(Frame::from_rgb(r as i64, g as i64, b as i64, brightness))
}

/// Hard cuts through the palette, one color per `tick` seconds.
pub fn strobe(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let tick = params.positive_f64_or("tick", 0.3)?;
    let index = ((t / tick).floor() as usize) % STROBE_PALETTE.len();
    let (r, g, b) = STROBE_PALETTE[index];
    Ok(Frame::from_rgb(r as i64, g as i64, b as i64, 100))
}

/// Any color, any time.
pub fn disco(_t: f64, _params: &Params, rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let red = rng.gen_range(0..=255);
    let green = rng.gen_range(0..=255);
    let blue = rng.gen_range(0..=255);
    let brightness = rng.gen_range(70..=100);
    Ok(Frame::from_rgb(red, green, blue, brightness))
}
