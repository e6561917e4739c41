//! Math-driven patterns: harmonic sums, noise, curves and fractals.

use std::f64::consts::PI;

use rand::RngCore;

use super::{Params, PatternResult};
use crate::frame::Frame;

/// Iteration cap for the Mandelbrot escape test.
pub const MAX_ITERATIONS: u32 = 50;

/// Sum of `harmonics` sines, term `n` at frequency `n` and amplitude `1/n`.
pub fn fourier(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let harmonics = params.count_or("harmonics", 5)?;

    let mut value = 0.0;
    let mut amplitude_sum = 0.0;
    for n in 1..=harmonics {
        let n = n as f64;
        value += (2.0 * PI * n * t / 10.0).sin() / n;
        amplitude_sum += 1.0 / n;
    }

    let normalized = (value + amplitude_sum) / (2.0 * amplitude_sum);
    Ok(Frame::from_hsv(normalized * 360.0, 1.0, 1.0, 100))
}

/// Pseudo-random gradient in -1..1 for an integer lattice point.
fn lattice_gradient(i: f64) -> f64 {
    let h = (i * 12.9898 + 78.233).sin() * 43758.5453;
    (h - h.floor()) * 2.0 - 1.0
}

/// One-dimensional gradient noise.
///
/// Zero at every lattice point, roughly within -0.5..0.5, with a continuous
/// first derivative across cell boundaries.
pub fn perlin_noise(x: f64) -> f64 {
    let x0 = x.floor();
    let u = x - x0;

    let n0 = lattice_gradient(x0) * u;
    let n1 = lattice_gradient(x0 + 1.0) * (u - 1.0);

    let fade = u * u * (3.0 - 2.0 * u);
    n0 + fade * (n1 - n0)
}

pub fn perlin(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let scale = params.positive_f64_or("scale", 0.05)?;
    let noise = perlin_noise(t * scale);
    let hue = ((noise * 2.0 + 1.0) * 180.0).rem_euclid(360.0);
    Ok(Frame::from_hsv(hue, 0.8, 1.0, 100))
}

/// Position on a Lissajous curve: angle picks the hue, radius the saturation.
pub fn lissajous(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let freq_x = params.f64_or("freq_x", 3.0)?;
    let freq_y = params.f64_or("freq_y", 2.0)?;
    let speed = params.f64_or("speed", 0.5)?;

    let x = (freq_x * t * speed).sin();
    let y = (freq_y * t * speed).sin();

    let hue = (y.atan2(x) + PI) / (2.0 * PI) * 360.0;
    let saturation = (x * x + y * y).sqrt().min(1.0);
    Ok(Frame::from_hsv(hue, saturation, 1.0, 100))
}

/// Beating between `waves` sines; the sum drives brightness.
pub fn interference(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let waves = params.count_or("waves", 3)?;
    let amplitude = 1.0 / waves as f64;

    let mut total = 0.0;
    for i in 0..waves {
        let i = i as f64;
        let frequency = 0.5 + i * 0.3;
        let phase = i * PI / waves as f64;
        total += amplitude * (2.0 * PI * frequency * t + phase).sin();
    }

    let normalized = (total + 1.0) / 2.0;
    let brightness = (50.0 + 50.0 * normalized) as i64;
    let hue = (t * 30.0).rem_euclid(360.0);
    Ok(Frame::from_hsv(hue, 1.0, 1.0, brightness))
}

/// Iterations of `z <- z^2 + c` from zero before `|z| >= 2`, capped at
/// [`MAX_ITERATIONS`].
pub fn escape_time(cx: f64, cy: f64) -> u32 {
    let (mut zx, mut zy) = (0.0f64, 0.0f64);
    let mut iterations = 0;
    while zx * zx + zy * zy < 4.0 && iterations < MAX_ITERATIONS {
        let next_x = zx * zx - zy * zy + cx;
        zy = 2.0 * zx * zy + cy;
        zx = next_x;
        iterations += 1;
    }
    iterations
}

/// Point `c * exp(-zoom_speed * t)` sampled against the Mandelbrot set.
pub fn mandelbrot(t: f64, params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let zoom_speed = params.f64_or("zoom_speed", 0.02)?;
    let cx = params.f64_or("cx", -1.4)?;
    let cy = params.f64_or("cy", 0.54)?;

    let zoom = (-zoom_speed * t).exp();
    let iterations = escape_time(cx * zoom, cy * zoom);

    if iterations >= MAX_ITERATIONS {
        return Ok(Frame::from_rgb(0, 0, 0, 100));
    }

    let hue = (iterations as f64 * 20.0 + t * 10.0).rem_euclid(360.0);
    let value = (iterations as f64 / MAX_ITERATIONS as f64 * 1.5).min(1.0);
    Ok(Frame::from_hsv(hue, 1.0, value, 100))
}

/// Four sines over a slowly moving point, plus a steady hue drift.
pub fn plasma(t: f64, _params: &Params, _rng: &mut dyn RngCore) -> PatternResult<Frame> {
    let x = t * 0.5;
    let y = t * 0.3;

    let sum = (x * 0.5).sin()
        + (y * 0.7).sin()
        + ((x + y) * 0.3).sin()
        + ((x * x + y * y).sqrt() * 0.4).sin();

    let normalized = (sum + 4.0) / 8.0;
    let hue = (normalized * 360.0 + t * 20.0).rem_euclid(360.0);
    Ok(Frame::from_hsv(hue, 1.0, 1.0, 100))
}
