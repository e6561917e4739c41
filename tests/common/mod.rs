//! Shared test infrastructure for the integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::io;
use std::time::Instant;

use govee_patterns::{EffectHost, Frame};

/// Host that records every frame it is given, with a timestamp.
#[derive(Default)]
pub struct RecordingHost {
    pub frames: Vec<(Instant, Frame)>,
    pub power_calls: Vec<bool>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.iter().map(|(_, frame)| *frame).collect()
    }

    pub fn last(&self) -> Option<Frame> {
        self.frames.last().map(|(_, frame)| *frame)
    }
}

impl EffectHost for RecordingHost {
    fn take_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.frames.push((Instant::now(), *frame));
        Ok(())
    }

    fn power(&mut self, on: bool) -> io::Result<()> {
        self.power_calls.push(on);
        Ok(())
    }
}

/// Sample times from 0 up to `end` seconds in `step` increments.
pub fn times(end: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = (end / step) as usize;
    (0..=count).map(move |i| i as f64 * step)
}
