//! Dry-run host that only logs what it would send.

use std::io;

use super::EffectHost;
use crate::frame::Frame;

#[derive(Debug, Default)]
pub struct ConsoleHost {
    /// Frames seen so far.
    pub frames: usize,
}

impl ConsoleHost {
    pub fn new() -> ConsoleHost {
        ConsoleHost::default()
    }
}

impl EffectHost for ConsoleHost {
    fn take_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.frames += 1;
        tracing::info!(
            "frame {:>5}: rgb({:>3}, {:>3}, {:>3}) brightness {:>3}",
            self.frames,
            frame.red,
            frame.green,
            frame.blue,
            frame.brightness
        );
        Ok(())
    }

    fn power(&mut self, on: bool) -> io::Result<()> {
        tracing::info!("power {}", if on { "on" } else { "off" });
        Ok(())
    }
}
