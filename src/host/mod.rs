//! Host devices receive frames and produce physical effects.

use std::io;

use crate::frame::Frame;

pub mod cloud;
pub mod console;
pub mod lan;

pub use self::cloud::CloudHost;
pub use self::console::ConsoleHost;
pub use self::lan::LanHost;

/// Light hosts accept frames and pass them to a device.
pub trait EffectHost {
    /// Show a single frame.
    fn take_frame(&mut self, frame: &Frame) -> io::Result<()>;
    /// Switch the device on or off.
    fn power(&mut self, on: bool) -> io::Result<()>;
}

fn other_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
