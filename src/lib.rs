//! Govee light control and animated color patterns.
//!
//! Patterns render [`Frame`]s from elapsed time; the [`driver`] plays them
//! on an [`EffectHost`] at a fixed tick rate.

pub mod cancel;
pub mod client;
pub mod config;
pub mod driver;
pub mod frame;
pub mod host;
pub mod pattern;

pub use frame::Frame;
pub use host::EffectHost;
pub use pattern::{Params, Pattern, PatternError, Registry};
