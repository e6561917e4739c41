//! Pattern functions and the registry that names them.
//!
//! A pattern is a pure function of elapsed time and its parameters. The only
//! other input is an explicit random source, which deterministic patterns
//! ignore.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::frame::Frame;

mod classic;
mod generative;

pub use classic::{disco, fire, ocean, pulse, rainbow, strobe, PULSE_COLOR, STROBE_PALETTE};
pub use generative::{
    escape_time, fourier, interference, lissajous, mandelbrot, perlin, perlin_noise, plasma,
    MAX_ITERATIONS,
};

/// Upper bound for count parameters, which set the work done per frame.
pub const MAX_COUNT: usize = 1000;

/// Result type for pattern evaluation.
pub type PatternResult<T> = Result<T, PatternError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// The registry has no pattern by this name.
    #[error("unknown pattern '{name}' (available: {})", .available.join(", "))]
    NotFound { name: String, available: Vec<String> },
    /// A parameter was present but had the wrong shape.
    #[error("invalid parameter '{key}': {reason}")]
    InvalidParam { key: String, reason: String },
}

impl PatternError {
    fn invalid(key: &str, reason: impl Into<String>) -> PatternError {
        PatternError::InvalidParam {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Named numeric parameters for one pattern run.
///
/// Defaults apply only to absent keys. A key that is present with the wrong
/// type is an error rather than silently replaced.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Params {
        Params::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Params {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer `other` on top of these params; keys in `other` win.
    pub fn merged(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        for (key, value) in &other.0 {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Parse a `key=value` pair from the command line.
    ///
    /// Values are read as JSON scalars when possible (`8`, `0.02`, `true`)
    /// and kept as strings otherwise, so a typo like `scale=fast` reaches the
    /// pattern and fails there with a useful message.
    pub fn parse_pair(&mut self, pair: &str) -> PatternResult<()> {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| PatternError::invalid(pair, "expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PatternError::invalid(pair, "empty key"));
        }
        let raw = raw.trim();
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        self.insert(key, value);
        Ok(())
    }

    /// A real-valued parameter.
    pub fn f64_or(&self, key: &str, default: f64) -> PatternResult<f64> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => match value.as_f64() {
                Some(num) if num.is_finite() => Ok(num),
                _ => Err(PatternError::invalid(key, format!("expected a number, got {}", value))),
            },
        }
    }

    /// A real-valued parameter that must be strictly positive, such as a
    /// period or a rate that time is divided or multiplied by.
    pub fn positive_f64_or(&self, key: &str, default: f64) -> PatternResult<f64> {
        let num = self.f64_or(key, default)?;
        if num > 0.0 {
            Ok(num)
        } else {
            Err(PatternError::invalid(key, format!("must be greater than 0, got {}", num)))
        }
    }

    /// A positive integer parameter such as a harmonic count, at most
    /// [`MAX_COUNT`].
    pub fn count_or(&self, key: &str, default: usize) -> PatternResult<usize> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => match value.as_u64() {
                Some(0) => Err(PatternError::invalid(key, "must be at least 1")),
                Some(num) if num > MAX_COUNT as u64 => Err(PatternError::invalid(
                    key,
                    format!("must be at most {}, got {}", MAX_COUNT, num),
                )),
                Some(num) => Ok(num as usize),
                None => Err(PatternError::invalid(
                    key,
                    format!("expected a positive integer, got {}", value),
                )),
            },
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Signature shared by every pattern, built-in or custom.
pub type PatternFn = dyn Fn(f64, &Params, &mut dyn RngCore) -> PatternResult<Frame> + Send + Sync;

/// A registered pattern.
#[derive(Clone)]
pub struct Pattern {
    pub name: String,
    /// Evaluation period the pattern was tuned for.
    pub tick: Duration,
    pub description: String,
    func: Arc<PatternFn>,
}

impl Pattern {
    pub fn new<F>(name: &str, tick: Duration, description: &str, func: F) -> Pattern
    where
        F: Fn(f64, &Params, &mut dyn RngCore) -> PatternResult<Frame> + Send + Sync + 'static,
    {
        Pattern {
            name: name.to_string(),
            tick,
            description: description.to_string(),
            func: Arc::new(func),
        }
    }

    /// Render the frame for `t` seconds into a run.
    pub fn eval(&self, t: f64, params: &Params, rng: &mut dyn RngCore) -> PatternResult<Frame> {
        (self.func)(t, params, rng)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("tick", &self.tick)
            .finish()
    }
}

/// Maps pattern names to patterns.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    patterns: HashMap<String, Pattern>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry holding every built-in pattern.
    pub fn builtin() -> Registry {
        let ms = Duration::from_millis;
        let mut registry = Registry::new();

        registry.add(Pattern::new("rainbow", ms(100), "Smooth rainbow wave", rainbow));
        registry.add(Pattern::new("ocean", ms(100), "Blue/cyan ocean waves", ocean));
        registry.add(Pattern::new("fire", ms(100), "Flickering fire", fire));
        registry.add(Pattern::new("pulse", ms(50), "Pulsing purple brightness", pulse));
        registry.add(Pattern::new("strobe", ms(300), "Multi-color strobe", strobe));
        registry.add(Pattern::new("disco", ms(275), "Random disco party", disco));

        registry.add(Pattern::new("fourier", ms(50), "Fourier series [harmonics=5]", fourier));
        registry.add(Pattern::new("perlin", ms(50), "Smooth gradient noise [scale=0.05]", perlin));
        registry.add(Pattern::new(
            "lissajous",
            ms(50),
            "Lissajous curve [freq_x=3 freq_y=2 speed=0.5]",
            lissajous,
        ));
        registry.add(Pattern::new(
            "interference",
            ms(50),
            "Wave interference [waves=3]",
            interference,
        ));
        registry.add(Pattern::new(
            "mandelbrot",
            ms(50),
            "Mandelbrot zoom [zoom_speed=0.02 cx=-1.4 cy=0.54]",
            mandelbrot,
        ));
        registry.add(Pattern::new("plasma", ms(50), "Demoscene plasma", plasma));

        registry
    }

    /// Register a pattern, replacing any pattern with the same name.
    pub fn add(&mut self, pattern: Pattern) -> Option<Pattern> {
        self.patterns.insert(pattern.name.clone(), pattern)
    }

    /// Register a custom pattern function under `name`.
    pub fn register<F>(&mut self, name: &str, tick: Duration, func: F) -> Option<Pattern>
    where
        F: Fn(f64, &Params, &mut dyn RngCore) -> PatternResult<Frame> + Send + Sync + 'static,
    {
        self.add(Pattern::new(name, tick, "Custom pattern", func))
    }

    pub fn get(&self, name: &str) -> PatternResult<&Pattern> {
        self.patterns.get(name).ok_or_else(|| PatternError::NotFound {
            name: name.to_string(),
            available: self.names(),
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.patterns.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Registered patterns, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        let mut patterns: Vec<&Pattern> = self.patterns.values().collect();
        patterns.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        patterns.into_iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
