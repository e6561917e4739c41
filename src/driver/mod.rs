//! Fixed-rate loop that renders a pattern onto a host.
//!
//! One tick evaluates the pattern at the elapsed time, hands the frame to the
//! host and then waits on the cancellation channel for the rest of the tick.
//! Ticks never overlap, and cancellation is only seen between them.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use rand::RngCore;
use thiserror::Error;

use crate::frame::Frame;
use crate::host::EffectHost;
use crate::pattern::{Params, Pattern, PatternError, Registry};

/// Patterns played by [`run_sequence`], with how long each one runs.
pub const SEQUENCE: [(&str, u64); 6] = [
    ("rainbow", 15),
    ("ocean", 15),
    ("fire", 15),
    ("pulse", 10),
    ("strobe", 10),
    ("disco", 15),
];

/// Pause between patterns in a sequence.
pub const SEQUENCE_GAP: Duration = Duration::from_secs(1);

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("host failed: {0}")]
    Host(#[from] io::Error),
    #[error("sequence scale {0} gives an unusable duration")]
    Scale(f64),
}

/// How long to run and how fast to tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub duration: Duration,
    /// Overrides the pattern's own tick.
    pub tick: Option<Duration>,
}

impl RunOptions {
    pub fn new(duration: Duration) -> RunOptions {
        RunOptions {
            duration,
            tick: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> RunOptions {
        self.tick = Some(tick);
        self
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    /// Pattern frames sent, not counting the reset frame.
    pub frames: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunStats {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Has cancellation been requested? A disconnected channel never cancels.
fn cancel_pending(cancel: &Receiver<()>) -> bool {
    match cancel.try_recv() {
        Ok(()) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
    }
}

/// Wait out the rest of a tick. Returns true if cancelled meanwhile.
fn wait(cancel: &Receiver<()>, timeout: Duration) -> bool {
    match cancel.recv_timeout(timeout) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => {
            thread::sleep(timeout);
            false
        }
    }
}

/// Run `pattern` on `host` until `options.duration` passes or `cancel` fires.
///
/// The host always receives [`Frame::RESET`] before this returns, even when
/// the run stops on an error. The first error is what gets returned.
pub fn run(
    pattern: &Pattern,
    params: &Params,
    host: &mut dyn EffectHost,
    options: RunOptions,
    cancel: &Receiver<()>,
    rng: &mut dyn RngCore,
) -> DriverResult<RunStats> {
    let tick = options.tick.unwrap_or(pattern.tick);
    tracing::info!(
        "Running {} for {:.1}s at {:.1} ticks/s with params {}",
        pattern.name,
        options.duration.as_secs_f64(),
        1.0 / tick.as_secs_f64().max(f64::EPSILON),
        params
    );

    let started = Instant::now();
    let mut frames = 0;
    let mut cancelled = false;

    let outcome = loop {
        let tick_started = Instant::now();
        let elapsed = tick_started.duration_since(started);
        if elapsed >= options.duration {
            break Ok(());
        }
        if cancel_pending(cancel) {
            cancelled = true;
            break Ok(());
        }

        let frame = match pattern.eval(elapsed.as_secs_f64(), params, rng) {
            Ok(frame) => frame,
            Err(err) => break Err(DriverError::from(err)),
        };
        if let Err(err) = host.take_frame(&frame) {
            break Err(DriverError::from(err));
        }
        frames += 1;

        // Sleep the remainder of the tick, but never past the deadline.
        let spent = tick_started.elapsed();
        let until_deadline = options.duration.saturating_sub(started.elapsed());
        let pause = tick.saturating_sub(spent).min(until_deadline);
        if wait(cancel, pause) {
            cancelled = true;
            break Ok(());
        }
    };

    let reset = host.take_frame(&Frame::RESET);
    let stats = RunStats {
        frames,
        elapsed: started.elapsed(),
        cancelled,
    };

    if cancelled {
        tracing::info!("Pattern interrupted after {:.1}s", stats.elapsed.as_secs_f64());
    }

    outcome?;
    reset?;

    tracing::info!(
        "Pattern complete: {} frames ({:.1} FPS), reset to white",
        stats.frames,
        stats.fps()
    );
    Ok(stats)
}

/// Look up `name` and run it. An unknown name fails before anything is sent.
pub fn run_named(
    registry: &Registry,
    name: &str,
    params: &Params,
    host: &mut dyn EffectHost,
    options: RunOptions,
    cancel: &Receiver<()>,
    rng: &mut dyn RngCore,
) -> DriverResult<RunStats> {
    let pattern = registry.get(name)?;
    run(pattern, params, host, options, cancel, rng)
}

/// Play the classic effects one after another, stopping early on cancellation.
///
/// `scale` shrinks or stretches every slot of [`SEQUENCE`]. A scale that is
/// negative, not finite, or too large for a [`Duration`] fails before
/// anything is sent.
pub fn run_sequence(
    registry: &Registry,
    host: &mut dyn EffectHost,
    scale: f64,
    cancel: &Receiver<()>,
    rng: &mut dyn RngCore,
) -> DriverResult<Vec<RunStats>> {
    let scaled = |duration: Duration| {
        Duration::try_from_secs_f64(duration.as_secs_f64() * scale)
            .map_err(|_| DriverError::Scale(scale))
    };
    let gap = scaled(SEQUENCE_GAP)?;
    let slots = SEQUENCE
        .iter()
        .map(|(name, secs)| scaled(Duration::from_secs(*secs)).map(|duration| (*name, duration)))
        .collect::<DriverResult<Vec<_>>>()?;

    let mut all = vec![];
    for (index, (name, duration)) in slots.into_iter().enumerate() {
        if index > 0 && wait(cancel, gap) {
            break;
        }
        let options = RunOptions::new(duration);
        let stats = run_named(registry, name, &Params::new(), host, options, cancel, rng)?;
        all.push(stats);
        if stats.cancelled {
            break;
        }
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel;
    use rand::rngs::mock::StepRng;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
        fail_after: Option<usize>,
    }

    impl EffectHost for Recorder {
        fn take_frame(&mut self, frame: &Frame) -> io::Result<()> {
            if let Some(limit) = self.fail_after {
                if self.frames.len() >= limit && *frame != Frame::RESET {
                    return Err(io::Error::new(io::ErrorKind::Other, "unplugged"));
                }
            }
            self.frames.push(*frame);
            Ok(())
        }

        fn power(&mut self, _on: bool) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn zero_duration_only_resets() {
        let registry = Registry::builtin();
        let (_tx, rx) = cancel::channel();
        let mut host = Recorder::default();
        let stats = run_named(
            &registry,
            "plasma",
            &Params::new(),
            &mut host,
            RunOptions::new(Duration::ZERO),
            &rx,
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert_eq!(stats.frames, 0);
        assert_eq!(host.frames, vec![Frame::RESET]);
    }

    #[test]
    fn host_failure_still_resets() {
        let registry = Registry::builtin();
        let (_tx, rx) = cancel::channel();
        let mut host = Recorder {
            fail_after: Some(2),
            ..Recorder::default()
        };
        let result = run_named(
            &registry,
            "rainbow",
            &Params::new(),
            &mut host,
            RunOptions::new(Duration::from_secs(5)).with_tick(Duration::from_millis(1)),
            &rx,
            &mut StepRng::new(0, 1),
        );
        assert!(matches!(result, Err(DriverError::Host(_))));
        assert_eq!(host.frames.len(), 3);
        assert_eq!(host.frames.last(), Some(&Frame::RESET));
    }

    #[test]
    fn bad_param_stops_the_run() {
        let registry = Registry::builtin();
        let (_tx, rx) = cancel::channel();
        let mut host = Recorder::default();
        let params = Params::new().with("harmonics", "many");
        let result = run_named(
            &registry,
            "fourier",
            &params,
            &mut host,
            RunOptions::new(Duration::from_secs(5)),
            &rx,
            &mut StepRng::new(0, 1),
        );
        assert!(matches!(
            result,
            Err(DriverError::Pattern(PatternError::InvalidParam { .. }))
        ));
        assert_eq!(host.frames, vec![Frame::RESET]);
    }

    #[test]
    fn sequence_stops_when_cancelled() {
        let registry = Registry::builtin();
        let (tx, rx) = cancel::channel();
        tx.send(()).unwrap();
        let mut host = Recorder::default();
        let runs = run_sequence(&registry, &mut host, 0.01, &rx, &mut StepRng::new(0, 1)).unwrap();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].cancelled);
        assert_eq!(host.frames, vec![Frame::RESET]);
    }

    #[test]
    fn unusable_scale_fails_without_sending() {
        let registry = Registry::builtin();
        let (_tx, rx) = cancel::channel();
        for scale in [1e20, f64::INFINITY, f64::NAN, -1.0] {
            let mut host = Recorder::default();
            let result = run_sequence(&registry, &mut host, scale, &rx, &mut StepRng::new(0, 1));
            assert!(matches!(result, Err(DriverError::Scale(_))), "scale {}", scale);
            assert!(host.frames.is_empty());
        }
    }

    #[test]
    fn fps_of_an_empty_run_is_zero() {
        let stats = RunStats {
            frames: 0,
            elapsed: Duration::ZERO,
            cancelled: false,
        };
        assert_eq!(stats.fps(), 0.0);
    }
}
