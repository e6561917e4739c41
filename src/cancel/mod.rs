//! Turns Ctrl-C into a message the driver can poll between ticks.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

/// Create a cancellation pair for callers that trigger cancellation themselves.
pub fn channel() -> (Sender<()>, Receiver<()>) {
    channel::bounded(1)
}

/// Exit status used when a second Ctrl-C forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// What to do about the `count`-th Ctrl-C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Ask the driver to stop after this tick.
    Cancel,
    /// Give up on a clean stop.
    ForceQuit,
}

pub fn interrupt_action(count: usize) -> Interrupt {
    if count <= 1 {
        Interrupt::Cancel
    } else {
        Interrupt::ForceQuit
    }
}

/// Start a thread that waits for Ctrl-C and then sends on the returned
/// channel. A second Ctrl-C exits the process without waiting for the
/// driver, for example while a slow request or the reset frame is pending.
pub fn start_signal_thread() -> io::Result<(Receiver<()>, JoinHandle<()>)> {
    let (sender, receiver) = channel();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    let handle = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                let mut count = 0;
                loop {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::warn!("Unable to listen for Ctrl-C: {}", err);
                        return;
                    }
                    count += 1;
                    match interrupt_action(count) {
                        Interrupt::Cancel => {
                            tracing::info!(
                                "Interrupted, stopping after this tick (Ctrl-C again to quit)"
                            );
                            sender.try_send(()).ok();
                        }
                        Interrupt::ForceQuit => {
                            tracing::warn!("Interrupted twice, exiting now");
                            std::process::exit(FORCED_EXIT_CODE);
                        }
                    }
                }
            })
        })?;

    Ok((receiver, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_interrupt_forces_quit() {
        assert_eq!(interrupt_action(1), Interrupt::Cancel);
        assert_eq!(interrupt_action(2), Interrupt::ForceQuit);
        assert_eq!(interrupt_action(5), Interrupt::ForceQuit);
    }

    #[test]
    fn cancel_channel_holds_one_request() {
        let (tx, rx) = channel();
        tx.try_send(()).unwrap();
        assert!(tx.try_send(()).is_err());
        assert_eq!(rx.try_recv(), Ok(()));
    }
}
