//! Cloud host: frames become capability requests.
//!
//! Each frame costs up to two requests against the daily quota, so this is
//! only practical for slow patterns.

use std::io;

use super::{other_error, EffectHost};
use crate::client::cloud::{Capability, CloudClient, CloudError, DeviceRef};
use crate::frame::Frame;

pub struct CloudHost {
    client: CloudClient,
    target: DeviceRef,
    last: Option<Frame>,
}

impl CloudHost {
    pub fn new(client: CloudClient, target: DeviceRef) -> CloudHost {
        tracing::warn!(
            "Driving {} through the cloud API; each frame counts against the rate limit",
            target.device
        );
        CloudHost {
            client,
            target,
            last: None,
        }
    }

    fn control(&self, capability: &Capability) -> io::Result<()> {
        self.client
            .control(&self.target, capability)
            .map(|_| ())
            .map_err(|err: CloudError| other_error(err))
    }
}

/// Capabilities needed to move the device from `last` to `frame`. Unchanged
/// color or brightness is skipped to save quota.
pub fn frame_changes(last: Option<&Frame>, frame: &Frame) -> Vec<Capability> {
    let mut changes = vec![];
    let color_changed = last.map_or(true, |last| {
        (last.red, last.green, last.blue) != (frame.red, frame.green, frame.blue)
    });
    if color_changed {
        changes.push(Capability::color(
            frame.red as i64,
            frame.green as i64,
            frame.blue as i64,
        ));
    }
    if last.map_or(true, |last| last.brightness != frame.brightness) {
        changes.push(Capability::brightness(frame.brightness as i64));
    }
    changes
}

impl EffectHost for CloudHost {
    fn take_frame(&mut self, frame: &Frame) -> io::Result<()> {
        for capability in frame_changes(self.last.as_ref(), frame) {
            self.control(&capability)?;
        }
        self.last = Some(*frame);
        Ok(())
    }

    fn power(&mut self, on: bool) -> io::Result<()> {
        self.control(&Capability::power(on))
    }
}
