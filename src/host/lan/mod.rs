//! LAN host: one `colorwc` and one `brightness` datagram per frame.
//!
//! Datagrams can be lost, so both are sent every frame and a missed one is
//! corrected by the next.

use std::io;

use super::{other_error, EffectHost};
use crate::client::lan::{Command, LanClient, LanError};
use crate::frame::Frame;

pub struct LanHost {
    client: LanClient,
}

impl LanHost {
    pub fn new(ip: &str) -> Result<LanHost, LanError> {
        Ok(LanHost::from_client(LanClient::new(ip)?))
    }

    pub fn from_client(client: LanClient) -> LanHost {
        LanHost { client }
    }
}

fn to_io(err: LanError) -> io::Error {
    match err {
        LanError::Io(err) => err,
        err => other_error(err),
    }
}

impl EffectHost for LanHost {
    fn take_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.client
            .send(&Command::color(
                frame.red as i64,
                frame.green as i64,
                frame.blue as i64,
            ))
            .map_err(to_io)?;
        self.client
            .send(&Command::brightness(frame.brightness as i64))
            .map_err(to_io)
    }

    fn power(&mut self, on: bool) -> io::Result<()> {
        self.client.turn(on).map_err(to_io)
    }
}
