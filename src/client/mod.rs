//! Clients for the two Govee APIs.

pub mod cloud;
pub mod lan;

pub use self::cloud::{CloudClient, DeviceRef};
pub use self::lan::LanClient;
