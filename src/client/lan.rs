//! Govee LAN API: JSON datagrams on the local network.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;

pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const DISCOVERY_PORT: u16 = 4001;
pub const LISTEN_PORT: u16 = 4002;
pub const CONTROL_PORT: u16 = 4003;
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_PACKET_SIZE: usize = 1024;

pub type LanResult<T> = Result<T, LanError>;

#[derive(Error, Debug)]
pub enum LanError {
    #[error("invalid device address '{0}'")]
    InvalidAddress(String),
    #[error("malformed reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// RGB triple as the LAN API spells it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Commands understood by the LAN API.
///
/// Serializes as `{"cmd": "...", "data": {...}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cmd", content = "data", rename_all = "camelCase")]
pub enum Command {
    Scan {
        account_topic: String,
    },
    Turn {
        value: u8,
    },
    Brightness {
        value: u8,
    },
    Colorwc {
        color: Color,
        #[serde(rename = "colorTemInKelvin")]
        color_tem_in_kelvin: u32,
    },
    DevStatus {},
}

/// Outer `{"msg": ...}` wrapper around every command and reply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub msg: T,
}

impl Command {
    pub fn scan() -> Command {
        Command::Scan {
            account_topic: "reserve".to_string(),
        }
    }

    pub fn turn(on: bool) -> Command {
        Command::Turn { value: on as u8 }
    }

    pub fn brightness(level: i64) -> Command {
        Command::Brightness {
            value: level.clamp(1, 100) as u8,
        }
    }

    pub fn color(r: i64, g: i64, b: i64) -> Command {
        let channel = |c: i64| c.clamp(0, 255) as u8;
        Command::Colorwc {
            color: Color {
                r: channel(r),
                g: channel(g),
                b: channel(b),
            },
            color_tem_in_kelvin: 0,
        }
    }

    pub fn temperature(kelvin: i64) -> Command {
        Command::Colorwc {
            color: Color::default(),
            color_tem_in_kelvin: kelvin.clamp(2000, 9000) as u32,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&Envelope { msg: self })
    }
}

/// A device's answer to a `scan`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    pub ip: String,
    pub device: String,
    pub sku: String,
    pub ble_version_hard: Option<String>,
    pub ble_version_soft: Option<String>,
    pub wifi_version_hard: Option<String>,
    pub wifi_version_soft: Option<String>,
}

/// A device's answer to `devStatus`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceStatus {
    pub on_off: u8,
    pub brightness: u8,
    pub color: Color,
    pub color_tem_in_kelvin: u32,
}

/// Replies the client knows how to read.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cmd", content = "data", rename_all = "camelCase")]
pub enum Reply {
    Scan(DeviceInfo),
    DevStatus(DeviceStatus),
}

/// Parse one reply datagram.
pub fn parse_reply(data: &[u8]) -> LanResult<Reply> {
    let envelope: Envelope<Reply> = serde_json::from_slice(data)?;
    Ok(envelope.msg)
}

/// Sends commands to one device.
pub struct LanClient {
    /// Control address of the device.
    addr: SocketAddr,
    /// How long `status` waits for an answer.
    timeout: Duration,
}

impl LanClient {
    /// Build a client for a device IP (try "192.168.1.23").
    pub fn new(ip: &str) -> LanResult<LanClient> {
        let ip: Ipv4Addr = ip
            .trim()
            .parse()
            .map_err(|_| LanError::InvalidAddress(ip.to_string()))?;
        Ok(LanClient::at(SocketAddr::from((ip, CONTROL_PORT))))
    }

    /// Client for an explicit control address, port included.
    pub fn at(addr: SocketAddr) -> LanClient {
        LanClient {
            addr,
            timeout: STATUS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> LanClient {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn socket(&self) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(self.timeout))?;
        Ok(socket)
    }

    /// Fire-and-forget a command.
    pub fn send(&self, cmd: &Command) -> LanResult<()> {
        let message = cmd.to_json()?;
        tracing::trace!(addr = %self.addr, "send {}", String::from_utf8_lossy(&message));
        self.socket()?.send_to(&message, self.addr)?;
        Ok(())
    }

    pub fn turn(&self, on: bool) -> LanResult<()> {
        self.send(&Command::turn(on))
    }

    pub fn set_brightness(&self, level: i64) -> LanResult<()> {
        self.send(&Command::brightness(level))
    }

    pub fn set_color(&self, r: i64, g: i64, b: i64) -> LanResult<()> {
        self.send(&Command::color(r, g, b))
    }

    pub fn set_temperature(&self, kelvin: i64) -> LanResult<()> {
        self.send(&Command::temperature(kelvin))
    }

    /// Query the device state. Returns `Ok(None)` if nothing answers in time.
    pub fn status(&self) -> LanResult<Option<DeviceStatus>> {
        let socket = self.socket()?;
        socket.send_to(&Command::DevStatus {}.to_json()?, self.addr)?;

        let mut buf = [0; MAX_PACKET_SIZE];
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(err) if is_timeout(&err) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match parse_reply(&buf[..len])? {
            Reply::DevStatus(status) => Ok(Some(status)),
            Reply::Scan(_) => Ok(None),
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Bind a UDP socket on `port` that other Govee tools can share.
pub fn shared_listener(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
    Ok(socket.into())
}

/// Multicast a scan and collect every device that answers before `timeout`.
pub fn discover(timeout: Duration) -> LanResult<Vec<DeviceInfo>> {
    let socket = shared_listener(LISTEN_PORT)?;
    socket.set_multicast_ttl_v4(2)?;
    socket.set_multicast_loop_v4(true)?;

    tracing::info!("Scanning for devices via {}:{}", MULTICAST_ADDR, DISCOVERY_PORT);
    socket.send_to(&Command::scan().to_json()?, (MULTICAST_ADDR, DISCOVERY_PORT))?;

    let started = Instant::now();
    let mut devices = vec![];
    let mut buf = [0; MAX_PACKET_SIZE];

    loop {
        let remaining = match timeout.checked_sub(started.elapsed()) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => break,
        };
        socket.set_read_timeout(Some(remaining))?;

        let (len, source) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if is_timeout(&err) => break,
            Err(err) => return Err(err.into()),
        };

        match parse_reply(&buf[..len]) {
            Ok(Reply::Scan(info)) => {
                tracing::debug!("scan reply from {}: {} {}", source, info.sku, info.device);
                devices.push(info);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!("ignoring datagram from {}: {}", source, err);
            }
        }
    }

    Ok(devices)
}

/// Probe `prefix.1` to `prefix.254` with a status query, one at a time.
pub fn scan_subnet(prefix: &str, timeout: Duration) -> LanResult<Vec<Ipv4Addr>> {
    let mut found = vec![];
    for host in 1..=254u8 {
        let ip = format!("{}.{}", prefix.trim_end_matches('.'), host);
        let client = LanClient::new(&ip)?.with_timeout(timeout);
        match client.status() {
            Ok(Some(_)) => {
                tracing::info!("Found device at {}", ip);
                if let std::net::IpAddr::V4(addr) = client.addr().ip() {
                    found.push(addr);
                }
            }
            Ok(None) => {}
            Err(err) => tracing::debug!("{}: {}", ip, err),
        }
        if host % 10 == 0 {
            tracing::debug!("Scanned {}/254", host);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn encoded(cmd: &Command) -> Value {
        serde_json::from_slice(&cmd.to_json().unwrap()).unwrap()
    }

    #[test]
    fn commands_match_the_wire_format() {
        assert_eq!(
            encoded(&Command::scan()),
            json!({"msg": {"cmd": "scan", "data": {"account_topic": "reserve"}}})
        );
        assert_eq!(
            encoded(&Command::turn(true)),
            json!({"msg": {"cmd": "turn", "data": {"value": 1}}})
        );
        assert_eq!(
            encoded(&Command::color(255, 0, 128)),
            json!({"msg": {"cmd": "colorwc", "data": {
                "color": {"r": 255, "g": 0, "b": 128},
                "colorTemInKelvin": 0
            }}})
        );
        assert_eq!(
            encoded(&Command::DevStatus {}),
            json!({"msg": {"cmd": "devStatus", "data": {}}})
        );
    }

    #[test]
    fn command_values_are_clamped() {
        assert_eq!(Command::brightness(0), Command::Brightness { value: 1 });
        assert_eq!(Command::brightness(180), Command::Brightness { value: 100 });
        assert_eq!(
            Command::temperature(12000),
            Command::Colorwc {
                color: Color::default(),
                color_tem_in_kelvin: 9000
            }
        );
        assert_eq!(
            Command::color(-4, 300, 7),
            Command::Colorwc {
                color: Color { r: 0, g: 255, b: 7 },
                color_tem_in_kelvin: 0
            }
        );
    }

    #[test]
    fn parses_scan_reply() {
        let data = br#"{"msg":{"cmd":"scan","data":{
            "ip":"192.168.1.23","device":"1F:80:C5:32:32:36:72:4E","sku":"H606A",
            "bleVersionHard":"3.01.01","bleVersionSoft":"1.03.01",
            "wifiVersionHard":"1.00.10","wifiVersionSoft":"1.02.03"}}}"#;
        match parse_reply(data).unwrap() {
            Reply::Scan(info) => {
                assert_eq!(info.ip, "192.168.1.23");
                assert_eq!(info.sku, "H606A");
                assert_eq!(info.wifi_version_soft.as_deref(), Some("1.02.03"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_status_reply() {
        let data = br#"{"msg":{"cmd":"devStatus","data":{
            "onOff":1,"brightness":100,"color":{"r":255,"g":0,"b":0},"colorTemInKelvin":7200}}}"#;
        assert_eq!(
            parse_reply(data).unwrap(),
            Reply::DevStatus(DeviceStatus {
                on_off: 1,
                brightness: 100,
                color: Color { r: 255, g: 0, b: 0 },
                color_tem_in_kelvin: 7200,
            })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_reply(b"not json").is_err());
        assert!(parse_reply(br#"{"msg":{"cmd":"turn","data":{"value":1}}}"#).is_err());
    }

    #[test]
    fn client_targets_control_port() {
        let client = LanClient::new("192.168.1.23").unwrap();
        assert_eq!(client.addr(), "192.168.1.23:4003".parse().unwrap());
        assert!(LanClient::new("lamp.local").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn listener_port_can_be_shared() {
        let first = shared_listener(0).unwrap();
        let port = first.local_addr().unwrap().port();
        let second = shared_listener(port).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), port);
    }

    #[test]
    fn status_reads_the_device_answer() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        device.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let client = LanClient::at(device.local_addr().unwrap());

        let responder = std::thread::spawn(move || {
            let mut buf = [0; MAX_PACKET_SIZE];
            let (len, from) = device.recv_from(&mut buf).unwrap();
            let query: Envelope<Command> = serde_json::from_slice(&buf[..len]).unwrap();
            assert_eq!(query.msg, Command::DevStatus {});
            let reply = br#"{"msg":{"cmd":"devStatus","data":{"onOff":1,"brightness":40}}}"#;
            device.send_to(reply, from).unwrap();
        });

        let status = client.status().unwrap().unwrap();
        responder.join().unwrap();
        assert_eq!(status.on_off, 1);
        assert_eq!(status.brightness, 40);
    }

    #[test]
    fn status_against_silent_socket_times_out() {
        // Nothing listens on this port, so the query should come back empty.
        let client = LanClient::new("127.0.0.1")
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        match client.status() {
            Ok(None) => {}
            // Some platforms surface the ICMP unreachable as an error instead.
            Err(LanError::Io(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
