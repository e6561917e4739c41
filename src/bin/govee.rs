//! Control Govee lights over the LAN or cloud API.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use govee_patterns::client::cloud::{self, Capability, CloudClient};
use govee_patterns::client::lan::{self, LanClient};
use govee_patterns::config::{self, Root};

#[derive(Parser)]
#[command(name = "govee")]
#[command(about = "Control Govee smart lights over the LAN or cloud API")]
#[command(version)]
struct Cli {
    /// Config file (YAML, or JSON by extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Local UDP control (needs LAN Control enabled in the Govee app)
    #[command(subcommand)]
    Lan(LanCommand),

    /// Cloud REST control (needs GOVEE_API_KEY)
    #[command(subcommand)]
    Cloud(CloudCommand),
}

#[derive(Clone, Copy, ValueEnum)]
enum PowerState {
    On,
    Off,
}

impl PowerState {
    fn is_on(self) -> bool {
        matches!(self, PowerState::On)
    }
}

#[derive(Subcommand)]
enum LanCommand {
    /// Discover devices via multicast
    Discover {
        /// How long to listen for answers
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Probe every address in a /24 with a status query
    Scan {
        /// First three octets, e.g. 192.168.0
        #[arg(default_value = "192.168.1")]
        subnet: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Query device status
    Status { target: String },
    /// Turn a device on or off
    Power {
        target: String,
        #[arg(value_enum)]
        state: PowerState,
    },
    /// Set brightness (1-100)
    Brightness { target: String, level: i64 },
    /// Set RGB color (0-255 each)
    Color { target: String, r: i64, g: i64, b: i64 },
    /// Set color temperature (2000-9000 K)
    Temperature { target: String, kelvin: i64 },
}

#[derive(Subcommand)]
enum CloudCommand {
    /// List all devices and their capabilities
    List,
    /// Turn a device on or off
    Power {
        /// Device alias or device id
        target: String,
        #[arg(value_enum)]
        state: PowerState,
        /// Model number, when the target is not an alias
        #[arg(long)]
        sku: Option<String>,
    },
    /// Set brightness (1-100)
    Brightness {
        target: String,
        level: i64,
        #[arg(long)]
        sku: Option<String>,
    },
    /// Set RGB color (0-255 each)
    Color {
        target: String,
        r: i64,
        g: i64,
        b: i64,
        #[arg(long)]
        sku: Option<String>,
    },
    /// Set color temperature (2000-9000 K)
    Temperature {
        target: String,
        kelvin: i64,
        #[arg(long)]
        sku: Option<String>,
    },
    /// Set the color of some segments
    Segment {
        target: String,
        /// Comma-separated segment indices, e.g. 0,1,2
        segments: String,
        r: i64,
        g: i64,
        b: i64,
        #[arg(long)]
        sku: Option<String>,
    },
    /// Spread a rainbow across the segments
    Gradient {
        target: String,
        #[arg(long)]
        sku: Option<String>,
    },
    /// List dynamic scenes
    Scenes {
        target: String,
        #[arg(long)]
        sku: Option<String>,
    },
    /// Apply a dynamic scene
    Scene {
        target: String,
        param_id: i64,
        id: i64,
        #[arg(long)]
        sku: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_segments(list: &str) -> Result<Vec<u32>> {
    list.split(',')
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .with_context(|| format!("bad segment index '{}'", s))
        })
        .collect()
}

fn run_lan(config: &Root, cmd: LanCommand) -> Result<()> {
    let client = |target: &str| -> Result<LanClient> {
        let ip = config.lan_target(target)?;
        LanClient::new(&ip).with_context(|| format!("bad LAN target '{}'", target))
    };

    match cmd {
        LanCommand::Discover { timeout_ms } => {
            let timeout = Duration::from_millis(timeout_ms.unwrap_or(config.lan.discovery_timeout_ms));
            let devices = lan::discover(timeout).context("discovery failed")?;
            println!("Found {} device(s):\n", devices.len());
            for device in &devices {
                print_json(device)?;
            }
            if devices.is_empty() {
                println!("Enable LAN Control in the Govee app, check the device shares");
                println!("this network, and allow UDP ports 4001-4003 through the firewall.");
            }
        }
        LanCommand::Scan { subnet, timeout_ms } => {
            let timeout = Duration::from_millis(timeout_ms.unwrap_or(config.lan.scan_timeout_ms));
            println!("Scanning {}.0/24 for devices...", subnet);
            let found = lan::scan_subnet(&subnet, timeout)?;
            println!("Found {} device(s):", found.len());
            for ip in &found {
                println!("  - {}", ip);
            }
        }
        LanCommand::Status { target } => match client(&target)?.status()? {
            Some(status) => print_json(&status)?,
            None => println!("No answer from {}", target),
        },
        LanCommand::Power { target, state } => {
            client(&target)?.turn(state.is_on())?;
            println!("Device turned {}", if state.is_on() { "on" } else { "off" });
        }
        LanCommand::Brightness { target, level } => {
            client(&target)?.set_brightness(level)?;
            println!("Brightness set to {}", level.clamp(1, 100));
        }
        LanCommand::Color { target, r, g, b } => {
            client(&target)?.set_color(r, g, b)?;
            println!("Color set to RGB({}, {}, {})", r, g, b);
        }
        LanCommand::Temperature { target, kelvin } => {
            client(&target)?.set_temperature(kelvin)?;
            println!("Temperature set to {}K", kelvin.clamp(2000, 9000));
        }
    }
    Ok(())
}

fn run_cloud(config: &Root, cmd: CloudCommand) -> Result<()> {
    let client = CloudClient::with_url(&config.cloud.base_url, &config.api_key()?)?;
    let target = |target: &str, sku: &Option<String>| config.cloud_target(target, sku.as_deref());

    let control = |device: &str, sku: &Option<String>, capability: Capability| -> Result<()> {
        let result = client.control(&target(device, sku)?, &capability)?;
        print_json(&result)
    };

    match cmd {
        CloudCommand::List => print_json(&client.devices()?)?,
        CloudCommand::Power { target, state, sku } => {
            control(&target, &sku, Capability::power(state.is_on()))?
        }
        CloudCommand::Brightness { target, level, sku } => {
            control(&target, &sku, Capability::brightness(level))?
        }
        CloudCommand::Color { target, r, g, b, sku } => {
            control(&target, &sku, Capability::color(r, g, b))?
        }
        CloudCommand::Temperature { target, kelvin, sku } => {
            control(&target, &sku, Capability::temperature(kelvin))?
        }
        CloudCommand::Segment { target, segments, r, g, b, sku } => {
            let segments = parse_segments(&segments)?;
            control(&target, &sku, Capability::segment_color(&segments, r, g, b))?
        }
        CloudCommand::Gradient { target: device, sku } => {
            for result in client.gradient(&target(&device, &sku)?)? {
                print_json(&result)?;
            }
        }
        CloudCommand::Scenes { target: device, sku } => {
            let response = client.scenes(&target(&device, &sku)?)?;
            match cloud::parse_scenes(&response) {
                Some(scenes) => {
                    println!("Available scenes ({}):\n", scenes.len());
                    for scene in scenes {
                        println!("  {}: paramId={}, id={}", scene.name, scene.param_id, scene.id);
                    }
                }
                None => print_json(&response)?,
            }
        }
        CloudCommand::Scene { target, param_id, id, sku } => {
            control(&target, &sku, Capability::scene(param_id, id))?
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "govee_patterns=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Lan(cmd) => run_lan(&config, cmd),
        Commands::Cloud(cmd) => run_cloud(&config, cmd),
    }
}
