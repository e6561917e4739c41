//! Play animated patterns on a Govee light.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use govee_patterns::client::CloudClient;
use govee_patterns::config::{self, Root};
use govee_patterns::driver::{self, RunOptions};
use govee_patterns::host::{CloudHost, ConsoleHost, EffectHost, LanHost};
use govee_patterns::{cancel, Params, Registry};

#[derive(Parser)]
#[command(name = "govee-pattern")]
#[command(about = "Run mathematical light patterns on Govee devices")]
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
    /// List available patterns
    List,

    /// Run one pattern
    Run {
        #[command(flatten)]
        target: Target,

        /// Pattern name
        pattern: String,

        /// Seconds to run
        #[arg(short, long, default_value_t = 60.0)]
        duration: f64,

        /// Override the pattern's tick, in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Seed for the random patterns
        #[arg(long)]
        seed: Option<u64>,

        /// Pattern parameters as key=value, e.g. harmonics=8
        params: Vec<String>,
    },

    /// Run the classic effects back to back
    All {
        #[command(flatten)]
        target: Target,

        /// Stretch or shrink every slot of the sequence
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args)]
struct Target {
    /// Device alias, LAN ip, or cloud device id
    device: String,

    /// Drive the device through the cloud API instead of the LAN
    #[arg(long)]
    cloud: bool,

    /// Model number for cloud targets that are not aliases
    #[arg(long)]
    sku: Option<String>,

    /// Log frames instead of sending them
    #[arg(long)]
    dry_run: bool,
}

fn open_host(config: &Root, target: &Target) -> Result<Box<dyn EffectHost>> {
    if target.dry_run {
        return Ok(Box::new(ConsoleHost::new()));
    }
    if target.cloud {
        let client = CloudClient::with_url(&config.cloud.base_url, &config.api_key()?)?;
        let device = config.cloud_target(&target.device, target.sku.as_deref())?;
        return Ok(Box::new(CloudHost::new(client, device)));
    }
    let ip = config.lan_target(&target.device)?;
    let host = LanHost::new(&ip).with_context(|| format!("bad LAN target '{}'", ip))?;
    Ok(Box::new(host))
}

/// Seeded when asked, from entropy otherwise.
fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn list(registry: &Registry) {
    println!("Available patterns:");
    for pattern in registry.iter() {
        println!(
            "  {:<13} {:>5.1} fps  {}",
            pattern.name,
            1.0 / pattern.tick.as_secs_f64(),
            pattern.description
        );
    }
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
    let registry = Registry::builtin();

    match cli.command {
        Commands::List => list(&registry),

        Commands::Run {
            target,
            pattern,
            duration,
            tick_ms,
            seed,
            params,
        } => {
            let pattern = registry.get(&pattern.to_lowercase())?;

            let mut cli_params = Params::new();
            for pair in &params {
                cli_params.parse_pair(pair)?;
            }
            let params = config.pattern_params(&pattern.name).merged(&cli_params);

            let duration_secs = Duration::try_from_secs_f64(duration).context("invalid duration")?;
            let mut options = RunOptions::new(duration_secs);
            if let Some(ms) = tick_ms {
                options = options.with_tick(Duration::from_millis(ms));
            }

            let mut host = open_host(&config, &target)?;
            let (cancel, _signal_thread) = cancel::start_signal_thread()?;

            host.power(true)?;
            thread::sleep(Duration::from_millis(500));

            println!("Running {} for {}s, press Ctrl+C to stop", pattern.name, duration);
            let stats = driver::run(pattern, &params, host.as_mut(), options, &cancel, &mut rng(seed))?;
            println!(
                "Pattern complete! Rendered {} frames ({:.1} FPS)",
                stats.frames,
                stats.fps()
            );
        }

        Commands::All { target, scale, seed } => {
            let mut host = open_host(&config, &target)?;
            let (cancel, _signal_thread) = cancel::start_signal_thread()?;

            host.power(true)?;
            thread::sleep(Duration::from_millis(500));

            println!("=== Running all patterns ===");
            let runs = driver::run_sequence(&registry, host.as_mut(), scale, &cancel, &mut rng(seed))?;
            let frames: usize = runs.iter().map(|stats| stats.frames).sum();
            println!("=== {} patterns, {} frames ===", runs.len(), frames);
        }
    }

    Ok(())
}
