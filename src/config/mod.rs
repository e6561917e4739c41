use std::collections::HashMap;
use std::path::Path;
use std::{env, fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::cloud::{self, DeviceRef};
use crate::client::lan;
use crate::pattern::Params;

/// Environment variable holding the cloud API key.
pub const API_KEY_ENV: &str = "GOVEE_API_KEY";
/// Dotenv file consulted for the API key.
pub const DOTENV_PATH: &str = ".env";
/// Config file looked up when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "./govee.yaml";

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Root {
    /// LAN API settings.
    pub lan: Lan,
    /// Cloud API settings.
    pub cloud: Cloud,
    /// Named devices.
    pub devices: HashMap<String, Device>,
    /// Default parameters per pattern name.
    pub patterns: HashMap<String, Params>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Lan {
    /// How long `discover` listens for answers, in milliseconds.
    pub discovery_timeout_ms: u64,
    /// Per-address wait during a subnet scan, in milliseconds.
    pub scan_timeout_ms: u64,
}

impl Default for Lan {
    fn default() -> Lan {
        Lan {
            discovery_timeout_ms: lan::DISCOVERY_TIMEOUT.as_millis() as u64,
            scan_timeout_ms: 200,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Cloud {
    /// API root, overridable for testing against a mock.
    pub base_url: String,
    /// API key; the environment variable takes precedence.
    pub api_key: Option<String>,
}

impl Default for Cloud {
    fn default() -> Cloud {
        Cloud {
            base_url: cloud::BASE_URL.to_string(),
            api_key: None,
        }
    }
}

/// A named device.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    /// LAN address.
    pub ip: Option<String>,
    /// Cloud device id (MAC-like string).
    pub device: Option<String>,
    /// Model number, required with `device`.
    pub sku: Option<String>,
    /// Human-readable name.
    pub name: Option<String>,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("device '{0}' needs an ip or a device and sku")]
    IncompleteDevice(String),
    #[error("{} not set; export it or set cloud.apiKey in the config", API_KEY_ENV)]
    MissingApiKey,
    #[error("device '{0}' has no {1}")]
    MissingField(String, &'static str),
}

pub fn read_config_json<T: AsRef<Path>>(path: T) -> ConfigResult<Root> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let root: Root = serde_json::from_reader(reader)?;
    root.validate()?;
    Ok(root)
}

pub fn read_config_yaml<T: AsRef<Path>>(path: T) -> ConfigResult<Root> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let root: Root = serde_yaml::from_reader(reader)?;
    root.validate()?;
    Ok(root)
}

/// Read a config by extension (`.json` or YAML otherwise).
pub fn read_config<T: AsRef<Path>>(path: T) -> ConfigResult<Root> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => read_config_json(path),
        _ => read_config_yaml(path),
    }
}

/// Load `path`, or the default file if it exists, or an empty config.
pub fn load(path: Option<&Path>) -> ConfigResult<Root> {
    match path {
        Some(path) => read_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => read_config(DEFAULT_CONFIG_PATH),
        None => Ok(Root::default()),
    }
}

impl Root {
    /// Quick sanity check for the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        for (id, device) in &self.devices {
            let cloud_ready = device.device.is_some() && device.sku.is_some();
            if device.ip.is_none() && !cloud_ready {
                return Err(ConfigError::IncompleteDevice(id.clone()));
            }
        }
        Ok(())
    }

    /// The API key from the environment, `./.env`, or the config file, in
    /// that order.
    pub fn api_key(&self) -> ConfigResult<String> {
        self.api_key_with_dotenv(Path::new(DOTENV_PATH))
    }

    /// Like [`Root::api_key`] with an explicit dotenv file. Variables already
    /// in the environment are not overridden by the file.
    pub fn api_key_with_dotenv(&self, dotenv: &Path) -> ConfigResult<String> {
        match dotenvy::from_path(dotenv) {
            Ok(()) => tracing::debug!("loaded {}", dotenv.display()),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!("ignoring {}: {}", dotenv.display(), err),
        }

        let from_env = env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty());
        from_env
            .or_else(|| self.cloud.api_key.clone())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Resolve a LAN target: a device alias with an ip, or a literal address.
    pub fn lan_target(&self, target: &str) -> ConfigResult<String> {
        match self.devices.get(target) {
            Some(device) => device
                .ip
                .clone()
                .ok_or_else(|| ConfigError::MissingField(target.to_string(), "ip")),
            None => Ok(target.to_string()),
        }
    }

    /// Resolve a cloud target from an alias, or from a literal device id and sku.
    pub fn cloud_target(&self, target: &str, sku: Option<&str>) -> ConfigResult<DeviceRef> {
        if let Some(device) = self.devices.get(target) {
            let id = device
                .device
                .clone()
                .ok_or_else(|| ConfigError::MissingField(target.to_string(), "device"))?;
            let sku = device
                .sku
                .clone()
                .ok_or_else(|| ConfigError::MissingField(target.to_string(), "sku"))?;
            return Ok(DeviceRef { device: id, sku });
        }
        match sku {
            Some(sku) => Ok(DeviceRef {
                device: target.to_string(),
                sku: sku.to_string(),
            }),
            None => Err(ConfigError::MissingField(target.to_string(), "sku")),
        }
    }

    /// Configured defaults for a pattern, or none.
    pub fn pattern_params(&self, name: &str) -> Params {
        self.patterns.get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
lan:
  scanTimeoutMs: 150
devices:
  desk:
    ip: 192.168.1.23
    device: "1A:74:CD:C2:EB:A4:08:21"
    sku: H606A
  shelf:
    ip: 192.168.1.40
patterns:
  fourier:
    harmonics: 8
  perlin:
    scale: 0.02
"#;

    fn sample() -> Root {
        let root: Root = serde_yaml::from_str(SAMPLE).unwrap();
        root.validate().unwrap();
        root
    }

    #[test]
    fn yaml_sections_default_when_absent() {
        let root = sample();
        assert_eq!(root.lan.scan_timeout_ms, 150);
        assert_eq!(root.lan.discovery_timeout_ms, 3000);
        assert_eq!(root.cloud.base_url, cloud::BASE_URL);
        assert_eq!(root.devices.len(), 2);
    }

    #[test]
    fn pattern_defaults_come_from_config() {
        let root = sample();
        assert_eq!(root.pattern_params("fourier").count_or("harmonics", 5).unwrap(), 8);
        assert_eq!(root.pattern_params("perlin").f64_or("scale", 0.05).unwrap(), 0.02);
        assert!(root.pattern_params("plasma").is_empty());
    }

    #[test]
    fn targets_resolve_through_aliases() {
        let root = sample();
        assert_eq!(root.lan_target("desk").unwrap(), "192.168.1.23");
        assert_eq!(root.lan_target("10.0.0.7").unwrap(), "10.0.0.7");

        let desk = root.cloud_target("desk", None).unwrap();
        assert_eq!(desk.sku, "H606A");
        assert!(matches!(
            root.cloud_target("shelf", None),
            Err(ConfigError::MissingField(_, "device"))
        ));

        let literal = root.cloud_target("AA:BB", Some("H6008")).unwrap();
        assert_eq!(literal.device, "AA:BB");
        assert!(root.cloud_target("AA:BB", None).is_err());
    }

    #[test]
    fn incomplete_device_is_rejected() {
        let root: Root = serde_yaml::from_str("devices:\n  lamp:\n    sku: H606A\n").unwrap();
        assert!(matches!(root.validate(), Err(ConfigError::IncompleteDevice(ref id)) if id == "lamp"));
    }

    #[test]
    fn api_key_sources_in_order() {
        let dir = env::temp_dir().join(format!("govee-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let dotenv = dir.join(".env");
        fs::write(&dotenv, "GOVEE_API_KEY=from-dotenv\n").unwrap();

        let mut root = Root::default();
        root.cloud.api_key = Some("from-config".to_string());
        let missing = dir.join("absent.env");

        env::remove_var(API_KEY_ENV);
        assert_eq!(root.api_key_with_dotenv(&missing).unwrap(), "from-config");
        assert_eq!(root.api_key_with_dotenv(&dotenv).unwrap(), "from-dotenv");

        env::set_var(API_KEY_ENV, "from-env");
        assert_eq!(root.api_key_with_dotenv(&dotenv).unwrap(), "from-env");

        env::remove_var(API_KEY_ENV);
        root.cloud.api_key = None;
        assert!(matches!(
            root.api_key_with_dotenv(&missing),
            Err(ConfigError::MissingApiKey)
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn json_config_uses_the_same_layout() {
        let root: Root = serde_json::from_str(
            r#"{"cloud": {"apiKey": "abc"}, "devices": {"desk": {"ip": "192.168.1.23"}}}"#,
        )
        .unwrap();
        assert_eq!(root.cloud.api_key.as_deref(), Some("abc"));
        assert_eq!(root.lan_target("desk").unwrap(), "192.168.1.23");
    }
}
