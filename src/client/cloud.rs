//! Govee cloud REST API.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::frame::Frame;

pub const BASE_URL: &str = "https://openapi.api.govee.com";
pub const DEVICES_ENDPOINT: &str = "/router/api/v1/user/devices";
pub const CONTROL_ENDPOINT: &str = "/router/api/v1/device/control";
pub const SCENES_ENDPOINT: &str = "/router/api/v1/device/scenes";

const API_KEY_HEADER: &str = "Govee-API-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Highest segment index addressed by `gradient`.
const MAX_SEGMENT: u32 = 14;

/// Colors spread across segments by `gradient`.
pub const GRADIENT_COLORS: [(u8, u8, u8); 7] = [
    (255, 0, 0),
    (255, 127, 0),
    (255, 255, 0),
    (0, 255, 0),
    (0, 255, 255),
    (0, 0, 255),
    (139, 0, 255),
];

pub type CloudResult<T> = Result<T, CloudError>;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("invalid API key")]
    InvalidApiKey,
    #[error("rate limit exceeded (10,000 requests/day)")]
    RateLimited,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One capability change in a control request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Capability {
    #[serde(rename = "type")]
    pub kind: String,
    pub instance: String,
    pub value: Value,
}

impl Capability {
    fn new(kind: &str, instance: &str, value: Value) -> Capability {
        Capability {
            kind: format!("devices.capabilities.{}", kind),
            instance: instance.to_string(),
            value,
        }
    }

    pub fn power(on: bool) -> Capability {
        Capability::new("on_off", "powerSwitch", json!(on as u8))
    }

    pub fn brightness(level: i64) -> Capability {
        Capability::new("range", "brightness", json!(level.clamp(1, 100)))
    }

    pub fn color(r: i64, g: i64, b: i64) -> Capability {
        let rgb = Frame::from_rgb(r, g, b, 100).rgb_value();
        Capability::new("color_setting", "colorRgb", json!(rgb))
    }

    pub fn temperature(kelvin: i64) -> Capability {
        Capability::new("color_setting", "colorTemperatureK", json!(kelvin.clamp(2000, 9000)))
    }

    pub fn segment_color(segments: &[u32], r: i64, g: i64, b: i64) -> Capability {
        let rgb = Frame::from_rgb(r, g, b, 100).rgb_value();
        Capability::new(
            "segment_color_setting",
            "segmentedColorRgb",
            json!({ "segment": segments, "rgb": rgb }),
        )
    }

    pub fn scene(param_id: i64, id: i64) -> Capability {
        Capability::new(
            "dynamic_scene",
            "lightScene",
            json!({ "paramId": param_id, "id": id }),
        )
    }
}

/// Identifies a device to the cloud API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceRef {
    pub device: String,
    pub sku: String,
}

/// Body of a control request.
pub fn control_body(target: &DeviceRef, capability: &Capability) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "payload": {
            "sku": target.sku,
            "device": target.device,
            "capability": capability,
        },
    })
}

/// A named dynamic scene.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub param_id: i64,
    pub id: i64,
}

/// Pull `lightScene` options out of a scenes response.
pub fn parse_scenes(response: &Value) -> Option<Vec<Scene>> {
    if response.get("code").and_then(Value::as_i64) != Some(200) {
        return None;
    }
    let capabilities = response.pointer("/payload/capabilities")?.as_array()?;
    let scenes = capabilities
        .iter()
        .find(|cap| cap.get("instance").and_then(Value::as_str) == Some("lightScene"))?;
    let options = scenes.pointer("/parameters/options")?.as_array()?;

    Some(
        options
            .iter()
            .map(|opt| Scene {
                name: opt
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                param_id: opt.pointer("/value/paramId").and_then(Value::as_i64).unwrap_or(0),
                id: opt.pointer("/value/id").and_then(Value::as_i64).unwrap_or(0),
            })
            .collect(),
    )
}

/// Segment groups for `gradient`: pairs `[2i, 2i+1]`, trimmed at the last segment.
pub fn gradient_segments() -> Vec<(Vec<u32>, (u8, u8, u8))> {
    GRADIENT_COLORS
        .iter()
        .enumerate()
        .filter_map(|(i, color)| {
            let first = i as u32 * 2;
            let segments: Vec<u32> = [first, first + 1]
                .iter()
                .copied()
                .filter(|s| *s <= MAX_SEGMENT)
                .collect();
            if segments.is_empty() {
                None
            } else {
                Some((segments, *color))
            }
        })
        .collect()
}

/// Authenticated client for the cloud API.
pub struct CloudClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CloudClient {
    pub fn new(api_key: &str) -> CloudResult<CloudClient> {
        CloudClient::with_url(BASE_URL, api_key)
    }

    /// Client for a custom base URL.
    pub fn with_url(base_url: &str, api_key: &str) -> CloudResult<CloudClient> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(CloudClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn read(response: reqwest::blocking::Response) -> CloudResult<Value> {
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(CloudError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(CloudError::RateLimited),
            _ => Ok(response.json()?),
        }
    }

    fn get(&self, endpoint: &str) -> CloudResult<Value> {
        tracing::debug!("GET {}", endpoint);
        let response = self
            .http
            .get(self.url(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .send()?;
        Self::read(response)
    }

    fn post(&self, endpoint: &str, body: &Value) -> CloudResult<Value> {
        tracing::debug!("POST {} {}", endpoint, body);
        let response = self
            .http
            .post(self.url(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()?;
        Self::read(response)
    }

    /// All devices on the account, with their capabilities.
    pub fn devices(&self) -> CloudResult<Value> {
        self.get(DEVICES_ENDPOINT)
    }

    pub fn control(&self, target: &DeviceRef, capability: &Capability) -> CloudResult<Value> {
        self.post(CONTROL_ENDPOINT, &control_body(target, capability))
    }

    /// Raw scenes response for a device.
    pub fn scenes(&self, target: &DeviceRef) -> CloudResult<Value> {
        let body = json!({
            "requestId": Uuid::new_v4().to_string(),
            "payload": { "sku": target.sku, "device": target.device },
        });
        self.post(SCENES_ENDPOINT, &body)
    }

    /// Paint the rainbow across segment pairs, one request per group.
    pub fn gradient(&self, target: &DeviceRef) -> CloudResult<Vec<Value>> {
        let mut results = vec![];
        for (segments, (r, g, b)) in gradient_segments() {
            let capability = Capability::segment_color(&segments, r as i64, g as i64, b as i64);
            results.push(self.control(target, &capability)?);
            thread::sleep(Duration::from_millis(300));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> DeviceRef {
        DeviceRef {
            device: "1A:74:CD:C2:EB:A4:08:21".to_string(),
            sku: "H606A".to_string(),
        }
    }

    #[test]
    fn control_body_shape() {
        let body = control_body(&lamp(), &Capability::color(255, 0, 128));
        assert_eq!(body["payload"]["sku"], "H606A");
        assert_eq!(body["payload"]["device"], "1A:74:CD:C2:EB:A4:08:21");
        assert_eq!(
            body["payload"]["capability"],
            json!({
                "type": "devices.capabilities.color_setting",
                "instance": "colorRgb",
                "value": 0xFF0080,
            })
        );
        let request_id = body["requestId"].as_str().unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
    }

    #[test]
    fn request_ids_are_unique() {
        let a = control_body(&lamp(), &Capability::power(true));
        let b = control_body(&lamp(), &Capability::power(true));
        assert_ne!(a["requestId"], b["requestId"]);
    }

    #[test]
    fn capabilities_clamp_their_values() {
        assert_eq!(Capability::brightness(0).value, json!(1));
        assert_eq!(Capability::brightness(140).value, json!(100));
        assert_eq!(Capability::temperature(1000).value, json!(2000));
        assert_eq!(Capability::color(300, -1, 0).value, json!(0xFF0000));
        assert_eq!(Capability::power(false).value, json!(0));
    }

    #[test]
    fn segment_and_scene_values() {
        assert_eq!(
            Capability::segment_color(&[0, 1], 0, 0, 255).value,
            json!({"segment": [0, 1], "rgb": 255})
        );
        assert_eq!(
            Capability::scene(4280, 3853).value,
            json!({"paramId": 4280, "id": 3853})
        );
    }

    #[test]
    fn gradient_paints_seven_pairs_up_to_segment_thirteen() {
        let groups = gradient_segments();
        assert_eq!(groups.len(), 7);
        assert_eq!(groups[0].0, vec![0, 1]);
        assert_eq!(groups[6].0, vec![12, 13]);
        assert_eq!(groups[6].1, (139, 0, 255));
        assert!(groups.iter().all(|(segments, _)| !segments.contains(&MAX_SEGMENT)));
    }

    #[test]
    fn scenes_are_extracted() {
        let response = json!({
            "code": 200,
            "payload": {"capabilities": [
                {"instance": "other"},
                {"instance": "lightScene", "parameters": {"options": [
                    {"name": "Sunrise", "value": {"paramId": 4280, "id": 3853}},
                    {"value": {"paramId": 1, "id": 2}},
                ]}},
            ]}
        });
        let scenes = parse_scenes(&response).unwrap();
        assert_eq!(
            scenes,
            vec![
                Scene { name: "Sunrise".to_string(), param_id: 4280, id: 3853 },
                Scene { name: "Unknown".to_string(), param_id: 1, id: 2 },
            ]
        );
        assert!(parse_scenes(&json!({"code": 400})).is_none());
    }
}
