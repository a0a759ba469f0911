use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Settings of the controller task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Time the bridge's microcontroller needs after the port opens.
    #[serde(
        rename = "warm_up_ms",
        serialize_with = "serialize_duration_millis",
        deserialize_with = "deserialize_duration_millis"
    )]
    pub warm_up: Duration,

    /// Gap between two packets.
    #[serde(
        rename = "pacing_ms",
        serialize_with = "serialize_duration_millis",
        deserialize_with = "deserialize_duration_millis"
    )]
    pub pacing: Duration,

    /// Line written once the warm-up is over.
    pub handshake: String,

    /// Events a slow subscriber may lag behind before it starts missing some.
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            warm_up: Duration::from_secs(5),
            pacing: Duration::from_millis(100),
            handshake: "xr\r\n".to_string(),
            event_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    #[serde(
        rename = "read_timeout_ms",
        serialize_with = "serialize_duration_millis",
        deserialize_with = "deserialize_duration_millis"
    )]
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub controller: ControllerConfig,
}

impl Config {
    /// Loads a configuration file, YAML or JSON by extension. Keys that are
    /// missing keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => bail!(
                "Unsupported config file {}, expected .yaml, .yml or .json",
                path.display()
            ),
        }
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML config")
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).context("Failed to parse JSON config")
    }
}

fn serialize_duration_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

fn deserialize_duration_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis: u64 = Deserialize::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.controller.warm_up, Duration::from_secs(5));
        assert_eq!(config.controller.pacing, Duration::from_millis(100));
        assert_eq!(config.controller.handshake, "xr\r\n");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "serial:\n  port: /dev/ttyACM0\ncontroller:\n  pacing_ms: 250\n",
        )
        .unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.controller.pacing, Duration::from_millis(250));
        assert_eq!(config.controller.warm_up, Duration::from_secs(5));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = Config::default();
        config.controller.warm_up = Duration::from_millis(1500);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"warm_up_ms\":1500"));
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let path = std::env::temp_dir().join("milight-rf24-config-test.toml");
        fs::write(&path, "").unwrap();
        assert!(Config::load(&path).is_err());
        let _ = fs::remove_file(&path);
    }
}
