//! Speech client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Device the inference service runs a model on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(SpeechError::InvalidArgument(format!(
                "unknown device '{}'",
                other
            ))),
        }
    }
}

/// Configuration for [`SpeechClient`](crate::SpeechClient).
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Base URL of the inference service
    pub base_url: String,
    /// Request timeout; synthesis of long texts is slow
    pub timeout: Duration,
    pub device: Device,
    pub max_retries: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout: Duration::from_secs(600),
            device: Device::Cpu,
            max_retries: 2,
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            base_url: lookup("TTS_SERVICE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: lookup("TTS_SERVICE_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            device: lookup("TTS_DEVICE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.device),
            max_retries: lookup("TTS_SERVICE_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = SpeechConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, "http://localhost:8002");
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("TTS_SERVICE_URL", "http://tts:9000/"),
            ("TTS_SERVICE_TIMEOUT", "30"),
            ("TTS_DEVICE", "CUDA"),
        ]
        .into_iter()
        .collect();
        let config = SpeechConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://tts:9000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.device, Device::Cuda);
    }
}
