// ABOUTME: Health check configuration: the loopback HTTP probe and container health wait.
// ABOUTME: Defines parameters with sensible defaults and converts to pipeline settings.

use serde::Deserialize;
use std::time::Duration;

use crate::deploy::{ContainerHealthSettings, HealthProbeSettings, IndeterminateHealth};

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_path() -> String {
    "/health".to_string()
}

fn default_interval() -> Duration {
    Duration::from_secs(6)
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_retries() -> u32 {
    10
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        HealthcheckConfig {
            path: default_path(),
            interval: default_interval(),
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }
}

impl HealthcheckConfig {
    pub fn probe_settings(&self) -> HealthProbeSettings {
        HealthProbeSettings {
            retries: self.retries,
            interval: self.interval,
            request_timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerHealthConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// `proceed` or `fail`.
    #[serde(default)]
    pub on_indeterminate: IndeterminateHealth,
}

fn default_attempts() -> u32 {
    30
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for ContainerHealthConfig {
    fn default() -> Self {
        ContainerHealthConfig {
            attempts: default_attempts(),
            interval: default_poll_interval(),
            on_indeterminate: IndeterminateHealth::default(),
        }
    }
}

impl ContainerHealthConfig {
    pub fn settings(&self) -> ContainerHealthSettings {
        ContainerHealthSettings {
            attempts: self.attempts,
            interval: self.interval,
            on_indeterminate: self.on_indeterminate,
        }
    }
}
