// ABOUTME: Configuration types and parsing for hoist.yml.
// ABOUTME: Handles YAML parsing, env var secrets, and conversion to pipeline inputs.

mod artifacts;
mod env_value;
mod healthcheck;
mod ssh;

pub use artifacts::ArtifactsConfig;
pub use env_value::EnvValue;
pub use healthcheck::{ContainerHealthConfig, HealthcheckConfig};
pub use ssh::SshConfig;

use crate::deploy::{AppSettings, DeployConfig, SnapshotSettings, WaitSettings};
use crate::error::{Error, Result};
use crate::provider::{ClientConfig, OrderRequest, PollPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hoist.yml";
pub const CONFIG_FILENAME_ALT: &str = "hoist.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hoist/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,

    pub order: OrderConfig,

    #[serde(default)]
    pub ssh: SshConfig,

    pub app: AppConfig,

    #[serde(default)]
    pub healthcheck: HealthcheckConfig,

    #[serde(default)]
    pub container_health: ContainerHealthConfig,

    #[serde(default)]
    pub snapshots: SnapshotsConfig,

    #[serde(default)]
    pub waits: WaitsConfig,

    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: EnvValue,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Discovery of a server whose order was acknowledged without details.
    #[serde(default = "default_order_poll")]
    pub order_poll: PollConfig,
    /// Discovery of a snapshot whose creation was acknowledged without an id.
    #[serde(default = "default_snapshot_poll")]
    pub snapshot_poll: PollConfig,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_order_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(5),
        attempts: 24,
    }
}

fn default_snapshot_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(5),
        attempts: 12,
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PollConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub attempts: u32,
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.interval, self.attempts)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfig {
    pub product_id: String,
    pub image_id: String,
    #[serde(default = "default_billing_term")]
    pub billing_term: String,
    #[serde(default)]
    pub hostname: Option<String>,
    /// The account balance must exceed this before ordering.
    #[serde(default)]
    pub min_balance: f64,
}

fn default_billing_term() -> String {
    "monthly".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub remote_dir: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_snapshot_prefix")]
    pub name_prefix: String,
}

fn default_true() -> bool {
    true
}

fn default_snapshot_prefix() -> String {
    "deploy".to_string()
}

impl Default for SnapshotsConfig {
    fn default() -> Self {
        SnapshotsConfig {
            enabled: true,
            name_prefix: default_snapshot_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitsConfig {
    #[serde(default = "default_provisioning_timeout", with = "humantime_serde")]
    pub provisioning: Duration,
    #[serde(default = "default_provisioning_poll", with = "humantime_serde")]
    pub provisioning_poll: Duration,
    #[serde(default = "default_ssh_timeout", with = "humantime_serde")]
    pub ssh: Duration,
    #[serde(default = "default_ssh_retry", with = "humantime_serde")]
    pub ssh_retry: Duration,
    #[serde(default = "default_ssh_grace", with = "humantime_serde")]
    pub ssh_grace: Duration,
    #[serde(default = "default_long_command", with = "humantime_serde")]
    pub long_command: Duration,
}

fn default_provisioning_timeout() -> Duration {
    Duration::from_secs(900)
}

fn default_provisioning_poll() -> Duration {
    Duration::from_secs(10)
}

fn default_ssh_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_ssh_retry() -> Duration {
    Duration::from_secs(5)
}

fn default_ssh_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_long_command() -> Duration {
    Duration::from_secs(1200)
}

impl Default for WaitsConfig {
    fn default() -> Self {
        WaitsConfig {
            provisioning: default_provisioning_timeout(),
            provisioning_poll: default_provisioning_poll(),
            ssh: default_ssh_timeout(),
            ssh_retry: default_ssh_retry(),
            ssh_grace: default_ssh_grace(),
            long_command: default_long_command(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`. Returns the config and the
    /// directory artifact paths are relative to.
    pub fn discover(dir: &Path) -> Result<(Self, std::path::PathBuf)> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                let base = path.parent().unwrap_or(dir).to_path_buf();
                return Self::load(path).map(|config| (config, base));
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("provider.base_url", &self.provider.base_url),
            ("order.product_id", &self.order.product_id),
            ("order.image_id", &self.order.image_id),
            ("app.name", &self.app.name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
            }
        }
        if self.app.port == 0 {
            return Err(Error::InvalidConfig("app.port cannot be 0".to_string()));
        }
        for (field, poll) in [
            ("provider.order_poll", &self.provider.order_poll),
            ("provider.snapshot_poll", &self.provider.snapshot_poll),
        ] {
            if poll.attempts == 0 {
                return Err(Error::InvalidConfig(format!(
                    "{field}.attempts must be at least 1"
                )));
            }
        }
        if self.order.min_balance < 0.0 {
            return Err(Error::InvalidConfig(
                "order.min_balance cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Client settings, with the API key resolved.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let api_key = self.provider.api_key.resolve()?;
        if api_key.is_empty() {
            return Err(Error::InvalidConfig("provider.api_key is empty".to_string()));
        }
        Ok(ClientConfig::new(self.provider.base_url.clone(), api_key)
            .request_timeout(self.provider.request_timeout)
            .order_poll(self.provider.order_poll.policy())
            .snapshot_poll(self.provider.snapshot_poll.policy()))
    }

    pub fn deploy_config(&self) -> DeployConfig {
        let order = OrderRequest {
            product_id: self.order.product_id.clone(),
            image_id: self.order.image_id.clone(),
            billing_term: self.order.billing_term.clone(),
            hostname: self.order.hostname.clone(),
        };

        let mut app = AppSettings::new(self.app.name.clone(), self.app.port);
        app.health_endpoint = self.healthcheck.path.clone();
        if let Some(dir) = &self.app.remote_dir {
            app.remote_dir = dir.clone();
        }
        if let Some(container) = &self.app.container {
            app.container_name = container.clone();
        }
        app.domain = self.app.domain.clone();
        app.certificate_email = self.app.email.clone();

        let mut config = DeployConfig::new(order, app);
        config.min_balance = self.order.min_balance;
        config.ssh_user = self.ssh.user.clone();
        config.ssh_port = self.ssh.port;
        config.ssh_key_path = self.ssh.key_path.clone();
        config.health = self.healthcheck.probe_settings();
        config.container_health = self.container_health.settings();
        config.waits = WaitSettings {
            provisioning_timeout: self.waits.provisioning,
            provisioning_poll: self.waits.provisioning_poll,
            ssh_timeout: self.waits.ssh,
            ssh_retry: self.waits.ssh_retry,
            ssh_grace: self.waits.ssh_grace,
            long_command_timeout: self.waits.long_command,
        };
        config.snapshots = SnapshotSettings {
            enabled: self.snapshots.enabled,
            name_prefix: self.snapshots.name_prefix.clone(),
        };
        config
    }
}
