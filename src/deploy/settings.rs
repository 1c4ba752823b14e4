// ABOUTME: Validated inputs for one deployment run.
// ABOUTME: Pipeline settings plus the pre-rendered artifacts uploaded to the server.

use std::path::PathBuf;
use std::time::Duration;

use crate::provider::OrderRequest;
use crate::ssh::RenderedTemplate;

/// What to do when the container never reports healthy or unhealthy
/// within the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndeterminateHealth {
    /// Record the outcome and carry on.
    #[default]
    Proceed,
    /// Treat it like an unhealthy container.
    Fail,
}

/// The application being deployed.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    /// Port the app listens on, on the server's loopback interface.
    pub port: u16,
    pub health_endpoint: String,
    /// Directory on the server holding the compose project.
    pub remote_dir: String,
    /// Container whose health is watched after `docker compose up`.
    pub container_name: String,
    /// Public domain; enables the certificate stage and the https URL.
    pub domain: Option<String>,
    pub certificate_email: Option<String>,
}

impl AppSettings {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        Self {
            remote_dir: format!("/opt/{name}"),
            container_name: name.clone(),
            name,
            port,
            health_endpoint: "/health".to_string(),
            domain: None,
            certificate_email: None,
        }
    }
}

/// Loopback HTTP probe run on the server after deployment.
#[derive(Debug, Clone)]
pub struct HealthProbeSettings {
    pub retries: u32,
    pub interval: Duration,
    /// Per-request limit passed to curl.
    pub request_timeout: Duration,
}

impl Default for HealthProbeSettings {
    fn default() -> Self {
        Self {
            retries: 10,
            interval: Duration::from_secs(6),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Wait for the container runtime to report the app container healthy.
#[derive(Debug, Clone)]
pub struct ContainerHealthSettings {
    pub attempts: u32,
    pub interval: Duration,
    pub on_indeterminate: IndeterminateHealth,
}

impl Default for ContainerHealthSettings {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(5),
            on_indeterminate: IndeterminateHealth::Proceed,
        }
    }
}

/// Ceilings for the waits that precede configuration.
#[derive(Debug, Clone)]
pub struct WaitSettings {
    pub provisioning_timeout: Duration,
    pub provisioning_poll: Duration,
    pub ssh_timeout: Duration,
    pub ssh_retry: Duration,
    pub ssh_grace: Duration,
    /// Timeout for long-running commands: setup script, image pulls, certbot.
    pub long_command_timeout: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            provisioning_timeout: Duration::from_secs(900),
            provisioning_poll: Duration::from_secs(10),
            ssh_timeout: Duration::from_secs(300),
            ssh_retry: Duration::from_secs(5),
            ssh_grace: Duration::from_secs(5),
            long_command_timeout: Duration::from_secs(1200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub enabled: bool,
    pub name_prefix: String,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name_prefix: "deploy".to_string(),
        }
    }
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub order: OrderRequest,
    /// The balance must exceed this for an order to be placed.
    pub min_balance: f64,
    pub ssh_user: String,
    pub ssh_port: u16,
    /// Key used when the provider does not hand out a password.
    pub ssh_key_path: Option<PathBuf>,
    pub app: AppSettings,
    pub health: HealthProbeSettings,
    pub container_health: ContainerHealthSettings,
    pub waits: WaitSettings,
    pub snapshots: SnapshotSettings,
}

impl DeployConfig {
    pub fn new(order: OrderRequest, app: AppSettings) -> Self {
        Self {
            order,
            min_balance: 0.0,
            ssh_user: "root".to_string(),
            ssh_port: 22,
            ssh_key_path: None,
            app,
            health: HealthProbeSettings::default(),
            container_health: ContainerHealthSettings::default(),
            waits: WaitSettings::default(),
            snapshots: SnapshotSettings::default(),
        }
    }
}

/// Pre-rendered files, uploaded verbatim.
#[derive(Debug, Clone)]
pub struct DeployArtifacts {
    /// Base server setup (packages, docker, nginx, firewall).
    pub setup_script: RenderedTemplate,
    pub compose_manifest: RenderedTemplate,
    pub env_file: Option<RenderedTemplate>,
    pub proxy_config: RenderedTemplate,
}
