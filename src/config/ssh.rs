// ABOUTME: SSH connection configuration for provisioned servers.
// ABOUTME: User, port, key, host-key policy, and session timeouts.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::ssh::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Used when the provider hands out no password. Without it the agent is tried.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for SshConfig {
    fn default() -> Self {
        SshConfig {
            user: default_user(),
            port: default_port(),
            key_path: None,
            trust_first_connection: default_trust_first_connection(),
            known_hosts: None,
            connect_timeout: default_connect_timeout(),
            command_timeout: default_command_timeout(),
        }
    }
}

impl SshConfig {
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::default()
            .connect_timeout(self.connect_timeout)
            .command_timeout(self.command_timeout)
            .trust_on_first_use(self.trust_first_connection);
        match &self.known_hosts {
            Some(path) => config.known_hosts_path(path.clone()),
            None => config,
        }
    }
}
