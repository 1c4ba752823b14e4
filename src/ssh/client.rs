// ABOUTME: SSH session management using russh.
// ABOUTME: Owns one connection's lifecycle, command execution, and the lazy SFTP channel.

use super::error::{Error, Result};
use super::sftp;
use super::shell::RemoteShell;
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Exit code reported when the remote side only sent an exit signal.
const SIGNALED_EXIT_CODE: u32 = 255;

/// Configuration shared by every connection a [`Session`] makes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Budget for TCP connect, key exchange and authentication together.
    pub connect_timeout: Duration,
    /// Default timeout for command execution (default: 5 minutes).
    pub command_timeout: Duration,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Interval between keepalive messages.
    pub keepalive_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(300),
            trust_on_first_use: true,
            known_hosts_path: None,
            keepalive_interval: Some(Duration::from_secs(15)),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }
}

/// How to authenticate once the transport is up.
#[derive(Clone)]
pub enum Auth {
    Password(String),
    KeyFile(PathBuf),
    /// SSH agent, then the default key files in `~/.ssh`.
    Agent,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Password(_) => f.write_str("Password(<redacted>)"),
            Auth::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            Auth::Agent => f.write_str("Agent"),
        }
    }
}

/// Where to connect and who to be.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: Auth,
}

impl Credentials {
    pub fn new(host: impl Into<String>, user: impl Into<String>, auth: Auth) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            auth,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Connection lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Output from a remote command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Standard output, trimmed.
    pub stdout: String,
    /// Standard error, trimmed.
    pub stderr: String,
    /// Exit code of the command.
    pub exit_code: u32,
    /// Signal that terminated the command, if any.
    pub signal: Option<String>,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }
}

/// Text produced elsewhere (a script, a manifest, a config file) that is
/// uploaded exactly as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    /// Name used in logs.
    pub name: String,
    pub content: String,
    /// Permission bits applied after upload.
    pub mode: u32,
}

impl RenderedTemplate {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mode: 0o644,
        }
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(
        host: String,
        port: u16,
        trust_on_first_use: bool,
        known_hosts_path: Option<PathBuf>,
    ) -> Self {
        Self {
            host,
            port,
            trust_on_first_use,
            known_hosts_path,
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) => {
                if !self.trust_on_first_use {
                    return Ok(false);
                }
                // Freshly provisioned servers are never in known_hosts yet.
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    "host key for {}:{} changed (known_hosts line {})",
                    self.host,
                    self.port,
                    line
                );
                Ok(false)
            }
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// Authentication method resolved from credentials.
enum AuthMethod {
    Password(String),
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// A live transport plus its lazily opened file-transfer channel.
struct Connection {
    host: String,
    handle: Handle<SshHandler>,
    sftp: Option<SftpSession>,
}

/// One SSH connection at a time, reusable across connects.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    connection: Option<Connection>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("host", &self.connection.as_ref().map(|c| c.host.as_str()))
            .finish()
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            connection: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open the transport and authenticate.
    async fn establish(
        config: &SessionConfig,
        credentials: &Credentials,
    ) -> Result<Handle<SshHandler>> {
        let auth_method = Self::resolve_auth_method(&credentials.auth).await?;

        let russh_config = Config {
            inactivity_timeout: None,
            keepalive_interval: config.keepalive_interval,
            ..Default::default()
        };

        let handler = SshHandler::new(
            credentials.host.clone(),
            credentials.port,
            config.trust_on_first_use,
            config.known_hosts_path.clone(),
        );

        let mut handle = client::connect(
            Arc::new(russh_config),
            (credentials.host.as_str(), credentials.port),
            handler,
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!(
                    "connection refused to {}:{}",
                    credentials.host, credentials.port
                ))
            } else {
                Error::Connection(e.to_string())
            }
        })?;

        if !Self::authenticate(&mut handle, &credentials.user, auth_method).await? {
            return Err(Error::AuthenticationFailed);
        }

        Ok(handle)
    }

    /// Resolve which authentication method to use.
    async fn resolve_auth_method(auth: &Auth) -> Result<AuthMethod> {
        match auth {
            Auth::Password(password) => Ok(AuthMethod::Password(password.clone())),
            Auth::KeyFile(key_path) => {
                let key = load_secret_key(key_path, None).map_err(|e| Error::KeyLoadFailed {
                    path: key_path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(AuthMethod::KeyFile(Arc::new(key)))
            }
            Auth::Agent => {
                if let Ok(agent) = AgentClient::connect_env().await {
                    return Ok(AuthMethod::Agent(agent));
                }

                let home = std::env::var("HOME").map_err(|_| {
                    Error::AgentUnavailable("SSH agent not available and HOME not set".to_string())
                })?;

                let default_keys = [
                    format!("{}/.ssh/id_ed25519", home),
                    format!("{}/.ssh/id_rsa", home),
                    format!("{}/.ssh/id_ecdsa", home),
                ];

                for key_path in &default_keys {
                    if let Ok(key) = load_secret_key(key_path, None) {
                        return Ok(AuthMethod::KeyFile(Arc::new(key)));
                    }
                }

                Err(Error::AgentUnavailable(
                    "SSH agent not available and no default keys found".to_string(),
                ))
            }
        }
    }

    async fn authenticate(
        handle: &mut Handle<SshHandler>,
        user: &str,
        auth_method: AuthMethod,
    ) -> Result<bool> {
        match auth_method {
            AuthMethod::Password(password) => {
                let result = handle
                    .authenticate_password(user, password)
                    .await
                    .map_err(Error::Protocol)?;
                Ok(result.success())
            }
            AuthMethod::Agent(mut agent) => {
                let keys = agent.request_identities().await.map_err(|e| {
                    Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
                })?;

                if keys.is_empty() {
                    return Err(Error::AgentUnavailable("no keys in SSH agent".to_string()));
                }

                for key in &keys {
                    match handle
                        .authenticate_publickey_with(user, key.clone(), None, &mut agent)
                        .await
                    {
                        Ok(result) if result.success() => return Ok(true),
                        _ => continue,
                    }
                }
                Ok(false)
            }
            AuthMethod::KeyFile(key) => {
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(Error::Protocol)?
                    .flatten();

                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(Error::Protocol)?;

                Ok(result.success())
            }
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(Error::NotConnected)
    }

    /// The SFTP channel, opened on first use.
    async fn sftp(&mut self) -> Result<&SftpSession> {
        let connection = self.connection.as_mut().ok_or(Error::NotConnected)?;
        if connection.sftp.is_none() {
            tracing::debug!(host = %connection.host, "opening SFTP channel");
            connection.sftp = Some(sftp::open(&connection.handle).await?);
        }
        connection
            .sftp
            .as_ref()
            .ok_or_else(|| Error::Sftp("SFTP channel unavailable".to_string()))
    }
}

async fn exec_on(handle: &Handle<SshHandler>, command: &str) -> Result<ExecResult> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| Error::Channel(format!("failed to open channel: {}", e)))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| Error::Channel(format!("failed to exec command: {}", e)))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;
    let mut signal = None;
    let mut got_eof = false;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                tracing::trace!(stream = "stdout", "{}", String::from_utf8_lossy(&data));
                stdout.extend_from_slice(&data);
            }
            Some(ChannelMsg::ExtendedData { data, ext }) => {
                if ext == 1 {
                    tracing::trace!(stream = "stderr", "{}", String::from_utf8_lossy(&data));
                    stderr.extend_from_slice(&data);
                }
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                exit_code = Some(exit_status);
                if got_eof {
                    break;
                }
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                signal = Some(format!("{:?}", signal_name));
            }
            Some(ChannelMsg::Eof) => {
                got_eof = true;
                if exit_code.is_some() {
                    break;
                }
            }
            Some(ChannelMsg::Close) => break,
            Some(_) => {}
            None => break,
        }
    }

    let exit_code = match (exit_code, &signal) {
        (Some(code), _) => code,
        (None, Some(_)) => SIGNALED_EXIT_CODE,
        // Closed without any exit report: the transport went away.
        (None, None) => return Err(Error::ChannelClosed),
    };

    Ok(ExecResult {
        stdout: String::from_utf8_lossy(&stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        exit_code,
        signal,
    })
}

#[async_trait]
impl RemoteShell for Session {
    fn state(&self) -> SessionState {
        self.state
    }

    fn command_timeout(&self) -> Duration {
        self.config.command_timeout
    }

    async fn connect(&mut self, credentials: &Credentials) -> Result<()> {
        if self.connection.is_some() {
            tracing::debug!("replacing existing connection");
            if let Err(e) = self.disconnect().await {
                tracing::warn!("disconnect before reconnect failed: {}", e);
            }
        }

        self.state = SessionState::Connecting;
        tracing::debug!(host = %credentials.host, port = credentials.port, user = %credentials.user, "connecting");

        let attempt = tokio::time::timeout(
            self.config.connect_timeout,
            Self::establish(&self.config, credentials),
        )
        .await;

        match attempt {
            Ok(Ok(handle)) => {
                self.connection = Some(Connection {
                    host: credentials.host.clone(),
                    handle,
                    sftp: None,
                });
                self.state = SessionState::Connected;
                tracing::info!(host = %credentials.host, "SSH connected");
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
            Err(_elapsed) => {
                self.state = SessionState::Disconnected;
                Err(Error::ConnectTimeout {
                    host: credentials.host.clone(),
                    port: credentials.port,
                    timeout: self.config.connect_timeout,
                })
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state = SessionState::Disconnected;
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        if let Some(sftp) = connection.sftp
            && let Err(e) = sftp.close().await
        {
            tracing::debug!("closing SFTP channel failed: {}", e);
        }

        connection
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        tracing::debug!(host = %connection.host, "SSH disconnected");
        Ok(())
    }

    async fn exec_with_timeout(&self, command: &str, timeout: Duration) -> Result<ExecResult> {
        let connection = self.connection()?;
        tracing::debug!(command, "exec");
        match tokio::time::timeout(timeout, exec_on(&connection.handle, command)).await {
            Ok(result) => result,
            // The remote process may still be running.
            Err(_elapsed) => Err(Error::CommandTimeout {
                command: command.to_string(),
                timeout,
            }),
        }
    }

    async fn upload_content(
        &mut self,
        content: &[u8],
        remote_path: &str,
        mode: Option<u32>,
    ) -> Result<()> {
        let sftp = self.sftp().await?;
        sftp::write_file(sftp, remote_path, content, mode).await?;
        tracing::debug!(path = remote_path, bytes = content.len(), "uploaded");
        Ok(())
    }

    async fn file_exists(&mut self, path: &str) -> bool {
        match self.sftp().await {
            Ok(sftp) => sftp::exists(sftp, path).await,
            Err(_) => false,
        }
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        let sftp = self.sftp().await?;
        sftp::create_dir_all(sftp, path).await
    }
}
