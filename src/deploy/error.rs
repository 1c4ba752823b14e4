// ABOUTME: Error types for deployment operations.
// ABOUTME: Wraps provider and SSH failures and classifies every error into a kind.

use crate::provider;
use crate::ssh;

/// Errors raised by pipeline stages and by rollback.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Insufficient account balance: {balance:.2} available, more than {required:.2} required")]
    InsufficientBalance { balance: f64, required: f64 },

    /// The configured product or image is not offered.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error(transparent)]
    Provider(#[from] provider::Error),

    #[error(transparent)]
    Ssh(#[from] ssh::Error),

    #[error("container {container} reported unhealthy{}", logs_suffix(.logs))]
    ContainerUnhealthy { container: String, logs: String },

    #[error("container {container} health undetermined after {attempts} checks (last: {last})")]
    ContainerHealthUnknown {
        container: String,
        attempts: u32,
        last: String,
    },

    #[error("certificate setup failed: {0}")]
    CertificateFailed(String),

    #[error("health check failed: {url} did not respond after {attempts} attempt(s)")]
    HealthCheckFailed { url: String, attempts: u32 },

    #[error("snapshot failed: {0}")]
    SnapshotFailed(String),

    #[error("no server id available")]
    NoServerId,

    #[error("no deployment artifacts loaded")]
    NoArtifacts,
}

fn logs_suffix(logs: &str) -> String {
    if logs.is_empty() {
        String::new()
    } else {
        format!("; recent logs:\n{logs}")
    }
}

/// Failure taxonomy for deployment errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProviderAuth,
    ProviderRateLimit,
    ProviderTimeout,
    InsufficientBalance,
    ResourceUnavailable,
    OrderFailed,
    ResourceNotFound,
    ProvisioningTimeout,
    ResourceErrorState,
    ConnectTimeout,
    ConnectError,
    CommandTimeout,
    CommandFailed,
    ContainerUnhealthy,
    CertificateFailed,
    HealthCheckFailed,
    SnapshotFailed,
    NoServerId,
    NoArtifacts,
    /// Any other provider failure.
    Provider,
    /// Any other SSH failure.
    Ssh,
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            DeployError::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            DeployError::Provider(e) => provider_kind(e),
            DeployError::Ssh(e) => ssh_kind(e),
            DeployError::ContainerUnhealthy { .. } | DeployError::ContainerHealthUnknown { .. } => {
                ErrorKind::ContainerUnhealthy
            }
            DeployError::CertificateFailed(_) => ErrorKind::CertificateFailed,
            DeployError::HealthCheckFailed { .. } => ErrorKind::HealthCheckFailed,
            DeployError::SnapshotFailed(_) => ErrorKind::SnapshotFailed,
            DeployError::NoServerId => ErrorKind::NoServerId,
            DeployError::NoArtifacts => ErrorKind::NoArtifacts,
        }
    }
}

fn provider_kind(err: &provider::Error) -> ErrorKind {
    use provider::Error as E;

    if err.is_auth() {
        return ErrorKind::ProviderAuth;
    }
    if err.is_rate_limited() {
        return ErrorKind::ProviderRateLimit;
    }
    match err {
        E::Timeout => ErrorKind::ProviderTimeout,
        E::OrderFailed(_) => ErrorKind::OrderFailed,
        E::ResourceNotFound(_) => ErrorKind::ResourceNotFound,
        E::WaitTimeout { .. } => ErrorKind::ProvisioningTimeout,
        E::ResourceError { .. } => ErrorKind::ResourceErrorState,
        _ => ErrorKind::Provider,
    }
}

fn ssh_kind(err: &ssh::Error) -> ErrorKind {
    use ssh::Error as E;

    match err {
        E::ConnectTimeout { .. } | E::Unreachable { .. } => ErrorKind::ConnectTimeout,
        E::Connection(_)
        | E::AuthenticationFailed
        | E::AgentUnavailable(_)
        | E::KeyLoadFailed { .. } => ErrorKind::ConnectError,
        E::CommandTimeout { .. } => ErrorKind::CommandTimeout,
        E::CommandFailed { .. } => ErrorKind::CommandFailed,
        _ => ErrorKind::Ssh,
    }
}
