// ABOUTME: Deployment orchestration over a provider API and a remote shell.
// ABOUTME: Exports the orchestrator, its settings, stages, and run results.

mod error;
mod health;
mod orchestrator;
mod result;
mod rollback;
mod settings;
mod stage;
mod state;

pub use error::{DeployError, ErrorKind};
pub use health::{ContainerHealth, loopback_url, probe_http, wait_for_container_health};
pub use orchestrator::Orchestrator;
pub use result::DeployResult;
pub use settings::{
    AppSettings, ContainerHealthSettings, DeployArtifacts, DeployConfig, HealthProbeSettings,
    IndeterminateHealth, SnapshotSettings, WaitSettings,
};
pub use stage::{NoProgress, ProgressSink, Stage};
pub use state::{LogEntry, RunState};
