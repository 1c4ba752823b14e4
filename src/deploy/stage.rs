// ABOUTME: Pipeline stages, their fatal/non-fatal policy, and progress notification.
// ABOUTME: Stages run strictly in the order of Stage::PIPELINE.

use serde::Serialize;
use std::fmt;

/// A step of the deployment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CheckBalance,
    OrderResource,
    WaitProvisioning,
    WaitReachable,
    Connect,
    BaseConfig,
    DeployApp,
    ConfigureProxy,
    Certificate,
    HealthCheck,
    Snapshot,
    Complete,
}

impl Stage {
    /// Every stage, in execution order.
    pub const PIPELINE: [Stage; 12] = [
        Stage::CheckBalance,
        Stage::OrderResource,
        Stage::WaitProvisioning,
        Stage::WaitReachable,
        Stage::Connect,
        Stage::BaseConfig,
        Stage::DeployApp,
        Stage::ConfigureProxy,
        Stage::Certificate,
        Stage::HealthCheck,
        Stage::Snapshot,
        Stage::Complete,
    ];

    /// Whether a failure in this stage aborts the run.
    pub fn is_fatal(self) -> bool {
        !matches!(
            self,
            Stage::Certificate | Stage::HealthCheck | Stage::Snapshot
        )
    }

    /// Stages from `start` (inclusive) to the end of the pipeline.
    pub fn starting_at(start: Stage) -> impl Iterator<Item = Stage> {
        Self::PIPELINE.into_iter().skip_while(move |s| *s != start)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::CheckBalance => "check_balance",
            Stage::OrderResource => "order_resource",
            Stage::WaitProvisioning => "wait_provisioning",
            Stage::WaitReachable => "wait_reachable",
            Stage::Connect => "connect",
            Stage::BaseConfig => "base_config",
            Stage::DeployApp => "deploy_app",
            Stage::ConfigureProxy => "configure_proxy",
            Stage::Certificate => "certificate",
            Stage::HealthCheck => "health_check",
            Stage::Snapshot => "snapshot",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives a notification at every stage transition.
///
/// Purely observational: nothing a sink does affects the run.
pub trait ProgressSink: Send + Sync {
    fn stage(&self, stage: Stage, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(Stage, &str) + Send + Sync,
{
    fn stage(&self, stage: Stage, message: &str) {
        self(stage, message)
    }
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn stage(&self, _stage: Stage, _message: &str) {}
}
