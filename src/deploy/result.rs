// ABOUTME: The record a deployment run hands back to its caller.
// ABOUTME: Built from the run state whether the run succeeded or not.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::{LogEntry, RunState};

/// Outcome of `deploy` / `deploy_to_existing`.
///
/// `success == false` with a non-empty `resource_id` means a server exists
/// but was not fully configured.
#[derive(Debug, Clone, Serialize)]
pub struct DeployResult {
    pub success: bool,
    /// Empty when no server was obtained.
    pub resource_id: String,
    /// Empty when the address never became known.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    pub health_check_passed: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub errors: Vec<String>,
    pub logs: Vec<LogEntry>,
}

impl DeployResult {
    pub(crate) fn from_state(state: &RunState, success: bool, url: Option<String>) -> Self {
        Self {
            success,
            resource_id: state.resource_id().unwrap_or_default().to_string(),
            address: state.address().unwrap_or_default().to_string(),
            snapshot_id: state.snapshot_id().map(str::to_string),
            health_check_passed: state.health_check_passed(),
            timestamp: Utc::now(),
            url,
            errors: state.errors().to_vec(),
            logs: state.logs().to_vec(),
        }
    }

    /// Whether a server was obtained even though the run failed.
    pub fn partially_provisioned(&self) -> bool {
        !self.success && !self.resource_id.is_empty()
    }
}
