// ABOUTME: Per-run state owned by one orchestrator.
// ABOUTME: Server identity is write-once; logs and non-fatal errors are append-only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::stage::Stage;

/// One informational line of a run's log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// What a run has learned and recorded so far.
#[derive(Default, Clone)]
pub struct RunState {
    resource_id: Option<String>,
    address: Option<String>,
    credential: Option<String>,
    snapshot_id: Option<String>,
    health_check_passed: bool,
    logs: Vec<LogEntry>,
    errors: Vec<String>,
}

impl fmt::Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("resource_id", &self.resource_id)
            .field("address", &self.address)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("snapshot_id", &self.snapshot_id)
            .field("health_check_passed", &self.health_check_passed)
            .field("logs", &self.logs.len())
            .field("errors", &self.errors)
            .finish()
    }
}

impl RunState {
    /// Record the server this run works on. Ignored once a server is known.
    /// Returns whether the values were taken.
    pub fn set_resource(&mut self, id: &str, address: &str, credential: &str) -> bool {
        if self.resource_id.is_some() {
            return false;
        }
        self.resource_id = Some(id.to_string());
        self.address = (!address.is_empty()).then(|| address.to_string());
        self.credential = (!credential.is_empty()).then(|| credential.to_string());
        true
    }

    /// Fill in an address the provider did not know at order time.
    /// An address that is already known is kept.
    pub fn fill_address(&mut self, address: &str) -> bool {
        if self.address.is_some() || address.is_empty() {
            return false;
        }
        self.address = Some(address.to_string());
        true
    }

    pub fn set_snapshot(&mut self, snapshot_id: &str) {
        self.snapshot_id = Some(snapshot_id.to_string());
    }

    pub fn set_health_check_passed(&mut self, passed: bool) {
        self.health_check_passed = passed;
    }

    pub fn log(&mut self, stage: Stage, message: impl Into<String>) {
        self.logs.push(LogEntry {
            at: Utc::now(),
            stage,
            message: message.into(),
        });
    }

    /// Record a failure. Errors also appear in the log.
    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        self.log(stage, format!("error: {message}"));
        self.errors.push(message);
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn health_check_passed(&self) -> bool {
        self.health_check_passed
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}
