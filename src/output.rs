// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes; doubles as the pipeline progress sink.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::{DeployResult, ProgressSink, Stage};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print a query result: JSON in json mode, `render` otherwise.
    pub fn value<T: Serialize>(&self, value: &T, render: impl FnOnce(&T) -> String) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(value) {
                    println!("{json}");
                }
            }
            OutputMode::Normal | OutputMode::Quiet => println!("{}", render(value)),
        }
    }

    /// Print the outcome of a deployment run.
    pub fn deploy_result(&self, result: &DeployResult) {
        if self.mode == OutputMode::Json {
            if let Ok(json) = serde_json::to_string(result) {
                println!("{json}");
            }
            return;
        }

        if result.success {
            let target = result.url.as_deref().unwrap_or(&result.address);
            self.success(&format!("Deployed server {} at {target}", result.resource_id));
            if let Some(snapshot) = &result.snapshot_id {
                self.progress(&format!("  snapshot: {snapshot}"));
            }
            if !result.health_check_passed {
                self.progress("  health check did not pass");
            }
            for error in &result.errors {
                self.progress(&format!("  warning: {error}"));
            }
        } else {
            for error in &result.errors {
                self.error(error);
            }
            if result.partially_provisioned() {
                self.error(&format!(
                    "server {} ({}) exists but was not fully configured",
                    result.resource_id,
                    if result.address.is_empty() {
                        "address unknown"
                    } else {
                        &result.address
                    }
                ));
            }
        }
    }
}

impl ProgressSink for Output {
    fn stage(&self, stage: Stage, message: &str) {
        match self.mode {
            OutputMode::Normal => println!("  → [{stage}] {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = StageEvent {
                    event: "stage",
                    stage,
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct StageEvent<'a> {
    event: &'a str,
    stage: Stage,
    message: &'a str,
}
