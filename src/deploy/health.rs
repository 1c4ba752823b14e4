// ABOUTME: Health checks executed on the server through the SSH session.
// ABOUTME: Container runtime health polling and the loopback HTTP probe.

use shell_escape::unix::escape;
use tokio::time::sleep;

use crate::ssh::RemoteShell;

use super::error::DeployError;
use super::settings::{ContainerHealthSettings, HealthProbeSettings, IndeterminateHealth};

/// Lines of container output attached to an unhealthy report.
const LOG_TAIL_LINES: u32 = 50;

/// How the container-health wait ended without failing the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerHealth {
    Healthy,
    /// The image defines no health check, so there is nothing to wait for.
    NoHealthcheck,
    /// Neither healthy nor unhealthy within the budget.
    Undetermined { last: String },
}

fn inspect_command(container: &str) -> String {
    format!(
        "docker inspect --format '{{{{if .State.Health}}}}{{{{.State.Health.Status}}}}{{{{else}}}}none{{{{end}}}}' {}",
        escape(container.into())
    )
}

/// Poll the runtime's health status for `container`.
///
/// `unhealthy` fails at once with the container's recent logs attached.
/// A failed inspect (e.g. the container is still being created) counts as
/// one more attempt.
pub async fn wait_for_container_health<S: RemoteShell + ?Sized>(
    session: &S,
    container: &str,
    settings: &ContainerHealthSettings,
) -> Result<ContainerHealth, DeployError> {
    let command = inspect_command(container);
    let mut last = String::from("unknown");

    for attempt in 1..=settings.attempts {
        match session.exec(&command).await {
            Ok(result) if result.success() => {
                let status = result.stdout.trim().to_string();
                tracing::debug!(container, attempt, %status, "container health");
                match status.as_str() {
                    "healthy" => return Ok(ContainerHealth::Healthy),
                    "none" => return Ok(ContainerHealth::NoHealthcheck),
                    "unhealthy" => {
                        let logs = container_logs(session, container).await;
                        return Err(DeployError::ContainerUnhealthy {
                            container: container.to_string(),
                            logs,
                        });
                    }
                    _ => last = status,
                }
            }
            Ok(result) => {
                tracing::debug!(container, attempt, stderr = %result.stderr, "inspect failed");
                last = format!("inspect exited with {}", result.exit_code);
            }
            Err(e) => {
                tracing::debug!(container, attempt, "inspect failed: {}", e);
                last = e.to_string();
            }
        }

        if attempt < settings.attempts {
            sleep(settings.interval).await;
        }
    }

    match settings.on_indeterminate {
        IndeterminateHealth::Proceed => Ok(ContainerHealth::Undetermined { last }),
        IndeterminateHealth::Fail => Err(DeployError::ContainerHealthUnknown {
            container: container.to_string(),
            attempts: settings.attempts,
            last,
        }),
    }
}

async fn container_logs<S: RemoteShell + ?Sized>(session: &S, container: &str) -> String {
    let command = format!(
        "docker logs --tail {} {} 2>&1",
        LOG_TAIL_LINES,
        escape(container.into())
    );
    match session.exec(&command).await {
        Ok(result) => result.stdout,
        Err(e) => format!("(could not read logs: {e})"),
    }
}

/// URL probed from the server itself.
pub fn loopback_url(port: u16, endpoint: &str) -> String {
    let endpoint = if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    };
    format!("http://127.0.0.1:{port}{endpoint}")
}

/// Probe `url` from the server until it answers successfully.
///
/// Returns the attempt that succeeded. Every non-zero exit, and every
/// execution error, is a miss.
pub async fn probe_http<S: RemoteShell + ?Sized>(
    session: &S,
    url: &str,
    settings: &HealthProbeSettings,
) -> Result<u32, DeployError> {
    let attempts = settings.retries.max(1);
    let command = format!(
        "curl -fsS -o /dev/null --max-time {} {}",
        settings.request_timeout.as_secs().max(1),
        escape(url.into())
    );

    for attempt in 1..=attempts {
        match session.exec(&command).await {
            Ok(result) if result.success() => return Ok(attempt),
            Ok(result) => {
                tracing::debug!(url, attempt, exit_code = result.exit_code, "health probe missed");
            }
            Err(e) => tracing::debug!(url, attempt, "health probe errored: {}", e),
        }
        if attempt < attempts {
            sleep(settings.interval).await;
        }
    }

    Err(DeployError::HealthCheckFailed {
        url: url.to_string(),
        attempts,
    })
}
