// ABOUTME: Connection-independent SSH reachability probe.
// ABOUTME: Retries a TCP connect plus identification banner read until success or timeout.

use super::client::Session;
use super::error::{Error, Result};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Upper bound on a single probe attempt.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Options for [`Session::wait_for_ssh`].
pub struct ReachabilityOptions<'a> {
    pub port: u16,
    pub timeout: Duration,
    pub retry_interval: Duration,
    /// Pause after the first successful probe. sshd accepts connections a
    /// moment before it can authenticate them.
    pub grace_period: Duration,
    /// Called after each failed attempt with the attempt number and reason.
    pub on_retry: Option<&'a (dyn Fn(u32, &str) + Send + Sync)>,
}

impl Default for ReachabilityOptions<'_> {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(300),
            retry_interval: Duration::from_secs(5),
            grace_period: Duration::from_secs(5),
            on_retry: None,
        }
    }
}

impl Session {
    /// Wait until `host` answers with an SSH identification banner.
    pub async fn wait_for_ssh(host: &str, options: &ReachabilityOptions<'_>) -> Result<()> {
        let attempts = async {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match probe(host, options.port).await {
                    Ok(banner) => {
                        tracing::debug!(host, attempt, %banner, "SSH reachable");
                        return;
                    }
                    Err(reason) => {
                        tracing::debug!(host, attempt, %reason, "SSH not reachable yet");
                        if let Some(on_retry) = options.on_retry {
                            on_retry(attempt, &reason);
                        }
                    }
                }
                sleep(options.retry_interval).await;
            }
        };

        if timeout(options.timeout, attempts).await.is_err() {
            return Err(Error::Unreachable {
                host: host.to_string(),
                port: options.port,
                timeout: options.timeout,
            });
        }

        if !options.grace_period.is_zero() {
            sleep(options.grace_period).await;
        }
        Ok(())
    }
}

/// One attempt: connect and read the server's identification line.
async fn probe(host: &str, port: u16) -> std::result::Result<String, String> {
    let attempt = async {
        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| e.to_string())?;

        let mut buf = [0u8; 256];
        let mut len = 0;
        while len < buf.len() {
            let n = stream
                .read(&mut buf[len..])
                .await
                .map_err(|e| e.to_string())?;
            if n == 0 {
                break;
            }
            len += n;
            if buf[..len].contains(&b'\n') {
                break;
            }
        }

        let banner = String::from_utf8_lossy(&buf[..len]);
        let banner = banner.lines().next().unwrap_or_default().trim();
        if banner.starts_with("SSH-") {
            Ok(banner.to_string())
        } else if banner.is_empty() {
            Err("connection closed before identification".to_string())
        } else {
            Err(format!("unexpected identification: {banner}"))
        }
    };

    match timeout(PROBE_TIMEOUT, attempt).await {
        Ok(result) => result,
        Err(_) => Err("probe timed out".to_string()),
    }
}
