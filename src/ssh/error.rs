// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, command execution, and file transfer failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    #[error("authentication failed: no valid credentials")]
    AuthenticationFailed,

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("not connected")]
    NotConnected,

    #[error("channel error: {0}")]
    Channel(String),

    #[error("command timed out after {timeout:?}: {command}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("command exited with {exit_code}: {command}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        exit_code: u32,
        stdout: String,
        stderr: String,
    },

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("file transfer failed: {0}")]
    Sftp(String),

    #[error("{host}:{port} not reachable over SSH within {timeout:?}")]
    Unreachable {
        host: String,
        port: u16,
        timeout: Duration,
    },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" ({stderr})")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
