// ABOUTME: SSH module for configuring remote servers.
// ABOUTME: Stateful session with command execution, SFTP uploads, and a reachability probe.

mod client;
mod error;
mod probe;
mod sftp;
mod shell;

pub use client::{
    Auth, Credentials, ExecResult, RenderedTemplate, Session, SessionConfig, SessionState,
};
pub use error::{Error, Result};
pub use probe::ReachabilityOptions;
pub use shell::RemoteShell;
