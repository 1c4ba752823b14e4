// ABOUTME: File transfer over an SFTP subsystem channel of an SSH connection.
// ABOUTME: Upload with permissions, existence checks, and recursive directory creation.

use super::client::SshHandler;
use super::error::{Error, Result};
use russh::client::Handle;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::FileAttributes;
use tokio::io::AsyncWriteExt;

/// Open the SFTP subsystem on a fresh channel of `handle`.
pub(super) async fn open(handle: &Handle<SshHandler>) -> Result<SftpSession> {
    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| Error::Channel(format!("failed to open SFTP channel: {}", e)))?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| Error::Sftp(format!("subsystem request refused: {}", e)))?;
    SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| Error::Sftp(e.to_string()))
}

pub(super) async fn write_file(
    sftp: &SftpSession,
    path: &str,
    content: &[u8],
    mode: Option<u32>,
) -> Result<()> {
    let mut file = sftp
        .create(path)
        .await
        .map_err(|e| Error::Sftp(format!("{}: {}", path, e)))?;
    file.write_all(content).await?;
    file.shutdown().await?;

    if let Some(mode) = mode {
        let attrs = FileAttributes {
            permissions: Some(mode),
            ..Default::default()
        };
        sftp.set_metadata(path, attrs)
            .await
            .map_err(|e| Error::Sftp(format!("chmod {:o} {}: {}", mode, path, e)))?;
    }
    Ok(())
}

/// Any failure to stat counts as absent.
pub(super) async fn exists(sftp: &SftpSession, path: &str) -> bool {
    sftp.metadata(path).await.is_ok()
}

pub(super) async fn create_dir_all(sftp: &SftpSession, path: &str) -> Result<()> {
    for prefix in prefixes(path) {
        if exists(sftp, &prefix).await {
            continue;
        }
        sftp.create_dir(prefix.as_str())
            .await
            .map_err(|e| Error::Sftp(format!("mkdir {}: {}", prefix, e)))?;
    }
    Ok(())
}

/// Every ancestor of `path` and `path` itself, shortest first.
fn prefixes(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut out = Vec::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        out.push(current.clone());
    }
    out
}
