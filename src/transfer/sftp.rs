//! SFTP sessions over russh
//!
//! Password authentication only. When the config carries a host key
//! fingerprint the server key must match it; otherwise any key is accepted
//! and its fingerprint is logged.

use super::session::{RemoteEntry, RemoteMetadata, RemoteSession, SessionOpener};
use crate::config::FileTransferConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use russh::client::{self, Config, Handle, Handler};
use russh::keys::{HashAlg, PublicKey};
use russh::Disconnect;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{OpenFlags, StatusCode};
use secrecy::ExposeSecret;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Opens password-authenticated SFTP sessions
pub struct SftpOpener {
    config: FileTransferConfig,
    ssh_config: Arc<Config>,
}

impl SftpOpener {
    pub fn new(config: FileTransferConfig) -> Self {
        let ssh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(600)),
            ..Default::default()
        };

        Self {
            config,
            ssh_config: Arc::new(ssh_config),
        }
    }

    async fn establish(&self) -> Result<SftpRemoteSession> {
        let host = self.config.host.as_str();
        let port = self.config.port;

        let handler = HostKeyCheck {
            host: format!("{host}:{port}"),
            expected: self.config.host_key_fingerprint.clone(),
        };

        let mut handle = client::connect(self.ssh_config.clone(), (host, port), handler)
            .await
            .map_err(|e| Error::sftp(format!("SSH handshake failed for {host}:{port}: {e}")))?;

        let auth = handle
            .authenticate_password(
                self.config.username.as_str(),
                self.config.password.expose_secret(),
            )
            .await
            .map_err(|e| Error::sftp(format!("Password authentication failed: {e}")))?;

        if !auth.success() {
            return Err(Error::sftp(format!(
                "Authentication rejected by {host}:{port} for user {}",
                self.config.username
            )));
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::sftp(format!("Failed to open channel: {e}")))?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::sftp(format!("Failed to request SFTP subsystem: {e}")))?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::sftp(format!("Failed to initialize SFTP session: {e}")))?;

        debug!("Opened SFTP session to {}:{}", host, port);
        Ok(SftpRemoteSession { handle, sftp })
    }
}

#[async_trait]
impl SessionOpener for SftpOpener {
    async fn open(&self) -> Result<Box<dyn RemoteSession>> {
        let limit = self.config.connect_timeout();
        match timeout(limit, self.establish()).await {
            Ok(session) => Ok(Box::new(session?)),
            Err(_) => Err(Error::sftp(format!(
                "Timed out after {:?} connecting to {}",
                limit,
                self.describe()
            ))),
        }
    }

    fn describe(&self) -> String {
        format!(
            "sftp://{}@{}:{}",
            self.config.username, self.config.host, self.config.port
        )
    }
}

impl std::fmt::Debug for SftpOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpOpener")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Host key check
// ============================================================================

struct HostKeyCheck {
    host: String,
    expected: Option<String>,
}

impl Handler for HostKeyCheck {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = std::result::Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();

        let accepted = match &self.expected {
            Some(expected) if expected.trim() == fingerprint => true,
            Some(expected) => {
                warn!(
                    "Host key mismatch for {}: expected {}, got {}",
                    self.host,
                    expected.trim(),
                    fingerprint
                );
                false
            }
            None => {
                debug!("Accepting host key {} for {}", fingerprint, self.host);
                true
            }
        };

        async move { Ok(accepted) }
    }
}

// ============================================================================
// Session
// ============================================================================

struct SftpRemoteSession {
    handle: Handle<HostKeyCheck>,
    sftp: SftpSession,
}

#[async_trait]
impl RemoteSession for SftpRemoteSession {
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(path, "list", e))?;

        Ok(entries
            .filter(|entry| {
                let name = entry.file_name();
                name != "." && name != ".."
            })
            .map(|entry| {
                let metadata = entry.metadata();
                RemoteEntry {
                    name: entry.file_name(),
                    is_dir: metadata.is_dir(),
                    size: metadata.size,
                }
            })
            .collect())
    }

    async fn stat(&mut self, path: &str) -> Result<RemoteMetadata> {
        let metadata = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(path, "stat", e))?;

        Ok(RemoteMetadata {
            is_dir: metadata.is_dir(),
            size: metadata.size,
        })
    }

    async fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        self.sftp
            .read(path)
            .await
            .map_err(|e| map_sftp_error(path, "read", e))
    }

    async fn write(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let mut file = self
            .sftp
            .open_with_flags(
                path,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            )
            .await
            .map_err(|e| map_sftp_error(path, "open", e))?;

        file.write_all(contents)
            .await
            .map_err(|e| Error::sftp(format!("Failed to write {path}: {e}")))?;
        file.shutdown()
            .await
            .map_err(|e| Error::sftp(format!("Failed to finish writing {path}: {e}")))?;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self
            .sftp
            .close()
            .await
            .map_err(|e| Error::sftp(format!("Failed to close SFTP session: {e}")));

        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| Error::sftp(format!("Failed to disconnect: {e}")))?;

        closed
    }
}

fn map_sftp_error(path: &str, action: &str, error: SftpError) -> Error {
    match error {
        SftpError::Status(status) if matches!(status.status_code, StatusCode::NoSuchFile) => {
            Error::remote_not_found(path)
        }
        other => Error::sftp(format!("Failed to {action} {path}: {other}")),
    }
}
