//! Remote session traits

use crate::error::Result;
use async_trait::async_trait;

/// One directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name, without the directory part
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
}

/// Attributes of a remote path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub is_dir: bool,
    pub size: Option<u64>,
}

/// An open file-transfer session
///
/// A missing path is reported as `Error::RemoteNotFound` by every method.
#[async_trait]
pub trait RemoteSession: Send {
    /// Entries of a directory, without `.` and `..`
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Attributes of a path
    async fn stat(&mut self, path: &str) -> Result<RemoteMetadata>;

    /// Whole contents of a file
    async fn read(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Replace the contents of a file, creating it if needed
    async fn write(&mut self, path: &str, contents: &[u8]) -> Result<()>;

    /// End the session
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions against one endpoint
#[async_trait]
pub trait SessionOpener: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RemoteSession>>;

    /// Endpoint description for log messages
    fn describe(&self) -> String;
}
