//! File transfer connector
//!
//! Download, upload, list and existence checks against one remote path over
//! SFTP. Every operation opens its own session and closes it before
//! returning, whether the operation succeeded or not.
//!
//! The session is reached through the `SessionOpener` seam: `SftpOpener` talks
//! to a real server, `MemoryRemote` keeps files in memory for tests and dry
//! runs.

mod client;
mod memory;
mod session;
mod sftp;

pub use client::{FileTransferClient, PROCESSED_DATE_COLUMN};
pub use memory::MemoryRemote;
pub use session::{RemoteEntry, RemoteMetadata, RemoteSession, SessionOpener};
pub use sftp::SftpOpener;
