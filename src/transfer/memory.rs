//! In-memory remote
//!
//! Files live in a shared map keyed by absolute path; directories exist
//! implicitly as prefixes of stored paths. Clones share the same files, so a
//! test can keep one handle and give another to the client.

use super::session::{RemoteEntry, RemoteMetadata, RemoteSession, SessionOpener};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Shared {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Shared {
    fn files(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remote file system kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    shared: Arc<Shared>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file, replacing any previous contents
    pub fn insert(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.shared.files().insert(normalize(path), contents.into());
    }

    /// Contents of a stored file
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.shared.files().get(&normalize(path)).cloned()
    }

    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.shared.files().remove(&normalize(path))
    }

    /// Every stored file path, sorted
    pub fn paths(&self) -> Vec<String> {
        self.shared.files().keys().cloned().collect()
    }

    /// Sessions opened so far
    pub fn sessions_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    pub fn sessions_closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionOpener for MemoryRemote {
    async fn open(&self) -> Result<Box<dyn RemoteSession>> {
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
            open: true,
        }))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

struct MemorySession {
    shared: Arc<Shared>,
    open: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::sftp("Session is closed"))
        }
    }
}

#[async_trait]
impl RemoteSession for MemorySession {
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.ensure_open()?;
        let dir = normalize(path);
        let prefix = if dir == "/" { dir.clone() } else { format!("{dir}/") };
        let files = self.shared.files();

        if files.contains_key(&dir) {
            return Err(Error::sftp(format!("Failed to list {dir}: not a directory")));
        }

        let mut entries: Vec<RemoteEntry> = Vec::new();
        for (path, contents) in files.iter() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                Some((sub, _)) => RemoteEntry {
                    name: sub.to_string(),
                    is_dir: true,
                    size: None,
                },
                None => RemoteEntry {
                    name: rest.to_string(),
                    is_dir: false,
                    size: Some(contents.len() as u64),
                },
            };
            if !entries.iter().any(|e| e.name == entry.name) {
                entries.push(entry);
            }
        }

        if entries.is_empty() && dir != "/" {
            return Err(Error::remote_not_found(dir));
        }
        Ok(entries)
    }

    async fn stat(&mut self, path: &str) -> Result<RemoteMetadata> {
        self.ensure_open()?;
        let path = normalize(path);
        let files = self.shared.files();

        if let Some(contents) = files.get(&path) {
            return Ok(RemoteMetadata {
                is_dir: false,
                size: Some(contents.len() as u64),
            });
        }

        let prefix = format!("{}/", path.trim_end_matches('/'));
        if path == "/" || files.keys().any(|p| p.starts_with(&prefix)) {
            return Ok(RemoteMetadata {
                is_dir: true,
                size: None,
            });
        }

        Err(Error::remote_not_found(path))
    }

    async fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let path = normalize(path);
        self.shared
            .files()
            .get(&path)
            .cloned()
            .ok_or_else(|| Error::remote_not_found(path))
    }

    async fn write(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.shared.files().insert(normalize(path), contents.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Absolute path with single separators and no trailing slash
fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    format!("/{}", parts.join("/"))
}
