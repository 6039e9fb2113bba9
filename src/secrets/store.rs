//! Secret store trait and implementations

use crate::error::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Named secret storage
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store `value` under `name`
    ///
    /// With `overwrite` false an existing entry is an error.
    async fn save(&self, name: &str, value: &SecretString, overwrite: bool) -> Result<()>;

    /// Fetch the value stored under `name`
    async fn load(&self, name: &str) -> Result<Option<SecretString>>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, mostly for tests and dry runs
#[derive(Default)]
pub struct InMemorySecretStore {
    entries: Mutex<HashMap<String, SecretString>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn save(&self, name: &str, value: &SecretString, overwrite: bool) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if !overwrite && entries.contains_key(name) {
            return Err(Error::secret_store(format!(
                "Secret '{name}' already exists"
            )));
        }
        entries.insert(
            name.to_string(),
            SecretString::from(value.expose_secret().to_owned()),
        );
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<SecretString>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(name)
            .map(|s| SecretString::from(s.expose_secret().to_owned())))
    }
}

impl std::fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySecretStore").finish_non_exhaustive()
    }
}

// ============================================================================
// File store
// ============================================================================

/// Secrets kept in one JSON document mapping names to values
///
/// The file is rewritten on every save and restricted to the owner on unix.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::secret_store(format!(
                    "Secret file '{}' is not a JSON object: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::secret_store(format!(
                "Failed to read secret file '{}': {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let body = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, body).await.map_err(|e| {
            Error::secret_store(format!(
                "Failed to write secret file '{}': {e}",
                self.path.display()
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, permissions).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn save(&self, name: &str, value: &SecretString, overwrite: bool) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read_all().await?;
        if !overwrite && entries.contains_key(name) {
            return Err(Error::secret_store(format!(
                "Secret '{name}' already exists"
            )));
        }
        entries.insert(name.to_string(), value.expose_secret().to_owned());
        self.write_all(&entries).await?;

        debug!("Stored secret '{}' in {}", name, self.path.display());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<SecretString>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        Ok(entries.remove(name).map(SecretString::from))
    }
}
