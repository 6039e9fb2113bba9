//! File transfer client
//!
//! Each public operation follows the same shape: open a session, run the
//! operation against `remote_path`, close the session, return the result.

use super::session::{RemoteSession, SessionOpener};
use super::sftp::SftpOpener;
use crate::config::FileTransferConfig;
use crate::error::{Result, ResultExt};
use crate::schema::TableSchema;
use crate::table::{
    column_by_name, empty_batch, read_delimited, stamp_timestamp, with_column, write_delimited,
};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Column stamped on every uploaded row
pub const PROCESSED_DATE_COLUMN: &str = "processed_date";

/// Client for one remote file or directory
pub struct FileTransferClient {
    remote_path: String,
    opener: Arc<dyn SessionOpener>,
    input_schema: Option<TableSchema>,
    output_schema: Option<TableSchema>,
}

impl FileTransferClient {
    /// Client backed by SFTP sessions
    pub fn new(config: FileTransferConfig) -> Result<Self> {
        config.check()?;
        let remote_path = config.remote_path.clone();
        Ok(Self::with_opener(remote_path, Arc::new(SftpOpener::new(config))))
    }

    /// Client backed by any session opener
    pub fn with_opener(remote_path: impl Into<String>, opener: Arc<dyn SessionOpener>) -> Self {
        Self {
            remote_path: remote_path.into(),
            opener,
            input_schema: None,
            output_schema: None,
        }
    }

    /// Validate downloaded CSV data against `schema`
    #[must_use]
    pub fn with_input_schema(mut self, schema: TableSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Validate and reorder uploaded data to `schema`
    #[must_use]
    pub fn with_output_schema(mut self, schema: TableSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn input_schema(&self) -> Option<&TableSchema> {
        self.input_schema.as_ref()
    }

    pub fn output_schema(&self) -> Option<&TableSchema> {
        self.output_schema.as_ref()
    }

    /// Names of the entries in `remote_path`, in server order
    pub async fn list_filenames(&self) -> Result<Vec<String>> {
        let mut session = self.opener.open().await?;
        let result = session
            .list(&self.remote_path)
            .await
            .map(|entries| entries.into_iter().map(|e| e.name).collect::<Vec<_>>());
        self.close(session, "list").await;

        let names = result?;
        debug!("Listed {} entries in {}", names.len(), self.remote_path);
        Ok(names)
    }

    /// Whether `remote_path` exists
    ///
    /// A missing path is `false`; other failures are errors.
    pub async fn file_exists(&self) -> Result<bool> {
        let mut session = self.opener.open().await?;
        let result = self.exists_in(session.as_mut()).await;
        self.close(session, "stat").await;
        result
    }

    /// Read `remote_path` as delimited text with a header row
    ///
    /// A missing file gives an empty batch: the input schema's columns when
    /// one is set, otherwise no columns.
    pub async fn download_csv(&self, separator: u8) -> Result<RecordBatch> {
        let mut session = self.opener.open().await?;
        let result = self.read_if_exists(session.as_mut()).await;
        self.close(session, "download").await;

        match result? {
            Some(bytes) => {
                let batch = read_delimited(&bytes, separator, self.input_schema.as_ref())?;
                info!(
                    "Downloaded {} row(s) from {}",
                    batch.num_rows(),
                    self.remote_path
                );
                Ok(batch)
            }
            None => Ok(empty_batch(self.input_schema.as_ref())),
        }
    }

    /// Copy `remote_path` to `<cwd>/<local_name>.<ext>`
    ///
    /// `<ext>` is the remote file's extension; without one no suffix is added.
    pub async fn download_file(&self, local_name: &str) -> Result<PathBuf> {
        let dir = std::env::current_dir()?;
        self.download_file_to(&dir, local_name).await
    }

    /// Copy `remote_path` to `<dir>/<local_name>.<ext>`
    pub async fn download_file_to(&self, dir: &Path, local_name: &str) -> Result<PathBuf> {
        let local_path = dir.join(local_file_name(&self.remote_path, local_name));

        let mut session = self.opener.open().await?;
        let result = session.read(&self.remote_path).await;
        self.close(session, "download").await;
        let bytes = result?;

        tokio::fs::write(&local_path, &bytes)
            .await
            .with_context(|| format!("Failed to write local file '{}'", local_path.display()))?;

        info!("Moved {} to {}", self.remote_path, local_path.display());
        Ok(local_path)
    }

    /// Stamp, validate and write `data` to `remote_path` as comma-separated text
    pub async fn upload_csv(&self, data: &RecordBatch) -> Result<()> {
        self.upload_csv_with_separator(data, b',').await
    }

    /// Stamp, validate and write `data` to `remote_path`
    ///
    /// Every row gets the current UTC time in `processed_date`. With an output
    /// schema the columns become exactly the schema's columns, followed by
    /// `processed_date` unless the schema places it itself.
    pub async fn upload_csv_with_separator(&self, data: &RecordBatch, separator: u8) -> Result<()> {
        let prepared = self.prepare_upload(data)?;
        let bytes = write_delimited(&prepared, separator)?;

        let mut session = self.opener.open().await?;
        let result = session.write(&self.remote_path, &bytes).await;
        self.close(session, "upload").await;
        result?;

        info!(
            "Uploaded {} row(s) to {}",
            prepared.num_rows(),
            self.remote_path
        );
        Ok(())
    }

    fn prepare_upload(&self, data: &RecordBatch) -> Result<RecordBatch> {
        let stamped = stamp_timestamp(data, PROCESSED_DATE_COLUMN, Utc::now())?;

        let Some(schema) = &self.output_schema else {
            return Ok(stamped);
        };

        let validated = schema.validate_batch(&stamped)?;
        if schema.contains(PROCESSED_DATE_COLUMN) {
            return Ok(validated);
        }

        match column_by_name(&stamped, PROCESSED_DATE_COLUMN) {
            Some((field, column)) => with_column(&validated, field, column),
            None => Ok(validated),
        }
    }

    async fn exists_in(&self, session: &mut dyn RemoteSession) -> Result<bool> {
        match session.stat(&self.remote_path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                warn!("The remote path '{}' does not exist", self.remote_path);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn read_if_exists(&self, session: &mut dyn RemoteSession) -> Result<Option<Vec<u8>>> {
        if !self.exists_in(session).await? {
            return Ok(None);
        }
        session.read(&self.remote_path).await.map(Some)
    }

    async fn close(&self, mut session: Box<dyn RemoteSession>, operation: &str) {
        if let Err(e) = session.close().await {
            warn!(
                "Failed to close session to {} after {}: {}",
                self.opener.describe(),
                operation,
                e
            );
        }
    }
}

impl std::fmt::Debug for FileTransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransferClient")
            .field("endpoint", &self.opener.describe())
            .field("remote_path", &self.remote_path)
            .field("input_schema", &self.input_schema.as_ref().map(TableSchema::display_name))
            .field("output_schema", &self.output_schema.as_ref().map(TableSchema::display_name))
            .finish()
    }
}

/// `<local_name>.<ext>` with the remote file's extension
pub(crate) fn local_file_name(remote_path: &str, local_name: &str) -> String {
    match Path::new(remote_path).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{local_name}.{ext}"),
        None => local_name.to_string(),
    }
}
