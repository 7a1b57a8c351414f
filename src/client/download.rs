//! Authenticated export file download

use chrono::Local;
use reqwest::header::AUTHORIZATION;
use std::path::PathBuf;
use tracing::{error, info};

use super::ZuoraClient;
use crate::error::{DownloadError, Result};
use crate::export::{ExportedRecordSet, PersistedExport, file_url, parse_records, write_export};
use crate::types::{FileId, OperationKind};

/// Where a downloaded export goes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadTarget {
    /// Write `<directory>/<name>.csv` plus a timestamped backup copy
    Persist {
        /// File name without extension
        name: String,
        /// Target directory; the configured drop directory when `None`
        directory: Option<PathBuf>,
    },
    /// Parse the file and return its rows
    InMemory,
}

impl DownloadTarget {
    /// Persist as `<name>.csv` in the configured drop directory
    pub fn persist(name: impl Into<String>) -> Self {
        DownloadTarget::Persist {
            name: name.into(),
            directory: None,
        }
    }
}

/// Result of a download: files on disk or parsed rows, never both
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Downloaded {
    /// Paths written in persist mode
    Persisted(PersistedExport),
    /// Rows parsed in in-memory mode
    Records(ExportedRecordSet),
}

impl Downloaded {
    /// Parsed rows, if downloaded in memory
    pub fn records(&self) -> Option<&ExportedRecordSet> {
        match self {
            Downloaded::Records(records) => Some(records),
            Downloaded::Persisted(_) => None,
        }
    }

    /// Written paths, if persisted
    pub fn persisted(&self) -> Option<&PersistedExport> {
        match self {
            Downloaded::Persisted(paths) => Some(paths),
            Downloaded::Records(_) => None,
        }
    }
}

impl ZuoraClient {
    /// Download an exported file from the host the session is bound to
    ///
    /// Sends `Authorization: ZSession <token>`. In in-memory mode a file that
    /// cannot be parsed is reported to the fatal-error hook and returned as
    /// [`Error::Parse`](crate::Error::Parse); no partial rows are returned.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Status`] for a non-success response,
    /// [`DownloadError::WriteFailed`] if persisting fails, and network or
    /// authentication errors as-is.
    pub async fn download(&self, file_id: &FileId, target: DownloadTarget) -> Result<Downloaded> {
        let options = self.call_options(OperationKind::Download).await?;

        let url = file_url(&options.endpoint, file_id);
        info!(file_id = %file_id, url = %url, "downloading export");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("ZSession {}", options.session.session))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!(file_id = %file_id, status, "export download failed");
            return Err(DownloadError::Status {
                file_id: file_id.to_string(),
                status,
            }
            .into());
        }

        let contents = response.bytes().await?;

        match target {
            DownloadTarget::Persist { name, directory } => {
                let directory = directory.unwrap_or_else(|| self.config.download.drop_dir.clone());
                let written = write_export(&directory, &name, &contents, Local::now()).await?;
                Ok(Downloaded::Persisted(written))
            }
            DownloadTarget::InMemory => match parse_records(file_id, &contents) {
                Ok(records) => {
                    info!(file_id = %file_id, rows = records.len(), "export loaded");
                    Ok(Downloaded::Records(records))
                }
                Err(e) => {
                    error!(file_id = %file_id, error = %e, "export could not be parsed");
                    if let Some(hook) = &self.fatal_hook {
                        hook(&e);
                    }
                    Err(e)
                }
            },
        }
    }
}
