//! Export jobs and exported files
//!
//! An export is an `Export` object whose `Query` the server runs in the
//! background. The client creates it, polls its status with a ZOQL query until
//! a `FileId` appears, and then downloads the file from the file endpoint.
//! This module holds the pieces that do not talk to the network: job naming,
//! status interpretation, file URLs, persisting and parsing.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{DownloadError, Error, Result};
use crate::query::{escape_value, select_statement};
use crate::types::{ExportId, FileId, ObjectType, QueryResult, ZObject};

/// Output format requested for every export
pub const EXPORT_FORMAT: &str = "csv";

/// Extension of persisted export files
pub const EXPORT_EXTENSION: &str = "csv";

/// Path of the authenticated file endpoint, relative to the API host
pub const FILE_ENDPOINT_PATH: &str = "/apps/api/file/";

/// What to export
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Object to export (e.g., Account, Invoice)
    pub object: ObjectType,
    /// Fields to select, in output column order
    pub fields: Vec<String>,
    /// ZOQL search conditions without the `WHERE` keyword
    #[serde(default)]
    pub filter: Option<String>,
    /// Override of the configured poll interval, in whole seconds
    #[serde(default, with = "crate::config::duration_serde::option")]
    pub poll_interval: Option<Duration>,
    /// Override of the configured maximum number of status polls
    #[serde(default)]
    pub max_tries: Option<u32>,
}

impl ExportRequest {
    /// Export `fields` of every `object` record
    pub fn new<S: Into<String>>(
        object: impl Into<ObjectType>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            object: object.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            filter: None,
            poll_interval: None,
            max_tries: None,
        }
    }

    /// Restrict the export with search conditions
    pub fn filter(mut self, conditions: impl Into<String>) -> Self {
        self.filter = Some(conditions.into());
        self
    }

    /// Poll every `interval` instead of the configured interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Give up after `tries` status polls
    pub fn max_tries(mut self, tries: u32) -> Self {
        self.max_tries = Some(tries);
        self
    }

    /// ZOQL query run by the export job
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty object name, an empty field
    /// list, or `max_tries == Some(0)`.
    pub fn query(&self) -> Result<String> {
        if self.object.as_str().trim().is_empty() {
            return Err(Error::validation("object", "export object must not be empty"));
        }
        let fields: Vec<&str> = self
            .fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            return Err(Error::validation("fields", "export needs at least one field"));
        }
        if self.max_tries == Some(0) {
            return Err(Error::validation("max_tries", "max_tries must be at least 1 when set"));
        }
        Ok(select_statement(
            &fields.join(", "),
            &self.object,
            self.filter.as_deref().unwrap_or_default(),
        ))
    }
}

/// Lifecycle of an export job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportStatus {
    /// Built locally, not yet created on the server
    New,
    /// Created on the server
    Submitted,
    /// Status has been polled `tries` times without a terminal answer
    Polling {
        /// Polls so far
        tries: u32,
    },
    /// The job produced a file
    Completed {
        /// File to download
        file_id: FileId,
    },
    /// The server reported a terminal failure
    Failed {
        /// Status reported by the server
        status: String,
    },
    /// Polling stopped at the try ceiling
    TimedOut {
        /// Polls performed
        tries: u32,
    },
}

/// A single export job and its progress
#[derive(Clone, Debug)]
pub struct ExportJob {
    /// Generated job name: object name followed by the creation timestamp
    pub name: String,
    /// ZOQL query the server runs
    pub query: String,
    /// Output format
    pub format: String,
    /// Remote id, once created
    pub id: Option<ExportId>,
    /// Current status
    pub status: ExportStatus,
}

impl ExportJob {
    /// Build a job for `request` created at `now`
    pub fn new(request: &ExportRequest, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            name: job_name(&request.object, now),
            query: request.query()?,
            format: EXPORT_FORMAT.to_string(),
            id: None,
            status: ExportStatus::New,
        })
    }

    /// `Export` object sent to `create`
    pub fn to_zobject(&self) -> ZObject {
        ZObject::new(ObjectType::Export)
            .with_field("Name", self.name.as_str())
            .with_field("Query", self.query.as_str())
            .with_field("Format", self.format.as_str())
    }

    /// Record the id assigned by the server
    pub fn submitted(&mut self, id: ExportId) {
        self.id = Some(id);
        self.status = ExportStatus::Submitted;
    }

    /// Status query for this job
    ///
    /// # Errors
    ///
    /// Fails if the job has not been submitted.
    pub fn status_query(&self) -> Result<String> {
        let id = self.id.as_ref().ok_or_else(|| {
            Error::ExportSubmission(format!("export {} has no remote id", self.name))
        })?;
        Ok(status_query(id))
    }
}

/// `<Object><unix-seconds>.<micros>`
fn job_name(object: &ObjectType, now: DateTime<Utc>) -> String {
    format!(
        "{}{}.{:06}",
        object,
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

/// ZOQL query reporting an export's progress
pub fn status_query(id: &ExportId) -> String {
    format!(
        "SELECT Status, FileId, Query, Size FROM Export WHERE Id = '{}'",
        escape_value(&id.0)
    )
}

/// What one status poll says about the job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep polling; carries the reported status when there was one
    Pending(Option<String>),
    /// The file is ready
    Completed(FileId),
    /// The job ended without a file
    Failed(String),
}

/// Interpret the result of a status query
///
/// Anything other than a finished result with exactly one record counts as
/// pending.
pub fn interpret_status(result: &QueryResult) -> PollOutcome {
    if !result.done || result.size != 1 || result.records.len() != 1 {
        return PollOutcome::Pending(None);
    }
    let record = &result.records[0];
    let status = record.get_str("Status").unwrap_or_default();

    match status {
        "Completed" => match record.get_str("FileId").filter(|id| !id.is_empty()) {
            Some(file_id) => PollOutcome::Completed(FileId::from(file_id)),
            None => PollOutcome::Failed("Completed without FileId".to_string()),
        },
        "Failed" | "Cancelled" => PollOutcome::Failed(status.to_string()),
        other => PollOutcome::Pending(Some(other.to_string())),
    }
}

/// URL of an exported file on the host serving `endpoint`
///
/// Only the scheme, host and port of the endpoint are kept.
pub fn file_url(endpoint: &Url, file_id: &FileId) -> Url {
    let mut url = endpoint.clone();
    url.set_path(&format!(
        "{}{}",
        FILE_ENDPOINT_PATH,
        urlencoding::encode(file_id.as_str())
    ));
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Paths written for a persisted export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedExport {
    /// `<dir>/<name>.csv`
    pub path: PathBuf,
    /// Timestamped copy next to it
    pub backup: PathBuf,
}

/// Backup suffix: `<year>_<day>_<month>_<hour>_<minute>`, unpadded
pub fn backup_stamp(now: DateTime<Local>) -> String {
    now.format("%Y_%-d_%-m_%-H_%-M").to_string()
}

/// Write an export to `<dir>/<name>.csv` and copy it to the timestamped backup
pub async fn write_export(
    dir: &Path,
    name: &str,
    contents: &[u8],
    now: DateTime<Local>,
) -> Result<PersistedExport> {
    let path = dir.join(format!("{name}.{EXPORT_EXTENSION}"));
    let backup = dir.join(format!("{name}.{}.{EXPORT_EXTENSION}", backup_stamp(now)));

    let write_failed = |path: &Path, e: std::io::Error| {
        Error::from(DownloadError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| write_failed(dir, e))?;
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| write_failed(path.as_path(), e))?;
    tokio::fs::copy(&path, &backup)
        .await
        .map_err(|e| write_failed(backup.as_path(), e))?;

    info!(
        path = %path.display(),
        backup = %backup.display(),
        bytes = contents.len(),
        "export written"
    );

    Ok(PersistedExport { path, backup })
}

/// Rows of an exported file, keyed by column name
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedRecordSet {
    /// Column names in file order
    pub headers: Vec<String>,
    /// Rows in file order
    pub rows: Vec<BTreeMap<String, String>>,
}

impl ExportedRecordSet {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the file had only a header (or nothing)
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.rows.iter().map(move |row| row.get(name).map(String::as_str))
    }
}

/// Parse a downloaded export: a header row followed by records
///
/// Blank lines are ignored. Every record must have as many fields as the
/// header; otherwise nothing is returned.
pub fn parse_records(file_id: &FileId, contents: &[u8]) -> Result<ExportedRecordSet> {
    let parse_error = |e: csv::Error| Error::Parse {
        file_id: file_id.to_string(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(contents);

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        rows.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }

    debug!(file_id = %file_id, columns = headers.len(), rows = rows.len(), "export parsed");
    Ok(ExportedRecordSet { headers, rows })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn completed(file_id: Option<&str>) -> QueryResult {
        crate::test_helpers::export_status("Completed", file_id)
    }

    #[test]
    fn poll_interval_reads_as_seconds_like_the_config() {
        let request: ExportRequest = serde_json::from_str(
            r#"{"object": "Invoice", "fields": ["Id"], "poll_interval": 2}"#,
        )
        .unwrap();
        assert_eq!(request.poll_interval, Some(Duration::from_secs(2)));

        let json = serde_json::to_value(request.poll_interval(Duration::from_secs(30))).unwrap();
        assert_eq!(json["poll_interval"], serde_json::json!(30));

        let unset: ExportRequest =
            serde_json::from_str(r#"{"object": "Invoice", "fields": ["Id"]}"#).unwrap();
        assert_eq!(unset.poll_interval, None);
    }

    #[test]
    fn query_selects_fields_with_optional_filter() {
        let request = ExportRequest::new(ObjectType::Account, ["Id", "Name"]);
        assert_eq!(request.query().unwrap(), "SELECT Id, Name FROM Account");

        let request = request.filter("Status = 'Active'");
        assert_eq!(
            request.query().unwrap(),
            "SELECT Id, Name FROM Account WHERE Status = 'Active'"
        );
    }

    #[test]
    fn query_without_fields_is_rejected() {
        let request = ExportRequest::new(ObjectType::Invoice, Vec::<String>::new());
        let err = request.query().unwrap_err();
        assert!(matches!(err, Error::Validation { key: Some(ref k), .. } if k == "fields"));
    }

    #[test]
    fn zero_max_tries_is_rejected() {
        let request = ExportRequest::new("Invoice", ["Id"]).max_tries(0);
        assert!(request.query().is_err());
    }

    #[test]
    fn job_is_named_after_object_and_time() {
        let now = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        let request = ExportRequest::new(ObjectType::Invoice, ["Id"]);
        let job = ExportJob::new(&request, now).unwrap();

        assert_eq!(job.name, "Invoice1700000000.250000");
        assert_eq!(job.format, "csv");
        assert_eq!(job.status, ExportStatus::New);

        let object = job.to_zobject();
        assert_eq!(object.object_type, ObjectType::Export);
        assert_eq!(object.get_str("Query"), Some("SELECT Id FROM Invoice"));
        assert_eq!(object.get_str("Format"), Some("csv"));
        assert_eq!(object.get_str("Name"), Some(job.name.as_str()));
    }

    #[test]
    fn status_query_requires_submission() {
        let request = ExportRequest::new(ObjectType::Invoice, ["Id"]);
        let mut job = ExportJob::new(&request, Utc::now()).unwrap();
        assert!(job.status_query().is_err());

        job.submitted(ExportId("2c92c0f9".into()));
        assert_eq!(job.status, ExportStatus::Submitted);
        assert_eq!(
            job.status_query().unwrap(),
            "SELECT Status, FileId, Query, Size FROM Export WHERE Id = '2c92c0f9'"
        );
    }

    #[test]
    fn completed_record_yields_file_id() {
        assert_eq!(
            interpret_status(&completed(Some("2c92a0fd"))),
            PollOutcome::Completed(FileId::from("2c92a0fd"))
        );
    }

    #[test]
    fn unfinished_or_ambiguous_results_are_pending() {
        assert_eq!(interpret_status(&QueryResult::default()), PollOutcome::Pending(None));

        let mut not_done = completed(Some("f"));
        not_done.done = false;
        assert_eq!(interpret_status(&not_done), PollOutcome::Pending(None));

        let mut two_records = completed(Some("f"));
        two_records.records.push(two_records.records[0].clone());
        two_records.size = 2;
        assert_eq!(interpret_status(&two_records), PollOutcome::Pending(None));

        let processing = crate::test_helpers::export_status("Processing", None);
        assert_eq!(
            interpret_status(&processing),
            PollOutcome::Pending(Some("Processing".into()))
        );
    }

    #[test]
    fn failed_and_cancelled_are_terminal() {
        for status in ["Failed", "Cancelled"] {
            let result = crate::test_helpers::export_status(status, None);
            assert_eq!(interpret_status(&result), PollOutcome::Failed(status.into()));
        }
        assert!(matches!(interpret_status(&completed(None)), PollOutcome::Failed(_)));
    }

    #[test]
    fn file_url_keeps_only_scheme_host_and_port() {
        let endpoint = Url::parse("https://apisandbox.zuora.com:8443/apps/services/a/63.0?x=1").unwrap();
        let url = file_url(&endpoint, &FileId::from("2c92a0fd"));
        assert_eq!(url.as_str(), "https://apisandbox.zuora.com:8443/apps/api/file/2c92a0fd");
    }

    #[test]
    fn backup_stamp_is_unpadded() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(backup_stamp(now), "2024_7_3_9_5");
    }

    #[tokio::test]
    async fn write_export_creates_file_and_backup() {
        let dir = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 12, 25, 18, 30, 0).unwrap();

        let written = write_export(dir.path(), "invoices", b"Id,Amount\n1,10\n", now)
            .await
            .unwrap();

        assert_eq!(written.path, dir.path().join("invoices.csv"));
        assert_eq!(written.backup, dir.path().join("invoices.2024_25_12_18_30.csv"));
        let original = tokio::fs::read(&written.path).await.unwrap();
        let backup = tokio::fs::read(&written.backup).await.unwrap();
        assert_eq!(original, b"Id,Amount\n1,10\n");
        assert_eq!(original, backup);
    }

    #[test]
    fn parse_records_maps_rows_by_header() {
        let records = parse_records(
            &FileId::from("f1"),
            b"Account.Name,Account.Balance\r\nAcme,10.00\r\n\r\nGlobex,0\n",
        )
        .unwrap();

        assert_eq!(records.headers, vec!["Account.Name", "Account.Balance"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records.rows[1]["Account.Name"], "Globex");
        let balances: Vec<_> = records.column("Account.Balance").collect();
        assert_eq!(balances, vec![Some("10.00"), Some("0")]);
    }

    #[test]
    fn parse_records_of_header_only_is_empty() {
        let records = parse_records(&FileId::from("f1"), b"Id,Name\n").unwrap();
        assert!(records.is_empty());
        assert_eq!(records.headers.len(), 2);
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let err = parse_records(&FileId::from("f1"), b"Id,Name\n1,Acme,extra\n").unwrap_err();
        match err {
            Error::Parse { file_id, .. } => assert_eq!(file_id, "f1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
