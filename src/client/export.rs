//! Export job submission and status polling

use chrono::Utc;
use tracing::{debug, info, warn};

use super::ZuoraClient;
use crate::error::{Error, Result};
use crate::export::{ExportJob, ExportRequest, ExportStatus, PollOutcome, interpret_status};
use crate::types::{ExportId, FileId, OperationKind};

impl ZuoraClient {
    /// Run an export and wait for its file
    ///
    /// Creates the export job, then polls its status every poll interval until
    /// the server reports a file, reports a failure, or the try ceiling is
    /// reached. No sleep follows the last permitted poll.
    ///
    /// # Errors
    ///
    /// - [`Error::ExportSubmission`] if the job could not be created
    /// - [`Error::ExportFailed`] if the server ended the job without a file
    /// - [`Error::ExportTimeout`] if `max_tries` polls passed without completion
    /// - Transport and authentication errors from the status queries as-is
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use zuora_toolkit::{ZuoraClient, export::ExportRequest, DownloadTarget};
    /// # async fn example(client: &ZuoraClient) -> zuora_toolkit::Result<()> {
    /// let request = ExportRequest::new("Invoice", ["Id", "Amount", "Balance"])
    ///     .filter("Status = 'Posted'")
    ///     .max_tries(120);
    /// let file_id = client.export(request).await?;
    /// let records = client.download(&file_id, DownloadTarget::InMemory).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn export(&self, request: ExportRequest) -> Result<FileId> {
        let mut job = ExportJob::new(&request, Utc::now())?;
        let export_id = self.submit_export(&job).await?;
        job.submitted(export_id);
        self.poll_export(&mut job, &request).await
    }

    async fn submit_export(&self, job: &ExportJob) -> Result<ExportId> {
        let transport = &self.transport;
        let results = self
            .dispatch(OperationKind::Create, |options| async move {
                transport
                    .create(&options, vec![job.to_zobject()])
                    .await
                    .map_err(|e| Error::ExportSubmission(e.to_string()))
            })
            .await?;

        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| Error::ExportSubmission("create returned no result".to_string()))?;

        match result.id {
            Some(id) if result.success && !id.is_empty() => {
                info!(export_id = %id, name = %job.name, query = %job.query, "export submitted");
                Ok(ExportId(id))
            }
            _ => {
                let reasons: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
                warn!(name = %job.name, errors = ?reasons, "export rejected");
                Err(Error::ExportSubmission(if reasons.is_empty() {
                    "export was not created".to_string()
                } else {
                    reasons.join("; ")
                }))
            }
        }
    }

    async fn poll_export(&self, job: &mut ExportJob, request: &ExportRequest) -> Result<FileId> {
        let interval = request
            .poll_interval
            .unwrap_or(self.config.export.poll_interval);
        let max_tries = request.max_tries.or(self.config.export.max_tries);
        let status_query = job.status_query()?;
        let export_id = job.id.as_ref().map(ToString::to_string).unwrap_or_default();

        let mut tries = 0u32;
        loop {
            tries += 1;
            job.status = ExportStatus::Polling { tries };

            let result = self.query(&status_query).await?;
            match interpret_status(&result) {
                PollOutcome::Completed(file_id) => {
                    info!(export_id = %export_id, file_id = %file_id, tries, "export completed");
                    job.status = ExportStatus::Completed {
                        file_id: file_id.clone(),
                    };
                    return Ok(file_id);
                }
                PollOutcome::Failed(status) => {
                    warn!(export_id = %export_id, status = %status, tries, "export failed");
                    job.status = ExportStatus::Failed {
                        status: status.clone(),
                    };
                    return Err(Error::ExportFailed { export_id, status });
                }
                PollOutcome::Pending(status) => {
                    debug!(export_id = %export_id, status = ?status, tries, "export not ready");
                }
            }

            if max_tries.is_some_and(|max| tries >= max) {
                warn!(export_id = %export_id, tries, "export did not complete, giving up");
                job.status = ExportStatus::TimedOut { tries };
                return Err(Error::ExportTimeout { export_id, tries });
            }

            debug!(export_id = %export_id, interval = ?interval, "waiting before next poll");
            tokio::time::sleep(interval).await;
        }
    }
}
