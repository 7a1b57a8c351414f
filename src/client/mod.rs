//! The Zuora API client, split into focused submodules.
//!
//! The `ZuoraClient` struct and its methods are organized by concern:
//! - [`dispatch`] - Session gating and per-call request metadata
//! - [`crud`] - Query, retrieve, create/update/delete, amend and subscribe
//! - [`export`] - Export job submission and status polling
//! - [`download`] - Authenticated export file download

mod crud;
mod dispatch;
mod download;
mod export;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use download::{DownloadTarget, Downloaded};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::batch::{BatchSizes, QueryBatchSize};
use crate::config::{BatchConfig, Config};
use crate::error::{Error, Result};
use crate::session::SessionManager;
use crate::transport::SoapTransport;

/// Callback invoked with errors that end a download without data
pub type FatalErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Client for the Zuora SOAP API
///
/// Owns the session and the batching limits. Every remote call goes through
/// [`ZuoraClient::dispatch`], which logs in first when the session is missing
/// or expired.
pub struct ZuoraClient {
    /// Configuration the client was built with
    pub(crate) config: Arc<Config>,
    /// SOAP collaborator
    pub(crate) transport: Arc<dyn SoapTransport>,
    /// Session state; login and header snapshots happen under this lock
    pub(crate) session: Mutex<SessionManager>,
    /// Current query and CRUD batch limits
    pub(crate) limits: BatchConfig,
    /// HTTP client for the file endpoint
    pub(crate) http: reqwest::Client,
    /// Called before a parse failure is returned
    pub(crate) fatal_hook: Option<FatalErrorHook>,
}

impl ZuoraClient {
    /// Create a client; no remote call is made until the first operation
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is invalid, or a
    /// network error if the HTTP client cannot be built.
    pub fn new(config: Config, transport: Arc<dyn SoapTransport>) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.endpoint.request_timeout)
            .user_agent(config.endpoint.user_agent.as_str())
            .build()?;

        let session = SessionManager::new(
            config.credentials.clone(),
            endpoint,
            config.session.session_length,
        );

        info!(
            transport = transport.name(),
            endpoint = %config.endpoint.url,
            "zuora client created"
        );

        Ok(Self {
            limits: config.batch,
            config: Arc::new(config),
            transport,
            session: Mutex::new(session),
            http,
            fatal_hook: None,
        })
    }

    /// Register a callback for errors that end a download without data
    pub fn on_fatal_error(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.fatal_hook = Some(Arc::new(hook));
        self
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the create/update/delete batch size range
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `0 < min <= max <= 50`; the current
    /// range is kept in that case.
    pub fn set_batch_size(&mut self, min: usize, max: usize) -> Result<()> {
        self.limits.sizes = BatchSizes::new(min, max)?;
        Ok(())
    }

    /// Set only the maximum batch size, resetting the minimum to its default
    pub fn set_max_batch_size(&mut self, max: usize) -> Result<()> {
        self.limits.sizes = BatchSizes::with_max(max)?;
        Ok(())
    }

    /// Current `(min, max)` batch size range
    pub fn batch_size(&self) -> (usize, usize) {
        self.limits.sizes.as_tuple()
    }

    /// Set `QueryOptions.batchSize`; `0` restores the default
    pub fn set_query_batch_size(&mut self, size: u32) -> Result<()> {
        self.limits.query_batch_size = QueryBatchSize::new(size)?;
        Ok(())
    }

    /// Current `QueryOptions.batchSize`
    pub fn query_batch_size(&self) -> u32 {
        self.limits.query_batch_size.get()
    }

    /// How long each sub-batch may run before its items are reported timed out
    pub fn set_dispatch_timeout(&mut self, timeout: Duration) {
        self.limits.dispatch_timeout = timeout;
    }

    /// Change how long a session is trusted after login
    ///
    /// Takes effect at the next login.
    pub async fn set_session_length(&self, session_length: Duration) -> Result<()> {
        self.session
            .lock()
            .await
            .set_session_length(session_length)
    }

    /// Current session lifetime
    pub async fn session_length(&self) -> Duration {
        self.session.lock().await.session_length()
    }
}
